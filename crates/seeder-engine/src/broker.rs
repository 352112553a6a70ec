use seeder_domain::{Application, Service};
use tracing::{debug, info};

use crate::error::OrchestrationError;
use crate::platform::{PlatformClient, Target, command};
use crate::resolver::resolve_route;

type BrokerResult<T> = std::result::Result<T, OrchestrationError>;

/// Public URL of a broker served at `route`.
#[must_use]
pub fn broker_url(route: &str) -> String {
    format!("https://{route}")
}

/// Register `app` as a service broker and enable its service access grants.
///
/// The broker URL is derived from the app's route and stored on the app's
/// broker descriptor. Apps without a broker descriptor are left alone.
///
/// # Errors
///
/// Returns the first failure among route resolution, broker creation and the
/// access grants; later steps are not attempted.
pub fn register_as_broker(
    client: &dyn PlatformClient,
    target: &Target,
    app: &mut Application,
) -> BrokerResult<()> {
    let Some(broker) = app.service_broker.as_mut() else {
        return Ok(());
    };

    let route = resolve_route(client, target, &app.name)?;
    broker.url = broker_url(&route);

    info!(app = %app.name, broker = %broker.name, url = %broker.url, "creating service broker");
    client.execute(&command([
        "create-service-broker",
        broker.name.as_str(),
        broker.username.as_str(),
        broker.password.as_str(),
        broker.url.as_str(),
    ]))?;

    for grant in &app.service_access {
        info!(service = %grant.service, "enabling service access");
        client.execute(&access_command("enable-service-access", grant))?;
    }
    Ok(())
}

/// Disable the access grants of `app` and delete its service broker.
///
/// The route is resolved again rather than remembered from registration.
///
/// # Errors
///
/// Returns the first failure; the broker is only deleted once every grant has
/// been disabled.
pub fn deregister_as_broker(
    client: &dyn PlatformClient,
    target: &Target,
    app: &Application,
) -> BrokerResult<()> {
    let Some(broker) = &app.service_broker else {
        return Ok(());
    };

    let route = resolve_route(client, target, &app.name)?;
    debug!(broker = %broker.name, url = %broker_url(&route), "deregistering service broker");

    for grant in &app.service_access {
        info!(service = %grant.service, "disabling service access");
        client.execute(&access_command("disable-service-access", grant))?;
    }

    info!(broker = %broker.name, "deleting service broker");
    client.execute(&command([
        "delete-service-broker",
        broker.name.as_str(),
        "-f",
    ]))?;
    Ok(())
}

fn access_command(verb: &str, grant: &Service) -> Vec<String> {
    let mut args = command([verb, grant.service.as_str()]);
    if let Some(plan) = grant.plan() {
        args.extend(command(["-p", plan]));
    }
    if let Some(org) = grant.org() {
        args.extend(command(["-o", org]));
    }
    args
}
