use std::path::PathBuf;

use seeder_domain::Manifest;
use seeder_source::RepositoryFetcher;
use tracing::{info, warn};

use crate::broker::{deregister_as_broker, register_as_broker};
use crate::deploy::{delete_app, deploy_app};
use crate::error::OrchestrationError;
use crate::platform::{PlatformClient, Target, command};

type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;

/// Drives a manifest against the platform, strictly in manifest order.
///
/// Every run stops at the first failed remote operation. Nothing is retried
/// or rolled back; a partially applied manifest is cleaned up with
/// [`Orchestrator::teardown`].
pub struct Orchestrator<'a> {
    client: &'a dyn PlatformClient,
    fetcher: &'a dyn RepositoryFetcher,
    apps_dir: PathBuf,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        client: &'a dyn PlatformClient,
        fetcher: &'a dyn RepositoryFetcher,
        apps_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            fetcher,
            apps_dir: apps_dir.into(),
        }
    }

    /// Create organizations, spaces, apps (registering brokers) and services.
    ///
    /// Broker URLs computed along the way are written back into `manifest`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any remote call when the manifest
    /// is invalid, otherwise the first failure encountered.
    pub fn apply(&self, manifest: &mut Manifest) -> OrchestrationResult<()> {
        manifest.validate()?;
        self.create_organizations(manifest)?;
        self.create_spaces(manifest)?;
        self.create_apps(manifest)?;
        self.create_services(manifest)?;
        info!("apply finished");
        Ok(())
    }

    /// Remove everything `apply` creates, deepest resources first.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any remote call when the manifest
    /// is invalid, otherwise the first failure encountered.
    pub fn teardown(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        manifest.validate()?;
        self.delete_apps(manifest)?;
        self.delete_services(manifest)?;
        self.delete_spaces(manifest)?;
        self.delete_organizations(manifest)?;
        info!("teardown finished");
        Ok(())
    }

    fn create_organizations(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for org in &manifest.organizations {
            info!(org = %org.name, "creating organization");
            self.run(&["create-org", org.name.as_str()])?;
        }
        Ok(())
    }

    fn delete_organizations(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for org in &manifest.organizations {
            info!(org = %org.name, "deleting organization");
            self.run(&["delete-org", org.name.as_str(), "-f"])?;
        }
        Ok(())
    }

    fn create_spaces(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for org in &manifest.organizations {
            self.select(&Target::organization(org.name.as_str()));
            for space in &org.spaces {
                info!(org = %org.name, space = %space.name, "creating space");
                self.run(&["create-space", space.name.as_str()])?;
            }
        }
        Ok(())
    }

    fn delete_spaces(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for org in &manifest.organizations {
            self.select(&Target::organization(org.name.as_str()));
            for space in &org.spaces {
                info!(org = %org.name, space = %space.name, "deleting space");
                self.run(&["delete-space", space.name.as_str(), "-f"])?;
            }
        }
        Ok(())
    }

    fn create_apps(&self, manifest: &mut Manifest) -> OrchestrationResult<()> {
        for org in &mut manifest.organizations {
            for space in &mut org.spaces {
                let target = Target::space(org.name.as_str(), space.name.as_str());
                self.select(&target);
                for app in &mut space.apps {
                    deploy_app(self.client, self.fetcher, &self.apps_dir, app)?;
                    if app.is_broker() {
                        info!(app = %app.name, "setting app as service broker");
                        register_as_broker(self.client, &target, app)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn delete_apps(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for (org, space) in manifest.spaces() {
            let target = Target::space(org.name.as_str(), space.name.as_str());
            self.select(&target);
            for app in &space.apps {
                if app.is_broker() {
                    deregister_as_broker(self.client, &target, app)?;
                }
                delete_app(self.client, app)?;
            }
        }
        Ok(())
    }

    fn create_services(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for (org, space) in manifest.spaces() {
            self.select(&Target::space(org.name.as_str(), space.name.as_str()));
            for service in &space.services {
                let plan = service.plan().unwrap_or_default();
                info!(service = %service.name, offering = %service.service, plan, "creating service");
                self.run(&[
                    "create-service",
                    service.service.as_str(),
                    plan,
                    service.name.as_str(),
                ])?;
            }
        }
        Ok(())
    }

    fn delete_services(&self, manifest: &Manifest) -> OrchestrationResult<()> {
        for (org, space) in manifest.spaces() {
            self.select(&Target::space(org.name.as_str(), space.name.as_str()));
            for service in &space.services {
                info!(service = %service.name, "deleting service");
                self.run(&["delete-service", service.name.as_str(), "-f"])?;
            }
        }
        Ok(())
    }

    // A failed target is not fatal: the next scoped command fails on its own.
    fn select(&self, target: &Target) {
        if let Err(error) = self.client.target(target) {
            warn!(%target, %error, "failed to target; continuing");
        }
    }

    fn run(&self, args: &[&str]) -> OrchestrationResult<()> {
        self.client.execute(&command(args.iter().copied()))?;
        Ok(())
    }
}
