use std::path::Path;

use seeder_domain::{AppSource, Application};
use seeder_source::{RepositoryFetcher, prepare_checkout};
use tracing::info;

use crate::error::OrchestrationError;
use crate::platform::{PlatformClient, command};

type DeployResult<T> = std::result::Result<T, OrchestrationError>;

/// Push `app` to the currently targeted space.
///
/// Repository-sourced apps are checked out under `apps_dir/<name>` first; an
/// existing non-empty checkout is pushed as-is.
///
/// # Errors
///
/// Returns a configuration error (before any remote call) when the app is
/// invalid, a source error when the checkout fails, or the platform error when
/// the push fails.
pub fn deploy_app(
    client: &dyn PlatformClient,
    fetcher: &dyn RepositoryFetcher,
    apps_dir: &Path,
    app: &Application,
) -> DeployResult<()> {
    app.validate()?;
    let source_path = match app.source()? {
        AppSource::Repository(repo) => {
            let checkout = apps_dir.join(&app.name);
            prepare_checkout(fetcher, repo, &checkout)?;
            checkout.to_string_lossy().into_owned()
        }
        AppSource::Path(path) => path.to_string(),
    };

    info!(app = %app.name, path = %source_path, "pushing app");
    client.execute(&push_command(app, &source_path))?;
    Ok(())
}

/// Delete `app` and its mapped routes from the targeted space.
///
/// # Errors
///
/// Returns the platform error when the delete fails.
pub fn delete_app(client: &dyn PlatformClient, app: &Application) -> DeployResult<()> {
    info!(app = %app.name, "deleting app");
    client.execute(&command(["delete", app.name.as_str(), "-f", "-r"]))?;
    Ok(())
}

fn push_command(app: &Application, source_path: &str) -> Vec<String> {
    let mut args = command(["push", app.name.as_str(), "-p", source_path]);
    for (flag, value) in app.push_flags() {
        args.extend(command([flag, value]));
    }
    args
}
