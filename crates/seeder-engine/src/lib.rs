mod broker;
mod cf;
mod deploy;
mod error;
mod manifest;
mod orchestrator;
mod platform;
mod resolver;
#[cfg(test)]
mod test_support;

pub use broker::{broker_url, deregister_as_broker, register_as_broker};
pub use cf::CfCli;
pub use deploy::{delete_app, deploy_app};
pub use error::{ManifestError, OrchestrationError, PlatformError, ResolutionError};
pub use manifest::{load_manifest, parse_manifest};
pub use orchestrator::Orchestrator;
pub use platform::{PlatformClient, Target, redacted_command_line};
pub use resolver::resolve_route;
