use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ArgumentParse(#[from] clap::Error),
    #[error(transparent)]
    Manifest(#[from] seeder_engine::ManifestError),
    #[error(transparent)]
    Platform(#[from] seeder_engine::PlatformError),
    #[error(transparent)]
    Orchestration(#[from] seeder_engine::OrchestrationError),
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}
