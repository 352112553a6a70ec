use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use seeder_domain::DomainValidationError;
use seeder_source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid manifest: {path}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: DomainValidationError,
    },
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("binary \"{binary}\" not found on PATH")]
    BinaryNotFound { binary: String },
    #[error("failed to execute: {command}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("command failed: {command} ({status})\n{output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },
    #[error("platform rejected {request}: {error_code}: {description}")]
    Reported {
        request: String,
        error_code: String,
        description: String,
    },
    #[error("cannot locate the platform session: no home directory and CF_HOME is unset")]
    HomeNotFound,
    #[error("failed to read platform session: {path}")]
    SessionRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode platform session: {path}")]
    SessionDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("target {target} does not name a space")]
    SpaceNotTargeted { target: String },
    #[error("platform session targets {actual}, expected {expected}")]
    TargetMismatch { expected: String, actual: String },
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("app '{app}' not found in {target}")]
    AppNotFound { app: String, target: String },
    #[error("app '{app}' has no routes URL")]
    MissingRoutesUrl { app: String },
    #[error("app '{app}' has no routes")]
    NoRoutes { app: String },
    #[error("failed to decode {step} response from {request}")]
    Decode {
        step: &'static str,
        request: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Configuration(#[from] DomainValidationError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
