use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to create app source directory {path}")]
    CreateWorkdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read app source directory {path}")]
    ReadWorkdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("repository source cannot be empty")]
    EmptyRepository,
    #[error("invalid repository URL: {input}")]
    InvalidRepositoryUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid scp-style repository; expected user@host:path, got {input}")]
    InvalidScpStyleFormat { input: String },
    #[error("file:// repositories are not supported; use `path` for local app sources")]
    FileSchemeNotSupported,
    #[error(
        "unsupported repository scheme \"{scheme}\"; expected https://, http://, git://, ssh://, or user@host:path"
    )]
    UnsupportedRepositoryScheme { scheme: String },
    #[error("repository \"{input}\" is not a URL; use `path` for local app sources")]
    NotARepositoryUrl { input: String },
    #[error("repository URL must include a host")]
    MissingRepositoryHost,
    #[error("repository URLs with passwords are not supported")]
    PasswordNotSupported,
    #[error("failed to prepare clone from {repo_url}")]
    PrepareClone {
        repo_url: String,
        #[source]
        source: Box<gix::clone::Error>,
    },
    #[error("failed to fetch remote repository {repo_url}")]
    FetchRemote {
        repo_url: String,
        #[source]
        source: Box<gix::clone::fetch::Error>,
    },
    #[error("failed to check out repository {repo_url}")]
    CheckoutRemote {
        repo_url: String,
        #[source]
        source: Box<gix::clone::checkout::main_worktree::Error>,
    },
}
