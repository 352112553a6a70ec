#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use tracing::{debug, info};
use url::Url;

mod error;

pub use error::SourceError;

type SourceResult<T> = std::result::Result<T, SourceError>;

/// Clones a repository into a local directory.
pub trait RepositoryFetcher {
    /// Clone `repo_url` into `destination`, which exists and is empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository cannot be fetched or checked out.
    fn fetch(&self, repo_url: &str, destination: &Path) -> SourceResult<()>;
}

/// Fetcher backed by an embedded git implementation, so no `git` binary is
/// needed on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct GixFetcher;

impl RepositoryFetcher for GixFetcher {
    fn fetch(&self, repo_url: &str, destination: &Path) -> SourceResult<()> {
        validate_repository_url(repo_url)?;

        let mut prepared = gix::prepare_clone(repo_url, destination).map_err(|source| {
            SourceError::PrepareClone {
                repo_url: repo_url.to_string(),
                source: Box::new(source),
            }
        })?;

        let should_interrupt = AtomicBool::new(false);
        let (mut checkout, _) = prepared
            .fetch_then_checkout(gix::progress::Discard, &should_interrupt)
            .map_err(|source| SourceError::FetchRemote {
                repo_url: repo_url.to_string(),
                source: Box::new(source),
            })?;

        let _ = checkout
            .main_worktree(gix::progress::Discard, &should_interrupt)
            .map_err(|source| SourceError::CheckoutRemote {
                repo_url: repo_url.to_string(),
                source: Box::new(source),
            })?;

        Ok(())
    }
}

/// Outcome of [`prepare_checkout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    Cloned,
    Reused,
}

/// Make sure `destination` holds a checkout of `repo_url`.
///
/// The directory is created when missing. A non-empty directory is treated as
/// an earlier checkout and reused without any freshness check; only an empty
/// directory triggers a clone.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or listed, or when
/// the clone fails.
pub fn prepare_checkout(
    fetcher: &dyn RepositoryFetcher,
    repo_url: &str,
    destination: &Path,
) -> SourceResult<Checkout> {
    fs::create_dir_all(destination).map_err(|source| SourceError::CreateWorkdir {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut entries = fs::read_dir(destination).map_err(|source| SourceError::ReadWorkdir {
        path: destination.to_path_buf(),
        source,
    })?;
    if entries.next().is_some() {
        debug!(path = %destination.display(), "reusing existing app source");
        return Ok(Checkout::Reused);
    }

    info!(repo = repo_url, path = %destination.display(), "cloning app source");
    fetcher.fetch(repo_url, destination)?;
    Ok(Checkout::Cloned)
}

/// Check that `input` names a network repository the fetcher can clone.
///
/// # Errors
///
/// Returns an error for empty input, local paths, `file://` URLs, unknown
/// schemes, missing hosts, and URLs carrying a password.
pub fn validate_repository_url(input: &str) -> SourceResult<()> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SourceError::EmptyRepository);
    }

    if !trimmed.contains("://") {
        return validate_scp_style(trimmed);
    }

    let url = Url::parse(trimmed).map_err(|source| SourceError::InvalidRepositoryUrl {
        input: trimmed.to_string(),
        source,
    })?;
    match url.scheme() {
        "https" | "http" | "git" | "ssh" => {}
        "file" => return Err(SourceError::FileSchemeNotSupported),
        scheme => {
            return Err(SourceError::UnsupportedRepositoryScheme {
                scheme: scheme.to_string(),
            });
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(SourceError::MissingRepositoryHost);
    }

    if url.password().is_some() {
        return Err(SourceError::PasswordNotSupported);
    }

    Ok(())
}

fn validate_scp_style(input: &str) -> SourceResult<()> {
    let Some((user_host, path)) = input.split_once(':') else {
        return Err(SourceError::NotARepositoryUrl {
            input: input.to_string(),
        });
    };
    let Some((user, host)) = user_host.split_once('@') else {
        return Err(SourceError::NotARepositoryUrl {
            input: input.to_string(),
        });
    };
    if user.is_empty() || host.is_empty() || path.is_empty() || host.contains('/') {
        return Err(SourceError::InvalidScpStyleFormat {
            input: input.to_string(),
        });
    }
    Ok(())
}
