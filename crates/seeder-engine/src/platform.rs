use std::fmt;

use crate::error::PlatformError;

pub(crate) type PlatformResult<T> = std::result::Result<T, PlatformError>;

const REDACTED: &str = "[REDACTED]";

/// Organization, and optionally space, that an operation is scoped to.
///
/// Built from the manifest position of the entity being processed and passed
/// explicitly into every scoped call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    organization: String,
    space: Option<String>,
}

impl Target {
    #[must_use]
    pub fn organization(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            space: None,
        }
    }

    #[must_use]
    pub fn space(organization: impl Into<String>, space: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            space: Some(space.into()),
        }
    }

    #[must_use]
    pub fn organization_name(&self) -> &str {
        &self.organization
    }

    #[must_use]
    pub fn space_name(&self) -> Option<&str> {
        self.space.as_deref()
    }

    /// The `target` command that selects this org/space in the session.
    #[must_use]
    pub fn command(&self) -> Vec<String> {
        let mut args = command(["target", "-o", self.organization.as_str()]);
        if let Some(space) = &self.space {
            args.extend(command(["-s", space.as_str()]));
        }
        args
    }
}

impl fmt::Display for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.space {
            Some(space) => write!(formatter, "{}/{space}", self.organization),
            None => self.organization.fmt(formatter),
        }
    }
}

/// The command/API surface of the platform.
///
/// Implementations are blocking: each call returns only once the platform has
/// answered.
pub trait PlatformClient {
    /// Run a state-changing or targeting command and return its output.
    ///
    /// # Errors
    ///
    /// Returns an error when the command cannot be run or the platform reports
    /// failure.
    fn execute(&self, args: &[String]) -> PlatformResult<String>;

    /// Fetch a read-only resource. `path` is an API path such as
    /// `/v2/apps/<guid>` or a URL taken from an earlier response.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be issued.
    fn query(&self, path: &str) -> PlatformResult<Vec<u8>>;

    /// GUID of the space the session currently targets, checked against
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be read or targets another
    /// space.
    fn space_guid(&self, target: &Target) -> PlatformResult<String>;

    /// Select `target` in the platform session.
    ///
    /// # Errors
    ///
    /// Returns an error when the targeting command fails.
    fn target(&self, target: &Target) -> PlatformResult<String> {
        self.execute(&target.command())
    }
}

pub(crate) fn command<'a, I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    args.into_iter().map(str::to_string).collect()
}

/// Render `args` for logs and error messages with broker credentials masked.
#[must_use]
pub fn redacted_command_line(args: &[String]) -> String {
    let mut rendered: Vec<&str> = args.iter().map(String::as_str).collect();
    // create-service-broker <name> <username> <password> <url>
    if rendered.first() == Some(&"create-service-broker") {
        if let Some(password) = rendered.get_mut(3) {
            *password = REDACTED;
        }
    }
    rendered.join(" ")
}
