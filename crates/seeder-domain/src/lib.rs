use std::fmt;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainValidationError {
    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },
    #[error("app {app} needs a repo or a path")]
    MissingAppSource { app: String },
    #[error("app name {app} must not contain path separators or be `.` or `..`")]
    InvalidAppName { app: String },
    #[error("app {app} sets both repo and path; exactly one is allowed")]
    ConflictingAppSource { app: String },
    #[error("service {name} must name a service offering")]
    MissingServiceOffering { name: String },
    #[error("service {name} must name a plan")]
    MissingServicePlan { name: String },
    #[error("service broker for app {app} must have a name")]
    EmptyBrokerName { app: String },
}

/// Root of a seed manifest: organizations in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default, alias = "orgs")]
    pub organizations: Vec<Organization>,
}

impl Manifest {
    /// Check every entity for the invariants the orchestrator relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, walking the tree in manifest order.
    pub fn validate(&self) -> Result<(), DomainValidationError> {
        for org in &self.organizations {
            require_name("organization", &org.name)?;
            for space in &org.spaces {
                require_name("space", &space.name)?;
                for app in &space.apps {
                    app.validate()?;
                }
                for service in &space.services {
                    service.validate_instance()?;
                }
            }
        }
        Ok(())
    }

    /// Iterate `(organization, space)` pairs in manifest order.
    pub fn spaces(&self) -> impl Iterator<Item = (&Organization, &Space)> {
        self.organizations
            .iter()
            .flat_map(|org| org.spaces.iter().map(move |space| (org, space)))
    }
}

fn require_name(kind: &'static str, name: &str) -> Result<(), DomainValidationError> {
    if name.trim().is_empty() {
        Err(DomainValidationError::EmptyName { kind })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default)]
    pub spaces: Vec<Space>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Space {
    pub name: String,
    #[serde(default)]
    pub apps: Vec<Application>,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A service instance request inside a space, or an access grant under an
/// application's `serviceAccess` list. In the grant role `plan` and `org`
/// narrow the grant and `name` is unused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub plan: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub org: Option<String>,
}

impl Service {
    #[must_use]
    pub fn plan(&self) -> Option<&str> {
        non_empty(self.plan.as_ref())
    }

    #[must_use]
    pub fn org(&self) -> Option<&str> {
        non_empty(self.org.as_ref())
    }

    /// Validate this entry as a service instance to create in a space.
    ///
    /// # Errors
    ///
    /// Returns an error when the instance name, offering, or plan is missing.
    pub fn validate_instance(&self) -> Result<(), DomainValidationError> {
        require_name("service", &self.name)?;
        if self.service.trim().is_empty() {
            return Err(DomainValidationError::MissingServiceOffering {
                name: self.name.clone(),
            });
        }
        if self.plan().is_none() {
            return Err(DomainValidationError::MissingServicePlan {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Validate this entry as a service access grant.
    ///
    /// # Errors
    ///
    /// Returns an error when the offering is missing.
    pub fn validate_grant(&self) -> Result<(), DomainValidationError> {
        if self.service.trim().is_empty() {
            Err(DomainValidationError::MissingServiceOffering {
                name: self.name.clone(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub repo: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub disk: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub memory: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub instances: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub buildpack: Option<String>,
    #[serde(default, alias = "manifest", deserialize_with = "optional_scalar")]
    pub manifest_file: Option<String>,
    #[serde(default, deserialize_with = "optional_broker")]
    pub service_broker: Option<ServiceBroker>,
    #[serde(default)]
    pub service_access: Vec<Service>,
}

/// Where the bits for an application push come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSource<'a> {
    Repository(&'a str),
    Path(&'a str),
}

impl Application {
    /// Resolve the single configured source of this application.
    ///
    /// # Errors
    ///
    /// Returns an error when neither or both of `repo` and `path` are set.
    pub fn source(&self) -> Result<AppSource<'_>, DomainValidationError> {
        match (non_empty(self.repo.as_ref()), non_empty(self.path.as_ref())) {
            (Some(repo), None) => Ok(AppSource::Repository(repo)),
            (None, Some(path)) => Ok(AppSource::Path(path)),
            (None, None) => Err(DomainValidationError::MissingAppSource {
                app: self.name.clone(),
            }),
            (Some(_), Some(_)) => Err(DomainValidationError::ConflictingAppSource {
                app: self.name.clone(),
            }),
        }
    }

    #[must_use]
    pub fn is_broker(&self) -> bool {
        self.service_broker.is_some()
    }

    /// Push flags in the order the platform CLI expects them, skipping unset
    /// fields.
    #[must_use]
    pub fn push_flags(&self) -> Vec<(&'static str, &str)> {
        [
            ("-k", &self.disk),
            ("-m", &self.memory),
            ("-i", &self.instances),
            ("-n", &self.hostname),
            ("-d", &self.domain),
            ("-b", &self.buildpack),
            ("-f", &self.manifest_file),
        ]
        .into_iter()
        .filter_map(|(flag, value)| non_empty(value.as_ref()).map(|value| (flag, value)))
        .collect()
    }

    /// Validate the application and its broker configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name, a missing or ambiguous source, or a
    /// malformed broker / access grant.
    pub fn validate(&self) -> Result<(), DomainValidationError> {
        require_name("app", &self.name)?;
        // The name doubles as the checkout directory under the apps dir.
        if matches!(self.name.as_str(), "." | "..") || self.name.contains(['/', '\\']) {
            return Err(DomainValidationError::InvalidAppName {
                app: self.name.clone(),
            });
        }
        self.source()?;
        if self
            .service_broker
            .as_ref()
            .is_some_and(|broker| broker.name.trim().is_empty())
        {
            return Err(DomainValidationError::EmptyBrokerName {
                app: self.name.clone(),
            });
        }
        for grant in &self.service_access {
            grant.validate_grant()?;
        }
        Ok(())
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceBroker {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: String,
}

impl ServiceBroker {
    /// True when no field is set, which the manifest treats as no broker.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.name, &self.username, &self.password, &self.url]
            .into_iter()
            .all(|field| field.trim().is_empty())
    }
}

impl fmt::Debug for ServiceBroker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceBroker")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

fn optional_broker<'de, D>(deserializer: D) -> Result<Option<ServiceBroker>, D::Error>
where
    D: Deserializer<'de>,
{
    let broker = Option::<ServiceBroker>::deserialize(deserializer)?;
    Ok(broker.filter(|broker| !broker.is_empty()))
}

// YAML authors write `instances: 2` as often as `instances: "2"`.
fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Unsigned(number) => number.to_string(),
        Scalar::Signed(number) => number.to_string(),
        Scalar::Float(number) => number.to_string(),
        Scalar::Flag(flag) => flag.to_string(),
    }))
}
