#![allow(clippy::expect_used)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use seeder_source::{RepositoryFetcher, SourceError};

use crate::error::PlatformError;
use crate::platform::{PlatformClient, PlatformResult, Target};

pub const SPACE_GUID: &str = "space-guid";
pub const ROUTES_PATH: &str = "/v2/apps/app-guid/routes";
pub const DOMAIN_PATH: &str = "/v2/shared_domains/domain-guid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(Vec<String>),
    Query(String),
}

/// Platform client that records every call and answers queries from canned
/// bodies.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: RefCell<Vec<Call>>,
    responses: HashMap<String, String>,
    failing: Vec<Vec<String>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, request: &str, body: &str) -> Self {
        self.responses.insert(request.to_string(), body.to_string());
        self
    }

    /// Answer the three route lookups for `app` with `host.domain`.
    pub fn with_route(self, app: &str, host: &str, domain: &str) -> Self {
        self.respond(&app_search(app), &app_page(Some(ROUTES_PATH)))
            .respond(ROUTES_PATH, &routes_page(&[host]))
            .respond(DOMAIN_PATH, &domain_record(domain))
    }

    pub fn fail_on(mut self, command: &[&str]) -> Self {
        self.failing.push(args(command));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Execute(args) => Some(args.clone()),
                Call::Query(_) => None,
            })
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Query(path) => Some(path.clone()),
                Call::Execute(_) => None,
            })
            .collect()
    }
}

impl PlatformClient for RecordingClient {
    fn execute(&self, command: &[String]) -> PlatformResult<String> {
        self.calls
            .borrow_mut()
            .push(Call::Execute(command.to_vec()));
        if self.failing.iter().any(|failing| failing == command) {
            return Err(PlatformError::Reported {
                request: command.join(" "),
                error_code: "CF-Scripted".to_string(),
                description: "scripted failure".to_string(),
            });
        }
        Ok("OK".to_string())
    }

    fn query(&self, path: &str) -> PlatformResult<Vec<u8>> {
        self.calls.borrow_mut().push(Call::Query(path.to_string()));
        self.responses
            .get(path)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| PlatformError::Reported {
                request: path.to_string(),
                error_code: "CF-NotFound".to_string(),
                description: "no canned response".to_string(),
            })
    }

    fn space_guid(&self, _target: &Target) -> PlatformResult<String> {
        Ok(SPACE_GUID.to_string())
    }
}

/// Fetcher that records clone requests and drops a marker file into the
/// destination.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    clones: RefCell<Vec<(String, PathBuf)>>,
}

impl RecordingFetcher {
    pub fn clones(&self) -> Vec<(String, PathBuf)> {
        self.clones.borrow().clone()
    }
}

impl RepositoryFetcher for RecordingFetcher {
    fn fetch(&self, repo_url: &str, destination: &Path) -> Result<(), SourceError> {
        self.clones
            .borrow_mut()
            .push((repo_url.to_string(), destination.to_path_buf()));
        fs::write(destination.join("README"), repo_url).expect("write checkout marker");
        Ok(())
    }
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|arg| (*arg).to_string()).collect()
}

pub fn app_search(app: &str) -> String {
    format!("/v2/spaces/{SPACE_GUID}/apps?q=name:{app}&inline-relations-depth=1")
}

pub fn app_page(routes_url: Option<&str>) -> String {
    let entity = routes_url.map_or_else(
        || r#"{"name": "api"}"#.to_string(),
        |url| format!(r#"{{"name": "api", "routes_url": "{url}"}}"#),
    );
    format!(
        r#"{{"total_results": 1, "resources": [{{"metadata": {{"guid": "app-guid"}}, "entity": {entity}}}]}}"#
    )
}

pub fn routes_page(hosts: &[&str]) -> String {
    let resources: Vec<String> = hosts
        .iter()
        .enumerate()
        .map(|(index, host)| {
            format!(
                r#"{{"metadata": {{"guid": "route-{index}"}}, "entity": {{"host": "{host}", "domain_url": "{DOMAIN_PATH}"}}}}"#
            )
        })
        .collect();
    format!(
        r#"{{"total_results": {}, "resources": [{}]}}"#,
        hosts.len(),
        resources.join(", ")
    )
}

pub fn domain_record(name: &str) -> String {
    format!(r#"{{"metadata": {{"guid": "domain-guid"}}, "entity": {{"name": "{name}"}}}}"#)
}
