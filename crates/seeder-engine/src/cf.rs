use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::PlatformError;
use crate::platform::{PlatformClient, PlatformResult, Target, redacted_command_line};

const CF_HOME_ENV: &str = "CF_HOME";
const FAILURE_OUTPUT_LINES: usize = 20;

/// [`PlatformClient`] that drives the Cloud Foundry `cf` command-line tool.
///
/// Commands run as `cf <args>`, queries as `cf curl <path>`. The targeted
/// space is read back from the CLI's session file.
#[derive(Debug, Clone)]
pub struct CfCli {
    binary: PathBuf,
    home: Option<PathBuf>,
}

impl CfCli {
    /// Locate `binary` on `PATH` (or accept it as a path) and honor
    /// `CF_HOME` for the session file.
    ///
    /// # Errors
    ///
    /// Returns an error when the binary cannot be found.
    pub fn locate(binary: &str) -> PlatformResult<Self> {
        let binary = which::which(binary).map_err(|_| PlatformError::BinaryNotFound {
            binary: binary.to_string(),
        })?;
        Ok(Self {
            binary,
            home: env::var_os(CF_HOME_ENV).map(PathBuf::from),
        })
    }

    #[must_use]
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = Some(home);
        self
    }

    fn session_path(&self) -> PlatformResult<PathBuf> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => dirs::home_dir().ok_or(PlatformError::HomeNotFound)?,
        };
        Ok(home.join(".cf").join("config.json"))
    }

    fn spawn(&self, args: &[String], command_line: &str) -> PlatformResult<Child> {
        debug!(command = %command_line, "running cf");
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PlatformError::Spawn {
                command: command_line.to_string(),
                source,
            })
    }

    /// Run `cf <args>`. With `stream` set, stdout lines are logged as they
    /// arrive so long pushes show progress.
    fn run(&self, args: &[String], stream: bool) -> PlatformResult<String> {
        let command_line = redacted_command_line(args);
        let mut child = self.spawn(args, &command_line)?;

        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                String::from_utf8_lossy(&buffer).into_owned()
            })
        });

        let mut stdout = String::new();
        if let Some(pipe) = child.stdout.take() {
            let mut reader = BufReader::new(pipe);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        if stream && !text.trim().is_empty() {
                            info!(target: "cf", "{}", text.trim_end());
                        }
                        stdout.push_str(&text);
                    }
                }
            }
        }

        let status = child.wait().map_err(|source| PlatformError::Spawn {
            command: command_line.clone(),
            source,
        })?;
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        check_status(command_line, status, stdout, &stderr)
    }
}

impl PlatformClient for CfCli {
    fn execute(&self, args: &[String]) -> PlatformResult<String> {
        self.run(args, true)
    }

    fn query(&self, path: &str) -> PlatformResult<Vec<u8>> {
        let body = self.run(&["curl".to_string(), path.to_string()], false)?;
        Ok(body.into_bytes())
    }

    fn space_guid(&self, target: &Target) -> PlatformResult<String> {
        let path = self.session_path()?;
        let contents = fs::read(&path).map_err(|source| PlatformError::SessionRead {
            path: path.clone(),
            source,
        })?;
        session_space_guid(&contents, &path, target)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Session {
    #[serde(default)]
    organization_fields: SessionFields,
    #[serde(default)]
    space_fields: SessionFields,
}

#[derive(Debug, Default, Deserialize)]
struct SessionFields {
    #[serde(default, rename = "GUID", alias = "Guid")]
    guid: String,
    #[serde(default, rename = "Name")]
    name: String,
}

fn session_space_guid(contents: &[u8], path: &Path, target: &Target) -> PlatformResult<String> {
    let Some(space) = target.space_name() else {
        return Err(PlatformError::SpaceNotTargeted {
            target: target.to_string(),
        });
    };

    let session: Session =
        serde_json::from_slice(contents).map_err(|source| PlatformError::SessionDecode {
            path: path.to_path_buf(),
            source,
        })?;

    let organization = &session.organization_fields.name;
    let current_space = &session.space_fields.name;
    // The platform treats org and space names case-insensitively.
    if !organization.eq_ignore_ascii_case(target.organization_name())
        || !current_space.eq_ignore_ascii_case(space)
    {
        return Err(PlatformError::TargetMismatch {
            expected: target.to_string(),
            actual: format!("{organization}/{current_space}"),
        });
    }

    if session.space_fields.guid.is_empty() {
        return Err(PlatformError::SpaceNotTargeted {
            target: target.to_string(),
        });
    }

    Ok(session.space_fields.guid)
}

fn check_status(
    command: String,
    status: ExitStatus,
    stdout: String,
    stderr: &str,
) -> PlatformResult<String> {
    if status.success() {
        return Ok(stdout);
    }
    Err(PlatformError::CommandFailed {
        command,
        status,
        output: failure_output(&stdout, stderr),
    })
}

fn failure_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(FAILURE_OUTPUT_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::{CfCli, session_space_guid};
    use crate::error::PlatformError;
    use crate::platform::{PlatformClient, Target};

    const SESSION: &str = r#"{
        "ConfigVersion": 3,
        "Target": "https://api.example.com",
        "OrganizationFields": {"GUID": "org-guid", "Name": "acme"},
        "SpaceFields": {"GUID": "space-guid", "Name": "dev", "AllowSSH": true}
    }"#;

    #[test]
    fn reads_targeted_space_guid() {
        let guid = session_space_guid(
            SESSION.as_bytes(),
            Path::new("config.json"),
            &Target::space("acme", "dev"),
        )
        .expect("space guid");
        assert_eq!(guid, "space-guid");
    }

    #[test]
    fn rejects_session_targeting_another_space() {
        let error = session_space_guid(
            SESSION.as_bytes(),
            Path::new("config.json"),
            &Target::space("acme", "prod"),
        )
        .expect_err("mismatched space");
        assert!(matches!(error, PlatformError::TargetMismatch { .. }));
        assert_eq!(
            error.to_string(),
            "platform session targets acme/dev, expected acme/prod"
        );
    }

    #[test]
    fn requires_space_in_target() {
        let error = session_space_guid(
            SESSION.as_bytes(),
            Path::new("config.json"),
            &Target::organization("acme"),
        )
        .expect_err("org-only target");
        assert!(matches!(error, PlatformError::SpaceNotTargeted { .. }));
    }

    #[test]
    fn missing_binary_is_reported() {
        let error = CfCli::locate("seeder-definitely-not-a-cf-binary").expect_err("missing");
        assert!(matches!(error, PlatformError::BinaryNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn reads_session_from_cf_home() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join(".cf")).expect("create .cf");
        fs::write(temp.path().join(".cf/config.json"), SESSION).expect("write session");

        let client = CfCli::locate("sh")
            .expect("sh on PATH")
            .with_home(temp.path().to_path_buf());
        let guid = client
            .space_guid(&Target::space("acme", "dev"))
            .expect("space guid");
        assert_eq!(guid, "space-guid");
    }

    #[test]
    fn session_names_match_case_insensitively() {
        let guid = session_space_guid(
            SESSION.as_bytes(),
            Path::new("config.json"),
            &Target::space("ACME", "Dev"),
        )
        .expect("space guid");
        assert_eq!(guid, "space-guid");
    }

    #[cfg(unix)]
    #[test]
    fn execute_collects_streamed_stdout() {
        let client = CfCli::locate("sh").expect("sh on PATH");
        let output = client
            .execute(&["-c".to_string(), "echo one; echo two".to_string()])
            .expect("command succeeds");
        assert_eq!(output, "one\ntwo\n");
    }

    #[cfg(unix)]
    #[test]
    fn failed_command_reports_stdout_and_stderr_tail() {
        let client = CfCli::locate("sh").expect("sh on PATH");
        let error = client
            .execute(&[
                "-c".to_string(),
                "echo pushing; echo boom >&2; exit 3".to_string(),
            ])
            .expect_err("command fails");

        assert!(matches!(
            &error,
            PlatformError::CommandFailed { output, .. } if output == "pushing\nboom"
        ));
    }
}
