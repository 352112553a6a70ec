use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

static BUILD_SEEDER: OnceLock<Result<(), String>> = OnceLock::new();

const FAKE_CF_SCRIPT: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$SEEDER_FAKE_CF_LOG"
if [ -n "$SEEDER_FAKE_CF_FAIL" ] && [ "$*" = "$SEEDER_FAKE_CF_FAIL" ]; then
  echo "FAILED"
  echo "Server error, status code: 500" >&2
  exit 1
fi
if [ "$1" = "curl" ]; then
  case "$2" in
    /v2/spaces/space-guid/apps*)
      echo '{"total_results":1,"resources":[{"metadata":{"guid":"app-guid"},"entity":{"name":"api","routes_url":"/v2/apps/app-guid/routes"}}]}' ;;
    /v2/apps/app-guid/routes)
      echo '{"total_results":1,"resources":[{"metadata":{"guid":"route-guid"},"entity":{"host":"api-abc123","domain_url":"/v2/shared_domains/domain-guid"}}]}' ;;
    /v2/shared_domains/domain-guid)
      echo '{"metadata":{"guid":"domain-guid"},"entity":{"name":"example.com"}}' ;;
    *)
      echo '{"code":10000,"description":"Unknown request","error_code":"CF-NotFound"}' ;;
  esac
  exit 0
fi
echo OK
"#;

const FAKE_SESSION: &str = r#"{
  "ConfigVersion": 3,
  "OrganizationFields": {"GUID": "org-guid", "Name": "acme"},
  "SpaceFields": {"GUID": "space-guid", "Name": "dev"}
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    #[must_use]
    pub fn transcript(&self) -> String {
        format!(
            "$ {}\n[exit: {}]\n[stdout]\n{}[stderr]\n{}",
            self.command_line, self.exit_code, self.stdout, self.stderr
        )
    }
}

/// A scripted stand-in for the `cf` CLI that logs every invocation and
/// answers route lookups for an app named `api` in `acme/dev`.
#[derive(Debug, Clone)]
pub struct FakeCf {
    bin_dir: PathBuf,
    home: PathBuf,
    log: PathBuf,
}

impl FakeCf {
    /// Install the fake `cf` script and its session file under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the script or session file cannot be written.
    pub fn install(root: &Path) -> std::io::Result<Self> {
        let bin_dir = root.join("fake-bin");
        let home = root.join("cf-home");
        let log = root.join("cf.log");

        let script = bin_dir.join("cf");
        write_file(&script, FAKE_CF_SCRIPT)?;
        make_executable(&script)?;
        write_file(&home.join(".cf").join("config.json"), FAKE_SESSION)?;
        write_file(&log, "")?;

        Ok(Self { bin_dir, home, log })
    }

    /// Environment that puts the fake first on `PATH`.
    #[must_use]
    pub fn env(&self) -> Vec<(String, OsString)> {
        let mut paths = vec![self.bin_dir.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        let path = std::env::join_paths(paths).unwrap_or_else(|_| self.bin_dir.clone().into());

        vec![
            ("PATH".to_string(), path),
            ("CF_HOME".to_string(), self.home.clone().into()),
            ("SEEDER_FAKE_CF_LOG".to_string(), self.log.clone().into()),
        ]
    }

    /// Every `cf` invocation so far, one argument string per call.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn invocations(&self) -> std::io::Result<Vec<String>> {
        Ok(fs::read_to_string(&self.log)?
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Run the `seeder` binary as an external process from `workdir`.
///
/// # Errors
///
/// Returns an error if building/running the `seeder` binary fails.
pub fn run_seeder(
    workdir: &Path,
    args: &[&str],
    env_overrides: &[(String, OsString)],
) -> Result<RunResult, String> {
    ensure_seeder_built()?;
    let bin = seeder_bin()?;

    let mut command = Command::new(bin);
    command.current_dir(workdir);
    command.env_remove("RUST_LOG");
    command.args(args);
    for (name, value) in env_overrides {
        command.env(name, value);
    }

    let mut command_parts = vec!["seeder".to_string()];
    command_parts.extend(args.iter().map(|arg| (*arg).to_string()));

    let output = command
        .output()
        .map_err(|error| format!("failed to run seeder: {error}"))?;

    Ok(RunResult {
        command_line: command_parts.join(" "),
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Write a text file, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directories or file contents cannot be written.
pub fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn ensure_seeder_built() -> Result<(), String> {
    match BUILD_SEEDER.get_or_init(|| {
        let status = Command::new("cargo")
            .arg("build")
            .arg("-q")
            .arg("-p")
            .arg("seeder")
            .status()
            .map_err(|error| format!("failed to build seeder binary: {error}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "failed to build seeder binary: cargo exited with status {status}"
            ))
        }
    }) {
        Ok(()) => Ok(()),
        Err(error) => Err(error.clone()),
    }
}

fn seeder_bin() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe()
        .map_err(|error| format!("failed to determine current executable: {error}"))?;
    if !path.pop() {
        return Err("failed to resolve test executable directory".to_string());
    }
    if path.ends_with("deps") {
        let _ = path.pop();
    }
    Ok(path.join(format!("seeder{}", std::env::consts::EXE_SUFFIX)))
}
