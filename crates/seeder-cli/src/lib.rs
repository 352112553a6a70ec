#![allow(clippy::multiple_crate_versions)]

use std::error::Error as _;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use seeder_engine::{CfCli, Orchestrator, load_manifest};
use seeder_source::GixFetcher;
use tracing::info;

mod error;
mod logging;

pub use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "seeder",
    version,
    about = "Seeds Cloud Foundry with the orgs, spaces, apps, services and brokers of a manifest"
)]
struct Cli {
    /// Seed manifest describing what to create
    #[arg(short = 'f', long = "file", value_name = "MANIFEST")]
    file: Option<PathBuf>,
    /// Delete everything the manifest describes instead of creating it
    #[arg(short = 'c', long = "cleanup")]
    cleanup: bool,
    /// Cloud Foundry CLI to drive
    #[arg(long = "cf", value_name = "BINARY", default_value = "cf")]
    cf_binary: String,
    /// Directory that receives repository checkouts, one per app
    #[arg(long = "apps-dir", value_name = "DIR", default_value = "apps")]
    apps_dir: PathBuf,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// Run the CLI using process arguments.
///
/// # Errors
///
/// Returns an error when argument parsing fails (excluding help/version), the
/// manifest cannot be loaded, or the seeding run fails.
pub fn run() -> std::result::Result<i32, CliError> {
    run_from(std::env::args_os())
}

fn run_from<I, T>(args: I) -> std::result::Result<i32, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(error.into()),
        },
    };

    let Some(file) = cli.file else {
        println!("{}", Cli::command().render_help());
        return Ok(1);
    };

    logging::init(cli.verbose);

    let mut manifest = load_manifest(&file)?;
    let apps_dir = std::env::current_dir()
        .map_err(|source| CliError::Io {
            context: "failed to determine working directory".to_string(),
            source,
        })?
        .join(&cli.apps_dir);
    let client = CfCli::locate(&cli.cf_binary)?;
    let fetcher = GixFetcher;
    let orchestrator = Orchestrator::new(&client, &fetcher, apps_dir);

    if cli.cleanup {
        info!(manifest = %file.display(), "tearing down");
        orchestrator.teardown(&manifest)?;
    } else {
        info!(manifest = %file.display(), "seeding");
        orchestrator.apply(&mut manifest)?;
    }
    Ok(0)
}

/// Render `error` followed by its source chain on one line.
#[must_use]
pub fn error_chain(error: &CliError) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::fs;

    use tempfile::TempDir;

    use super::{CliError, error_chain, run_from};

    #[test]
    fn missing_manifest_flag_exits_non_zero() {
        let code = run_from(["seeder"]).expect("usage is printed");
        assert_eq!(code, 1);
    }

    #[test]
    fn help_exits_zero() {
        let code = run_from(["seeder", "--help"]).expect("help is printed");
        assert_eq!(code, 0);
    }

    #[test]
    fn unknown_flag_is_an_argument_error() {
        let error = run_from(["seeder", "--bogus"]).expect_err("unknown flag");
        assert!(matches!(error, CliError::ArgumentParse(_)));
    }

    #[test]
    fn unreadable_manifest_is_reported_with_cause() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("missing.yml");
        let missing_arg = missing.to_string_lossy().into_owned();

        let error =
            run_from(["seeder", "-f", missing_arg.as_str()]).expect_err("manifest missing");

        assert!(matches!(error, CliError::Manifest(_)));
        let rendered = error_chain(&error);
        assert!(rendered.starts_with("failed to read manifest"));
        assert!(rendered.contains(&missing_arg));
    }

    #[test]
    fn missing_cf_binary_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        let manifest = temp.path().join("seed.yml");
        fs::write(&manifest, "organizations:\n  - name: acme\n").expect("write manifest");
        let manifest_arg = manifest.to_string_lossy().into_owned();

        let error = run_from([
            "seeder",
            "-f",
            manifest_arg.as_str(),
            "--cf",
            "seeder-no-such-cf-binary",
        ])
        .expect_err("cf missing");

        assert_eq!(
            error_chain(&error),
            "binary \"seeder-no-such-cf-binary\" not found on PATH"
        );
    }
}
