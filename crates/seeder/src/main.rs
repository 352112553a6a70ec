// Target-specific transitive dependency split (gix/reqwest stack) is accepted for now.
#![allow(clippy::multiple_crate_versions)]

fn main() {
    match seeder_cli::run() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            println!("error: {}", seeder_cli::error_chain(&error));
            std::process::exit(1);
        }
    }
}
