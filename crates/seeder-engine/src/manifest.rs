use std::fs;
use std::path::Path;

use seeder_domain::Manifest;

use crate::error::ManifestError;

/// Read, parse and validate a YAML seed manifest.
///
/// # Errors
///
/// Returns an error when the file cannot be read, is not a valid manifest
/// document, or violates a manifest invariant.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&contents, path)
}

/// Parse and validate manifest text; `path` is only used in errors.
///
/// # Errors
///
/// Returns an error when the text is not a valid manifest document or
/// violates a manifest invariant.
pub fn parse_manifest(contents: &str, path: &Path) -> Result<Manifest, ManifestError> {
    let manifest: Manifest =
        serde_yaml::from_str(contents).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    manifest
        .validate()
        .map_err(|source| ManifestError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(manifest)
}
