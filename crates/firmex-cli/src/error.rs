//! Error conversion utilities for CLI.
//!
//! Converts firmex-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use firmex_core::ExtractionError;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &str) -> anyhow::Error {
    match err {
        ExtractionError::ArchitectureWithoutDyld => {
            anyhow!(
                "--dyld-arch was given without --dyld\n\
                 HINT: Add --dyld to extract the dyld_shared_cache for the listed architectures."
            )
        }
        ExtractionError::InvalidArchitecture { arch } => {
            anyhow!(
                "Unknown dyld_shared_cache architecture '{arch}'\n\
                 HINT: Supported architectures: arm64, arm64e, x86_64, x86_64h"
            )
        }
        ExtractionError::InvalidPattern { pattern, source } => {
            anyhow!(
                "Invalid --pattern '{pattern}': {source}\n\
                 HINT: --pattern takes a regular expression; escape '.' or '+' to match them literally."
            )
        }
        ExtractionError::NotFound { path } => {
            anyhow!(
                "Archive not found: {}\n\
                 HINT: Use --remote to read an archive from a URL.",
                path.display()
            )
        }
        ExtractionError::Unreadable { path, source } => {
            anyhow!(
                "Cannot read archive {}: {source}\n\
                 HINT: Check that the file is readable by the current user.",
                path.display()
            )
        }
        ExtractionError::InvalidUrl { url, reason } => {
            anyhow!(
                "Invalid archive URL '{url}': {reason}\n\
                 HINT: Remote archives need an absolute http:// or https:// URL."
            )
        }
        ExtractionError::Network(reason) => {
            anyhow!(
                "Network error while reading '{archive}': {reason}\n\
                 HINT: The server must support HTTP range requests. Use --proxy or --insecure if a proxy or TLS interception is involved."
            )
        }
        ExtractionError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{archive}': {reason}\n\
                 HINT: IPSW and OTA files are ZIP containers; the file may be truncated or corrupted."
            )
        }
        ExtractionError::NoMatches { kind } => {
            anyhow!(
                "No {kind} found in '{archive}'\n\
                 HINT: Use --pattern to extract entries by name instead."
            )
        }
        _ => anyhow::Error::from(err).context(format!("Error processing archive '{archive}'")),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &str,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}
