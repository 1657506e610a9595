//! Extraction run reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::selection::ArtifactKind;

/// A file written to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Entry name inside the archive.
    pub entry: String,

    /// Path of the written file.
    pub path: PathBuf,

    /// Bytes written.
    pub size: u64,
}

/// Result of one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutcome {
    /// Artifact that was extracted.
    pub kind: ArtifactKind,

    /// Files written for this artifact.
    pub files: Vec<ExtractedFile>,
}

impl ArtifactOutcome {
    /// Total bytes written for this artifact.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// A selector that was requested but not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArtifact {
    /// Artifact that was skipped.
    pub kind: ArtifactKind,

    /// User-facing explanation.
    pub reason: String,
}

/// Report of a complete extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Directory the artifacts were written to.
    pub destination: PathBuf,

    /// Per-selector outcomes, in table order.
    pub artifacts: Vec<ArtifactOutcome>,

    /// Selectors not available in the active access mode.
    pub skipped: Vec<SkippedArtifact>,

    /// Duration of the run.
    pub duration: Duration,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty report for the given destination.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Returns the number of files written across all artifacts.
    #[must_use]
    pub fn files_extracted(&self) -> usize {
        self.artifacts.iter().map(|a| a.files.len()).sum()
    }

    /// Returns the number of bytes written across all artifacts.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.artifacts.iter().map(ArtifactOutcome::bytes_written).sum()
    }

    /// Returns the outcome recorded for `kind`, if it ran.
    #[must_use]
    pub fn outcome(&self, kind: ArtifactKind) -> Option<&ArtifactOutcome> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Callback trait for progress reporting while entries are copied.
///
/// # Examples
///
/// ```
/// use firmex_core::ProgressCallback;
/// use std::path::Path;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("{current}/{total}: {}", path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, path: &Path) {
///         println!("wrote {}", path.display());
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an entry is copied.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination of the entry
    /// * `total` - Number of entries selected for this artifact
    /// * `current` - Current entry number (1-indexed)
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called as bytes are written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when an entry has been written.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called once the whole run is finished.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> ExtractedFile {
        ExtractedFile {
            entry: format!("Firmware/{name}"),
            path: PathBuf::from("out").join(name),
            size,
        }
    }

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new("out");
        assert_eq!(report.destination, PathBuf::from("out"));
        assert_eq!(report.files_extracted(), 0);
        assert_eq!(report.bytes_written(), 0);
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_totals() {
        let mut report = ExtractionReport::new("out");
        report.artifacts.push(ArtifactOutcome {
            kind: ArtifactKind::DeviceTree,
            files: vec![file("DeviceTree.a.im4p", 10), file("DeviceTree.b.im4p", 5)],
        });
        report.artifacts.push(ArtifactOutcome {
            kind: ArtifactKind::IBoot,
            files: vec![file("iBoot.a.im4p", 7)],
        });

        assert_eq!(report.files_extracted(), 3);
        assert_eq!(report.bytes_written(), 22);
        assert_eq!(
            report
                .outcome(ArtifactKind::DeviceTree)
                .map(ArtifactOutcome::bytes_written),
            Some(15)
        );
        assert!(report.outcome(ArtifactKind::Kernel).is_none());
    }

    #[test]
    fn test_add_warning() {
        let mut report = ExtractionReport::new("out");
        report.add_warning("nothing matched".to_string());
        assert!(report.has_warnings());
    }
}
