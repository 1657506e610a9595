//! Dispatch of active selectors against an opened archive.

use std::path::Path;
use std::time::Instant;

use tracing::info;
use tracing::warn;

use crate::ExtractionError;
use crate::ExtractionReport;
use crate::ExtractionRequest;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::access::ArchiveAccess;
use crate::access::open_archive;
use crate::destination::resolve_destination;
use crate::extractors::ExtractorOptions;
use crate::extractors::Extractors;
use crate::metadata::ArchiveMetadata;
use crate::metadata::MetadataParser;
use crate::metadata::RestorePlistParser;
use crate::report::ArtifactOutcome;
use crate::report::ExtractedFile;
use crate::report::SkippedArtifact;
use crate::selection::ArtifactRule;
use crate::selection::EmptyPolicy;
use crate::selection::EntryMatcher;
use crate::selection::ExtractAction;
use crate::selection::compile_pattern;
use crate::source::AccessMode;

/// Walks the selection matrix for a request.
///
/// Selectors run one at a time in table order. The first failing selector
/// ends the run; files written by earlier selectors stay on disk.
pub struct Dispatcher {
    extractors: Extractors,
    metadata: Box<dyn MetadataParser>,
}

impl Dispatcher {
    /// Creates a dispatcher with the built-in extractors and metadata parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractors: Extractors::builtin()?,
            metadata: Box::new(RestorePlistParser),
        })
    }

    /// Replaces the specialized extractors.
    #[must_use]
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    /// Replaces the metadata parser used in local mode.
    #[must_use]
    pub fn with_metadata_parser(mut self, parser: impl MetadataParser + 'static) -> Self {
        self.metadata = Box::new(parser);
        self
    }

    /// Opens the request's archive and runs every active selector.
    ///
    /// The archive handle is released when this returns, on success or
    /// failure.
    ///
    /// # Errors
    ///
    /// Source errors from opening the archive, metadata errors in local
    /// mode, and the first selector failure (wrapped with its artifact kind).
    pub fn run(
        &self,
        request: &ExtractionRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let mut archive = open_archive(request.source())?;
        self.run_on(archive.as_mut(), request, progress)
    }

    /// Runs every active selector against an already opened archive.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run). Also fails with `InvalidConfig` if the
    /// archive's access mode differs from the request's.
    pub fn run_on(
        &self,
        archive: &mut dyn ArchiveAccess,
        request: &ExtractionRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let started = Instant::now();
        let mode = archive.mode();
        if mode != request.mode() {
            return Err(ExtractionError::InvalidConfig {
                reason: format!(
                    "request is for a {} archive but the handle is {mode}",
                    request.mode()
                ),
            });
        }

        // Remote archives have no parsed metadata without a full download.
        let metadata = match mode {
            AccessMode::Local => Some(self.metadata.parse(archive)?),
            AccessMode::Remote => None,
        };
        let destination = resolve_destination(request.output_root(), metadata.as_ref());

        let mut report = ExtractionReport::new(&destination);
        let options = ExtractorOptions {
            dyld_arches: &request.selectors().dyld_arches,
        };

        for rule in ArtifactRule::table() {
            let kind = rule.kind;
            if !request.selectors().is_active(kind) {
                continue;
            }

            if !rule.available_in(mode) {
                let reason = rule.limitation(mode);
                warn!(artifact = %kind, "{reason}");
                report.skipped.push(SkippedArtifact { kind, reason });
                continue;
            }

            info!(artifact = %kind, destination = %destination.display(), "extracting");
            let files = self
                .run_rule(
                    rule,
                    archive,
                    &destination,
                    request,
                    metadata.as_ref(),
                    &options,
                    progress,
                )
                .map_err(|e| e.for_artifact(kind))?;

            if files.is_empty() {
                match rule.on_empty {
                    EmptyPolicy::Fail => return Err(ExtractionError::NoMatches { kind }),
                    EmptyPolicy::Warn => {
                        warn!(artifact = %kind, "no archive entries matched");
                        report.add_warning(format!("no archive entries matched {kind}"));
                    }
                }
            }

            for file in &files {
                info!(artifact = %kind, path = %file.path.display(), "created");
            }
            report.artifacts.push(ArtifactOutcome { kind, files });
        }

        progress.on_complete();
        report.duration = started.elapsed();
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_rule(
        &self,
        rule: &ArtifactRule,
        archive: &mut dyn ArchiveAccess,
        dest: &Path,
        request: &ExtractionRequest,
        metadata: Option<&ArchiveMetadata>,
        options: &ExtractorOptions<'_>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>> {
        match (rule.action, rule.matcher) {
            (ExtractAction::Specialized, _) => {
                let extractor =
                    self.extractors
                        .get(rule.kind)
                        .ok_or_else(|| ExtractionError::InvalidConfig {
                            reason: format!("no specialized extractor for {}", rule.kind),
                        })?;
                extractor.extract(archive, dest, options, progress)
            }
            (ExtractAction::FilteredCopy, EntryMatcher::Regex(pattern)) => {
                let re = compile_pattern(pattern)?;
                archive.extract_matching(&|name: &str| re.is_match(name), dest, progress)
            }
            (ExtractAction::FilteredCopy, EntryMatcher::UserPattern) => match request.pattern() {
                Some(re) => {
                    archive.extract_matching(&|name: &str| re.is_match(name), dest, progress)
                }
                None => Ok(Vec::new()),
            },
            (ExtractAction::FilteredCopy, EntryMatcher::FilesystemImageName) => {
                let image = metadata
                    .and_then(|m| m.filesystem_image.as_deref())
                    .ok_or_else(|| {
                        ExtractionError::Metadata(
                            "archive does not name a filesystem image".to_string(),
                        )
                    })?;
                let is_image = |name: &str| {
                    Path::new(name)
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.eq_ignore_ascii_case(image))
                };
                archive.extract_matching(&is_image, dest, progress)
            }
            (ExtractAction::FilteredCopy, EntryMatcher::Delegated) => {
                Err(ExtractionError::InvalidConfig {
                    reason: format!("{} has no entry matcher", rule.kind),
                })
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("extractors", &self.extractors)
            .finish_non_exhaustive()
    }
}

/// Runs `request` with the built-in collaborators.
///
/// # Examples
///
/// ```no_run
/// use firmex_core::ArchiveSource;
/// use firmex_core::ExtractionRequest;
/// use firmex_core::Selectors;
/// use firmex_core::extract;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ExtractionRequest::builder(ArchiveSource::local("iPhone15,2_17.0_21A329_Restore.ipsw"))
///     .selectors(Selectors {
///         kernel: true,
///         device_tree: true,
///         ..Default::default()
///     })
///     .output("/tmp/firmware")
///     .build()?;
///
/// let report = extract(&request)?;
/// println!("Extracted {} files to {}", report.files_extracted(), report.destination.display());
/// # Ok(())
/// # }
/// ```
pub fn extract(request: &ExtractionRequest) -> Result<ExtractionReport> {
    extract_with_progress(request, &mut NoopProgress)
}

/// Runs `request` with the built-in collaborators, reporting progress.
pub fn extract_with_progress(
    request: &ExtractionRequest,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    Dispatcher::new()?.run(request, progress)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ArchiveSource;
    use crate::Selectors;
    use crate::TransportConfig;
    use crate::access::ZipHandle;
    use crate::selection::ArtifactKind;
    use crate::test_utils::SAMPLE_FOLDER;
    use crate::test_utils::sample_ipsw;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn handle(mode: AccessMode) -> ZipHandle<Cursor<Vec<u8>>> {
        ZipHandle::new(Cursor::new(sample_ipsw()), mode, "sample.ipsw").unwrap()
    }

    fn request(source: ArchiveSource, selectors: Selectors, out: &Path) -> ExtractionRequest {
        ExtractionRequest::builder(source)
            .selectors(selectors)
            .output(out)
            .build()
            .unwrap()
    }

    fn remote_source() -> ArchiveSource {
        ArchiveSource::remote("https://updates.example.com/fw.ipsw", TransportConfig::default())
            .unwrap()
    }

    #[test]
    fn test_local_destination_uses_folder_name() {
        let temp = TempDir::new().unwrap();
        let req = request(
            ArchiveSource::local("sample.ipsw"),
            Selectors {
                iboot: true,
                ..Default::default()
            },
            temp.path(),
        );

        let report = Dispatcher::new()
            .unwrap()
            .run_on(&mut handle(AccessMode::Local), &req, &mut NoopProgress)
            .unwrap();

        let dest = temp.path().join(SAMPLE_FOLDER);
        assert_eq!(report.destination, dest);
        assert!(dest.join("iBoot.d73.RELEASE.im4p").is_file());
    }

    #[test]
    fn test_remote_skips_restricted_and_continues() {
        let temp = TempDir::new().unwrap();
        let req = request(
            remote_source(),
            Selectors {
                dyld: true,
                filesystem_image: true,
                sep: true,
                ..Default::default()
            },
            temp.path(),
        );

        let report = Dispatcher::new()
            .unwrap()
            .run_on(&mut handle(AccessMode::Remote), &req, &mut NoopProgress)
            .unwrap();

        let skipped: Vec<_> = report.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(
            skipped,
            vec![ArtifactKind::DyldCache, ArtifactKind::FilesystemImage]
        );
        assert_eq!(report.destination, temp.path());
        assert!(temp.path().join("sep-firmware.d73.RELEASE.im4p").is_file());
    }

    #[test]
    fn test_mode_mismatch() {
        let temp = TempDir::new().unwrap();
        let req = request(remote_source(), Selectors::default(), temp.path());
        let err = Dispatcher::new()
            .unwrap()
            .run_on(&mut handle(AccessMode::Local), &req, &mut NoopProgress)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_filesystem_image_by_metadata_name() {
        let temp = TempDir::new().unwrap();
        let req = request(
            ArchiveSource::local("sample.ipsw"),
            Selectors {
                filesystem_image: true,
                ..Default::default()
            },
            temp.path(),
        );

        let report = Dispatcher::new()
            .unwrap()
            .run_on(&mut handle(AccessMode::Local), &req, &mut NoopProgress)
            .unwrap();

        let outcome = report.outcome(ArtifactKind::FilesystemImage).unwrap();
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].entry, crate::test_utils::SAMPLE_DMG);
    }

    #[test]
    fn test_mandatory_selector_without_matches_fails() {
        let temp = TempDir::new().unwrap();
        let data = crate::test_utils::create_test_zip(vec![("Restore.plist", b"x")]);
        let mut archive = ZipHandle::new(Cursor::new(data), AccessMode::Remote, "x").unwrap();
        let req = request(
            remote_source(),
            Selectors {
                kernel: true,
                ..Default::default()
            },
            temp.path(),
        );

        let err = Dispatcher::new()
            .unwrap()
            .run_on(&mut archive, &req, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::NoMatches {
                kind: ArtifactKind::Kernel
            }
        ));
    }
}
