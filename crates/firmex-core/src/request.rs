//! Validated extraction requests.

use std::path::Path;
use std::path::PathBuf;

use regex::Regex;

use crate::ExtractionError;
use crate::Result;
use crate::selection::ArtifactKind;
use crate::selection::DyldArch;
use crate::selection::Selectors;
use crate::selection::compile_pattern;
use crate::source::AccessMode;
use crate::source::ArchiveSource;

/// One extraction run: where to read, what to extract, where to write.
///
/// Built once through [`ExtractionRequestBuilder`], which performs every
/// configuration check, and never modified afterwards.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    source: ArchiveSource,
    selectors: Selectors,
    pattern: Option<Regex>,
    output_root: PathBuf,
}

impl ExtractionRequest {
    /// Starts building a request for `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use firmex_core::ArchiveSource;
    /// use firmex_core::ExtractionRequest;
    /// use firmex_core::Selectors;
    ///
    /// let request = ExtractionRequest::builder(ArchiveSource::local("fw.ipsw"))
    ///     .selectors(Selectors {
    ///         dyld: true,
    ///         ..Default::default()
    ///     })
    ///     .dyld_arches(["arm64e"])
    ///     .output("out")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.selectors().dyld_arches.len(), 1);
    ///
    /// // An architecture filter without --dyld is rejected up front.
    /// let err = ExtractionRequest::builder(ArchiveSource::local("fw.ipsw"))
    ///     .dyld_arches(["arm64e"])
    ///     .build()
    ///     .unwrap_err();
    /// assert!(err.is_configuration_error());
    /// ```
    #[must_use]
    pub fn builder(source: ArchiveSource) -> ExtractionRequestBuilder {
        ExtractionRequestBuilder::new(source)
    }

    /// The archive to read.
    #[must_use]
    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Access mode of the source.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.source.mode()
    }

    /// The validated selectors.
    #[must_use]
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// Compiled user pattern, if one was given.
    #[must_use]
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// User-supplied output root.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Requested artifact kinds, in table order.
    #[must_use]
    pub fn active_kinds(&self) -> Vec<ArtifactKind> {
        self.selectors.active_kinds()
    }
}

/// Builder for [`ExtractionRequest`].
#[derive(Debug)]
pub struct ExtractionRequestBuilder {
    source: ArchiveSource,
    selectors: Selectors,
    arch_names: Vec<String>,
    output_root: Option<PathBuf>,
}

impl ExtractionRequestBuilder {
    /// Creates a builder with no selectors.
    #[must_use]
    pub fn new(source: ArchiveSource) -> Self {
        Self {
            source,
            selectors: Selectors::default(),
            arch_names: Vec::new(),
            output_root: None,
        }
    }

    /// Sets the selector flags.
    #[must_use]
    pub fn selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Adds unparsed dyld_shared_cache architecture names.
    ///
    /// Names are validated by [`build`](Self::build).
    #[must_use]
    pub fn dyld_arches<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arch_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the output root (default: current directory).
    #[must_use]
    pub fn output(mut self, root: impl AsRef<Path>) -> Self {
        self.output_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Validates the configuration and produces the request.
    ///
    /// No I/O happens here.
    ///
    /// # Errors
    ///
    /// - `ArchitectureWithoutDyld` if an architecture filter is given without
    ///   the dyld selector
    /// - `InvalidArchitecture` for a name outside `arm64`, `arm64e`,
    ///   `x86_64`, `x86_64h`
    /// - `InvalidPattern` if the user pattern does not compile
    pub fn build(self) -> Result<ExtractionRequest> {
        let Self {
            source,
            mut selectors,
            arch_names,
            output_root,
        } = self;

        let has_filter = !arch_names.is_empty() || !selectors.dyld_arches.is_empty();
        if has_filter && !selectors.dyld {
            return Err(ExtractionError::ArchitectureWithoutDyld);
        }

        for name in &arch_names {
            let arch: DyldArch = name.parse()?;
            if !selectors.dyld_arches.contains(&arch) {
                selectors.dyld_arches.push(arch);
            }
        }

        let pattern = match selectors.pattern.as_deref() {
            Some(p) if !p.is_empty() => Some(compile_pattern(p)?),
            _ => None,
        };

        Ok(ExtractionRequest {
            source,
            selectors,
            pattern,
            output_root: output_root.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn local() -> ArchiveSource {
        ArchiveSource::local("fw.ipsw")
    }

    #[test]
    fn test_defaults() {
        let request = ExtractionRequest::builder(local()).build().unwrap();
        assert!(request.active_kinds().is_empty());
        assert_eq!(request.output_root(), Path::new("."));
        assert!(request.pattern().is_none());
        assert_eq!(request.mode(), AccessMode::Local);
    }

    #[test]
    fn test_arch_without_dyld() {
        let err = ExtractionRequest::builder(local())
            .selectors(Selectors {
                kernel: true,
                ..Default::default()
            })
            .dyld_arches(["arm64e"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ArchitectureWithoutDyld));
    }

    #[test]
    fn test_invalid_arch() {
        let err = ExtractionRequest::builder(local())
            .selectors(Selectors {
                dyld: true,
                ..Default::default()
            })
            .dyld_arches(["arm64", "armv7s"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidArchitecture { ref arch } if arch == "armv7s"));
    }

    #[test]
    fn test_arches_deduplicated() {
        let request = ExtractionRequest::builder(local())
            .selectors(Selectors {
                dyld: true,
                ..Default::default()
            })
            .dyld_arches(["arm64e", "x86_64h", "arm64e"])
            .build()
            .unwrap();
        assert_eq!(
            request.selectors().dyld_arches,
            vec![DyldArch::Arm64e, DyldArch::X86_64h]
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ExtractionRequest::builder(local())
            .selectors(Selectors {
                pattern: Some("[".to_string()),
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_pattern_compiled() {
        let request = ExtractionRequest::builder(local())
            .selectors(Selectors {
                pattern: Some("SEP".to_string()),
                ..Default::default()
            })
            .output("/tmp/out")
            .build()
            .unwrap();
        assert!(request.pattern().unwrap().is_match("sep-firmware.d73.im4p"));
        assert_eq!(request.active_kinds(), vec![ArtifactKind::Pattern]);
        assert_eq!(request.output_root(), Path::new("/tmp/out"));
    }
}
