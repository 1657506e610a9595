//! Error types for firmware artifact extraction.

use std::path::PathBuf;
use thiserror::Error;

use crate::selection::ArtifactKind;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Coarse classification of an [`ExtractionError`].
///
/// Configuration and source errors are raised before any extraction starts;
/// network and extraction errors can happen in the middle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid flag combination or value.
    Configuration,
    /// Archive missing, unreadable, or URL malformed.
    Source,
    /// Remote fetch or connection failure.
    Network,
    /// A selector's extraction step failed.
    Extraction,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Source => "source",
            Self::Network => "network",
            Self::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while extracting firmware artifacts.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Architecture name outside the supported set.
    #[error(
        "invalid dyld_shared_cache architecture '{arch}' (must be: arm64, arm64e, x86_64 or x86_64h)"
    )]
    InvalidArchitecture {
        /// The rejected value.
        arch: String,
    },

    /// Architecture filter given without the dyld selector.
    #[error("--dyld-arch can only be used together with --dyld")]
    ArchitectureWithoutDyld,

    /// The user pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as supplied.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// Any other invalid request.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// Local archive does not exist.
    #[error("archive not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Local archive exists but cannot be read.
    #[error("cannot read archive {path}: {source}")]
    Unreadable {
        /// Path of the archive.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Archive is not a readable ZIP container.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Remote URL lacks a scheme or host.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Connection, TLS, or HTTP failure while reading a remote archive.
    #[error("network error: {0}")]
    Network(String),

    /// Archive metadata could not be derived.
    #[error("failed to parse archive metadata: {0}")]
    Metadata(String),

    /// A mandatory selector matched no archive entries.
    #[error("no archive entries matched {kind}")]
    NoMatches {
        /// Artifact that was requested.
        kind: ArtifactKind,
    },

    /// Extraction of a specific artifact failed.
    #[error("failed to extract {kind}: {source}")]
    Artifact {
        /// Artifact whose extraction failed.
        kind: ArtifactKind,
        /// Underlying failure.
        #[source]
        source: Box<ExtractionError>,
    },
}

impl ExtractionError {
    /// Wraps this error with the artifact kind that was being extracted.
    ///
    /// Errors that already carry an artifact context are returned unchanged.
    #[must_use]
    pub fn for_artifact(self, kind: ArtifactKind) -> Self {
        match self {
            Self::Artifact { .. } => self,
            other => Self::Artifact {
                kind,
                source: Box::new(other),
            },
        }
    }

    /// Returns the category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use firmex_core::ErrorCategory;
    /// use firmex_core::ExtractionError;
    ///
    /// let err = ExtractionError::ArchitectureWithoutDyld;
    /// assert_eq!(err.category(), ErrorCategory::Configuration);
    ///
    /// let err = ExtractionError::Network("connection reset".to_string());
    /// assert_eq!(err.category(), ErrorCategory::Network);
    /// ```
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArchitecture { .. }
            | Self::ArchitectureWithoutDyld
            | Self::InvalidPattern { .. }
            | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::NotFound { .. }
            | Self::Unreadable { .. }
            | Self::InvalidArchive(_)
            | Self::InvalidUrl { .. } => ErrorCategory::Source,
            Self::Network(_) => ErrorCategory::Network,
            Self::Artifact { source, .. } => match source.category() {
                ErrorCategory::Configuration | ErrorCategory::Source => {
                    ErrorCategory::Extraction
                }
                other => other,
            },
            Self::Io(_) | Self::Metadata(_) | Self::NoMatches { .. } => ErrorCategory::Extraction,
        }
    }

    /// Returns `true` if the request itself was invalid.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Returns `true` if the archive could not be located or opened.
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        self.category() == ErrorCategory::Source
    }

    /// Returns the artifact kind this error is attributed to, if any.
    #[must_use]
    pub const fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            Self::Artifact { kind, .. } | Self::NoMatches { kind } => Some(*kind),
            _ => None,
        }
    }
}
