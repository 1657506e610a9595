//! Archive sources and transport settings.

use std::path::Path;
use std::path::PathBuf;

use url::Url;

use crate::ExtractionError;
use crate::Result;

/// How the archive bytes are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Random access to a file on disk.
    Local,
    /// Partial reads of a ZIP directory over HTTP.
    Remote,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Proxy and TLS settings for remote archives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// HTTP/HTTPS proxy URL.
    pub proxy: Option<String>,

    /// Skip TLS certificate verification.
    pub insecure: bool,
}

/// Where the firmware archive lives.
///
/// Exactly one variant is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// A ZIP file on the local filesystem.
    Local(PathBuf),

    /// A ZIP file served over HTTP(S).
    Remote {
        /// Location of the archive.
        url: Url,
        /// Proxy and TLS settings.
        transport: TransportConfig,
    },
}

impl ArchiveSource {
    /// Creates a local source.
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Creates a remote source after validating the URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the string is not a URL with both scheme and
    /// host.
    ///
    /// # Examples
    ///
    /// ```
    /// use firmex_core::ArchiveSource;
    /// use firmex_core::TransportConfig;
    ///
    /// let source =
    ///     ArchiveSource::remote("https://updates.example.com/fw.ipsw", TransportConfig::default());
    /// assert!(source.is_ok());
    ///
    /// let source = ArchiveSource::remote("fw.ipsw", TransportConfig::default());
    /// assert!(source.is_err());
    /// ```
    pub fn remote(url: &str, transport: TransportConfig) -> Result<Self> {
        Ok(Self::Remote {
            url: parse_remote_url(url)?,
            transport,
        })
    }

    /// Returns the access mode of this source.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        match self {
            Self::Local(_) => AccessMode::Local,
            Self::Remote { .. } => AccessMode::Remote,
        }
    }

    /// Human-readable location, used in messages.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote { url, .. } => url.to_string(),
        }
    }
}

/// Parses a remote archive URL, requiring a scheme and a host.
pub fn parse_remote_url(input: &str) -> Result<Url> {
    let url = Url::parse(input).map_err(|e| ExtractionError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ExtractionError::InvalidUrl {
            url: input.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}
