//! Selective extraction of firmware artifacts from IPSW and OTA archives.
//!
//! `firmex-core` pulls individual artifacts (kernelcache, dyld_shared_cache,
//! DeviceTree, filesystem image, iBoot, SEP firmware, or any entry matching a
//! pattern) out of a ZIP-based firmware container. Local archives are read
//! from disk; remote archives are read in place over HTTP range requests, so
//! only the central directory and the selected members are transferred.
//!
//! # Examples
//!
//! ```no_run
//! use firmex_core::ArchiveSource;
//! use firmex_core::ExtractionRequest;
//! use firmex_core::Selectors;
//! use firmex_core::extract;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ExtractionRequest::builder(ArchiveSource::local("iPhone15,2_17.0_21A329_Restore.ipsw"))
//!     .selectors(Selectors {
//!         kernel: true,
//!         pattern: Some("sep".to_string()),
//!         ..Default::default()
//!     })
//!     .output("out")
//!     .build()?;
//!
//! let report = extract(&request)?;
//! println!("Extracted {} files", report.files_extracted());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod copy;
pub mod destination;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod metadata;
pub mod report;
pub mod request;
pub mod selection;
pub mod source;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use dispatch::Dispatcher;
pub use dispatch::extract;
pub use dispatch::extract_with_progress;
pub use error::ErrorCategory;
pub use error::ExtractionError;
pub use error::Result;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use request::ExtractionRequest;
pub use request::ExtractionRequestBuilder;
pub use selection::ArtifactKind;
pub use selection::DyldArch;
pub use selection::Selectors;
pub use source::AccessMode;
pub use source::ArchiveSource;
pub use source::TransportConfig;
