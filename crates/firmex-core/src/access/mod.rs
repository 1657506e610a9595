//! Uniform access to archive entries, local or remote.
//!
//! Both access modes are served by [`ZipHandle`]; they differ only in the
//! reader underneath. A local archive is read from a buffered file, a remote
//! one through [`HttpRangeReader`], which fetches the central directory and
//! the selected members with HTTP range requests instead of downloading the
//! whole container.

pub mod http;
pub mod zip;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use crate::ExtractionError;
use crate::ProgressCallback;
use crate::Result;
use crate::report::ExtractedFile;
use crate::source::AccessMode;
use crate::source::ArchiveSource;

pub use self::http::HttpRangeReader;
pub use self::zip::ZipHandle;

/// Name and size of an archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Full entry name inside the archive.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Read access to the members of an opened archive.
///
/// The dispatcher and every extractor work against this trait only, so they
/// behave identically whether the archive is local or remote.
pub trait ArchiveAccess {
    /// How the archive bytes are reached.
    fn mode(&self) -> AccessMode;

    /// Human-readable location of the archive.
    fn location(&self) -> &str;

    /// Names of all file entries (directories excluded), in archive order.
    ///
    /// Served from the central directory without further I/O.
    fn entry_names(&self) -> Vec<String>;

    /// Names and sizes of all file entries.
    fn entries(&mut self) -> Result<Vec<EntryInfo>>;

    /// Reads a whole entry into memory.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Extracts every file entry accepted by `predicate` into `dest`.
    ///
    /// Entries are written under their base name; the archive's directory
    /// structure is not reproduced. `dest` is created if absent and existing
    /// files are overwritten. Returns the written files, which may be empty.
    fn extract_matching(
        &mut self,
        predicate: &dyn Fn(&str) -> bool,
        dest: &Path,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>>;
}

/// Opens an archive for the given source.
///
/// # Errors
///
/// - `NotFound` if a local path does not exist
/// - `InvalidArchive` if the bytes are not a ZIP container
/// - `InvalidUrl` / `Network` for unreachable remote archives
///
/// # Examples
///
/// ```no_run
/// use firmex_core::ArchiveSource;
/// use firmex_core::access::open_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = open_archive(&ArchiveSource::local("iPhone15,2_17.0_21A329_Restore.ipsw"))?;
/// for name in archive.entry_names() {
///     println!("{name}");
/// }
/// # Ok(())
/// # }
/// ```
pub fn open_archive(source: &ArchiveSource) -> Result<Box<dyn ArchiveAccess>> {
    match source {
        ArchiveSource::Local(path) => Ok(Box::new(open_local(path)?)),
        ArchiveSource::Remote { url, transport } => {
            info!(url = %url, "opening remote archive");
            let reader = HttpRangeReader::connect(url, transport)?;
            let handle = ZipHandle::new(reader, AccessMode::Remote, url.as_str())?;
            Ok(Box::new(handle))
        }
    }
}

/// Opens a ZIP archive on the local filesystem.
pub fn open_local(path: &Path) -> Result<ZipHandle<BufReader<File>>> {
    if !path.exists() {
        return Err(ExtractionError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(ExtractionError::InvalidArchive(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|source| ExtractionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    ZipHandle::new(
        BufReader::new(file),
        AccessMode::Local,
        path.display().to_string(),
    )
}
