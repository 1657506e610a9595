//! ZIP archive handle shared by local and remote access.

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use ::zip::ZipArchive;
use ::zip::result::ZipError;
use tracing::debug;
use tracing::warn;

use super::ArchiveAccess;
use super::EntryInfo;
use super::http::classify_io;
use crate::ExtractionError;
use crate::ProgressCallback;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_progress;
use crate::report::ExtractedFile;
use crate::source::AccessMode;

/// An opened ZIP archive over any seekable reader.
///
/// The handle owns the reader; dropping it releases the file or connection.
pub struct ZipHandle<R> {
    archive: ZipArchive<R>,
    mode: AccessMode,
    location: String,
}

impl<R: Read + Seek> ZipHandle<R> {
    /// Reads the central directory from `reader`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArchive` if no valid ZIP directory is found,
    /// `Unreadable` if a local reader fails, or `Network` if a remote reader
    /// fails while fetching it.
    pub fn new(reader: R, mode: AccessMode, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let archive = ZipArchive::new(reader).map_err(|e| match e {
            ZipError::Io(io) if mode == AccessMode::Local => ExtractionError::Unreadable {
                path: PathBuf::from(&location),
                source: io,
            },
            ZipError::Io(io) => classify_io(io),
            other => ExtractionError::InvalidArchive(format!(
                "failed to read ZIP directory of {location}: {other}"
            )),
        })?;

        debug!(location = %location, entries = archive.len(), %mode, "opened archive");

        Ok(Self {
            archive,
            mode,
            location,
        })
    }

    /// Number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Consumes the handle, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.archive.into_inner()
    }

    fn write_entry(
        &mut self,
        name: &str,
        target: &Path,
        buffer: &mut CopyBuffer,
        progress: &mut dyn ProgressCallback,
    ) -> Result<u64> {
        let mut entry = self.archive.by_name(name).map_err(map_zip_error)?;

        // Only complete entries appear under their final name.
        let partial = partial_path(target);
        let copied = File::create(&partial)
            .map_err(ExtractionError::from)
            .and_then(|mut out| {
                let size = copy_with_progress(&mut entry, &mut out, buffer, progress)?;
                out.flush()?;
                Ok(size)
            });

        match copied {
            Ok(size) => {
                fs::rename(&partial, target)?;
                Ok(size)
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    debug!(path = %partial.display(), error = %cleanup, "partial file not removed");
                }
                Err(match err {
                    ExtractionError::Io(io) => classify_io(io),
                    other => other,
                })
            }
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

fn map_zip_error(err: ZipError) -> ExtractionError {
    match err {
        ZipError::Io(io) => classify_io(io),
        other => ExtractionError::InvalidArchive(other.to_string()),
    }
}

impl<R: Read + Seek> ArchiveAccess for ZipHandle<R> {
    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn entry_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            // Raw access reads the headers only, so unsupported compression
            // methods do not matter here.
            let entry = self.archive.by_index_raw(i).map_err(map_zip_error)?;
            if entry.is_dir() {
                continue;
            }
            entries.push(EntryInfo {
                name: entry.name().to_string(),
                size: entry.size(),
            });
        }
        Ok(entries)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(name).map_err(map_zip_error)?;
        let capacity = usize::try_from(entry.size()).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        entry.read_to_end(&mut data).map_err(classify_io)?;
        Ok(data)
    }

    fn extract_matching(
        &mut self,
        predicate: &dyn Fn(&str) -> bool,
        dest: &Path,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>> {
        let selected: Vec<String> = self
            .entry_names()
            .into_iter()
            .filter(|name| predicate(name))
            .collect();

        fs::create_dir_all(dest)?;

        let total = selected.len();
        let mut buffer = CopyBuffer::new();
        let mut written: Vec<ExtractedFile> = Vec::with_capacity(total);

        for (index, name) in selected.into_iter().enumerate() {
            let Some(file_name) = Path::new(&name).file_name() else {
                warn!(entry = %name, "skipping entry without a file name");
                continue;
            };
            let target = dest.join(file_name);

            progress.on_entry_start(&target, total, index + 1);
            let size = self.write_entry(&name, &target, &mut buffer, progress)?;
            progress.on_entry_complete(&target);

            debug!(entry = %name, path = %target.display(), size, "extracted entry");

            // Entries sharing a base name overwrite each other on disk.
            if let Some(pos) = written.iter().position(|f| f.path == target) {
                warn!(entry = %name, path = %target.display(), "entry overwrote an earlier entry with the same name");
                written.remove(pos);
            }
            written.push(ExtractedFile {
                entry: name,
                path: target,
                size,
            });
        }

        Ok(written)
    }
}
