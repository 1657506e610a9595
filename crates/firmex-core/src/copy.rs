//! Entry copy with a reusable buffer and progress reporting.
//!
//! Remote entries are read through many small ranged requests, so the buffer
//! is sized to match the HTTP reader's fetch window.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::ExtractionError;
use crate::ProgressCallback;

/// Buffer size for entry copies (64KB).
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Heap buffer reused across all entries of one extraction run.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer`, reporting written bytes to `progress`.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns an error if reading or writing fails, or if the byte count would
/// overflow `u64`.
///
/// # Examples
///
/// ```
/// use firmex_core::NoopProgress;
/// use firmex_core::copy::CopyBuffer;
/// use firmex_core::copy::copy_with_progress;
/// use std::io::Cursor;
///
/// let mut buffer = CopyBuffer::new();
/// let mut input = Cursor::new(b"im4p payload".to_vec());
/// let mut output = Vec::new();
///
/// let copied = copy_with_progress(&mut input, &mut output, &mut buffer, &mut NoopProgress).unwrap();
/// assert_eq!(copied, 12);
/// ```
pub fn copy_with_progress<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    progress: &mut dyn ProgressCallback,
) -> Result<u64, ExtractionError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;

        total = total.checked_add(bytes_read as u64).ok_or_else(|| {
            ExtractionError::InvalidArchive("entry size overflows u64".to_string())
        })?;
        progress.on_bytes_written(bytes_read as u64);
    }

    writer.flush()?;
    Ok(total)
}
