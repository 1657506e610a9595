//! Output directory resolution.

use std::path::Path;
use std::path::PathBuf;

use crate::metadata::ArchiveMetadata;

/// Computes the directory artifacts are written to.
///
/// With metadata (local archives) the result is `root/<folder_name>`; without
/// it (remote archives) the root is used unchanged. Nothing is created here:
/// directories appear when the first artifact is written.
///
/// # Examples
///
/// ```
/// use firmex_core::destination::resolve_destination;
/// use firmex_core::metadata::ArchiveMetadata;
/// use std::path::Path;
///
/// let metadata = ArchiveMetadata {
///     folder_name: "17.0__21A329__iPhone15,2".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(
///     resolve_destination(Path::new("out"), Some(&metadata)),
///     Path::new("out/17.0__21A329__iPhone15,2")
/// );
/// assert_eq!(resolve_destination(Path::new("out"), None), Path::new("out"));
/// ```
#[must_use]
pub fn resolve_destination(root: &Path, metadata: Option<&ArchiveMetadata>) -> PathBuf {
    let root = if root.as_os_str().is_empty() {
        Path::new(".")
    } else {
        root
    };

    match metadata {
        Some(metadata) if !metadata.folder_name.is_empty() => root.join(&metadata.folder_name),
        _ => root.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_is_current_dir() {
        assert_eq!(resolve_destination(Path::new(""), None), Path::new("."));
    }

    #[test]
    fn test_empty_folder_name_keeps_root() {
        let metadata = ArchiveMetadata::default();
        assert_eq!(
            resolve_destination(Path::new("/out"), Some(&metadata)),
            Path::new("/out")
        );
    }
}
