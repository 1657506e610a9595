//! Archive metadata used to name the output folder and find the filesystem
//! image.

use std::path::Path;

use regex::Regex;
use tracing::debug;
use tracing::warn;

use crate::ExtractionError;
use crate::Result;
use crate::access::ArchiveAccess;

/// Entry holding the restore description of an IPSW.
pub const RESTORE_PLIST: &str = "Restore.plist";

/// Facts derived from an archive's own description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveMetadata {
    /// OS version, e.g. `17.0`.
    pub product_version: Option<String>,
    /// Build identifier, e.g. `21A329`.
    pub build_version: Option<String>,
    /// Supported device identifiers, e.g. `iPhone15,2`.
    pub devices: Vec<String>,
    /// Folder name the artifacts are extracted into.
    pub folder_name: String,
    /// Base name of the root filesystem image, if known.
    pub filesystem_image: Option<String>,
}

/// Derives [`ArchiveMetadata`] from an opened archive.
pub trait MetadataParser {
    /// Parses metadata from `archive`.
    ///
    /// # Errors
    ///
    /// Returns `Metadata` if the archive does not describe itself in a way
    /// this parser understands.
    fn parse(&self, archive: &mut dyn ArchiveAccess) -> Result<ArchiveMetadata>;
}

/// Reads `Restore.plist` from the archive.
///
/// The folder name is `<version>__<build>__<device>[_<device>...]`. The
/// filesystem image is the `.dmg` listed under `SystemRestoreImageFileSystems`,
/// or the largest `.dmg` in the archive. Archives without a `Restore.plist`
/// are named after the archive file itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestorePlistParser;

impl MetadataParser for RestorePlistParser {
    fn parse(&self, archive: &mut dyn ArchiveAccess) -> Result<ArchiveMetadata> {
        let plist_entry = archive
            .entry_names()
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(RESTORE_PLIST));

        let mut metadata = match plist_entry {
            Some(entry) => {
                let data = archive.read_entry(&entry)?;
                let text = String::from_utf8(data).map_err(|_| {
                    ExtractionError::Metadata(format!("{entry} is not a UTF-8 XML plist"))
                })?;
                parse_restore_plist(&text)?
            }
            None => {
                let stem = Path::new(archive.location())
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ExtractionError::Metadata(format!(
                            "{RESTORE_PLIST} not found and archive name is unusable"
                        ))
                    })?
                    .to_string();
                warn!(folder = %stem, "{RESTORE_PLIST} not found, naming output after the archive");
                ArchiveMetadata {
                    folder_name: stem,
                    ..ArchiveMetadata::default()
                }
            }
        };

        if metadata.filesystem_image.is_none() {
            metadata.filesystem_image = largest_dmg(archive)?;
        }

        debug!(
            folder = %metadata.folder_name,
            filesystem_image = ?metadata.filesystem_image,
            "parsed archive metadata"
        );
        Ok(metadata)
    }
}

fn largest_dmg(archive: &mut dyn ArchiveAccess) -> Result<Option<String>> {
    let largest = archive
        .entries()?
        .into_iter()
        .filter(|e| e.name.to_ascii_lowercase().ends_with(".dmg"))
        .max_by_key(|e| e.size)
        .and_then(|e| {
            Path::new(&e.name)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        });
    Ok(largest)
}

fn plist_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ExtractionError::Metadata(format!("internal pattern: {e}")))
}

fn string_value(text: &str, key: &str) -> Result<Option<String>> {
    let re = plist_regex(&format!(
        r"(?s)<key>{}</key>\s*<string>(.*?)</string>",
        regex::escape(key)
    ))?;
    Ok(re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn section<'a>(text: &'a str, key: &str, container: &str) -> Result<Option<&'a str>> {
    let re = plist_regex(&format!(
        r"(?s)<key>{}</key>\s*<{container}>(.*?)</{container}>",
        regex::escape(key)
    ))?;
    Ok(re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str()))
}

/// Parses the parts of a `Restore.plist` the extractor needs.
///
/// # Errors
///
/// Returns `Metadata` if `ProductVersion` or `ProductBuildVersion` is missing.
///
/// # Examples
///
/// ```
/// use firmex_core::metadata::parse_restore_plist;
///
/// let plist = r#"<plist><dict>
///     <key>ProductBuildVersion</key><string>21A329</string>
///     <key>ProductVersion</key><string>17.0</string>
///     <key>SupportedProductTypes</key><array><string>iPhone15,2</string></array>
/// </dict></plist>"#;
///
/// let metadata = parse_restore_plist(plist).unwrap();
/// assert_eq!(metadata.folder_name, "17.0__21A329__iPhone15,2");
/// ```
pub fn parse_restore_plist(text: &str) -> Result<ArchiveMetadata> {
    let version = string_value(text, "ProductVersion")?
        .ok_or_else(|| ExtractionError::Metadata("ProductVersion missing".to_string()))?;
    let build = string_value(text, "ProductBuildVersion")?
        .ok_or_else(|| ExtractionError::Metadata("ProductBuildVersion missing".to_string()))?;

    let item = plist_regex(r"(?s)<string>(.*?)</string>")?;
    let mut devices: Vec<String> = match section(text, "SupportedProductTypes", "array")? {
        Some(array) => item
            .captures_iter(array)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };
    if devices.is_empty() {
        devices.extend(string_value(text, "ProductType")?);
    }

    let key = plist_regex(r"(?s)<key>(.*?)</key>")?;
    let filesystem_image = section(text, "SystemRestoreImageFileSystems", "dict")?.and_then(|dict| {
        key.captures_iter(dict)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .find(|name| name.to_ascii_lowercase().ends_with(".dmg"))
            .map(str::to_string)
    });

    let mut folder_name = format!("{version}__{build}");
    if !devices.is_empty() {
        folder_name.push_str("__");
        folder_name.push_str(&devices.join("_"));
    }

    Ok(ArchiveMetadata {
        product_version: Some(version),
        build_version: Some(build),
        devices,
        folder_name,
        filesystem_image,
    })
}
