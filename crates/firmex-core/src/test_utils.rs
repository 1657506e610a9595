//! Test utilities for building firmware-shaped archives.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fmt::Write as _;
use std::io::Cursor;
use std::io::Write;

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). Files are stored uncompressed.
///
/// # Examples
///
/// ```
/// use firmex_core::test_utils::create_test_zip;
///
/// let zip_data = create_test_zip(vec![("Firmware/iBoot.d83.im4p", b"iboot")]);
/// assert!(!zip_data.is_empty());
/// ```
#[must_use]
pub fn create_test_zip(entries: Vec<(&str, &[u8])>) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);

    for (path, data) in entries {
        zip.start_file(path, options).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Rewrites the compression method of every entry in a ZIP image.
///
/// Both the local file headers and the central directory are patched, so the
/// archive still opens but its members claim e.g. LZMA (14) compression.
#[must_use]
pub fn with_compression_method(mut data: Vec<u8>, method: u16) -> Vec<u8> {
    let bytes = method.to_le_bytes();
    let mut i = 0;
    while i + 4 <= data.len() {
        let offset = match &data[i..i + 4] {
            b"PK\x03\x04" => Some(i + 8),
            b"PK\x01\x02" => Some(i + 10),
            _ => None,
        };
        if let Some(offset) = offset {
            data[offset..offset + 2].copy_from_slice(&bytes);
        }
        i += 1;
    }
    data
}

/// Renders a minimal XML `Restore.plist`.
#[must_use]
pub fn restore_plist(version: &str, build: &str, devices: &[&str], dmg: Option<&str>) -> String {
    let mut plist = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n",
    );
    let _ = writeln!(plist, "\t<key>ProductBuildVersion</key>\n\t<string>{build}</string>");
    let _ = writeln!(plist, "\t<key>ProductVersion</key>\n\t<string>{version}</string>");
    plist.push_str("\t<key>SupportedProductTypes</key>\n\t<array>\n");
    for device in devices {
        let _ = writeln!(plist, "\t\t<string>{device}</string>");
    }
    plist.push_str("\t</array>\n");
    if let Some(dmg) = dmg {
        let _ = writeln!(
            plist,
            "\t<key>SystemRestoreImageFileSystems</key>\n\t<dict>\n\t\t<key>{dmg}</key>\n\t\t<string>apfs</string>\n\t</dict>"
        );
    }
    plist.push_str("</dict>\n</plist>\n");
    plist
}

/// Folder name produced for [`sample_ipsw`].
pub const SAMPLE_FOLDER: &str = "17.0__21A329__iPhone15,2";

/// Filesystem image name listed in [`sample_ipsw`].
pub const SAMPLE_DMG: &str = "098-12345-001.dmg";

/// Builds a small IPSW-shaped archive with one of every artifact.
#[must_use]
pub fn sample_ipsw() -> Vec<u8> {
    let plist = restore_plist("17.0", "21A329", &["iPhone15,2"], Some(SAMPLE_DMG));
    create_test_zip(vec![
        ("Restore.plist", plist.as_bytes()),
        ("BuildManifest.plist", b"<plist/>"),
        ("kernelcache.release.iphone15", b"kernel"),
        ("Firmware/all_flash/DeviceTree.d73ap.im4p", b"devicetree"),
        ("Firmware/all_flash/iBoot.d73.RELEASE.im4p", b"iboot"),
        ("Firmware/all_flash/LLB.d73.RELEASE.im4p", b"llb"),
        ("Firmware/all_flash/sep-firmware.d73.RELEASE.im4p", b"sep"),
        ("Firmware/dfu/iBSS.d73.RELEASE.im4p", b"ibss"),
        ("098-12345-001.dmg", b"filesystem"),
        ("098-00000-001.dmg", b"ramdisk"),
        (
            "AssetData/payloadv2/System/Library/Caches/com.apple.dyld/dyld_shared_cache_arm64e",
            b"dyld",
        ),
        (
            "AssetData/payloadv2/System/Library/Caches/com.apple.dyld/dyld_shared_cache_arm64e.01",
            b"dyld01",
        ),
        (
            "AssetData/payloadv2/System/Library/Caches/com.apple.dyld/dyld_shared_cache_x86_64h",
            b"dyldx86",
        ),
    ])
}
