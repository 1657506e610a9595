//! Integration tests for firmex-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

const FOLDER: &str = "17.0__21A329__iPhone15,2";

const RESTORE_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>ProductBuildVersion</key>
	<string>21A329</string>
	<key>ProductVersion</key>
	<string>17.0</string>
	<key>SupportedProductTypes</key>
	<array>
		<string>iPhone15,2</string>
	</array>
	<key>SystemRestoreImageFileSystems</key>
	<dict>
		<key>098-12345-001.dmg</key>
		<string>apfs</string>
	</dict>
</dict>
</plist>
"#;

fn write_ipsw(dir: &Path) -> PathBuf {
    let entries: [(&str, &[u8]); 8] = [
        ("Restore.plist", RESTORE_PLIST.as_bytes()),
        ("kernelcache.release.iphone15", b"kernel"),
        ("Firmware/all_flash/DeviceTree.d73ap.im4p", b"devicetree"),
        ("Firmware/all_flash/iBoot.d73.RELEASE.im4p", b"iboot"),
        ("Firmware/all_flash/sep-firmware.d73.RELEASE.im4p", b"sep"),
        ("098-12345-001.dmg", b"filesystem"),
        (
            "System/Library/Caches/com.apple.dyld/dyld_shared_cache_arm64e",
            b"dyld",
        ),
        (
            "System/Library/Caches/com.apple.dyld/dyld_shared_cache_x86_64h",
            b"dyldx86",
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    let bytes = zip.finish().unwrap().into_inner();

    let path = dir.join("iPhone15,2_17.0_21A329_Restore.ipsw");
    fs::write(&path, bytes).unwrap();
    path
}

fn firmex_cmd() -> Command {
    cargo_bin_cmd!("firmex")
}

#[test]
fn test_version_flag() {
    firmex_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("firmex"));
}

#[test]
fn test_extract_help() {
    firmex_cmd()
        .arg("extract")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dyld-arch"))
        .stdout(predicate::str::contains("--remote"));
}

#[test]
fn test_extract_device_tree_and_iboot() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());
    let out = temp.path().join("out");

    firmex_cmd()
        .arg("extract")
        .arg(&archive)
        .args(["--dtree", "--iboot", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    let dest = out.join(FOLDER);
    assert!(dest.join("DeviceTree.d73ap.im4p").is_file());
    assert_eq!(fs::read(dest.join("iBoot.d73.RELEASE.im4p")).unwrap(), b"iboot");
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 2);
}

#[test]
fn test_verbose_logs_extraction_summary() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());
    let out = temp.path().join("out");

    firmex_cmd()
        .env_remove("RUST_LOG")
        .args(["-v", "--log-format", "json", "extract"])
        .arg(&archive)
        .args(["--iboot", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("extraction finished"));
}

#[test]
fn test_extract_pattern_json() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());
    let out = temp.path().join("out");

    let output = firmex_cmd()
        .arg("--json")
        .arg("extract")
        .arg(&archive)
        .args(["--pattern", "SEP", "--output"])
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "extract");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["files_extracted"], 1);
    assert!(out.join(FOLDER).join("sep-firmware.d73.RELEASE.im4p").is_file());
}

#[test]
fn test_extract_dyld_with_arch_filter() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());
    let out = temp.path().join("out");

    firmex_cmd()
        .arg("extract")
        .arg(&archive)
        .args(["-d", "-a", "arm64e", "-o"])
        .arg(&out)
        .assert()
        .success();

    let dest = out.join(FOLDER);
    assert!(dest.join("dyld_shared_cache_arm64e").is_file());
    assert!(!dest.join("dyld_shared_cache_x86_64h").exists());
}

#[test]
fn test_arch_without_dyld_fails_before_io() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let out = temp.path().join("out");

    firmex_cmd()
        .arg("extract")
        .arg(temp.path().join("does-not-exist.ipsw"))
        .args(["-k", "-a", "arm64e", "-o"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dyld"));

    assert!(!out.exists());
}

#[test]
fn test_invalid_arch_rejected() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());

    firmex_cmd()
        .arg("extract")
        .arg(&archive)
        .args(["-d", "-a", "ARM64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ARM64"));
}

#[test]
fn test_missing_archive() {
    let temp = TempDir::new().expect("failed to create temp dir");

    firmex_cmd()
        .arg("extract")
        .arg(temp.path().join("missing.ipsw"))
        .arg("-k")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Archive not found"));
}

#[test]
fn test_invalid_remote_url() {
    firmex_cmd()
        .args(["extract", "--remote", "not a url", "-k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid archive URL"));
}

#[test]
fn test_proxy_requires_remote() {
    firmex_cmd()
        .args(["extract", "fw.ipsw", "-k", "--proxy", "http://proxy:3128"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--remote"));
}

#[test]
fn test_no_selectors_writes_nothing() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_ipsw(temp.path());
    let out = temp.path().join("out");

    firmex_cmd()
        .arg("extract")
        .arg(&archive)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    assert!(!out.exists());
}

#[test]
fn test_missing_artifact_fails() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = temp.path().join("bare.ipsw");
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("README.txt", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"nothing here").unwrap();
    fs::write(&archive, zip.finish().unwrap().into_inner()).unwrap();

    firmex_cmd()
        .arg("extract")
        .arg(&archive)
        .arg("--iboot")
        .arg("-o")
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No iBoot found"));
}

#[test]
fn test_completion_bash() {
    firmex_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("firmex"));
}
