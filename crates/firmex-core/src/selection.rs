//! The selection matrix: artifact kinds, selectors and extraction rules.
//!
//! Every extractable artifact is described by one [`ArtifactRule`] in a
//! static, ordered table. Adding an artifact kind means adding a row here;
//! the dispatcher walks the table and never special-cases a kind.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use regex::RegexBuilder;

use crate::ExtractionError;
use crate::Result;
use crate::source::AccessMode;

/// A logical artifact that can be pulled out of a firmware archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Kernel image (kernelcache).
    Kernel,
    /// Shared-library cache (dyld_shared_cache).
    DyldCache,
    /// Device tree blobs.
    DeviceTree,
    /// Root filesystem image.
    FilesystemImage,
    /// Boot firmware.
    IBoot,
    /// Secure-enclave firmware.
    SepFirmware,
    /// Entries matching the user-supplied pattern.
    Pattern,
}

impl ArtifactKind {
    /// All kinds in table order.
    pub const ALL: [Self; 7] = [
        Self::Kernel,
        Self::DyldCache,
        Self::DeviceTree,
        Self::FilesystemImage,
        Self::IBoot,
        Self::SepFirmware,
        Self::Pattern,
    ];

    /// Command-line flag that activates this kind.
    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Kernel => "--kernel",
            Self::DyldCache => "--dyld",
            Self::DeviceTree => "--dtree",
            Self::FilesystemImage => "--dmg",
            Self::IBoot => "--iboot",
            Self::SepFirmware => "--sep",
            Self::Pattern => "--pattern",
        }
    }

    /// Stable machine-readable identifier.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::DyldCache => "dyld",
            Self::DeviceTree => "dtree",
            Self::FilesystemImage => "dmg",
            Self::IBoot => "iboot",
            Self::SepFirmware => "sep",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kernel => "kernelcache",
            Self::DyldCache => "dyld_shared_cache",
            Self::DeviceTree => "DeviceTree",
            Self::FilesystemImage => "File System DMG",
            Self::IBoot => "iBoot",
            Self::SepFirmware => "sep-firmware",
            Self::Pattern => "files matching pattern",
        };
        f.write_str(name)
    }
}

/// Supported dyld_shared_cache architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DyldArch {
    /// `arm64`
    Arm64,
    /// `arm64e`
    Arm64e,
    /// `x86_64`
    X86_64,
    /// `x86_64h`
    X86_64h,
}

impl DyldArch {
    /// All supported architectures.
    pub const ALL: [Self; 4] = [Self::Arm64, Self::Arm64e, Self::X86_64, Self::X86_64h];

    /// Architecture name as it appears in cache file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::Arm64e => "arm64e",
            Self::X86_64 => "x86_64",
            Self::X86_64h => "x86_64h",
        }
    }
}

impl fmt::Display for DyldArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DyldArch {
    type Err = ExtractionError;

    /// Parses an architecture name. Matching is exact: `ARM64` is rejected.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| ExtractionError::InvalidArchitecture {
                arch: s.to_string(),
            })
    }
}

/// The user's selector flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    /// Extract the kernel image.
    pub kernel: bool,
    /// Extract the shared-library cache.
    pub dyld: bool,
    /// Extract device trees.
    pub device_tree: bool,
    /// Extract the filesystem image.
    pub filesystem_image: bool,
    /// Extract boot firmware.
    pub iboot: bool,
    /// Extract secure-enclave firmware.
    pub sep: bool,
    /// Free-form pattern for arbitrary entries.
    pub pattern: Option<String>,
    /// Architecture filter for the shared-library cache.
    pub dyld_arches: Vec<DyldArch>,
}

impl Selectors {
    /// Returns `true` if `kind` was requested.
    #[must_use]
    pub fn is_active(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Kernel => self.kernel,
            ArtifactKind::DyldCache => self.dyld,
            ArtifactKind::DeviceTree => self.device_tree,
            ArtifactKind::FilesystemImage => self.filesystem_image,
            ArtifactKind::IBoot => self.iboot,
            ArtifactKind::SepFirmware => self.sep,
            ArtifactKind::Pattern => self.pattern.as_deref().is_some_and(|p| !p.is_empty()),
        }
    }

    /// Requested kinds, in table order.
    #[must_use]
    pub fn active_kinds(&self) -> Vec<ArtifactKind> {
        ArtifactRule::table()
            .iter()
            .map(|rule| rule.kind)
            .filter(|kind| self.is_active(*kind))
            .collect()
    }

    /// Returns `true` if no selector is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_kinds().is_empty()
    }
}

/// Access modes in which an artifact can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    local: bool,
    remote: bool,
}

impl Capability {
    /// Available in both modes.
    pub const BOTH: Self = Self {
        local: true,
        remote: true,
    };

    /// Needs random access to a local file.
    pub const LOCAL_ONLY: Self = Self {
        local: true,
        remote: false,
    };

    /// Returns `true` if extraction is possible in `mode`.
    #[must_use]
    pub const fn allows(self, mode: AccessMode) -> bool {
        match mode {
            AccessMode::Local => self.local,
            AccessMode::Remote => self.remote,
        }
    }
}

/// How archive entries are selected for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMatcher {
    /// Case-insensitive regular expression over the full entry name.
    Regex(&'static str),
    /// Exact (case-insensitive) base name taken from archive metadata.
    FilesystemImageName,
    /// The user-supplied pattern.
    UserPattern,
    /// The specialized extractor scans the archive itself.
    Delegated,
}

/// What the dispatcher does for an active rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractAction {
    /// Hand the archive to a specialized extractor.
    Specialized,
    /// Copy every entry accepted by the matcher.
    FilteredCopy,
}

/// What happens when a selector matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Fail the run with `NoMatches`.
    Fail,
    /// Record a warning and continue.
    Warn,
}

/// One row of the selection matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactRule {
    /// Artifact described by this rule.
    pub kind: ArtifactKind,
    /// Entry selection.
    pub matcher: EntryMatcher,
    /// Modes in which the rule can run.
    pub capability: Capability,
    /// Extraction action.
    pub action: ExtractAction,
    /// Behaviour when nothing matched.
    pub on_empty: EmptyPolicy,
    /// Message shown when the rule is skipped in remote mode.
    pub remote_limitation: Option<&'static str>,
}

static RULES: [ArtifactRule; 7] = [
    ArtifactRule {
        kind: ArtifactKind::Kernel,
        matcher: EntryMatcher::Delegated,
        capability: Capability::BOTH,
        action: ExtractAction::Specialized,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: None,
    },
    ArtifactRule {
        kind: ArtifactKind::DyldCache,
        matcher: EntryMatcher::Delegated,
        capability: Capability::LOCAL_ONLY,
        action: ExtractAction::Specialized,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: Some(
            "unable to extract dyld_shared_cache remotely (download the OTA with its dyld caches instead)",
        ),
    },
    ArtifactRule {
        kind: ArtifactKind::DeviceTree,
        matcher: EntryMatcher::Delegated,
        capability: Capability::BOTH,
        action: ExtractAction::Specialized,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: None,
    },
    ArtifactRule {
        kind: ArtifactKind::FilesystemImage,
        matcher: EntryMatcher::FilesystemImageName,
        capability: Capability::LOCAL_ONLY,
        action: ExtractAction::FilteredCopy,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: Some("unable to extract File System DMG remotely"),
    },
    ArtifactRule {
        kind: ArtifactKind::IBoot,
        matcher: EntryMatcher::Regex(r".*iBoot.*im4p$"),
        capability: Capability::BOTH,
        action: ExtractAction::FilteredCopy,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: None,
    },
    ArtifactRule {
        kind: ArtifactKind::SepFirmware,
        matcher: EntryMatcher::Regex(r".*sep-firmware.*im4p$"),
        capability: Capability::BOTH,
        action: ExtractAction::FilteredCopy,
        on_empty: EmptyPolicy::Fail,
        remote_limitation: None,
    },
    ArtifactRule {
        kind: ArtifactKind::Pattern,
        matcher: EntryMatcher::UserPattern,
        capability: Capability::BOTH,
        action: ExtractAction::FilteredCopy,
        on_empty: EmptyPolicy::Warn,
        remote_limitation: None,
    },
];

impl ArtifactRule {
    /// The ordered selection matrix.
    #[must_use]
    pub fn table() -> &'static [Self] {
        &RULES
    }

    /// Returns the rule for `kind`.
    #[must_use]
    pub fn for_kind(kind: ArtifactKind) -> &'static Self {
        // The table holds exactly one row per kind, in `ArtifactKind::ALL` order.
        &RULES[kind as usize]
    }

    /// Returns `true` if the rule can run in `mode`.
    #[must_use]
    pub const fn available_in(&self, mode: AccessMode) -> bool {
        self.capability.allows(mode)
    }

    /// Explanation used when the rule cannot run in `mode`.
    #[must_use]
    pub fn limitation(&self, mode: AccessMode) -> String {
        match (mode, self.remote_limitation) {
            (AccessMode::Remote, Some(message)) => message.to_string(),
            _ => format!("unable to extract {} in {mode} mode", self.kind),
        }
    }
}

/// Compiles a case-insensitive entry-name pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ExtractionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_one_row_per_kind_in_order() {
        let kinds: Vec<_> = ArtifactRule::table().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, ArtifactKind::ALL.to_vec());
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactRule::for_kind(kind).kind, kind);
        }
    }

    #[test]
    fn test_remote_restricted_kinds() {
        let restricted: Vec<_> = ArtifactRule::table()
            .iter()
            .filter(|r| !r.available_in(AccessMode::Remote))
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            restricted,
            vec![ArtifactKind::DyldCache, ArtifactKind::FilesystemImage]
        );
        assert!(
            ArtifactRule::table()
                .iter()
                .all(|r| r.available_in(AccessMode::Local))
        );
    }

    #[test]
    fn test_limitation_messages() {
        let dyld = ArtifactRule::for_kind(ArtifactKind::DyldCache);
        assert!(dyld.limitation(AccessMode::Remote).contains("dyld_shared_cache"));
        let dmg = ArtifactRule::for_kind(ArtifactKind::FilesystemImage);
        assert!(dmg.limitation(AccessMode::Remote).contains("DMG"));
    }

    #[test]
    fn test_builtin_regexes_match_firmware_names() {
        let iboot = ArtifactRule::for_kind(ArtifactKind::IBoot);
        let EntryMatcher::Regex(pattern) = iboot.matcher else {
            panic!("iBoot rule should use a regex");
        };
        let re = compile_pattern(pattern).unwrap();
        assert!(re.is_match("Firmware/all_flash/iBoot.d83.RELEASE.im4p"));
        assert!(!re.is_match("Firmware/all_flash/iBoot.d83.RELEASE.im4p.plist"));
        assert!(!re.is_match("Firmware/dfu/iBSS.d83.RELEASE.im4p"));

        let sep = ArtifactRule::for_kind(ArtifactKind::SepFirmware);
        let EntryMatcher::Regex(pattern) = sep.matcher else {
            panic!("SEP rule should use a regex");
        };
        let re = compile_pattern(pattern).unwrap();
        assert!(re.is_match("Firmware/all_flash/sep-firmware.d83.RELEASE.im4p"));
    }

    #[test]
    fn test_dyld_arch_parse() {
        assert_eq!("arm64e".parse::<DyldArch>().unwrap(), DyldArch::Arm64e);
        assert_eq!("x86_64h".parse::<DyldArch>().unwrap(), DyldArch::X86_64h);
        for invalid in ["ARM64", "armv7k", "", "x86-64"] {
            let err = invalid.parse::<DyldArch>().unwrap_err();
            assert!(err.is_configuration_error(), "{invalid} should be rejected");
        }
    }

    #[test]
    fn test_selectors_active_kinds() {
        let selectors = Selectors {
            sep: true,
            kernel: true,
            pattern: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            selectors.active_kinds(),
            vec![ArtifactKind::Kernel, ArtifactKind::SepFirmware]
        );
        assert!(Selectors::default().is_empty());
    }

    #[test]
    fn test_compile_pattern_is_case_insensitive() {
        let re = compile_pattern("SEP").unwrap();
        assert!(re.is_match("Firmware/all_flash/sep-firmware.d83.RELEASE.im4p"));
        assert!(compile_pattern("(unclosed").is_err());
    }
}
