//! Specialized extractors for artifacts that need more than a name filter.
//!
//! The defaults copy the matching archive members verbatim. Format-aware
//! extractors (decompressing a kernelcache, splitting a dyld cache) plug in
//! through [`ArtifactExtractor`] and [`Extractors`].

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::ProgressCallback;
use crate::Result;
use crate::access::ArchiveAccess;
use crate::report::ExtractedFile;
use crate::selection::ArtifactKind;
use crate::selection::DyldArch;
use crate::selection::compile_pattern;

/// Options forwarded to specialized extractors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractorOptions<'a> {
    /// Shared-cache architectures to keep; empty keeps all.
    pub dyld_arches: &'a [DyldArch],
}

/// Extracts one artifact kind from an opened archive.
///
/// Implementations receive the access-mode agnostic handle and scan the
/// archive themselves.
pub trait ArtifactExtractor {
    /// Writes the artifact into `dest` and returns the files written.
    fn extract(
        &self,
        archive: &mut dyn ArchiveAccess,
        dest: &Path,
        options: &ExtractorOptions<'_>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>>;
}

fn base_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

/// Copies every `kernelcache*` member.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelcacheExtractor;

impl ArtifactExtractor for KernelcacheExtractor {
    fn extract(
        &self,
        archive: &mut dyn ArchiveAccess,
        dest: &Path,
        _options: &ExtractorOptions<'_>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>> {
        let is_kernel = |name: &str| {
            base_name(name)
                .to_ascii_lowercase()
                .starts_with("kernelcache")
        };
        archive.extract_matching(&is_kernel, dest, progress)
    }
}

/// Copies `dyld_shared_cache_<arch>` members and their sub-caches.
#[derive(Debug, Clone)]
pub struct DyldCacheExtractor {
    name: Regex,
}

impl DyldCacheExtractor {
    /// Creates the extractor.
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: compile_pattern(
                r"^dyld_shared_cache_(arm64e|arm64|x86_64h|x86_64)(\.[0-9]+|\.symbols)?$",
            )?,
        })
    }

    /// Returns the architecture of a cache entry, if `entry` is one.
    #[must_use]
    pub fn arch_of(&self, entry: &str) -> Option<DyldArch> {
        let caps = self.name.captures(base_name(entry))?;
        caps.get(1)?.as_str().to_ascii_lowercase().parse().ok()
    }
}

impl ArtifactExtractor for DyldCacheExtractor {
    fn extract(
        &self,
        archive: &mut dyn ArchiveAccess,
        dest: &Path,
        options: &ExtractorOptions<'_>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>> {
        debug!(arches = ?options.dyld_arches, "selecting dyld_shared_cache entries");
        let wanted = |name: &str| {
            self.arch_of(name).is_some_and(|arch| {
                options.dyld_arches.is_empty() || options.dyld_arches.contains(&arch)
            })
        };
        archive.extract_matching(&wanted, dest, progress)
    }
}

/// Copies `DeviceTree*.im3p` / `DeviceTree*.im4p` members.
#[derive(Debug, Clone)]
pub struct DeviceTreeExtractor {
    name: Regex,
}

impl DeviceTreeExtractor {
    /// Creates the extractor.
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: compile_pattern(r".*DeviceTree.*im(3|4)p$")?,
        })
    }
}

impl ArtifactExtractor for DeviceTreeExtractor {
    fn extract(
        &self,
        archive: &mut dyn ArchiveAccess,
        dest: &Path,
        _options: &ExtractorOptions<'_>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<Vec<ExtractedFile>> {
        archive.extract_matching(&|name: &str| self.name.is_match(name), dest, progress)
    }
}

/// The specialized extractors used by the dispatcher.
pub struct Extractors {
    kernel: Box<dyn ArtifactExtractor>,
    dyld: Box<dyn ArtifactExtractor>,
    device_tree: Box<dyn ArtifactExtractor>,
}

impl Extractors {
    /// Creates the registry with the built-in extractors.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            kernel: Box::new(KernelcacheExtractor),
            dyld: Box::new(DyldCacheExtractor::new()?),
            device_tree: Box::new(DeviceTreeExtractor::new()?),
        })
    }

    /// Replaces the kernelcache extractor.
    #[must_use]
    pub fn with_kernel(mut self, extractor: impl ArtifactExtractor + 'static) -> Self {
        self.kernel = Box::new(extractor);
        self
    }

    /// Replaces the dyld_shared_cache extractor.
    #[must_use]
    pub fn with_dyld(mut self, extractor: impl ArtifactExtractor + 'static) -> Self {
        self.dyld = Box::new(extractor);
        self
    }

    /// Replaces the DeviceTree extractor.
    #[must_use]
    pub fn with_device_tree(mut self, extractor: impl ArtifactExtractor + 'static) -> Self {
        self.device_tree = Box::new(extractor);
        self
    }

    /// Returns the extractor for `kind`, if it has a specialized one.
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> Option<&dyn ArtifactExtractor> {
        match kind {
            ArtifactKind::Kernel => Some(self.kernel.as_ref()),
            ArtifactKind::DyldCache => Some(self.dyld.as_ref()),
            ArtifactKind::DeviceTree => Some(self.device_tree.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Extractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractors").finish_non_exhaustive()
    }
}
