//! Property-based tests for request validation and entry selection.

#![allow(clippy::unwrap_used)]

use firmex_core::ArchiveSource;
use firmex_core::DyldArch;
use firmex_core::ErrorCategory;
use firmex_core::ExtractionError;
use firmex_core::ExtractionRequest;
use firmex_core::Selectors;
use firmex_core::extractors::DyldCacheExtractor;
use firmex_core::selection::compile_pattern;
use proptest::prelude::*;

fn arch_name() -> impl Strategy<Value = String> {
    prop::sample::select(DyldArch::ALL.map(DyldArch::as_str).to_vec()).prop_map(str::to_string)
}

fn selectors_without_dyld() -> impl Strategy<Value = Selectors> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(kernel, device_tree, filesystem_image, iboot, sep)| Selectors {
            kernel,
            device_tree,
            filesystem_image,
            iboot,
            sep,
            ..Default::default()
        })
}

proptest! {
    /// An architecture filter without the dyld selector is always rejected.
    #[test]
    fn prop_arch_filter_requires_dyld(
        selectors in selectors_without_dyld(),
        arches in prop::collection::vec(arch_name(), 1..4)
    ) {
        let err = ExtractionRequest::builder(ArchiveSource::local("fw.ipsw"))
            .selectors(selectors)
            .dyld_arches(arches)
            .build()
            .unwrap_err();
        prop_assert!(matches!(err, ExtractionError::ArchitectureWithoutDyld));
        prop_assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    /// Any name outside the supported set is rejected as a configuration error.
    #[test]
    fn prop_unknown_arch_rejected(name in "[a-zA-Z0-9_]{1,12}") {
        prop_assume!(!DyldArch::ALL.iter().any(|a| a.as_str() == name));
        let err = ExtractionRequest::builder(ArchiveSource::local("fw.ipsw"))
            .selectors(Selectors { dyld: true, ..Default::default() })
            .dyld_arches([name])
            .build()
            .unwrap_err();
        prop_assert!(err.is_configuration_error());
    }

    /// Supported names are always accepted with dyld set.
    #[test]
    fn prop_known_arches_accepted(arches in prop::collection::vec(arch_name(), 0..8)) {
        let request = ExtractionRequest::builder(ArchiveSource::local("fw.ipsw"))
            .selectors(Selectors { dyld: true, ..Default::default() })
            .dyld_arches(arches.clone())
            .build()
            .unwrap();
        let kept = &request.selectors().dyld_arches;
        prop_assert!(kept.len() <= arches.len());
        for name in &arches {
            let arch: DyldArch = name.parse().unwrap();
            prop_assert!(kept.contains(&arch));
        }
    }

    /// Literal patterns match regardless of case.
    #[test]
    fn prop_literal_pattern_ignores_case(word in "[a-z]{1,10}", prefix in "[a-z/]{0,10}") {
        let re = compile_pattern(&word.to_uppercase()).unwrap();
        let entry = format!("{prefix}{word}.im4p");
        prop_assert!(re.is_match(&entry));
    }

    /// Sub-caches resolve to the architecture of their main cache.
    #[test]
    fn prop_subcache_arch(arch in arch_name(), index in 1u32..100, dir in "([a-z]+/){0,3}") {
        let dyld = DyldCacheExtractor::new().unwrap();
        let entry = format!("{dir}dyld_shared_cache_{arch}.{index:02}");
        prop_assert_eq!(dyld.arch_of(&entry).map(DyldArch::as_str), Some(arch.as_str()));
    }
}
