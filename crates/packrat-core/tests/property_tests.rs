//! Property-based tests for pattern matching and member naming.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use packrat_core::creation::ExclusionPattern;
use packrat_core::creation::ExclusionSet;
use packrat_core::creation::filters;
use packrat_core::creation::zip::member_name;
use proptest::prelude::*;
use std::ffi::OsStr;
use std::path::PathBuf;

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9_-]{1,12}", 1..6)
}

proptest! {
    /// A trailing slash never changes what a pattern excludes.
    #[test]
    fn prop_trailing_slash_is_ignored(
        name in "[a-zA-Z0-9_]{1,10}",
        path in segments(),
        is_dir in any::<bool>(),
    ) {
        let plain = ExclusionSet::new([name.as_str()]).unwrap();
        let slashed = ExclusionSet::new([format!("{name}/")]).unwrap();

        let relative = PathBuf::from(path.join("/"));
        let basename = OsStr::new(path.last().map_or("", String::as_str));
        prop_assert_eq!(
            plain.is_excluded(&relative, basename, is_dir),
            slashed.is_excluded(&relative, basename, is_dir)
        );
    }

    /// `*.ext` matches a file of that extension at any depth.
    #[test]
    fn prop_extension_matches_at_any_depth(
        dirs in prop::collection::vec("[a-z]{1,8}", 0..5),
        stem in "[a-z]{1,8}",
    ) {
        let basename = format!("{stem}.tmp");
        let mut parts = dirs.clone();
        parts.push(basename.clone());
        prop_assert!(filters::matches("*.tmp", &parts.join("/"), &basename).unwrap());
    }

    /// Adding a further extension defeats an extension pattern.
    #[test]
    fn prop_extension_requires_suffix(
        dirs in prop::collection::vec("[a-z]{1,8}", 0..5),
        stem in "[a-z]{1,8}",
        extra in "[a-z]{1,4}",
    ) {
        let basename = format!("{stem}.tmp.{extra}");
        let mut parts = dirs.clone();
        parts.push(basename.clone());
        prop_assert!(!filters::matches("*.tmp", &parts.join("/"), &basename).unwrap());
    }

    /// Anything below a `build` directory is excluded by `**/build/**`.
    #[test]
    fn prop_build_contents_excluded(
        before in prop::collection::vec("[a-z]{1,8}", 0..4),
        after in segments(),
    ) {
        let mut parts = before.clone();
        parts.push("build".to_string());
        parts.extend(after.iter().cloned());
        let relative = parts.join("/");
        let basename = parts.last().unwrap();
        prop_assert!(filters::matches("**/build/**", &relative, basename).unwrap());
    }

    /// A file literally named `build` is not matched by `**/build/**`.
    #[test]
    fn prop_build_file_kept(before in prop::collection::vec("[a-z]{2,8}", 0..4)) {
        let mut parts = before.clone();
        parts.push("build".to_string());
        prop_assert!(!filters::matches("**/build/**", &parts.join("/"), "build").unwrap());
    }

    /// Member names are the label and relative components joined by `/`.
    #[test]
    fn prop_member_name_joins_with_slash(label in "[a-zA-Z0-9_.-]{1,12}", parts in segments()) {
        let relative: PathBuf = parts.iter().collect();
        let name = member_name(&label, &relative).unwrap();

        prop_assert_eq!(name.clone(), format!("{label}/{}", parts.join("/")));
        prop_assert!(!name.contains('\\'));
        prop_assert!(!name.ends_with('/'));
    }

    /// Valid glob text always compiles and keeps its raw form.
    #[test]
    fn prop_pattern_keeps_raw_text(raw in "\\*?[a-z?]{1,10}/?") {
        let pattern = ExclusionPattern::new(&raw).unwrap();
        prop_assert_eq!(pattern.raw(), raw.as_str());
        prop_assert!(!pattern.normalized().ends_with('/'));
    }
}
