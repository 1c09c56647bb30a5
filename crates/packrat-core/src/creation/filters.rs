//! Exclusion pattern matching for archive creation.
//!
//! Patterns are glob-style rules compiled with `globset`:
//!
//! - `*` matches any run of characters except a path separator
//! - `**` as a whole segment matches any number of segments, including zero
//! - everything else is matched literally and case-sensitively
//!
//! A pattern without a separator is tested against the entry's basename, so
//! it matches anywhere in the tree. A pattern with a separator is tested
//! against the path relative to the traversal root. Both patterns and paths
//! are normalized to forward slashes first, and a trailing separator is
//! dropped (`Library/` behaves like `Library`).

use crate::PackratError;
use crate::Result;
use globset::GlobBuilder;
use globset::GlobMatcher;
use std::ffi::OsStr;
use std::path::Component;
use std::path::Path;

/// Which part of a path a pattern is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Final path segment only.
    Basename,
    /// Full path relative to the traversal root.
    RelativePath,
}

/// A single compiled exclusion pattern.
#[derive(Debug, Clone)]
pub struct ExclusionPattern {
    raw: String,
    normalized: String,
    scope: MatchScope,
    matcher: GlobMatcher,
    /// For patterns ending in `/**`: matches the directory that owns the
    /// excluded subtree, so the walker can prune it instead of visiting
    /// every descendant.
    subtree_root: Option<GlobMatcher>,
}

impl ExclusionPattern {
    /// Compiles a raw pattern.
    ///
    /// # Errors
    ///
    /// Returns `PackratError::Config` if the pattern is empty or is not a
    /// valid glob.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::creation::filters::ExclusionPattern;
    /// use packrat_core::creation::filters::MatchScope;
    ///
    /// let pattern = ExclusionPattern::new("Library/")?;
    /// assert_eq!(pattern.normalized(), "Library");
    /// assert_eq!(pattern.scope(), MatchScope::Basename);
    /// # Ok::<(), packrat_core::PackratError>(())
    /// ```
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = normalize_pattern(raw);
        if normalized.is_empty() {
            return Err(PackratError::config(format!(
                "exclusion pattern '{raw}' is empty"
            )));
        }

        let scope = if normalized.contains('/') {
            MatchScope::RelativePath
        } else {
            MatchScope::Basename
        };

        let matcher = compile(raw, &normalized)?;
        let subtree_root = match normalized.strip_suffix("/**") {
            Some(stem) if !stem.is_empty() => Some(compile(raw, stem)?),
            _ => None,
        };

        Ok(Self {
            raw: raw.to_string(),
            normalized,
            scope,
            matcher,
            subtree_root,
        })
    }

    /// The pattern as configured.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The pattern after separator normalization.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Which part of a path this pattern is tested against.
    #[must_use]
    pub const fn scope(&self) -> MatchScope {
        self.scope
    }

    /// Tests the pattern against an entry.
    ///
    /// `relative_path` is the entry's path relative to the traversal root
    /// (empty for the root itself) and `basename` its final segment. Both
    /// the path as given and its backslash-normalized form are tried.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::creation::filters::ExclusionPattern;
    ///
    /// let pattern = ExclusionPattern::new("*.tmp")?;
    /// assert!(pattern.matches("sub/dir/b.tmp", "b.tmp"));
    /// assert!(!pattern.matches("a.tmp.bak", "a.tmp.bak"));
    /// # Ok::<(), packrat_core::PackratError>(())
    /// ```
    #[must_use]
    pub fn matches(&self, relative_path: &str, basename: &str) -> bool {
        let candidate = match self.scope {
            MatchScope::Basename => basename,
            MatchScope::RelativePath => relative_path,
        };
        matches_either_form(&self.matcher, candidate)
    }

    /// Tests whether a directory is the root of a subtree this pattern
    /// excludes in full (`**/build/**` prunes every `build` directory).
    #[must_use]
    pub fn prunes_directory(&self, relative_path: &str) -> bool {
        self.subtree_root
            .as_ref()
            .is_some_and(|m| matches_either_form(m, relative_path))
    }
}

/// An ordered set of exclusion patterns; exclusion wins if any pattern
/// matches.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionSet {
    /// Compiles every pattern, failing on the first invalid one.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::creation::filters::ExclusionSet;
    /// use std::ffi::OsStr;
    /// use std::path::Path;
    ///
    /// let set = ExclusionSet::new(["*.log", "node_modules"])?;
    /// assert!(set.is_excluded(Path::new("debug.log"), OsStr::new("debug.log"), false));
    /// assert!(!set.is_excluded(Path::new("src/main.txt"), OsStr::new("main.txt"), false));
    /// # Ok::<(), packrat_core::PackratError>(())
    /// ```
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| ExclusionPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// A set that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of patterns in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if the set has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates over the compiled patterns in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExclusionPattern> {
        self.patterns.iter()
    }

    /// Returns `true` if an entry must be left out of the archive.
    ///
    /// For directories this also means the whole subtree is pruned.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &Path, basename: &OsStr, is_dir: bool) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let relative = slash_path(relative_path);
        let basename = basename.to_string_lossy();

        self.patterns.iter().any(|pattern| {
            pattern.matches(&relative, &basename)
                || (is_dir && !relative.is_empty() && pattern.prunes_directory(&relative))
        })
    }
}

/// Matches a raw pattern against an entry without building a set.
///
/// # Errors
///
/// Returns `PackratError::Config` if the pattern does not compile.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::filters;
///
/// assert!(filters::matches("**/build/**", "src/build/out.o", "out.o")?);
/// assert!(!filters::matches("**/build/**", "build", "build")?);
/// # Ok::<(), packrat_core::PackratError>(())
/// ```
pub fn matches(pattern: &str, relative_path: &str, basename: &str) -> Result<bool> {
    Ok(ExclusionPattern::new(pattern)?.matches(relative_path, basename))
}

/// Renders a relative path with forward slashes regardless of host
/// separator.
///
/// # Examples
///
/// ```
/// use packrat_core::creation::filters::slash_path;
/// use std::path::Path;
///
/// assert_eq!(slash_path(Path::new("src/bin/main.rs")), "src/bin/main.rs");
/// assert_eq!(slash_path(Path::new("")), "");
/// ```
#[must_use]
pub fn slash_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

/// Normalizes a pattern to forward slashes without leading `./`, leading
/// `/` or trailing `/`.
fn normalize_pattern(raw: &str) -> String {
    let mut pattern = raw.trim().replace('\\', "/");

    while let Some(stripped) = pattern.strip_prefix("./") {
        pattern = stripped.to_string();
    }

    let trimmed = pattern.trim_matches('/');
    trimmed.to_string()
}

fn compile(raw: &str, glob: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(false)
        .case_insensitive(false)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| PackratError::config(format!("invalid exclusion pattern '{raw}': {e}")))
}

fn matches_either_form(matcher: &GlobMatcher, candidate: &str) -> bool {
    if matcher.is_match(candidate) {
        return true;
    }
    candidate.contains('\\') && matcher.is_match(candidate.replace('\\', "/"))
}
