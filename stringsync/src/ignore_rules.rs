//! Hierarchical ignore-pattern matching.
//!
//! Pattern lists (one per directory, in `.gitignore` syntax) are evaluated
//! from the outermost directory to the innermost. Within one list the last
//! matching pattern decides; a deeper list overrides a shallower one for the
//! files below it, including re-including them with `!pattern`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};

use ignore::{
    Match,
    gitignore::{Gitignore, GitignoreBuilder},
};

pub const PATTERN_FILE_NAME: &str = ".gitignore";

/// Reads a pattern file, skipping blank lines and `#` comments.
///
/// A file that cannot be read contributes no patterns.
pub fn parse_pattern_file(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let patterns: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect();
            tracing::debug!(
                "Parsed {} patterns from {}",
                patterns.len(),
                path.display()
            );
            patterns
        }
        Err(e) => {
            tracing::warn!("Error reading ignore file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn build_matcher(dir: &Path, patterns: &[String]) -> Gitignore {
    let mut builder = GitignoreBuilder::new(dir);
    for pattern in patterns {
        if let Err(e) = builder.add_line(None, pattern) {
            tracing::warn!("Skipping invalid ignore pattern '{}': {}", pattern, e);
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Failed to build ignore rules for {}: {}", dir.display(), e);
        Gitignore::empty()
    })
}

/// Verdict of one list for a path relative to the list's directory.
fn verdict(matcher: &Gitignore, relative: &Path) -> Option<bool> {
    match matcher.matched_path_or_any_parents(relative, false) {
        Match::None => None,
        Match::Ignore(_) => Some(true),
        Match::Whitelist(_) => Some(false),
    }
}

#[derive(Debug, Clone)]
struct RuleSet {
    patterns: Vec<String>,
    matcher: Gitignore,
}

/// Pattern lists keyed by the directory that owns them.
#[derive(Debug, Clone, Default)]
pub struct RuleSets {
    sets: BTreeMap<PathBuf, RuleSet>,
}

impl RuleSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the pattern files of `start` and every ancestor up to the filesystem root.
    pub fn discover_upward(start: &Path) -> Self {
        let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
        let mut rules = RuleSets::new();
        for dir in start.ancestors() {
            let file = dir.join(PATTERN_FILE_NAME);
            if file.is_file() {
                rules.add_file(&file);
            }
        }
        rules
    }

    /// Adds the patterns of `file`, owned by the file's directory.
    pub fn add_file(&mut self, file: &Path) {
        let Some(dir) = file.parent() else {
            return;
        };
        let patterns = parse_pattern_file(file);
        if !patterns.is_empty() {
            tracing::debug!(
                "Found ignore file with {} patterns at {}",
                patterns.len(),
                dir.display()
            );
        }
        self.insert(dir, patterns);
    }

    /// Sets the pattern list owned by `dir`, replacing any previous one.
    pub fn insert(&mut self, dir: impl Into<PathBuf>, patterns: Vec<String>) {
        let dir = dir.into();
        let matcher = build_matcher(&dir, &patterns);
        self.sets.insert(dir, RuleSet { patterns, matcher });
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn patterns(&self, dir: &Path) -> Option<&[String]> {
        self.sets.get(dir).map(|set| set.patterns.as_slice())
    }

    /// Whether `path` is excluded by the lists of its ancestor directories.
    ///
    /// Lists are applied from the outermost directory inward; each matching
    /// list replaces the running verdict. Without any list nothing is ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let mut ignored = false;
        // Keys sort parents before their descendants.
        for (dir, set) in &self.sets {
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            if let Some(v) = verdict(&set.matcher, relative) {
                ignored = v;
            }
        }
        ignored
    }
}

fn normal_components(path: &Path) -> Vec<&std::ffi::OsStr> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// How candidate files are excluded during a scan.
#[derive(Debug, Clone, Default)]
pub enum IgnorePolicy {
    /// Nothing is excluded.
    #[default]
    None,
    /// Exclude files below any directory with one of these names.
    Folders(Vec<String>),
    /// Exclude files matched by the pattern files.
    Patterns(RuleSets),
}

impl IgnorePolicy {
    /// An explicit folder list wins over pattern files; pattern files are only
    /// used when no folders are given.
    pub fn resolve(folders: Vec<String>, rules: RuleSets) -> Self {
        let folders: Vec<String> = folders
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if !folders.is_empty() {
            IgnorePolicy::Folders(folders)
        } else if !rules.is_empty() {
            IgnorePolicy::Patterns(rules)
        } else {
            IgnorePolicy::None
        }
    }

    /// Whether `path`, found while scanning `root`, is excluded.
    ///
    /// Folder names only match directories below `root`, as whole path
    /// components; a name like `app/build` matches consecutive components.
    pub fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        match self {
            IgnorePolicy::None => false,
            IgnorePolicy::Folders(folders) => {
                let Ok(relative) = path.strip_prefix(root) else {
                    return false;
                };
                let dirs = normal_components(relative.parent().unwrap_or(Path::new("")));
                folders.iter().any(|folder| {
                    let wanted = normal_components(Path::new(folder));
                    !wanted.is_empty() && dirs.windows(wanted.len()).any(|w| w == wanted.as_slice())
                })
            }
            IgnorePolicy::Patterns(rules) => rules.is_ignored(path),
        }
    }
}
