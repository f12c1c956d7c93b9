//! Discovery of resource files and their grouping into modules.
//!
//! A module is the directory that owns `src/main/res/values*/strings.xml`,
//! identified by its canonical path so that two modules with the same
//! directory name in different places stay apart.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::{
    document::{Baseline, ResourceDocument},
    error::Error,
    ignore_rules::{IgnorePolicy, PATTERN_FILE_NAME, RuleSets},
    scan_options::ScanOptions,
    types::Language,
};

/// Depth of the module directory above a resource file:
/// `<module>/src/main/res/values*/strings.xml`.
const MODULE_DEPTH: usize = 5;

/// Modules keyed by their identifier.
pub type Modules = BTreeMap<PathBuf, ResourceModule>;

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceModule {
    pub name: String,
    /// Canonical path of the module directory.
    pub identifier: PathBuf,
    documents: BTreeMap<Language, Vec<ResourceDocument>>,
}

impl ResourceModule {
    pub fn new(name: impl Into<String>, identifier: impl Into<PathBuf>) -> Self {
        ResourceModule {
            name: name.into(),
            identifier: identifier.into(),
            documents: BTreeMap::new(),
        }
    }

    pub fn add_document(&mut self, document: ResourceDocument) {
        tracing::debug!(
            "Added resource for '{}' in module '{}': {}",
            document.language(),
            self.name,
            document.path().display()
        );
        self.documents
            .entry(document.language().clone())
            .or_default()
            .push(document);
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.documents.keys()
    }

    pub fn documents(&self, language: &Language) -> &[ResourceDocument] {
        self.documents
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Target-language documents, mutable, grouped by language.
    pub fn translations_mut(
        &mut self,
    ) -> impl Iterator<Item = (&Language, &mut Vec<ResourceDocument>)> {
        self.documents
            .iter_mut()
            .filter(|(language, _)| !language.is_default())
    }

    pub fn translations(&self) -> impl Iterator<Item = (&Language, &Vec<ResourceDocument>)> {
        self.documents
            .iter()
            .filter(|(language, _)| !language.is_default())
    }

    /// Merged default-language resources, `None` when the module has no
    /// default-language file.
    pub fn baseline(&self) -> Option<Baseline> {
        let defaults = self.documents.get(&Language::Default)?;
        if defaults.is_empty() {
            return None;
        }
        Some(Baseline::from_documents(defaults))
    }

    /// Moves the documents of `other` into this module.
    pub fn absorb(&mut self, other: ResourceModule) {
        for (language, documents) in other.documents {
            self.documents.entry(language).or_default().extend(documents);
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Module: {} (ID: {})",
            self.name,
            self.identifier.display()
        );
        for (language, documents) in &self.documents {
            for document in documents {
                let (strings, plurals) = document.summary();
                tracing::debug!(
                    "  [{}] {} | Strings: {}, Plurals: {}",
                    language,
                    document.path().display(),
                    strings,
                    plurals
                );
            }
        }
    }
}

struct Candidate {
    path: PathBuf,
    language: Language,
    module_dir: PathBuf,
}

fn module_dir_of(path: &Path) -> Result<PathBuf, Error> {
    let dir = path.ancestors().nth(MODULE_DEPTH).ok_or_else(|| {
        Error::InvalidResource(format!(
            "cannot determine module folder for {}",
            path.display()
        ))
    })?;
    Ok(fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()))
}

fn policy_for(root: &Path, options: &ScanOptions, in_tree_rules: &[PathBuf]) -> IgnorePolicy {
    let mut rules = if options.use_pattern_files {
        RuleSets::discover_upward(root)
    } else {
        RuleSets::new()
    };
    if options.use_pattern_files {
        for file in in_tree_rules {
            rules.add_file(file);
        }
    }

    let policy = IgnorePolicy::resolve(options.ignore_folders.clone(), rules);
    match &policy {
        IgnorePolicy::Folders(folders) => {
            tracing::info!("Using explicit ignore folders: {}", folders.join(", "));
        }
        IgnorePolicy::Patterns(rules) => {
            tracing::info!(
                "Using patterns from {} ignore files in directory hierarchy",
                rules.len()
            );
        }
        IgnorePolicy::None => {}
    }
    policy
}

/// Scans one root directory for resource files.
pub fn scan_root(root: &Path, options: &ScanOptions) -> Result<Modules, Error> {
    if !root.exists() {
        return Err(Error::NotFound(root.to_path_buf()));
    }
    let root = fs::canonicalize(root)?;
    tracing::info!("Scanning for resource files in {}", root.display());

    let walker = WalkBuilder::new(&root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    let mut in_tree_rules = Vec::new();
    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let name = dent.file_name();
        let is_pattern_file = name == PATTERN_FILE_NAME;
        let is_resource_file = name == options.file_name.as_str();
        if is_pattern_file {
            in_tree_rules.push(dent.into_path());
        } else if is_resource_file {
            files.push(dent.into_path());
        }
    }

    let policy = policy_for(&root, options, &in_tree_rules);

    let mut candidates = Vec::new();
    for path in files {
        if policy.is_ignored(&root, &path) {
            tracing::debug!("Skipping {} (ignored)", path.display());
            continue;
        }
        let Some(dir_name) = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        if !dir_name.starts_with("values") {
            continue;
        }
        let language = match Language::from_values_dir(&dir_name) {
            Ok(language) => language,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        tracing::debug!("Detected language '{}' from {}", language, dir_name);
        let module_dir = module_dir_of(&path)?;
        candidates.push(Candidate {
            path,
            language,
            module_dir,
        });
    }

    let parsed: Vec<(PathBuf, Result<ResourceDocument, Error>)> = candidates
        .into_par_iter()
        .map(|c| {
            let document = ResourceDocument::load(&c.path, c.language);
            (c.module_dir, document)
        })
        .collect();

    let mut modules = Modules::new();
    for (module_dir, document) in parsed {
        let document = match document {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Skipping resource file: {}", e);
                continue;
            }
        };
        let module = modules.entry(module_dir.clone()).or_insert_with(|| {
            let name = module_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!(
                "Created module entry for '{}' (key: {})",
                name,
                module_dir.display()
            );
            ResourceModule::new(name, module_dir.clone())
        });
        module.add_document(document);
    }
    Ok(modules)
}

/// Scans every root and merges modules found under several of them.
pub fn scan<P: AsRef<Path>>(roots: &[P], options: &ScanOptions) -> Result<Modules, Error> {
    let mut modules = Modules::new();
    for root in roots {
        for (identifier, module) in scan_root(root.as_ref(), options)? {
            match modules.get_mut(&identifier) {
                Some(existing) => existing.absorb(module),
                None => {
                    modules.insert(identifier, module);
                }
            }
        }
    }
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    const BASE: &str = r#"<resources><string name="hello">Hello</string></resources>"#;
    const SPANISH: &str = r#"<resources><string name="hello">Hola</string></resources>"#;

    #[test]
    fn test_scan_groups_by_module_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/res/values/strings.xml", BASE);
        write(root, "app/src/main/res/values-es/strings.xml", SPANISH);
        write(root, "app/src/main/res/values-night/strings.xml", BASE);
        write(root, "lib/src/main/res/values/strings.xml", BASE);

        let modules = scan(&[root], &ScanOptions::new()).unwrap();
        assert_eq!(modules.len(), 2);

        let app = modules
            .values()
            .find(|m| m.name == "app")
            .expect("app module");
        let languages: Vec<String> = app.languages().map(|l| l.to_string()).collect();
        assert_eq!(languages, vec!["default", "es"]);
        assert_eq!(app.documents(&Language::from("es"))[0].entry("hello"), Some("Hola"));
        assert!(app.baseline().is_some());
    }

    #[test]
    fn test_malformed_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/res/values/strings.xml", BASE);
        write(root, "app/src/main/res/values-fr/strings.xml", "<resources><string>");

        let modules = scan(&[root], &ScanOptions::new()).unwrap();
        let app = modules.values().next().unwrap();
        assert!(app.documents(&Language::from("fr")).is_empty());
        assert_eq!(app.documents(&Language::Default).len(), 1);
    }

    #[test]
    fn test_ignore_folders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/res/values/strings.xml", BASE);
        write(root, "build/src/main/res/values/strings.xml", BASE);

        let options = ScanOptions::new().with_ignore_folders(vec!["build".to_string()]);
        let modules = scan(&[root], &options).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules.values().next().unwrap().name, "app");
    }

    #[test]
    fn test_in_tree_pattern_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/res/values/strings.xml", BASE);
        write(root, "app/src/main/res/values-de/strings.xml", BASE);
        write(root, "app/.gitignore", "src/main/res/values-de/\n");

        let modules = scan(&[root], &ScanOptions::new()).unwrap();
        let app = modules.values().next().unwrap();
        assert!(app.documents(&Language::from("de")).is_empty());

        let options = ScanOptions::new().with_pattern_files(false);
        let modules = scan(&[root], &options).unwrap();
        let app = modules.values().next().unwrap();
        assert_eq!(app.documents(&Language::from("de")).len(), 1);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&[dir.path().join("nope")], &ScanOptions::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_shallow_tree_is_an_error() {
        let err = module_dir_of(Path::new("values/strings.xml")).unwrap_err();
        assert!(matches!(err, Error::InvalidResource(_)));
    }

    #[test]
    fn test_same_module_from_two_roots_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/src/main/res/values/strings.xml", BASE);
        write(root, "app/src/main/res/values-es/strings.xml", SPANISH);

        let modules = scan(
            &[root.join("app/src/main/res/values"), root.join("app/src/main/res/values-es")],
            &ScanOptions::new(),
        )
        .unwrap();
        assert_eq!(modules.len(), 1);
        let app = modules.values().next().unwrap();
        assert_eq!(app.languages().count(), 2);
    }
}
