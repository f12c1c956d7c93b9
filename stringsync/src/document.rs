//! One parsed `strings.xml` file and the merged base-language view of a module.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    error::Error,
    traits::Parser,
    types::{Language, QuantityCategory, QuantityMap},
    xml::{NodeId, XmlTree},
};

pub(crate) const STRING_TAG: &str = "string";
pub(crate) const PLURALS_TAG: &str = "plurals";
pub(crate) const ITEM_TAG: &str = "item";

/// The `<string>` and `<plurals>` resources of one file.
///
/// Entry text is the element's inner markup, trimmed, with escapes left as
/// written. Resources marked `translatable="false"` are not part of the
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
    path: PathBuf,
    language: Language,
    entries: BTreeMap<String, String>,
    groups: BTreeMap<String, QuantityMap>,
    locations: BTreeMap<String, usize>,
    dirty: bool,
}

/// Reads the node tree of `path`, separating a missing file from a broken one.
pub(crate) fn read_tree(path: &Path) -> Result<XmlTree, Error> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    XmlTree::read_from(path).map_err(|e| match e {
        Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            Error::NotFound(path.to_path_buf())
        }
        other => Error::malformed(path, other.to_string()),
    })
}

fn is_translatable(tree: &XmlTree, id: NodeId) -> bool {
    tree.element(id)
        .and_then(|el| el.attribute("translatable"))
        .is_none_or(|v| !v.trim().eq_ignore_ascii_case("false"))
}

impl ResourceDocument {
    /// Loads and parses `path`.
    ///
    /// A file that does not exist yields [`Error::NotFound`]; a file that
    /// exists but cannot be parsed yields [`Error::Malformed`]. There is no
    /// partial document.
    pub fn load<P: AsRef<Path>>(path: P, language: Language) -> Result<Self, Error> {
        let path = path.as_ref();
        let tree = read_tree(path)?;
        let document = Self::from_tree(path, language, &tree);
        tracing::debug!(
            "Parsed {} strings and {} plurals from {}",
            document.entries.len(),
            document.groups.len(),
            path.display()
        );
        Ok(document)
    }

    /// Parses a document from in-memory XML, attributing it to `path`.
    pub fn parse_str(
        path: impl Into<PathBuf>,
        language: Language,
        text: &str,
    ) -> Result<Self, Error> {
        let path = path.into();
        let tree = XmlTree::parse(text).map_err(|e| Error::malformed(&path, e.to_string()))?;
        Ok(Self::from_tree(&path, language, &tree))
    }

    fn from_tree(path: &Path, language: Language, tree: &XmlTree) -> Self {
        let mut document = ResourceDocument {
            path: path.to_path_buf(),
            language,
            entries: BTreeMap::new(),
            groups: BTreeMap::new(),
            locations: BTreeMap::new(),
            dirty: false,
        };

        let root = tree.root();
        for &child in tree.children(root) {
            let Some(el) = tree.element(child) else {
                continue;
            };
            if el.name != STRING_TAG && el.name != PLURALS_TAG {
                continue;
            }
            if !is_translatable(tree, child) {
                continue;
            }
            let name = match el.attribute("name").map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    tracing::warn!(
                        "Skipping <{}> without a name in {} (line {})",
                        el.name,
                        path.display(),
                        tree.line(child).unwrap_or_default()
                    );
                    continue;
                }
            };

            if el.name == STRING_TAG {
                document.entries.insert(name.clone(), tree.inner_xml(child));
            } else {
                let forms = Self::read_items(tree, child, &name, path);
                document.groups.insert(name.clone(), forms);
            }
            if let Some(line) = tree.line(child) {
                document.locations.insert(name, line);
            }
        }
        document
    }

    fn read_items(tree: &XmlTree, plurals: NodeId, name: &str, path: &Path) -> QuantityMap {
        let mut forms = QuantityMap::new();
        for item in tree.child_elements(plurals, ITEM_TAG) {
            let quantity = tree.element(item).and_then(|el| el.attribute("quantity"));
            match quantity.map(QuantityCategory::from_str) {
                Some(Ok(category)) => {
                    forms.insert(category, tree.inner_xml(item));
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        "Skipping item of plurals '{}' in {}: {}",
                        name,
                        path.display(),
                        e
                    );
                }
                None => {
                    tracing::warn!(
                        "Skipping item without quantity in plurals '{}' in {}",
                        name,
                        path.display()
                    );
                }
            }
        }
        forms
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn groups(&self) -> &BTreeMap<String, QuantityMap> {
        &self.groups
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn group(&self, key: &str) -> Option<&QuantityMap> {
        self.groups.get(key)
    }

    /// 1-based line where `key` was declared in the source file.
    pub fn location(&self, key: &str) -> Option<usize> {
        self.locations.get(key).copied()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Number of string entries and plural groups.
    pub fn summary(&self) -> (usize, usize) {
        (self.entries.len(), self.groups.len())
    }

    pub fn set_entry(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
        self.dirty = true;
    }

    pub fn set_group(&mut self, key: impl Into<String>, forms: QuantityMap) {
        self.groups.insert(key.into(), forms);
        self.dirty = true;
    }

    /// Merges freshly generated `forms` into group `key`.
    ///
    /// The generated map is the default; quantities already present in the
    /// document win on collision, so existing translations are never replaced.
    pub fn merge_group(&mut self, key: &str, forms: QuantityMap) -> &QuantityMap {
        let mut merged = forms;
        if let Some(existing) = self.groups.get(key) {
            merged.extend(existing.iter().map(|(q, text)| (*q, text.clone())));
        }
        self.dirty = true;
        self.groups.insert(key.to_string(), merged);
        &self.groups[key]
    }
}

/// Merged base-language resources of a module.
///
/// When several default-language files declare the same key, the first one
/// wins. Plural groups are merged per quantity with the same rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub entries: BTreeMap<String, String>,
    pub groups: BTreeMap<String, QuantityMap>,
    /// Key → (file, line) of the declaration that won.
    pub locations: BTreeMap<String, (PathBuf, usize)>,
}

impl Baseline {
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a ResourceDocument>,
    {
        let mut baseline = Baseline::default();
        for document in documents {
            for (key, text) in &document.entries {
                if !baseline.entries.contains_key(key) {
                    baseline.entries.insert(key.clone(), text.clone());
                    baseline.record_location(document, key);
                }
            }
            for (key, forms) in &document.groups {
                let merged = baseline.groups.entry(key.clone()).or_default();
                for (quantity, text) in forms {
                    merged.entry(*quantity).or_insert_with(|| text.clone());
                }
                baseline.record_location(document, key);
            }
        }
        baseline
    }

    fn record_location(&mut self, document: &ResourceDocument, key: &str) {
        if let Some(line) = document.location(key) {
            self.locations
                .entry(key.to_string())
                .or_insert_with(|| (document.path.clone(), line));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.groups.is_empty()
    }
}
