//! Writes a [`ResourceDocument`] back into its file without reformatting it.
//!
//! The file on disk is re-parsed and only the nodes whose content changed are
//! touched. New resources are appended to the end of their parent, indented
//! like their siblings. Comments, attribute order and unrelated resources are
//! left as they are.

use std::{
    collections::HashMap,
    fs,
    str::FromStr,
};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    document::{ITEM_TAG, PLURALS_TAG, ResourceDocument, STRING_TAG, read_tree},
    error::Error,
    types::{QuantityCategory, QuantityMap},
    xml::{Element, NodeId, NodeKind, XmlTree},
};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const DEFAULT_INDENT: &str = "    ";

lazy_static! {
    static ref DECLARATION: Regex = Regex::new(r"(?i)^\s*<\?xml\s[^>]*\?>").unwrap();
}

/// Rewrites the leading XML declaration into the canonical
/// `<?xml version="1.0" encoding="utf-8"?>`, adding one if missing.
pub fn normalize_declaration(xml: &str) -> String {
    if DECLARATION.is_match(xml) {
        DECLARATION.replace(xml, XML_DECLARATION).into_owned()
    } else {
        format!("{}{}{}", XML_DECLARATION, detect_newline(xml), xml)
    }
}

/// Line ending of the file, taken from its first line break.
fn detect_newline(xml: &str) -> &'static str {
    match xml.find('\n') {
        Some(pos) if xml[..pos].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Indentation on the last line of a whitespace run that contains a newline.
fn indent_of(ws: &str) -> Option<&str> {
    let (_, last_line) = ws.rsplit_once('\n')?;
    (!last_line.is_empty() && last_line.chars().all(|c| c == ' ' || c == '\t'))
        .then_some(last_line)
}

/// The indentation unit of the file, read from the whitespace around the root's
/// first child.
fn detect_indent(tree: &XmlTree) -> String {
    let root = tree.root();
    let first = tree
        .children(root)
        .iter()
        .copied()
        .find(|id| !matches!(tree.kind(*id), NodeKind::Text(_)));

    first
        .and_then(|first| tree.trailing_whitespace(root, first))
        .filter(|ws| ws.starts_with('\n') || ws.starts_with("\r\n"))
        .and_then(indent_of)
        .or_else(|| tree.leading_whitespace(root).and_then(indent_of))
        .unwrap_or(DEFAULT_INDENT)
        .to_string()
}

/// Whitespace indentation in front of `child` inside `parent`.
fn indent_before(tree: &XmlTree, parent: NodeId, child: NodeId) -> Option<String> {
    let children = tree.children(parent);
    let pos = children.iter().position(|c| *c == child)?;
    let previous = pos.checked_sub(1).map(|p| children[p])?;
    match tree.kind(previous) {
        NodeKind::Text(t) => indent_of(t).map(str::to_string),
        _ => None,
    }
}

/// Appends `kind` as the last child of `parent`.
///
/// The previous last node's trailing whitespace is re-anchored to
/// `child_indent` so the new node lines up with its siblings, and the new
/// node is followed by `closing_indent` so the parent's end tag stays in place.
/// Both separators start with `newline`.
fn append_aligned(
    tree: &mut XmlTree,
    parent: NodeId,
    kind: NodeKind,
    newline: &str,
    child_indent: &str,
    closing_indent: &str,
) -> NodeId {
    let last = tree
        .children(parent)
        .iter()
        .rev()
        .copied()
        .find(|id| !matches!(tree.kind(*id), NodeKind::Text(_)));
    let separator = format!("{}{}", newline, child_indent);
    match last {
        Some(last) => tree.set_trailing_whitespace(parent, last, &separator),
        None => tree.set_leading_whitespace(parent, &separator),
    }

    let id = tree.append_child(parent, kind);
    tree.set_trailing_whitespace(parent, id, &format!("{}{}", newline, closing_indent));
    id
}

fn replace_if_changed(tree: &mut XmlTree, id: NodeId, content: &str) -> bool {
    if tree.inner_xml(id).trim() == content.trim() {
        return false;
    }
    tree.set_inner_xml(id, content);
    true
}

/// Named children of `parent`; a repeated name maps to its last node, as the document reads it.
fn named_children(tree: &XmlTree, parent: NodeId, tag: &str) -> HashMap<String, NodeId> {
    let mut named = HashMap::new();
    for id in tree.child_elements(parent, tag) {
        if let Some(name) = tree.element(id).and_then(|el| el.attribute("name")) {
            named.insert(name.trim().to_string(), id);
        }
    }
    named
}

struct Merge<'a> {
    tree: &'a mut XmlTree,
    unit: String,
    newline: &'static str,
    document: &'a ResourceDocument,
}

impl Merge<'_> {
    fn strings(&mut self) {
        let root = self.tree.root();
        let existing = named_children(self.tree, root, STRING_TAG);
        let document = self.document;
        for (key, text) in document.entries() {
            match existing.get(key) {
                Some(&id) => {
                    if replace_if_changed(self.tree, id, text) {
                        tracing::debug!(
                            "Updated <string name='{}'> in {}",
                            key,
                            document.path().display()
                        );
                    }
                }
                None => {
                    let element = Element::new(STRING_TAG, &[("name", key.as_str())]);
                    let id = append_aligned(
                        self.tree,
                        root,
                        NodeKind::Element(element),
                        self.newline,
                        &self.unit,
                        "",
                    );
                    self.tree.set_inner_xml(id, text);
                    tracing::debug!(
                        "Appended <string name='{}'> to {}",
                        key,
                        document.path().display()
                    );
                }
            }
        }
    }

    fn plurals(&mut self) {
        let root = self.tree.root();
        let existing = named_children(self.tree, root, PLURALS_TAG);
        let document = self.document;
        for (key, forms) in document.groups() {
            match existing.get(key) {
                Some(&id) => {
                    let own_indent =
                        indent_before(self.tree, root, id).unwrap_or_else(|| self.unit.clone());
                    let item_indent = self
                        .tree
                        .leading_whitespace(id)
                        .and_then(indent_of)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{}{}", own_indent, self.unit));
                    self.items(key, id, forms, &item_indent, &own_indent);
                }
                None => {
                    let element = Element::new(PLURALS_TAG, &[("name", key.as_str())]);
                    let id = append_aligned(
                        self.tree,
                        root,
                        NodeKind::Element(element),
                        self.newline,
                        &self.unit,
                        "",
                    );
                    let item_indent = format!("{}{}", self.unit, self.unit);
                    let own_indent = self.unit.clone();
                    self.items(key, id, forms, &item_indent, &own_indent);
                    tracing::debug!(
                        "Appended <plurals name='{}'> to {}",
                        key,
                        document.path().display()
                    );
                }
            }
        }
    }

    fn items(
        &mut self,
        key: &str,
        plurals: NodeId,
        forms: &QuantityMap,
        item_indent: &str,
        closing_indent: &str,
    ) {
        let mut existing: HashMap<QuantityCategory, NodeId> = HashMap::new();
        for id in self.tree.child_elements(plurals, ITEM_TAG) {
            let quantity = self
                .tree
                .element(id)
                .and_then(|el| el.attribute("quantity"))
                .and_then(|q| QuantityCategory::from_str(q).ok());
            if let Some(quantity) = quantity {
                existing.insert(quantity, id);
            }
        }

        for (quantity, text) in forms {
            match existing.get(quantity) {
                Some(&id) => {
                    if replace_if_changed(self.tree, id, text) {
                        tracing::debug!("Updated plural '{}' quantity '{}'", key, quantity);
                    }
                }
                None => {
                    let element = Element::new(ITEM_TAG, &[("quantity", quantity.as_str())]);
                    let id = append_aligned(
                        self.tree,
                        plurals,
                        NodeKind::Element(element),
                        self.newline,
                        item_indent,
                        closing_indent,
                    );
                    self.tree.set_inner_xml(id, text);
                    tracing::debug!("Added plural '{}' quantity '{}'", key, quantity);
                }
            }
        }
    }
}

/// Applies the in-memory state of `document` to `tree` and returns the new file content.
pub fn render(tree: &mut XmlTree, document: &ResourceDocument) -> String {
    let unit = detect_indent(tree);
    let newline = detect_newline(&tree.to_xml_string());
    let mut merge = Merge {
        tree,
        unit,
        newline,
        document,
    };
    merge.strings();
    merge.plurals();
    normalize_declaration(&merge.tree.to_xml_string())
}

/// Writes `document` into its backing file if it has unsaved changes.
///
/// Returns `Ok(false)` without touching the file when the document is clean.
/// On success the document is marked clean.
pub fn flush(document: &mut ResourceDocument) -> Result<bool, Error> {
    if !document.is_dirty() {
        return Ok(false);
    }

    let path = document.path().to_path_buf();
    let mut tree = read_tree(&path).inspect_err(|e| {
        tracing::error!("Error reading XML file {}: {}", path.display(), e);
    })?;
    let content = render(&mut tree, document);
    fs::write(&path, content).inspect_err(|e| {
        tracing::error!("Error writing XML file {}: {}", path.display(), e);
    })?;

    tracing::info!("Updated XML file: {}", path.display());
    document.mark_clean();
    Ok(true)
}
