//! Lossless XML node arena used to edit `strings.xml` files in place.
//!
//! Every node keeps its raw source text (tag content, attribute quoting,
//! whitespace, comments, entity references) so that serializing an unmodified
//! tree reproduces the input byte for byte. Nodes live in a flat arena and are
//! addressed by [`NodeId`] handles that stay valid for the lifetime of the tree.

use std::io::{BufRead, Read};

use quick_xml::{Reader, escape::escape, escape::partial_escape, events::Event};

use crate::{error::Error, traits::Parser};

const FRAGMENT_WRAPPER: &str = "__stringsync_fragment__";

/// Stable handle to a node inside an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Raw content of the start tag (`string name="a"`), `None` for created elements.
    raw_start: Option<String>,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

impl Element {
    pub fn new(name: &str, attributes: &[(&str, &str)]) -> Self {
        Element {
            name: name.to_string(),
            raw_start: None,
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            self_closing: false,
        }
    }

    /// Unescaped value of attribute `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn from_tag(tag: &quick_xml::events::BytesStart, self_closing: bool) -> Result<Self, Error> {
        let name = utf8(tag.name().as_ref())?;
        let mut attributes = Vec::new();
        for attr in tag.attributes().with_checks(false) {
            let attr = attr.map_err(|e| Error::InvalidResource(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr.unescape_value()?.to_string();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            raw_start: Some(utf8(tag)?),
            attributes,
            self_closing,
        })
    }

    fn write_start(&self, out: &mut String) {
        out.push('<');
        match &self.raw_start {
            Some(raw) => out.push_str(raw),
            None => {
                out.push_str(&self.name);
                for (key, value) in &self.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    /// Character data exactly as written in the source (entities not expanded).
    Text(String),
    CData(String),
    Comment(String),
    /// The `<?xml ...?>` declaration, raw content between `<?` and `?>`.
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
    line: Option<usize>,
}

/// A parsed XML document: top-level nodes plus the single root element.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<Node>,
    top: Vec<NodeId>,
    root: NodeId,
}

fn utf8(bytes: &[u8]) -> Result<String, Error> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::InvalidResource(format!("invalid UTF-8: {}", e)))
}

/// Byte offsets at which each line starts.
fn line_starts_of(text: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(256);
    starts.push(0);
    for (i, b) in text.as_bytes().iter().enumerate() {
        if *b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line containing byte `pos`.
fn byte_pos_to_line(pos: usize, starts: &[usize]) -> usize {
    starts.partition_point(|&s| s <= pos).max(1)
}

/// Nodes read from a source, before they are attached to a tree.
struct ParsedNodes {
    nodes: Vec<Node>,
    top: Vec<NodeId>,
}

fn parse_nodes(text: &str) -> Result<ParsedNodes, Error> {
    let mut reader = Reader::from_str(text);
    let line_starts = line_starts_of(text);

    let mut nodes: Vec<Node> = Vec::new();
    let mut top: Vec<NodeId> = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        let offset = reader.buffer_position() as usize;
        let kind = match reader.read_event()? {
            Event::Start(e) => NodeKind::Element(Element::from_tag(&e, false)?),
            Event::Empty(e) => NodeKind::Element(Element::from_tag(&e, true)?),
            Event::End(e) => {
                if stack.pop().is_none() {
                    return Err(Error::InvalidResource(format!(
                        "unexpected closing tag `{}`",
                        utf8(e.name().as_ref())?
                    )));
                }
                continue;
            }
            Event::Text(e) => {
                // Rejects bare `&` and undefined entities up front.
                e.unescape()?;
                NodeKind::Text(utf8(&e)?)
            }
            Event::CData(e) => NodeKind::CData(utf8(&e)?),
            Event::Comment(e) => NodeKind::Comment(utf8(&e)?),
            Event::Decl(e) => NodeKind::Declaration(utf8(&e)?),
            Event::PI(e) => NodeKind::ProcessingInstruction(utf8(&e)?),
            Event::DocType(e) => NodeKind::DocType(utf8(&e)?),
            Event::Eof => break,
        };

        let opens = matches!(&kind, NodeKind::Element(el) if !el.self_closing);
        let id = NodeId(nodes.len());
        nodes.push(Node {
            kind,
            children: Vec::new(),
            line: Some(byte_pos_to_line(offset, &line_starts)),
        });
        match stack.last() {
            Some(parent) => nodes[parent.0].children.push(id),
            None => top.push(id),
        }
        if opens {
            stack.push(id);
        }
    }

    if let Some(open) = stack.last() {
        let name = match &nodes[open.0].kind {
            NodeKind::Element(el) => el.name.clone(),
            _ => String::new(),
        };
        return Err(Error::InvalidResource(format!("unclosed element `{}`", name)));
    }

    Ok(ParsedNodes { nodes, top })
}

impl XmlTree {
    /// Parses a complete document. Fails on mismatched or unclosed tags and on
    /// documents without exactly one root element.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let parsed = parse_nodes(text)?;
        let roots: Vec<NodeId> = parsed
            .top
            .iter()
            .copied()
            .filter(|id| matches!(parsed.nodes[id.0].kind, NodeKind::Element(_)))
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err(Error::InvalidResource("no root element".to_string())),
            _ => return Err(Error::InvalidResource("multiple root elements".to_string())),
        };
        Ok(XmlTree {
            nodes: parsed.nodes,
            top: parsed.top,
            root,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// 1-based source line of the node, `None` for nodes created after parsing.
    pub fn line(&self, id: NodeId) -> Option<usize> {
        self.nodes[id.0].line
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements of `id` named `name`, in document order.
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.element(*child).is_some_and(|el| el.name == name))
    }

    fn is_whitespace_text(&self, id: NodeId) -> bool {
        matches!(&self.nodes[id.0].kind, NodeKind::Text(t) if t.trim().is_empty())
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
            line: None,
        });
        id
    }

    /// Appends a new node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push(kind);
        self.nodes[parent.0].children.push(id);
        if let NodeKind::Element(el) = &mut self.nodes[parent.0].kind {
            el.self_closing = false;
        }
        id
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> NodeId {
        let id = self.push(kind);
        self.nodes[parent.0].children.insert(index, id);
        id
    }

    /// Whitespace that follows `child` inside `parent`, if the next sibling is text.
    pub fn trailing_whitespace(&self, parent: NodeId, child: NodeId) -> Option<&str> {
        let children = self.children(parent);
        let pos = children.iter().position(|c| *c == child)?;
        match children.get(pos + 1).map(|next| &self.nodes[next.0].kind) {
            Some(NodeKind::Text(t)) => {
                let trimmed = t.trim_end();
                Some(&t[trimmed.len()..])
            }
            _ => None,
        }
    }

    /// Replaces the whitespace that follows `child` with `ws`, inserting a text node if needed.
    pub fn set_trailing_whitespace(&mut self, parent: NodeId, child: NodeId, ws: &str) {
        let Some(pos) = self.children(parent).iter().position(|c| *c == child) else {
            return;
        };
        let next = self.children(parent).get(pos + 1).copied();
        match next {
            Some(next) if matches!(self.nodes[next.0].kind, NodeKind::Text(_)) => {
                if let NodeKind::Text(t) = &mut self.nodes[next.0].kind {
                    let kept = t.trim_end().len();
                    t.truncate(kept);
                    t.push_str(ws);
                }
            }
            _ => {
                self.insert_child(parent, pos + 1, NodeKind::Text(ws.to_string()));
            }
        }
    }

    /// Whitespace between the start tag of `parent` and its first non-text child.
    pub fn leading_whitespace(&self, parent: NodeId) -> Option<&str> {
        let first = *self.children(parent).first()?;
        match &self.nodes[first.0].kind {
            NodeKind::Text(t) => {
                let content_start = t.len() - t.trim_start().len();
                Some(&t[..content_start])
            }
            _ => None,
        }
    }

    /// Replaces the whitespace before the first child of `parent` with `ws`.
    pub fn set_leading_whitespace(&mut self, parent: NodeId, ws: &str) {
        let first = self.children(parent).first().copied();
        match first {
            Some(first) if self.is_whitespace_text(first) => {
                self.nodes[first.0].kind = NodeKind::Text(ws.to_string());
            }
            _ => {
                self.insert_child(parent, 0, NodeKind::Text(ws.to_string()));
            }
        }
    }

    /// Serialized markup of everything between the start and end tag of `id`, trimmed.
    pub fn inner_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out.trim().to_string()
    }

    /// Replaces the children of `id` with `content`.
    ///
    /// Well-formed markup is grafted as nodes so nested tags survive; anything
    /// else is stored as escaped text.
    pub fn set_inner_xml(&mut self, id: NodeId, content: &str) {
        let content = content.trim();
        self.nodes[id.0].children.clear();
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            el.self_closing = false;
        }
        if content.is_empty() {
            return;
        }

        let wrapped = format!("<{0}>{1}</{0}>", FRAGMENT_WRAPPER, content);
        match XmlTree::parse(&wrapped) {
            Ok(fragment) => {
                for child in fragment.children(fragment.root()).to_vec() {
                    let grafted = self.graft(&fragment, child);
                    self.nodes[id.0].children.push(grafted);
                }
            }
            Err(e) => {
                tracing::debug!("content is not well-formed markup ({}), storing as text", e);
                let text = partial_escape(content).into_owned();
                let text_id = self.push(NodeKind::Text(text));
                self.nodes[id.0].children.push(text_id);
            }
        }
    }

    /// Deep-copies `node` from `other` into this arena, returning the new handle.
    fn graft(&mut self, other: &XmlTree, node: NodeId) -> NodeId {
        let id = self.push(other.nodes[node.0].kind.clone());
        for child in other.children(node).to_vec() {
            let grafted = self.graft(other, child);
            self.nodes[id.0].children.push(grafted);
        }
        id
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Element(el) => {
                el.write_start(out);
                if el.self_closing && node.children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Declaration(t) | NodeKind::ProcessingInstruction(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            NodeKind::DocType(t) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(t.trim_start());
                out.push('>');
            }
        }
    }

    /// Serializes the whole document.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for id in &self.top {
            self.write_node(*id, &mut out);
        }
        out
    }
}

impl Parser for XmlTree {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        XmlTree::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        <?xml version='1.0' encoding='utf-8'?>
        <!-- generated by hand -->
        <resources xmlns:tools="http://schemas.android.com/tools">
          <string name="hello" tools:ignore="MissingTranslation">Hello &amp; welcome</string>
          <string name="styled">Tap <b>here</b>, <i>now</i></string>
          <string name="empty"/>
          <plurals name="days">
            <item quantity="one">%d day</item>
            <item quantity='other'>%d days</item>
          </plurals>
        </resources>
    "#};

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        assert_eq!(tree.to_xml_string(), SAMPLE);
    }

    #[test]
    fn test_attributes_are_unescaped_and_looked_up() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let root = tree.root();
        let hello = tree.child_elements(root, "string").next().unwrap();
        let el = tree.element(hello).unwrap();
        assert_eq!(el.attribute("name"), Some("hello"));
        assert_eq!(el.attribute("tools:ignore"), Some("MissingTranslation"));
        assert_eq!(el.attribute("translatable"), None);
    }

    #[test]
    fn test_inner_xml_keeps_nested_markup() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let strings: Vec<NodeId> = tree.child_elements(tree.root(), "string").collect();
        assert_eq!(tree.inner_xml(strings[0]), "Hello &amp; welcome");
        assert_eq!(tree.inner_xml(strings[1]), "Tap <b>here</b>, <i>now</i>");
        assert_eq!(tree.inner_xml(strings[2]), "");
    }

    #[test]
    fn test_lines_are_recorded() {
        let tree = XmlTree::parse(SAMPLE).unwrap();
        let hello = tree.child_elements(tree.root(), "string").next().unwrap();
        assert_eq!(tree.line(tree.root()), Some(3));
        assert_eq!(tree.line(hello), Some(4));
    }

    #[test]
    fn test_set_inner_xml_with_markup() {
        let mut tree = XmlTree::parse(SAMPLE).unwrap();
        let hello = tree.child_elements(tree.root(), "string").next().unwrap();
        tree.set_inner_xml(hello, "  Hola <b>mundo</b> ");
        assert_eq!(tree.inner_xml(hello), "Hola <b>mundo</b>");
        assert!(tree.to_xml_string().contains(
            r#"<string name="hello" tools:ignore="MissingTranslation">Hola <b>mundo</b></string>"#
        ));
    }

    #[test]
    fn test_set_inner_xml_falls_back_to_escaped_text() {
        let mut tree = XmlTree::parse(SAMPLE).unwrap();
        let hello = tree.child_elements(tree.root(), "string").next().unwrap();
        tree.set_inner_xml(hello, "Tom & Jerry <3");
        assert_eq!(tree.inner_xml(hello), "Tom &amp; Jerry &lt;3");
    }

    #[test]
    fn test_self_closing_element_gets_content() {
        let mut tree = XmlTree::parse(SAMPLE).unwrap();
        let empty = tree.child_elements(tree.root(), "string").nth(2).unwrap();
        tree.set_inner_xml(empty, "Now filled");
        assert!(
            tree.to_xml_string()
                .contains(r#"<string name="empty">Now filled</string>"#)
        );
    }

    #[test]
    fn test_append_created_element() {
        let mut tree = XmlTree::parse("<resources></resources>").unwrap();
        let root = tree.root();
        let id = tree.append_child(
            root,
            NodeKind::Element(Element::new("string", &[("name", "a\"b")])),
        );
        tree.set_inner_xml(id, "Value");
        assert_eq!(
            tree.to_xml_string(),
            r#"<resources><string name="a&quot;b">Value</string></resources>"#
        );
    }

    #[test]
    fn test_whitespace_helpers() {
        let mut tree = XmlTree::parse("<resources>\n  <a/>\n</resources>").unwrap();
        let root = tree.root();
        let a = tree.child_elements(root, "a").next().unwrap();
        assert_eq!(tree.leading_whitespace(root), Some("\n  "));
        assert_eq!(tree.trailing_whitespace(root, a), Some("\n"));

        tree.set_trailing_whitespace(root, a, "\n    ");
        tree.set_leading_whitespace(root, "\n    ");
        assert_eq!(tree.to_xml_string(), "<resources>\n    <a/>\n    </resources>");
    }

    #[test]
    fn test_trailing_whitespace_inserted_when_missing() {
        let mut tree = XmlTree::parse("<resources><a/></resources>").unwrap();
        let root = tree.root();
        let a = tree.child_elements(root, "a").next().unwrap();
        assert_eq!(tree.trailing_whitespace(root, a), None);
        tree.set_trailing_whitespace(root, a, "\n");
        assert_eq!(tree.to_xml_string(), "<resources><a/>\n</resources>");
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(XmlTree::parse("<resources><string name=\"a\">x</plurals></resources>").is_err());
    }

    #[test]
    fn test_unclosed_root_fails() {
        assert!(XmlTree::parse("<resources><string name=\"a\">x</string>").is_err());
    }

    #[test]
    fn test_missing_root_fails() {
        let err = XmlTree::parse("<?xml version=\"1.0\"?>\n").unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_bare_ampersand_fails() {
        assert!(XmlTree::parse("<resources><string name=\"a\">Tom & Jerry</string></resources>").is_err());
    }

    #[test]
    fn test_read_from_strips_utf8_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strings.xml");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<resources><string name=\"a\">A</string></resources>");
        std::fs::write(&path, bytes).unwrap();

        let tree = XmlTree::read_from(&path).unwrap();
        assert_eq!(
            tree.to_xml_string(),
            "<resources><string name=\"a\">A</string></resources>"
        );
    }
}
