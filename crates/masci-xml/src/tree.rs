// masci-xml - schema-driven editing of FLEUR input files
//
// Copyright (c) 2025 masci-xml contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mutable XML element tree.
//!
//! Documents are stored in an arena: every node lives in one `Vec` and is
//! addressed by a [`NodeId`]. Detaching a node only unlinks it from its parent,
//! so ids handed out by XPath evaluation stay valid while a setter rearranges
//! the tree. Cloning a tree is a plain `Vec` clone.
//!
//! Whitespace-only text between elements is dropped when parsing and
//! regenerated by the pretty printer, so two documents that differ only in
//! formatting compare equal.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;
use std::io::{BufRead, Cursor};

/// Index of a node in an [`XmlTree`].
pub type NodeId = usize;

/// Content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An element with its attributes in document order.
    Element {
        /// Tag name (including a namespace prefix, if any)
        name: String,
        /// Attributes as `(name, value)` pairs
        attributes: Vec<(String, String)>,
    },
    /// Character data.
    Text(String),
    /// A comment.
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Configuration for parsing XML documents.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// Maximum element nesting depth (default: 100).
    pub max_depth: usize,
    /// Keep comments inside the root element (default: true).
    pub keep_comments: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            keep_comments: true,
        }
    }
}

/// Configuration for XML output.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Pretty-print with indentation
    pub pretty: bool,
    /// Number of spaces per indentation level
    pub indent: usize,
    /// Write the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl WriteConfig {
    /// Single line output without declaration.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            indent: 0,
            declaration: false,
        }
    }
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 3,
            declaration: true,
        }
    }
}

/// An XML document held in an arena of nodes.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl XmlTree {
    /// Create a document consisting of an empty root element.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element {
                    name: root_name.to_string(),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    /// Parse a document from a string with the default configuration.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with(xml, &ReadConfig::default())
    }

    /// Parse a document from a string.
    pub fn parse_with(xml: &str, config: &ReadConfig) -> Result<Self> {
        Self::from_reader(xml.as_bytes(), config)
    }

    /// Parse a document from any buffered reader.
    pub fn from_reader<R: BufRead>(input: R, config: &ReadConfig) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        let mut nodes: Vec<NodeData> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut stack: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| Error::Parse {
                message: e.to_string(),
                position: Some(reader.buffer_position()),
            })?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    if stack.is_empty() && root.is_some() {
                        return Err(Error::Parse {
                            message: "document has more than one root element".to_string(),
                            position: Some(reader.buffer_position()),
                        });
                    }
                    if stack.len() >= config.max_depth {
                        return Err(Error::Parse {
                            message: format!(
                                "element nesting exceeds the maximum depth of {}",
                                config.max_depth
                            ),
                            position: Some(reader.buffer_position()),
                        });
                    }
                    let kind = element_kind(e)?;
                    let id = nodes.len();
                    nodes.push(NodeData {
                        kind,
                        parent: stack.last().copied(),
                        children: Vec::new(),
                    });
                    match stack.last() {
                        Some(&parent) => nodes[parent].children.push(id),
                        None => root = Some(id),
                    }
                    if !is_empty {
                        stack.push(id);
                    }
                }
                Event::End(ref e) => {
                    let closing = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match stack.pop() {
                        Some(open) => {
                            if let NodeKind::Element { name, .. } = &nodes[open].kind {
                                if *name != closing {
                                    return Err(Error::Parse {
                                        message: format!(
                                            "closing tag '{}' does not match '{}'",
                                            closing, name
                                        ),
                                        position: Some(reader.buffer_position()),
                                    });
                                }
                            }
                        }
                        None => {
                            return Err(Error::Parse {
                                message: format!("unexpected closing tag '{}'", closing),
                                position: Some(reader.buffer_position()),
                            })
                        }
                    }
                }
                Event::Text(ref e) => {
                    if let Some(&parent) = stack.last() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::parse(format!("text unescape error: {}", e)))?
                            .into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::Text(text));
                    }
                }
                Event::CData(ref e) => {
                    if let Some(&parent) = stack.last() {
                        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::Text(text));
                    }
                }
                Event::Comment(ref e) => {
                    if let (Some(&parent), true) = (stack.last(), config.keep_comments) {
                        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                        push_leaf(&mut nodes, parent, NodeKind::Comment(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::parse("unexpected end of document, unclosed elements"));
        }
        let root = root.ok_or_else(|| Error::parse("document has no root element"))?;
        Ok(Self { nodes, root })
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Content of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    /// Tag name of an element, `None` for text and comments.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Element { .. })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// All child nodes including text and comments.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Child elements in document order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    /// Child elements with the given tag name.
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.element_children(id)
            .filter(|&c| self.name(c) == Some(name))
            .collect()
    }

    /// First child element with the given tag name.
    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(id).find(|&c| self.name(c) == Some(name))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes of an element, empty for other nodes.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Set (or add) an attribute. Does nothing for non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id].kind {
            let value = value.into();
            match attributes.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value,
                None => attributes.push((name.to_string(), value)),
            }
        }
    }

    /// Remove an attribute and return its old value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id].kind {
            let index = attributes.iter().position(|(key, _)| key == name)?;
            return Some(attributes.remove(index).1);
        }
        None
    }

    /// Rename an element.
    pub fn rename(&mut self, id: NodeId, new_name: &str) {
        if let NodeKind::Element { name, .. } = &mut self.nodes[id].kind {
            *name = new_name.to_string();
        }
    }

    /// Leading text of an element (the text before its first child element).
    pub fn text(&self, id: NodeId) -> Option<&str> {
        let first = *self.nodes[id].children.first()?;
        match &self.nodes[first].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Replace the leading text of an element.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        if let Some(&first) = self.nodes[id].children.first() {
            if let NodeKind::Text(existing) = &mut self.nodes[first].kind {
                *existing = text;
                return;
            }
        }
        let node = self.alloc(NodeKind::Text(text));
        self.insert_child(id, 0, node);
    }

    /// Allocate a detached element.
    pub fn new_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append a detached node as last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Insert a node at `index` of the (full) child list of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let index = index.min(self.nodes[parent].children.len());
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(index, child);
    }

    /// Insert `node` directly after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        if let (Some(parent), Some(index)) = (self.parent(sibling), self.position(sibling)) {
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Unlink a node from its parent. The node and its subtree stay allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Put `new` at the position of `old` and detach `old`. Neighbouring text
    /// nodes are untouched.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) {
        match (self.parent(old), self.position(old)) {
            (Some(parent), Some(index)) => {
                self.detach(old);
                self.insert_child(parent, index, new);
            }
            _ => {
                if old == self.root {
                    self.detach(new);
                    self.root = new;
                }
            }
        }
    }

    /// Position of a node in its parent's child list.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id].parent?;
        self.nodes[parent].children.iter().position(|&c| c == id)
    }

    /// Whether the node is still reachable from the root.
    pub fn is_attached(&self, mut id: NodeId) -> bool {
        loop {
            if id == self.root {
                return true;
            }
            match self.nodes[id].parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Detached deep copy of a subtree of this tree.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id].kind.clone();
        let copy = self.alloc(kind);
        let children = self.nodes[id].children.clone();
        for child in children {
            let child_copy = self.deep_copy(child);
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        copy
    }

    /// Detached deep copy of a subtree of another tree.
    pub fn import(&mut self, other: &XmlTree, id: NodeId) -> NodeId {
        let copy = self.alloc(other.nodes[id].kind.clone());
        for &child in &other.nodes[id].children {
            let child_copy = self.import(other, child);
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        copy
    }

    /// Copy a subtree into a standalone document.
    pub fn subtree(&self, id: NodeId) -> XmlTree {
        let mut tree = XmlTree {
            nodes: Vec::new(),
            root: 0,
        };
        tree.root = tree.import(self, id);
        tree
    }

    /// Copy of the document without the nodes detached by earlier edits.
    /// Node ids are renumbered.
    pub fn compacted(&self) -> XmlTree {
        self.subtree(self.root)
    }

    /// Number of allocated nodes, detached ones included.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// The node and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current].children.iter().rev());
        }
        out
    }

    /// Rank of every attached node in document order (`usize::MAX` for
    /// detached nodes).
    pub(crate) fn document_order(&self) -> Vec<usize> {
        let mut ranks = vec![usize::MAX; self.nodes.len()];
        for (rank, id) in self.descendants(self.root).into_iter().enumerate() {
            ranks[id] = rank;
        }
        ranks
    }

    /// Serialize the document.
    pub fn to_xml_string(&self, config: &WriteConfig) -> Result<String> {
        self.subtree_to_string(self.root, config)
    }

    /// Serialize one element with its subtree.
    pub fn subtree_to_string(&self, id: NodeId, config: &WriteConfig) -> Result<String> {
        let mut writer = if config.pretty {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', config.indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        if config.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(write_error)?;
        }
        self.write_node(&mut writer, id)?;

        let mut bytes = writer.into_inner().into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| Error::parse(format!("invalid UTF-8 in output: {}", e)))
    }

    fn write_node<W: std::io::Write>(&self, writer: &mut Writer<W>, id: NodeId) -> Result<()> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, attributes } => {
                let mut start = BytesStart::new(name.as_str());
                for (key, value) in attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if self.nodes[id].children.is_empty() {
                    writer.write_event(Event::Empty(start)).map_err(write_error)?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(write_error)?;
                    for &child in &self.nodes[id].children {
                        self.write_node(writer, child)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(write_error)?;
                }
            }
            NodeKind::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_error)?;
            }
            NodeKind::Comment(text) => {
                writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                    .map_err(write_error)?;
            }
        }
        Ok(())
    }

    fn subtree_eq(&self, id: NodeId, other: &XmlTree, other_id: NodeId) -> bool {
        let (a, b) = (&self.nodes[id], &other.nodes[other_id]);
        a.kind == b.kind
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(&x, &y)| self.subtree_eq(x, other, y))
    }
}

/// Structural equality of the attached documents, ignoring detached nodes.
impl PartialEq for XmlTree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

/// Compact single-line form without declaration.
impl fmt::Display for XmlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .to_xml_string(&WriteConfig::compact())
            .map_err(|_| fmt::Error)?;
        f.write_str(text.trim_end())
    }
}

impl std::str::FromStr for XmlTree {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn element_kind(start: &BytesStart) -> Result<NodeKind> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::parse(format!("malformed attribute in <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::parse(format!("attribute unescape error: {}", e)))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(NodeKind::Element { name, attributes })
}

fn push_leaf(nodes: &mut Vec<NodeData>, parent: NodeId, kind: NodeKind) {
    let id = nodes.len();
    nodes.push(NodeData {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent].children.push(id);
}

fn write_error(err: quick_xml::Error) -> Error {
    Error::parse(format!("failed to write XML: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"<?xml version="1.0"?>
<root version="1">
   <a x="1"/>
   <!-- note -->
   <b>text &amp; more</b>
   <a x="2"><c/></a>
</root>"#;

    #[test]
    fn test_parse_structure() {
        let tree = XmlTree::parse(SMALL).unwrap();
        let root = tree.root();
        assert_eq!(tree.name(root), Some("root"));
        assert_eq!(tree.attribute(root, "version"), Some("1"));
        let names: Vec<_> = tree
            .element_children(root)
            .map(|c| tree.name(c).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        let b = tree.first_child_named(root, "b").unwrap();
        assert_eq!(tree.text(b), Some("text & more"));
    }

    #[test]
    fn test_whitespace_does_not_affect_equality() {
        let compact = r#"<root version="1"><a x="1"/><!-- note --><b>text &amp; more</b><a x="2"><c/></a></root>"#;
        assert_eq!(XmlTree::parse(SMALL).unwrap(), XmlTree::parse(compact).unwrap());
    }

    #[test]
    fn test_serialize_and_reparse() {
        let tree = XmlTree::parse(SMALL).unwrap();
        let text = tree.to_xml_string(&WriteConfig::default()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<b>text &amp; more</b>"));
        assert_eq!(XmlTree::parse(&text).unwrap(), tree);
    }

    #[test]
    fn test_attribute_editing() {
        let mut tree = XmlTree::parse(SMALL).unwrap();
        let a = tree.first_child_named(tree.root(), "a").unwrap();
        tree.set_attribute(a, "x", "5");
        tree.set_attribute(a, "y", "6");
        assert_eq!(tree.attribute(a, "x"), Some("5"));
        assert_eq!(tree.attributes(a).len(), 2);
        assert_eq!(tree.remove_attribute(a, "x"), Some("5".to_string()));
        assert_eq!(tree.remove_attribute(a, "x"), None);
    }

    #[test]
    fn test_set_text_creates_leading_text() {
        let mut tree = XmlTree::parse("<r><a><c/></a></r>").unwrap();
        let a = tree.first_child_named(tree.root(), "a").unwrap();
        assert_eq!(tree.text(a), None);
        tree.set_text(a, "hello");
        assert_eq!(tree.text(a), Some("hello"));
        tree.set_text(a, "again");
        assert_eq!(tree.text(a), Some("again"));
        assert_eq!(tree.children(a).len(), 2);
    }

    #[test]
    fn test_insert_detach_and_replace() {
        let mut tree = XmlTree::parse("<r><a/><b/></r>").unwrap();
        let root = tree.root();
        let new = tree.new_element("n");
        tree.insert_child(root, 1, new);
        let names: Vec<_> = tree.element_children(root).map(|c| tree.name(c).unwrap()).collect();
        assert_eq!(names, vec!["a", "n", "b"]);

        let b = tree.first_child_named(root, "b").unwrap();
        let replacement = tree.new_element("z");
        tree.replace_node(b, replacement);
        assert!(!tree.is_attached(b));
        assert_eq!(tree, XmlTree::parse("<r><a/><n/><z/></r>").unwrap());

        tree.detach(new);
        assert_eq!(tree, XmlTree::parse("<r><a/><z/></r>").unwrap());
    }

    #[test]
    fn test_compacted_drops_detached_nodes() {
        let mut tree = XmlTree::parse("<r><a><b/><c/></a><d x=\"1\"/></r>").unwrap();
        let before = tree.allocated();
        let a = tree.first_child_named(tree.root(), "a").unwrap();
        tree.detach(a);
        assert_eq!(tree.allocated(), before);

        let compact = tree.compacted();
        assert_eq!(compact, tree);
        assert_eq!(compact.allocated(), before - 3);
        assert_eq!(compact.root(), 0);
        let d = compact.first_child_named(compact.root(), "d").unwrap();
        assert_eq!(compact.attribute(d, "x"), Some("1"));
    }

    #[test]
    fn test_deep_copy_and_import() {
        let mut tree = XmlTree::parse("<r><a x=\"1\"><c>t</c></a></r>").unwrap();
        let a = tree.first_child_named(tree.root(), "a").unwrap();
        let copy = tree.deep_copy(a);
        tree.set_attribute(copy, "x", "2");
        tree.insert_after(a, copy);
        assert_eq!(
            tree,
            XmlTree::parse("<r><a x=\"1\"><c>t</c></a><a x=\"2\"><c>t</c></a></r>").unwrap()
        );

        let fragment = XmlTree::parse("<d><e/></d>").unwrap();
        let imported = tree.import(&fragment, fragment.root());
        tree.append_child(tree.root(), imported);
        assert_eq!(tree.children_named(tree.root(), "d").len(), 1);
        assert_eq!(tree.subtree(imported), fragment);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(XmlTree::parse("<r><a></r>").is_err());
        assert!(XmlTree::parse("<r/><s/>").is_err());
        assert!(XmlTree::parse("").is_err());
        assert!(XmlTree::parse("<r><a>").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let config = ReadConfig {
            max_depth: 3,
            ..Default::default()
        };
        assert!(XmlTree::parse_with("<a><b><c/></b></a>", &config).is_ok());
        let err = XmlTree::parse_with("<a><b><c><d/></c></b></a>", &config).unwrap_err();
        assert!(err.to_string().contains("maximum depth"));
    }

    #[test]
    fn test_compact_output() {
        let tree = XmlTree::parse(SMALL).unwrap();
        let text = tree.to_xml_string(&WriteConfig::compact()).unwrap();
        assert_eq!(
            text.trim_end(),
            r#"<root version="1"><a x="1"/><!-- note --><b>text &amp; more</b><a x="2"><c/></a></root>"#
        );
        assert_eq!(tree.to_string(), text.trim_end());
    }
}
