//! Shortcuts document tree
//!
//! Thin, arena-owned labeled tree over the shortcuts XML file. Every element
//! becomes a [`Node`] stored in a flat table and addressed by a copyable
//! [`NodeId`], so node identity can be used as a set key without borrowing
//! the tree. Parent links are plain ids and are only used for traversal.
//!
//! The resolution engine never mutates a loaded document.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Element names understood by the resolver (case-sensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum Tag {
    Define,
    Profile,
    List,
    Shortcut,
    Path,
    Params,
}

/// Attribute names understood by the resolver (case-sensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Attr {
    Name,
    Value,
    Inherits,
}

/// Stable handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single element of the document
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<NodeId>,
    text: String,
    parent: Option<NodeId>,
}

impl Node {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Text content directly owned by this element (not descendants)
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Errors raised while reading the XML text into a [`Document`]
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("unexpected closing tag </{0}>")]
    UnbalancedEnd(String),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("could not read shortcuts file")]
    Io(#[from] std::io::Error),
}

/// Arena-owned element tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document holding a single root element
    pub fn new(root_tag: impl Into<String>) -> Self {
        let root = Node {
            tag: root_tag.into(),
            ..Node::default()
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Load and parse a shortcuts file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded {} bytes from {:?}", content.len(), path.as_ref());
        content.parse()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new child element and return its handle
    pub fn append_child(&mut self, parent: NodeId, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.into(),
            parent: Some(parent),
            ..Node::default()
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[id.0].attributes.insert(name.into(), value.into());
    }

    /// Builder helper: `set_attribute` that hands the id back
    pub fn with_attribute(&mut self, id: NodeId, name: Attr, value: impl Into<String>) -> NodeId {
        self.set_attribute(id, name.as_ref(), value);
        id
    }

    pub fn push_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text.push_str(text);
    }

    /// Raw (unexpanded) attribute value
    pub fn attribute(&self, id: NodeId, name: Attr) -> Option<&str> {
        self.node(id).attributes.get(name.as_ref()).map(String::as_str)
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Every direct child element, in document order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().copied()
    }

    /// Direct child elements with the given tag, in document order
    pub fn children_tagged(&self, id: NodeId, tag: Tag) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |&child| self.tag(child) == tag.as_ref())
    }

    pub fn first_child_tagged(&self, id: NodeId, tag: Tag) -> Option<NodeId> {
        self.children_tagged(id, tag).next()
    }

    /// Concatenated text of the element and all of its descendants
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push_str(&node.text);
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Label used in diagnostics: the `name` attribute, else the tag
    pub fn debug_name(&self, id: NodeId) -> &str {
        self.attribute(id, Attr::Name).unwrap_or_else(|| self.tag(id))
    }

    /// Dotted label path from the root down to `id`, e.g. `Shortcuts.Dev.Editor`
    pub fn node_path(&self, id: NodeId) -> String {
        let mut labels = vec![self.debug_name(id)];
        let mut current = self.parent(id);
        while let Some(node) = current {
            labels.push(self.debug_name(node));
            current = self.parent(node);
        }
        labels.reverse();
        labels.join(".")
    }

    fn open_element(
        &mut self,
        parent: Option<NodeId>,
        start: &BytesStart<'_>,
        position: u64,
    ) -> Result<NodeId, ParseError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let id = match parent {
            Some(parent) => self.append_child(parent, tag),
            None => {
                self.nodes[0].tag = tag;
                self.root
            }
        };

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::Xml {
                position,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| ParseError::Xml {
                position,
                message: e.to_string(),
            })?;
            self.set_attribute(id, key, value.into_owned());
        }

        Ok(id)
    }
}

impl std::str::FromStr for Document {
    type Err = ParseError;

    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        // Text is kept verbatim; only whitespace-only runs between elements
        // are dropped
        let mut reader = Reader::from_str(xml);

        let mut doc = Document::new(String::new());
        let mut stack: Vec<NodeId> = Vec::new();
        let mut seen_root = false;

        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    if stack.is_empty() && seen_root {
                        return Err(ParseError::Xml {
                            position,
                            message: "multiple root elements".to_string(),
                        });
                    }
                    let id = doc.open_element(stack.last().copied(), e, position)?;
                    seen_root = true;
                    stack.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    if stack.is_empty() && seen_root {
                        return Err(ParseError::Xml {
                            position,
                            message: "multiple root elements".to_string(),
                        });
                    }
                    doc.open_element(stack.last().copied(), e, position)?;
                    seen_root = true;
                }
                Ok(Event::End(ref e)) => {
                    if stack.pop().is_none() {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        return Err(ParseError::UnbalancedEnd(name));
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(&current) = stack.last() {
                        let text = t.unescape().map_err(|e| ParseError::Xml {
                            position,
                            message: e.to_string(),
                        })?;
                        if !text.trim().is_empty() {
                            doc.push_text(current, &text);
                        }
                    }
                }
                Ok(Event::CData(ref c)) => {
                    if let Some(&current) = stack.last() {
                        let text = String::from_utf8_lossy(c).into_owned();
                        doc.push_text(current, &text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(&open) = stack.last() {
            return Err(ParseError::Unclosed(doc.tag(open).to_string()));
        }
        if !seen_root {
            return Err(ParseError::NoRootElement);
        }

        Ok(doc)
    }
}
