//! Arena-backed XML document.
//!
//! Every node lives in one `Vec` and is addressed by a [`NodeId`] handle, so structural edits
//! (remove, empty, insert-after) stay well-defined while the tree is reshaped across passes.
//! Detached nodes keep their handle and can be re-inserted elsewhere.
//!
//! Parsed elements remember their original start-tag markup and every text/comment node keeps
//! its escaped source text, which makes serialization of untouched regions byte-identical.

use crate::error::{XmlError, XmlResult};
use crate::query::{ElementLike, local_name_of};
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

const BOM: char = '\u{feff}';

/// The synthetic document node; parent of the prolog, the root element and trailing nodes.
const DOCUMENT: NodeId = NodeId(0);

/// Stable handle to a node of one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A name/value pair. Values are stored unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    name: String,
    attributes: Vec<Attribute>,
    /// Original markup between `<` and `>` (or `/>`), `None` for built elements.
    raw_tag: Option<String>,
    self_closing: bool,
}

impl ElementData {
    /// Qualified name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    /// Escaped character data exactly as written.
    Text(String),
    Comment(String),
    CData(String),
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owned, mutable XML tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    bom: bool,
}

impl Document {
    /// Parse a complete document. A leading UTF-8 byte order mark is remembered and re-emitted.
    pub fn parse(input: &str) -> XmlResult<Self> {
        let (bom, text) = match input.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let mut doc = Document {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: DOCUMENT,
            bom,
        };

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack = vec![DOCUMENT];
        loop {
            let event = reader.read_event().map_err(|e| XmlError::Syntax {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;
            let parent = stack.last().copied().unwrap_or(DOCUMENT);

            match event {
                Event::Start(e) => {
                    let id = doc.push(parent, NodeKind::Element(parsed_element(&e, false)?));
                    stack.push(id);
                }
                Event::Empty(e) => {
                    doc.push(parent, NodeKind::Element(parsed_element(&e, true)?));
                }
                Event::End(e) => {
                    if stack.len() <= 1 {
                        return Err(XmlError::UnexpectedEnd {
                            name: utf8(e.name().as_ref())?,
                        });
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    doc.push(parent, NodeKind::Text(utf8(&e)?));
                }
                Event::CData(e) => {
                    doc.push(parent, NodeKind::CData(utf8(&e)?));
                }
                Event::Comment(e) => {
                    doc.push(parent, NodeKind::Comment(utf8(&e)?));
                }
                Event::Decl(e) => {
                    doc.push(parent, NodeKind::Declaration(utf8(&e)?));
                }
                Event::PI(e) => {
                    doc.push(parent, NodeKind::ProcessingInstruction(utf8(&e)?));
                }
                Event::DocType(e) => {
                    doc.push(parent, NodeKind::DocType(utf8(&e)?));
                }
                Event::Eof => break,
            }
        }

        if let Some(&open) = stack.get(1) {
            let name = doc
                .element_data(open)
                .map(|el| el.name.clone())
                .unwrap_or_default();
            return Err(XmlError::Unclosed { name });
        }

        let roots: Vec<NodeId> = doc.nodes[DOCUMENT.0]
            .children
            .iter()
            .copied()
            .filter(|&id| doc.element_data(id).is_some())
            .collect();
        match roots.as_slice() {
            [] => return Err(XmlError::NoRoot),
            [root] => doc.root = *root,
            _ => return Err(XmlError::MultipleRoots),
        }

        debug!(nodes = doc.nodes.len(), "parsed xml document");
        Ok(doc)
    }

    /// Serialize the tree. Parsed nodes that were not edited come out exactly as read.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push(BOM);
        }
        for &child in &self.nodes[DOCUMENT.0].children {
            self.write_node(child, &mut out);
        }
        out
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_element(&self) -> ElementRef<'_> {
        ElementRef {
            doc: self,
            id: self.root,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    /// A read-only element view, or `None` when `id` is not an element.
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.element_data(id)?;
        Some(ElementRef { doc: self, id })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent.filter(|&p| p != DOCUMENT)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// True when the node can be reached from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == DOCUMENT {
                return true;
            }
            match self.nodes.get(current.0).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.position(id)?;
        idx.checked_sub(1).map(|i| self.nodes[parent.0].children[i])
    }

    /// Whitespace-only text node.
    pub fn is_blank_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(t)) if t.trim().is_empty())
    }

    /// Create a detached element with the given attributes; it serializes as `<name ... />`.
    pub fn create_element(&mut self, name: &str, attributes: Vec<Attribute>) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            name: name.to_string(),
            attributes,
            raw_tag: None,
            self_closing: true,
        }))
    }

    /// Create a detached text node. `text` is escaped on the way in.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(escape(text).into_owned()))
    }

    /// Unlink a node from its parent. The node and its subtree stay addressable.
    pub fn remove(&mut self, id: NodeId) {
        if let Some((parent, idx)) = self.position(id) {
            self.nodes[parent.0].children.remove(idx);
            self.nodes[id.0].parent = None;
        }
    }

    /// Remove a node together with the whitespace-only text node right before it, so the
    /// surrounding indentation does not pile up.
    pub fn remove_with_indentation(&mut self, id: NodeId) {
        if let Some(prev) = self.previous_sibling(id)
            && self.is_blank_text(prev)
        {
            self.remove(prev);
        }
        self.remove(id);
    }

    /// Drop all content of an element (text and children), keeping the element and its
    /// attributes. Returns whether anything changed; a second call is a no-op.
    pub fn make_empty(&mut self, id: NodeId) -> XmlResult<bool> {
        let node = self.nodes.get_mut(id.0).ok_or(XmlError::UnknownNode(id.0))?;
        let NodeKind::Element(el) = &mut node.kind else {
            return Ok(false);
        };

        let changed = !node.children.is_empty() || !el.self_closing;
        if !el.self_closing {
            el.self_closing = true;
            if let Some(raw) = el.raw_tag.as_mut()
                && !raw.ends_with(char::is_whitespace)
            {
                raw.push(' ');
            }
        }

        let children = std::mem::take(&mut node.children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        Ok(changed)
    }

    /// Insert `node` immediately after `reference`, detaching it from wherever it was.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> XmlResult<()> {
        self.check(node)?;
        self.check(reference)?;
        if reference == node {
            return Ok(());
        }
        self.remove(node);
        let (parent, idx) = self
            .position(reference)
            .ok_or(XmlError::Detached(reference.0))?;
        self.nodes[parent.0].children.insert(idx + 1, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    /// Make `node` the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, node: NodeId) -> XmlResult<()> {
        self.check(parent)?;
        self.check(node)?;
        self.remove(node);
        self.nodes[parent.0].children.insert(0, node);
        self.nodes[node.0].parent = Some(parent);
        self.open_element(parent);
        Ok(())
    }

    /// Make `node` the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> XmlResult<()> {
        self.check(parent)?;
        self.check(node)?;
        self.remove(node);
        self.nodes[parent.0].children.push(node);
        self.nodes[node.0].parent = Some(parent);
        self.open_element(parent);
        Ok(())
    }

    /// Replace the child list of `parent` with a permutation of itself.
    pub fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) -> XmlResult<()> {
        self.check(parent)?;
        let mut current = self.nodes[parent.0].children.clone();
        let mut proposed = order.clone();
        current.sort_unstable();
        proposed.sort_unstable();
        if current != proposed {
            return Err(XmlError::NotAPermutation(parent.0));
        }
        self.nodes[parent.0].children = order;
        Ok(())
    }

    /// The line break and one level of indentation used under the root element.
    pub fn indentation(&self) -> Indentation {
        let sample = self
            .children(self.root)
            .iter()
            .find_map(|&id| match self.kind(id) {
                Some(NodeKind::Text(t)) if t.trim().is_empty() && t.contains('\n') => {
                    Some(t.as_str())
                }
                _ => None,
            });

        match sample {
            Some(ws) => {
                let newline = if ws.contains("\r\n") { "\r\n" } else { "\n" };
                let unit = ws.rsplit('\n').next().unwrap_or_default();
                Indentation {
                    newline: newline.to_string(),
                    unit: if unit.is_empty() { "  " } else { unit }.to_string(),
                }
            }
            None => Indentation::default(),
        }
    }

    pub(crate) fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn check(&self, id: NodeId) -> XmlResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(XmlError::UnknownNode(id.0))
        }
    }

    fn position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes.get(id.0)?.parent?;
        let idx = self.nodes[parent.0].children.iter().position(|&c| c == id)?;
        Some((parent, idx))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// An element that gains children can no longer be written as `<x/>`.
    fn open_element(&mut self, id: NodeId) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            el.self_closing = false;
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Document => {
                for &child in &node.children {
                    self.write_node(child, out);
                }
            }
            NodeKind::Element(el) => {
                out.push('<');
                match &el.raw_tag {
                    Some(raw) => out.push_str(raw),
                    None => write_start_tag(el, out),
                }
                if node.children.is_empty() && el.self_closing {
                    if el.raw_tag.is_none() {
                        out.push(' ');
                    }
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(&el.name);
                    out.push('>');
                }
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            NodeKind::Declaration(text) | NodeKind::ProcessingInstruction(text) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            }
            NodeKind::DocType(text) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(text);
                out.push('>');
            }
        }
    }
}

/// Line break plus one indentation step, as found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indentation {
    pub newline: String,
    pub unit: String,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            newline: "\n".to_string(),
            unit: "  ".to_string(),
        }
    }
}

impl Indentation {
    /// Whitespace that starts a new line at `depth` levels below the root's opening tag.
    pub fn line(&self, depth: usize) -> String {
        format!("{}{}", self.newline, self.unit.repeat(depth))
    }
}

/// Read-only view of one element in a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Qualified name, including any namespace prefix.
    pub fn name(&self) -> &'a str {
        self.data().name()
    }

    fn data(&self) -> &'a ElementData {
        match &self.doc.nodes[self.id.0].kind {
            NodeKind::Element(el) => el,
            _ => unreachable!("ElementRef always points at an element"),
        }
    }
}

impl ElementLike for ElementRef<'_> {
    fn local_name(&self) -> &str {
        local_name_of(self.data().name())
    }

    fn attributes(&self) -> &[Attribute] {
        self.data().attributes()
    }

    fn child_elements(&self) -> impl Iterator<Item = Self> {
        let doc = self.doc;
        doc.children(self.id)
            .iter()
            .filter_map(move |&child| doc.element(child))
    }

    fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self.doc, self.id, &mut out);
        out
    }
}

fn collect_text(doc: &Document, id: NodeId, out: &mut String) {
    for &child in doc.children(id) {
        match doc.kind(child) {
            Some(NodeKind::Text(raw)) => match unescape(raw) {
                Ok(text) => out.push_str(&text),
                Err(_) => out.push_str(raw),
            },
            Some(NodeKind::CData(raw)) => out.push_str(raw),
            Some(NodeKind::Element(_)) => collect_text(doc, child, out),
            _ => {}
        }
    }
}

fn parsed_element(start: &BytesStart<'_>, self_closing: bool) -> XmlResult<ElementData> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Attribute {
            element: name.clone(),
            message: e.to_string(),
        })?;
        let value = attr.unescape_value().map_err(|e| XmlError::Attribute {
            element: name.clone(),
            message: e.to_string(),
        })?;
        attributes.push(Attribute {
            name: utf8(attr.key.as_ref())?,
            value: value.into_owned(),
        });
    }

    Ok(ElementData {
        raw_tag: Some(utf8(start)?),
        name,
        attributes,
        self_closing,
    })
}

fn write_start_tag(el: &ElementData, out: &mut String) {
    out.push_str(&el.name);
    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
}

fn utf8(bytes: &[u8]) -> XmlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| XmlError::Utf8)
}
