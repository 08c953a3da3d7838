// src/mets/tree.rs

//! In-memory METS document tree
//!
//! A small element tree built on quick-xml events. Names are kept exactly as
//! written (`mets:file`, `xlink:href`), attributes keep their order and, as
//! long as they are not overwritten, their original escaped text. Comments,
//! processing instructions and CDATA sections survive a round trip.
//! Whitespace-only text is dropped on parse; the writer re-indents.

use crate::error::{Error, Result};
use crate::mets::namespace::{NamespaceTable, QName};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::path::Path;

/// Indentation width used when none is configured
pub const DEFAULT_INDENT: usize = 4;

/// One attribute of an element
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr {
    name: String,
    value: String,
    /// Escaped source text, dropped once the value is overwritten
    raw: Option<String>,
}

/// A child of an element (or a misc node around the root)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped character data
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// An element with its attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name as written in the document
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this element has the given qualified name
    pub fn is(&self, name: &QName) -> bool {
        name.matches(&self.name)
    }

    /// Attribute value (unescaped)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Required attribute value
    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            Error::malformed(format!("<{}> is missing attribute {}", self.name, name))
        })
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => {
                attr.value = value;
                attr.raw = None;
            }
            None => self.attributes.push(Attr {
                name: name.to_string(),
                value,
                raw: None,
            }),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    /// Attribute names in document order
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements, mutably
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with the given name
    pub fn children_named<'a>(&'a self, name: &QName) -> impl Iterator<Item = &'a Element> {
        let raw = name.raw();
        self.elements().filter(move |e| e.name == raw)
    }

    /// Child elements with the given name, mutably
    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &QName,
    ) -> impl Iterator<Item = &'a mut Element> {
        let raw = name.raw();
        self.elements_mut().filter(move |e| e.name == raw)
    }

    /// First child element with the given name
    pub fn child(&self, name: &QName) -> Option<&Element> {
        self.children_named(name).next()
    }

    /// First child element with the given name, mutably
    pub fn child_mut(&mut self, name: &QName) -> Option<&mut Element> {
        self.children_named_mut(name).next()
    }

    /// First child element with the given name, or a document error
    pub fn required_child_mut(&mut self, name: &QName) -> Result<&mut Element> {
        let parent = self.name.clone();
        self.child_mut(name)
            .ok_or_else(|| Error::malformed(format!("<{}> has no <{}> child", parent, name.raw())))
    }

    /// Remove child elements for which `remove` returns true; returns the
    /// removed elements in document order
    pub fn remove_children_where<F>(&mut self, mut remove: F) -> Vec<Element>
    where
        F: FnMut(&Element) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                Node::Element(e) if remove(&e) => removed.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    /// Visit every descendant element (depth first, document order)
    pub fn try_for_each_descendant_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Element) -> Result<()>,
    {
        for child in self.elements_mut() {
            f(child)?;
            child.try_for_each_descendant_mut(f)?;
        }
        Ok(())
    }

    /// Visit every descendant element immutably
    pub fn for_each_descendant<F>(&self, f: &mut F)
    where
        F: FnMut(&Element),
    {
        for child in self.elements() {
            f(child);
            child.for_each_descendant(f);
        }
    }

    /// Concatenated unescaped text of the direct text children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => match quick_xml::escape::unescape(raw) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(raw),
                },
                Node::CData(data) => out.push_str(data),
                _ => {}
            }
        }
        out
    }
}

/// A parsed METS document together with its namespace bindings
#[derive(Debug, Clone)]
pub struct XmlDocument {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
    namespaces: NamespaceTable,
}

impl XmlDocument {
    /// Parse a document from text
    pub fn parse(xml: &str) -> Result<Self> {
        let namespaces = NamespaceTable::resolve(xml)?;

        let mut reader = Reader::from_str(xml);
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::malformed(format!(
                    "not well-formed at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            let node = match event {
                Event::Start(e) => {
                    stack.push(element_from_start(&e)?);
                    continue;
                }
                Event::End(_) => {
                    let finished = stack
                        .pop()
                        .ok_or_else(|| Error::malformed("unexpected closing tag"))?;
                    Node::Element(finished)
                }
                Event::Empty(e) => Node::Element(element_from_start(&e)?),
                Event::Text(e) => {
                    let raw = utf8(e.into_inner())?;
                    if raw.trim().is_empty() {
                        continue;
                    }
                    Node::Text(raw)
                }
                Event::CData(e) => Node::CData(utf8(e.into_inner())?),
                Event::Comment(e) => Node::Comment(utf8(e.into_inner())?),
                Event::PI(e) => Node::ProcessingInstruction(utf8(e.into_inner())?),
                Event::DocType(e) => Node::DocType(utf8(e.into_inner())?),
                // The declaration is regenerated on write
                Event::Decl(_) => continue,
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            } else {
                match node {
                    Node::Element(e) => {
                        if root.is_some() {
                            return Err(Error::malformed("more than one root element"));
                        }
                        root = Some(e);
                    }
                    Node::Text(_) | Node::CData(_) => {
                        return Err(Error::malformed("character data outside the root element"));
                    }
                    misc if root.is_none() => prolog.push(misc),
                    misc => epilog.push(misc),
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::malformed(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| Error::malformed("document has no root element"))?;

        Ok(Self {
            prolog,
            root,
            epilog,
            namespaces,
        })
    }

    /// Read and parse a document from disk
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    /// Root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Root element, mutably
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Namespace bindings captured from the source text
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Root element and namespace table borrowed together
    pub fn split_mut(&mut self) -> (&mut Element, &NamespaceTable) {
        (&mut self.root, &self.namespaces)
    }

    /// Serialize with an XML declaration and `indent` spaces per level
    pub fn to_xml(&self, indent: usize) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);

        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes)
            .map_err(|e| Error::malformed(format!("invalid UTF-8 output: {}", e)))
    }

    /// Serialize and write to `path`, replacing any existing file
    pub fn write(&self, path: &Path, indent: usize) -> Result<()> {
        let xml = self.to_xml(indent)?;
        std::fs::write(path, xml).map_err(|e| Error::io(path, e))
    }
}

fn utf8(bytes: Cow<'_, [u8]>) -> Result<String> {
    String::from_utf8(bytes.into_owned())
        .map_err(|e| Error::malformed(format!("invalid UTF-8: {}", e)))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = utf8(Cow::Borrowed(start.name().as_ref()))?;
    let mut element = Element::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::malformed(format!("bad attribute: {}", e)))?;
        let attr_name = utf8(Cow::Borrowed(attr.key.as_ref()))?;
        // Raw text is written back double-quoted, so it must not contain `"`
        let raw = Some(utf8(attr.value.clone())?).filter(|raw| !raw.contains('"'));
        let value = attr
            .unescape_value()
            .map_err(|e| Error::malformed(format!("bad value for {}: {}", attr_name, e)))?
            .into_owned();
        element.attributes.push(Attr {
            name: attr_name,
            value,
            raw,
        });
    }

    Ok(element)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event)?;
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for attr in &element.attributes {
        match &attr.raw {
            Some(raw) => start.push_attribute(Attribute {
                key: quick_xml::name::QName(attr.name.as_bytes()),
                value: Cow::Borrowed(raw.as_bytes()),
            }),
            None => start.push_attribute((attr.name.as_str(), attr.value.as_str())),
        }
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for node in &element.children {
        write_node(writer, node)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<()> {
    match node {
        Node::Element(e) => write_element(writer, e),
        Node::Text(raw) => emit(writer, Event::Text(BytesText::from_escaped(raw.as_str()))),
        Node::CData(data) => emit(writer, Event::CData(BytesCData::new(data.as_str()))),
        Node::Comment(text) => emit(writer, Event::Comment(BytesText::from_escaped(text.as_str()))),
        Node::ProcessingInstruction(text) => {
            emit(writer, Event::PI(BytesText::from_escaped(text.as_str())))
        }
        Node::DocType(text) => emit(writer, Event::DocType(BytesText::from_escaped(text.as_str()))),
    }
}
