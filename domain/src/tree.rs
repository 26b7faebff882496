//! Order-preserving XML tree with path addressing.
//!
//! Only the parts of XML that libvirt domain documents use are modelled:
//! nested elements with qualified names, attributes, repeated siblings,
//! text, CDATA, comments and processing instructions. Namespace prefixes are
//! kept verbatim in names and `xmlns:*` declarations are ordinary attributes.

use crate::error::{ParseError, PathError};
use crate::path::Path;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    Instruction(String),
}

impl Node {
    fn is_element_named(&self, name: &str) -> bool {
        matches!(self, Node::Element(element) if element.name == name)
    }

    /// Text and CDATA are significant content; everything else may be indented.
    fn is_markup(&self) -> bool {
        !matches!(self, Node::Text(_) | Node::CData(_))
    }

    fn is_blank(&self) -> bool {
        matches!(self, Node::Text(text) if text.bytes().all(|b| b.is_ascii_whitespace()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attribute| attribute.name == name) {
            Some(attribute) => attribute.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.name == name)
    }

    fn child_or_insert(&mut self, name: &str) -> &mut Element {
        let index = match self.children.iter().position(|child| child.is_element_named(name)) {
            Some(index) => index,
            None => {
                self.children.push(Node::Element(Element::new(name)));
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            Node::Element(element) => element,
            _ => unreachable!("child {index} of {} is an element", self.name),
        }
    }

    /// Swap every child element called `name` for `replacement`, which lands
    /// where the first removed element was.
    fn replace_children(&mut self, name: &str, replacement: Vec<Element>) {
        let first = self.children.iter().position(|child| child.is_element_named(name));
        self.children.retain(|child| !child.is_element_named(name));
        let at = first.unwrap_or(self.children.len());
        self.children
            .splice(at..at, replacement.into_iter().map(Node::Element));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub declaration: Option<Declaration>,
    /// Comments and processing instructions before the root element.
    pub prolog: Vec<Node>,
    pub doctype: Option<String>,
    pub root: Element,
    /// Comments and processing instructions after the root element.
    pub epilog: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            prolog: Vec::new(),
            doctype: None,
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a complete document. Whitespace-only text between markup is
    /// treated as indentation and dropped; in mixed content it is kept.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(text);
        let mut builder = Builder::default();

        loop {
            let event = reader.read_event().map_err(|source| ParseError::Xml {
                position: reader.error_position() as u64,
                source,
            })?;
            let position = reader.buffer_position() as u64;

            match event {
                Event::Decl(decl) => builder.declaration = Some(declaration_from(&decl, position)?),
                Event::Start(start) => builder.open.push(element_from(&start, position)?),
                Event::Empty(start) => builder.attach(element_from(&start, position)?)?,
                Event::End(end) => builder.close(std::str::from_utf8(end.name().as_ref())?)?,
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|source| ParseError::Xml { position, source })?;
                    builder.text(Node::Text(text.into_owned()))?;
                }
                Event::CData(data) => builder.text(Node::CData(utf8(&data)?))?,
                Event::Comment(comment) => builder.misc(Node::Comment(utf8(&comment)?)),
                Event::PI(instruction) => builder.misc(Node::Instruction(utf8(&instruction)?)),
                Event::DocType(doctype) => builder.doctype = Some(utf8(&doctype)?.trim().to_string()),
                Event::Eof => break,
            }
        }

        builder.finish()
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse(std::str::from_utf8(bytes)?)
    }

    /// All elements matching the terminal segment of `path`, in document order.
    ///
    /// Intermediate segments follow the first matching child. A missing
    /// intermediate element is an error; a missing terminal element is an
    /// empty result.
    pub fn values_at(&self, path: &Path) -> Result<Vec<&Element>, PathError> {
        self.check_root(path)?;
        if path.segments().len() == 1 {
            return Ok(vec![&self.root]);
        }

        let mut parent = &self.root;
        for segment in path.intermediate() {
            parent = parent
                .children_named(segment)
                .next()
                .ok_or_else(|| PathError::Missing {
                    segment: segment.clone(),
                    parent: parent.name.clone(),
                })?;
        }

        Ok(parent.children_named(path.terminal()).collect())
    }

    /// Replace all elements at `path` with `values`.
    ///
    /// Missing intermediate elements are created. Everything outside the
    /// terminal elements of the resolved parent is left untouched.
    pub fn replace_at(&mut self, path: &Path, values: Vec<Element>) -> Result<(), PathError> {
        self.check_root(path)?;
        if path.segments().len() == 1 {
            return Err(PathError::RootReplacement(self.root.name.clone()));
        }

        let mut parent = &mut self.root;
        for segment in path.intermediate() {
            parent = parent.child_or_insert(segment);
        }
        parent.replace_children(path.terminal(), values);

        Ok(())
    }

    pub fn to_xml(&self) -> String {
        self.to_string()
    }

    fn check_root(&self, path: &Path) -> Result<(), PathError> {
        if path.root() != self.root.name {
            return Err(PathError::RootMismatch {
                expected: path.root().to_string(),
                found: self.root.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(declaration) = &self.declaration {
            write!(f, "<?xml version=\"{}\"", escape_attribute(&declaration.version))?;
            if let Some(encoding) = &declaration.encoding {
                write!(f, " encoding=\"{}\"", escape_attribute(encoding))?;
            }
            if let Some(standalone) = &declaration.standalone {
                write!(f, " standalone=\"{}\"", escape_attribute(standalone))?;
            }
            f.write_str("?>\n")?;
        }
        for node in &self.prolog {
            write_node(f, node, Some(0))?;
            f.write_char('\n')?;
        }
        if let Some(doctype) = &self.doctype {
            writeln!(f, "<!DOCTYPE {doctype}>")?;
        }
        write_element(f, &self.root, Some(0))?;
        for node in &self.epilog {
            f.write_char('\n')?;
            write_node(f, node, Some(0))?;
        }
        Ok(())
    }
}

/// `indent` is the nesting level when pretty printing, `None` inside mixed content.
fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, indent: Option<usize>) -> fmt::Result {
    match node {
        Node::Element(element) => write_element(f, element, indent),
        Node::Text(text) => f.write_str(&partial_escape(text.as_str())),
        Node::CData(data) => write!(f, "<![CDATA[{data}]]>"),
        Node::Comment(comment) => write!(f, "<!--{comment}-->"),
        Node::Instruction(instruction) => write!(f, "<?{instruction}?>"),
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, element: &Element, indent: Option<usize>) -> fmt::Result {
    write!(f, "<{}", element.name)?;
    for attribute in &element.attributes {
        write!(f, " {}=\"{}\"", attribute.name, escape_attribute(&attribute.value))?;
    }
    if element.children.is_empty() {
        return f.write_str("/>");
    }
    f.write_char('>')?;

    match indent.filter(|_| element.children.iter().all(Node::is_markup)) {
        Some(level) => {
            for child in &element.children {
                f.write_char('\n')?;
                pad(f, level + 1)?;
                write_node(f, child, Some(level + 1))?;
            }
            f.write_char('\n')?;
            pad(f, level)?;
        }
        None => {
            for child in &element.children {
                write_node(f, child, None)?;
            }
        }
    }

    write!(f, "</{}>", element.name)
}

/// Readers normalize a literal tab or line break inside an attribute value to
/// a space, so those are written as character references.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn pad(f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = level * 2)
}

fn utf8(bytes: &[u8]) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}

fn element_from(start: &BytesStart<'_>, position: u64) -> Result<Element, ParseError> {
    let mut element = Element::new(std::str::from_utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let name = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute
            .unescape_value()
            .map_err(|source| ParseError::Xml { position, source })?
            .into_owned();
        element.attributes.push(Attribute { name, value });
    }
    Ok(element)
}

fn declaration_from(decl: &BytesDecl<'_>, position: u64) -> Result<Declaration, ParseError> {
    let version = decl
        .version()
        .map_err(|source| ParseError::Xml { position, source })?;
    let encoding = decl.encoding().transpose()?;
    let standalone = decl.standalone().transpose()?;

    Ok(Declaration {
        version: utf8(&version)?,
        encoding: encoding.map(|value| utf8(&value)).transpose()?,
        standalone: standalone.map(|value| utf8(&value)).transpose()?,
    })
}

/// Blank text is indentation only when everything else in `element` is markup.
fn drop_indentation(element: &mut Element) {
    let indented = element
        .children
        .iter()
        .filter(|child| !child.is_blank())
        .all(Node::is_markup);
    if indented {
        element.children.retain(|child| !child.is_blank());
    }
}

/// Accumulates reader events into a [`Document`].
#[derive(Default)]
struct Builder {
    declaration: Option<Declaration>,
    prolog: Vec<Node>,
    doctype: Option<String>,
    root: Option<Element>,
    epilog: Vec<Node>,
    open: Vec<Element>,
}

impl Builder {
    fn close(&mut self, name: &str) -> Result<(), ParseError> {
        match self.open.pop() {
            Some(mut element) if element.name == name => {
                drop_indentation(&mut element);
                self.attach(element)
            }
            _ => Err(ParseError::UnexpectedClose(name.to_string())),
        }
    }

    fn attach(&mut self, element: Element) -> Result<(), ParseError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(Node::Element(element));
            return Ok(());
        }
        if self.root.is_some() {
            return Err(ParseError::MultipleRoots(element.name));
        }
        self.root = Some(element);
        Ok(())
    }

    fn text(&mut self, node: Node) -> Result<(), ParseError> {
        match self.open.last_mut() {
            Some(parent) => {
                parent.children.push(node);
                Ok(())
            }
            None if node.is_blank() => Ok(()),
            None => Err(ParseError::TextOutsideRoot),
        }
    }

    fn misc(&mut self, node: Node) {
        match (self.open.last_mut(), &self.root) {
            (Some(parent), _) => parent.children.push(node),
            (None, None) => self.prolog.push(node),
            (None, Some(_)) => self.epilog.push(node),
        }
    }

    fn finish(self) -> Result<Document, ParseError> {
        if let Some(element) = self.open.last() {
            return Err(ParseError::Unterminated(element.name.clone()));
        }
        let root = self.root.ok_or(ParseError::MissingRoot)?;

        Ok(Document {
            declaration: self.declaration,
            prolog: self.prolog,
            doctype: self.doctype,
            root,
            epilog: self.epilog,
        })
    }
}
