//! Mutable XML element tree.
//!
//! The tree is built from `quick-xml` events and written back with its
//! writer. It keeps everything a round trip must not lose: comments,
//! processing instructions, CDATA, whitespace, entity references, attribute
//! order and raw attribute values, and whether an empty element was written
//! self-closing. Text and attribute values are stored in their escaped
//! (on-disk) form.

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;

use anyhow::{Context, Result, bail};

/// Child of an element, or a top-level misc node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped character data, entity references included verbatim
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// Attribute with its qualified name and escaped value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `w:rPr`
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<Node>,
    /// Written as `<x/>` when it has no children
    pub self_closing: bool,
}

impl Element {
    /// New empty element, serialized self-closing until it gains children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Raw (escaped) value of an attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute from unescaped text, keeping its position if present
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let value = escape(value).into_owned();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.name != name);
        self.attributes.len() != before
    }

    /// `(prefix, uri)` pairs declared on this element; the default namespace has no prefix
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes.iter().filter_map(|a| {
            if a.name == "xmlns" {
                Some((None, a.value.as_str()))
            } else {
                a.name
                    .strip_prefix("xmlns:")
                    .map(|prefix| (Some(prefix), a.value.as_str()))
            }
        })
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Node index of the first child element named `name`
    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(el) if el.name == name))
    }

    /// Node index of the first child element of any name
    pub fn first_element_index(&self) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(_)))
    }

    /// Mutable access to the element stored at node index `index`
    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Remove every child element named `name`, returning how many went
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(el) if el.name == name));
        before - self.children.len()
    }

    /// Visit `self` and its descendants in document order
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for attr in &self.attributes {
            start.push_attribute(Attribute {
                key: QName(attr.name.as_bytes()),
                value: Cow::Borrowed(attr.value.as_bytes()),
            });
        }

        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn collect<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
    out.push(el);
    for child in el.child_elements() {
        collect(child, out);
    }
}

impl Node {
    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            Node::Element(el) => el.write(writer)?,
            Node::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?
            }
            Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
            Node::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
            Node::ProcessingInstruction(content) => {
                writer.write_event(Event::PI(BytesPI::new(content.as_str())))?
            }
            Node::DocType(content) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(content.as_str())))?
            }
        }
        Ok(())
    }
}

/// A parsed XML part: root element plus the misc nodes around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// Comments, processing instructions and doctype before the root
    pub prolog: Vec<Node>,
    pub root: Element,
    /// Comments and processing instructions after the root
    pub epilog: Vec<Node>,
}

impl XmlDocument {
    /// Parse UTF-8 XML. The declaration and whitespace outside the root are dropped.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .with_context(|| format!("malformed XML near byte {position}"))?;

            let node = match event {
                Event::Start(e) => {
                    stack.push(element_from(&e, false)?);
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(el) => Node::Element(el),
                    None => bail!("unexpected closing tag near byte {position}"),
                },
                Event::Empty(e) => Node::Element(element_from(&e, true)?),
                Event::Text(e) => Node::Text(utf8(&e, position)?.to_string()),
                Event::GeneralRef(e) => Node::Text(format!("&{};", utf8(&e, position)?)),
                Event::CData(e) => Node::CData(utf8(&e, position)?.to_string()),
                Event::Comment(e) => Node::Comment(utf8(&e, position)?.to_string()),
                Event::PI(e) => Node::ProcessingInstruction(utf8(&e, position)?.to_string()),
                Event::DocType(e) => Node::DocType(utf8(&e, position)?.to_string()),
                Event::Decl(_) => continue,
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                append(parent, node);
                continue;
            }

            // Top level: outside any element
            match node {
                Node::Element(el) => {
                    if root.is_some() {
                        bail!("second root element <{}> near byte {position}", el.name);
                    }
                    root = Some(el);
                }
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(_) | Node::CData(_) => {
                    bail!("character data outside the root element near byte {position}")
                }
                misc if root.is_none() => prolog.push(misc),
                misc => epilog.push(misc),
            }
        }

        if let Some(open) = stack.last() {
            bail!("unexpected end of document inside <{}>", open.name);
        }
        let root = root.context("document has no root element")?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    /// Serialize with a fixed `UTF-8`, `standalone="yes"` declaration
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        writer.get_mut().extend_from_slice(b"\r\n");

        for node in &self.prolog {
            node.write(&mut writer)?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        self.root.write(&mut writer)?;
        for node in &self.epilog {
            writer.get_mut().extend_from_slice(b"\r\n");
            node.write(&mut writer)?;
        }

        Ok(writer.into_inner())
    }
}

/// Append a node, merging adjacent text so entity references stay inline
fn append(parent: &mut Element, node: Node) {
    if let Node::Text(text) = &node
        && let Some(Node::Text(last)) = parent.children.last_mut()
    {
        last.push_str(text);
        return;
    }
    parent.children.push(node);
}

fn element_from(start: &BytesStart<'_>, self_closing: bool) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .context("element name is not valid UTF-8")?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.with_context(|| format!("bad attribute on <{name}>"))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .with_context(|| format!("attribute name on <{name}> is not valid UTF-8"))?;
        let value = std::str::from_utf8(&attr.value)
            .with_context(|| format!("attribute {key} on <{name}> is not valid UTF-8"))?;
        attributes.push(XmlAttribute {
            name: key.to_string(),
            // Values are re-emitted inside double quotes
            value: value.replace('"', "&quot;"),
        });
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        self_closing,
    })
}

fn utf8(bytes: &[u8], position: impl std::fmt::Display) -> Result<&str> {
    std::str::from_utf8(bytes).with_context(|| format!("invalid UTF-8 near byte {position}"))
}
