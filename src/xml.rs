use std::borrow::Cow;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::GpxError;

type Result<T> = std::result::Result<T, GpxError>;

/// One node of the document tree: an element or a run of character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its qualified name, attributes, and children, all in
/// document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// An element whose only child is a text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut elem = Self::new(name);
        elem.push_text(text);
        elem
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(elem) => Some(elem),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element whose local name matches.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| split_qname(&e.name).1 == local)
    }

    /// All child elements whose local name matches, in document order.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| split_qname(&e.name).1 == local)
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                text.push_str(t);
            }
        }
        text
    }

    pub fn push_element(&mut self, elem: XmlElement) {
        self.children.push(XmlNode::Element(elem));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }
}

/// Split a qualified name into its namespace prefix and local name.
/// All prefix handling goes through here; nothing else splits on `:`.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// Parse an XML document into its root element.
///
/// Whitespace-only text nodes are discarded; character and predefined
/// entity references are resolved into the surrounding text.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let elem = element_from_start(&e)?;
                attach(&mut stack, &mut root, elem);
            }
            Ok(Event::End(_)) => {
                if let Some(elem) = stack.pop() {
                    attach(&mut stack, &mut root, elem);
                }
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                if !raw.trim().is_empty() {
                    append_text(&mut stack, raw);
                }
            }
            Ok(Event::CData(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                append_text(&mut stack, raw);
            }
            Ok(Event::GeneralRef(e)) => {
                // Character references (&#60; &#x3C;) and predefined entities
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    append_text(&mut stack, &ch.to_string());
                } else {
                    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                    match name {
                        "amp" => append_text(&mut stack, "&"),
                        "lt" => append_text(&mut stack, "<"),
                        "gt" => append_text(&mut stack, ">"),
                        "quot" => append_text(&mut stack, "\""),
                        "apos" => append_text(&mut stack, "'"),
                        _ => {} // Unknown entity, skip
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::Xml(e)),
            _ => {}
        }
    }

    root.ok_or(GpxError::EmptyDocument)
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().0).into_owned();
    let mut elem = XmlElement::new(name);

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.0).into_owned();
        let raw = std::str::from_utf8(&attr.value).unwrap_or_default();
        let value = unescape(raw).unwrap_or(Cow::Borrowed(raw)).into_owned();
        elem.attributes.push((key, value));
    }

    Ok(elem)
}

/// Hand a completed element to its parent, or make it the root.
fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, elem: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.push_element(elem);
    } else if root.is_none() {
        *root = Some(elem);
    }
}

fn append_text(stack: &mut Vec<XmlElement>, text: &str) {
    let Some(parent) = stack.last_mut() else {
        return; // text outside the root element
    };
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.push_text(text);
    }
}

/// Serialize a tree back to XML text with a declaration and 2-space
/// indentation. Childless elements are self-closed.
pub fn serialize(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;

    let out = writer.into_inner();
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn write_element(writer: &mut Writer<Vec<u8>>, elem: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(elem.name.as_str());
    for (key, value) in &elem.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &elem.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(elem.name.as_str())))?;

    Ok(())
}
