//! Minimal XML tree for record bodies
//!
//! Elements are addressed by local name, so `lei:LegalName` is found as `LegalName`.
//! Attributes keep their qualified key (`xml:lang`). Text is trimmed.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// XML parse failure
#[derive(Debug, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct XmlError {
    pub message: String,
    pub position: u64,
}

/// One XML element with its children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parse a document and return its root element
    pub fn parse(data: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| XmlError {
                message: e.to_string(),
                position: reader.error_position() as u64,
            })?;

            match event {
                Event::Start(ref e) => {
                    stack.push(element_from_start(e, &reader)?);
                }
                Event::Empty(ref e) => {
                    let element = element_from_start(e, &reader)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(ref t) => {
                    if let Some(top) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| XmlError {
                            message: e.to_string(),
                            position: reader.buffer_position() as u64,
                        })?;
                        top.text.push_str(&text);
                    }
                }
                Event::CData(ref c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(XmlError {
                message: format!("unclosed element '{}'", open.name),
                position: reader.buffer_position() as u64,
            });
        }
        root.ok_or_else(|| XmlError {
            message: "document has no root element".to_string(),
            position: 0,
        })
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a path of local names
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |element, name| element.child(name))
    }

    /// Text of the first child with the given name, `None` when absent or empty
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Attribute value by qualified key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn element_from_start(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(&String::from_utf8_lossy(e.local_name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError {
            message: err.to_string(),
            position: reader.buffer_position() as u64,
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError {
                message: err.to_string(),
                position: reader.buffer_position() as u64,
            })?
            .to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
