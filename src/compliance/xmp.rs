//! Reading the conformance-relevant parts of an XMP packet.

use super::types::ConformanceLevel;
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Properties of an XMP packet that the rule engine compares against the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpInfo {
    /// `pdfaid:part`
    pub part: Option<String>,
    /// `pdfaid:conformance`
    pub conformance: Option<String>,
    /// `pdfaid:rev`
    pub rev: Option<String>,
    /// `dc:title` (x-default)
    pub title: Option<String>,
    /// `pdf:Producer`
    pub producer: Option<String>,
    /// `dc:language`
    pub language: Option<String>,
}

impl XmpInfo {
    /// Conformance level named by the `pdfaid` properties.
    pub fn level(&self) -> Option<ConformanceLevel> {
        ConformanceLevel::from_xmp(self.part.as_deref()?, self.conformance.as_deref())
    }

    fn set(&mut self, property: &str, value: String) {
        let slot = match property {
            "pdfaid:part" => &mut self.part,
            "pdfaid:conformance" => &mut self.conformance,
            "pdfaid:rev" => &mut self.rev,
            "dc:title" => &mut self.title,
            "pdf:Producer" => &mut self.producer,
            "dc:language" => &mut self.language,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn read_attributes(&mut self, element: &BytesStart<'_>) -> Result<()> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|e| Error::Xml(e.to_string()))?;
            self.set(&key, value.trim().to_string());
        }
        Ok(())
    }
}

/// Parse `packet`, accepting properties as elements or as attributes of
/// `rdf:Description`.
///
/// Malformed XML is an `Error::Xml`; a packet without the properties yields
/// an `XmpInfo` with `None` fields.
pub fn parse_xmp(packet: &[u8]) -> Result<XmpInfo> {
    let text = std::str::from_utf8(packet).map_err(|e| Error::Xml(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut info = XmpInfo::default();
    let mut element_stack: Vec<String> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                saw_root |= name == "x:xmpmeta" || name == "rdf:RDF";
                if name == "rdf:Description" {
                    info.read_attributes(&e)?;
                }
                element_stack.push(name);
            },
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"rdf:Description" {
                    info.read_attributes(&e)?;
                }
            },
            Ok(Event::Text(e)) => {
                let value = e.unescape().map_err(|err| Error::Xml(err.to_string()))?;
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                let property = element_stack
                    .iter()
                    .rev()
                    .find(|el| !el.starts_with("rdf:") && !el.starts_with("x:"));
                if let Some(property) = property {
                    info.set(property, value.to_string());
                }
            },
            Ok(Event::End(_)) => {
                element_stack.pop();
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("at byte {}: {}", reader.buffer_position(), e))),
            _ => {},
        }
    }

    if !saw_root {
        return Err(Error::Xml("no x:xmpmeta or rdf:RDF element".to_string()));
    }
    if !element_stack.is_empty() {
        return Err(Error::Xml(format!("unclosed element {}", element_stack.join("/"))));
    }
    Ok(info)
}
