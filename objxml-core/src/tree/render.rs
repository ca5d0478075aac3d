//! Rendering a [`Document`] to XML text
//!
//! Output follows libxml2's layout: an XML declaration naming the encoding,
//! a newline, the root element, and a trailing newline. With `pretty` set,
//! nested elements are indented by two spaces while text-only elements stay on
//! a single line. Elements with neither text nor children render as `<tag/>`.
//!
//! Characters the chosen encoding cannot carry are written as hexadecimal
//! character references, so `ASCII` output is always 7-bit clean.

use super::{Content, Document, NodeId};
use crate::error::RenderError;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Character encoding of rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Utf8,
    #[default]
    Ascii,
    Latin1,
}

impl Encoding {
    /// Name written into the XML declaration.
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Ascii => "ASCII",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }

    fn can_encode(self, c: char) -> bool {
        match self {
            Encoding::Utf8 => true,
            Encoding::Ascii => c.is_ascii(),
            Encoding::Latin1 => (c as u32) <= 0xFF,
        }
    }

    /// Replace every character this encoding cannot carry with a hexadecimal
    /// character reference. Markup is left untouched.
    pub fn with_character_references(self, text: &str) -> Cow<'_, str> {
        if text.chars().all(|c| self.can_encode(c)) {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len() + 8);
        for c in text.chars() {
            if self.can_encode(c) {
                out.push(c);
            } else {
                out.push_str(&format!("&#x{:X};", c as u32));
            }
        }
        Cow::Owned(out)
    }

    /// Encode `text`, which must already be representable in this encoding.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 | Encoding::Ascii => text.as_bytes().to_vec(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Decode bytes written in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Encoding::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Encoding {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            _ => Err(RenderError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// How a document is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub encoding: Encoding,
    pub pretty: bool,
}

impl RenderOptions {
    pub fn new(encoding: Encoding, pretty: bool) -> Self {
        Self { encoding, pretty }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl Document {
    /// Render the document as XML text.
    ///
    /// The returned string is the logical text of the document; use
    /// [`Document::render_bytes`] to get it encoded in `options.encoding`.
    pub fn render(&self, options: &RenderOptions) -> Result<String, RenderError> {
        let root = self.root.ok_or(RenderError::EmptyDocument)?;

        let declaration = format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>\n",
            options.encoding.label()
        );
        let buffer = declaration.into_bytes();

        let mut out = if options.pretty {
            let mut writer = Writer::new_with_indent(buffer, b' ', 2);
            write_element(&mut writer, self, root, options.encoding)?;
            writer.into_inner()
        } else {
            let mut writer = Writer::new(buffer);
            write_element(&mut writer, self, root, options.encoding)?;
            writer.into_inner()
        };
        out.push(b'\n');

        String::from_utf8(out)
            .map_err(|e| RenderError::Write(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Render the document and encode the text in `options.encoding`.
    pub fn render_bytes(&self, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let text = self.render(options)?;
        Ok(options.encoding.encode(&text))
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    doc: &Document,
    id: NodeId,
    encoding: Encoding,
) -> Result<(), RenderError> {
    let element = &doc.nodes[id.0];

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_for(value, encoding).into_bytes()),
        });
    }

    match &element.content {
        Content::Empty => {
            writer.write_event(Event::Empty(start))?;
        }
        Content::Text(text) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::from_escaped(escape_for(
                text, encoding,
            ))))?;
            writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        }
        Content::Children(children) => {
            writer.write_event(Event::Start(start))?;
            for child in children {
                write_element(writer, doc, *child, encoding)?;
            }
            writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        }
    }

    Ok(())
}

fn escape_for(raw: &str, encoding: Encoding) -> String {
    let escaped = quick_xml::escape::escape(raw);
    encoding.with_character_references(&escaped).into_owned()
}
