//! XSL transformation of serialized documents
//!
//! The crate does not implement XSLT. It hands the rendered document to an
//! [`XsltEngine`] together with a [`Stylesheet`] bundle and parameters:
//!
//! - [`resolver`]: where referenced stylesheets come from ([`FileResolver`]
//!   anchors absolute hrefs at a base path)
//! - [`stylesheet`]: the entry stylesheet plus everything it includes or
//!   imports, loaded up front
//! - `xsltproc` (feature `native-xslt`): an engine that runs libxslt's
//!   command-line tool
//!
//! The engine writes its result in whatever encoding the stylesheet's
//! `xsl:output` asks for. That result is decoded and re-encoded in the
//! [`RenderOptions`] encoding, with character references for anything the
//! target encoding cannot carry. Indentation and output method stay with
//! `xsl:output`.

pub mod resolver;
pub mod stylesheet;
#[cfg(feature = "native-xslt")]
pub mod xsltproc;

pub use resolver::{FileResolver, StylesheetResolver};
pub use stylesheet::{Stylesheet, StylesheetModule};
#[cfg(feature = "native-xslt")]
pub use xsltproc::XsltprocEngine;

use crate::error::{Error, TransformError};
use crate::serializer::{Bindings, Serializer, SerializerOptions};
use crate::tree::{Document, Encoding, RenderOptions};
use tracing::debug;

/// Value of a top-level stylesheet parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Passed to the stylesheet as a string.
    String(String),
    /// Evaluated by the engine as an XPath expression.
    XPath(String),
}

/// Ordered stylesheet parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, ParamValue::String(value.into()));
        self
    }

    pub fn xpath(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.insert(name, ParamValue::XPath(expression.into()));
        self
    }

    /// Set a parameter, replacing an earlier value of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.entries.iter().position(|(existing, _)| *existing == name) {
            Some(pos) => self.entries[pos].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> + '_ {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    /// Collects string parameters.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, ParamValue::String(value.into()));
        }
        params
    }
}

/// An XSLT processor.
pub trait XsltEngine {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Apply `stylesheet` to the XML text `source` and return the output
    /// bytes exactly as the engine wrote them.
    fn apply(
        &self,
        stylesheet: &Stylesheet,
        source: &str,
        params: &Params,
    ) -> Result<Vec<u8>, TransformError>;
}

impl<E: XsltEngine + ?Sized> XsltEngine for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(
        &self,
        stylesheet: &Stylesheet,
        source: &str,
        params: &Params,
    ) -> Result<Vec<u8>, TransformError> {
        (**self).apply(stylesheet, source, params)
    }
}

/// Render `document` and run it through `stylesheet`.
///
/// The document is handed to the engine as UTF-8 regardless of the encoding
/// in `render`. The returned text is ready to be encoded in `render.encoding`
/// with [`Encoding::encode`].
pub fn apply_to_document(
    engine: &dyn XsltEngine,
    stylesheet: &Stylesheet,
    document: &Document,
    params: &Params,
    render: &RenderOptions,
) -> Result<String, Error> {
    let source = document.render(&render.with_encoding(Encoding::Utf8))?;
    debug!(
        engine = engine.name(),
        stylesheet = %stylesheet.entry().href,
        params = params.len(),
        "applying stylesheet"
    );
    let output = engine.apply(stylesheet, &source, params)?;
    Ok(reencode_output(&output, stylesheet, render.encoding)?)
}

/// Decode engine output and prepare it for `target`.
///
/// The output's own XML declaration names its encoding; without one the
/// stylesheet's `xsl:output` does, and UTF-8 is assumed otherwise.
pub fn reencode_output(
    output: &[u8],
    stylesheet: &Stylesheet,
    target: Encoding,
) -> Result<String, TransformError> {
    let declaration = xml_declaration(output);
    let declared =
        declaration.and_then(|decl| pseudo_attribute(decl, "encoding").map(|span| &decl[span]));
    let label = declared
        .or_else(|| stylesheet.output_encoding())
        .unwrap_or("UTF-8");
    let source: Encoding = label.parse().map_err(|_| {
        TransformError::Engine(format!("unsupported output encoding '{label}'"))
    })?;
    let text = source.decode(output).ok_or_else(|| {
        TransformError::Engine(format!("output is not valid {}", source.label()))
    })?;

    let mut text = target.with_character_references(&text).into_owned();
    if let Some(decl_len) = declaration.map(str::len) {
        relabel_declaration(&mut text, decl_len, target);
    }
    Ok(text)
}

/// The `<?xml ...?>` declaration at the start of `output`, if any.
fn xml_declaration(output: &[u8]) -> Option<&str> {
    if !output.starts_with(b"<?xml") {
        return None;
    }
    let end = output.windows(2).position(|w| w == b"?>")? + 2;
    std::str::from_utf8(&output[..end]).ok()
}

/// Byte range of the value of pseudo-attribute `name` in `declaration`.
fn pseudo_attribute(declaration: &str, name: &str) -> Option<std::ops::Range<usize>> {
    let mut offset = 0;
    while let Some(found) = declaration[offset..].find(name) {
        let after_name = offset + found + name.len();
        let rest = declaration[after_name..].trim_start();
        if let Some(rest) = rest.strip_prefix('=') {
            let value = rest.trim_start();
            let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
            let start = declaration.len() - value.len() + 1;
            let len = declaration[start..].find(quote)?;
            return Some(start..start + len);
        }
        offset = after_name;
    }
    None
}

/// Point the declaration occupying `text[..decl_len]` at `target`. The
/// declaration is ASCII, so its length survives decoding.
fn relabel_declaration(text: &mut String, decl_len: usize, target: Encoding) {
    let declaration = &text[..decl_len];
    if let Some(span) = pseudo_attribute(declaration, "encoding") {
        text.replace_range(span, target.label());
    } else if let Some(version) = pseudo_attribute(declaration, "version") {
        text.insert_str(version.end + 1, &format!(" encoding=\"{}\"", target.label()));
    }
}

/// Serialize `bindings`, then transform the result with `stylesheet`.
pub fn to_string(
    engine: &dyn XsltEngine,
    stylesheet: &Stylesheet,
    params: &Params,
    options: &SerializerOptions,
    render: &RenderOptions,
    bindings: &Bindings<'_>,
) -> Result<String, Error> {
    let document = Serializer::new(options.clone()).serialize(bindings)?;
    apply_to_document(engine, stylesheet, &document, params, render)
}
