//! Stylesheet bundles
//!
//! A [`Stylesheet`] is the entry stylesheet plus every module it pulls in
//! through `xsl:include` and `xsl:import`, transitively. Relative hrefs are
//! resolved against the href of the stylesheet that references them (the
//! way a URI base works) before being handed to the resolver, so the
//! resolver always sees paths relative to the working directory, or absolute
//! ones. Each module is loaded once, however many times it is referenced.

use super::resolver::{normalize_path, StylesheetResolver};
use crate::error::TransformError;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Include,
    Import,
}

/// A reference from one stylesheet module to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// The `href` attribute as written in the referencing module.
    pub written: String,
    /// The href passed to the resolver.
    pub resolved: String,
    /// Byte range of the attribute value (inside the quotes) in the
    /// referencing module's source.
    pub span: Range<usize>,
}

/// One stylesheet file of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetModule {
    pub href: String,
    pub source: String,
    pub references: Vec<Reference>,
    /// The `encoding` of a top-level `xsl:output`, if any.
    pub output_encoding: Option<String>,
}

/// An entry stylesheet and all the modules it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    entry: StylesheetModule,
    modules: Vec<StylesheetModule>,
}

impl Stylesheet {
    /// Read the stylesheet at `path` and resolve its includes and imports.
    pub fn load(
        path: impl AsRef<Path>,
        resolver: &dyn StylesheetResolver,
    ) -> Result<Self, TransformError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| TransformError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_source(path.to_string_lossy(), source, resolver)
    }

    /// Build a bundle from in-memory stylesheet text. `href` is the name
    /// relative includes are resolved against.
    pub fn from_source(
        href: impl Into<String>,
        source: impl Into<String>,
        resolver: &dyn StylesheetResolver,
    ) -> Result<Self, TransformError> {
        let entry = scan(href.into(), source.into())?;

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(entry.href.clone());
        let mut pending: VecDeque<Reference> = entry.references.iter().cloned().collect();
        let mut modules = Vec::new();

        while let Some(reference) = pending.pop_front() {
            if !seen.insert(reference.resolved.clone()) {
                continue;
            }
            let bytes = resolver
                .load(&reference.resolved)?
                .ok_or_else(|| TransformError::IncludeNotFound {
                    href: reference.resolved.clone(),
                })?;
            let source = String::from_utf8(bytes).map_err(|_| TransformError::Stylesheet {
                href: reference.resolved.clone(),
                message: "stylesheet is not valid UTF-8".to_string(),
            })?;
            debug!(href = %reference.resolved, kind = ?reference.kind, "loaded stylesheet module");

            let module = scan(reference.resolved, source)?;
            pending.extend(module.references.iter().cloned());
            modules.push(module);
        }

        Ok(Self { entry, modules })
    }

    pub fn entry(&self) -> &StylesheetModule {
        &self.entry
    }

    /// Referenced modules in discovery order, excluding the entry.
    pub fn includes(&self) -> &[StylesheetModule] {
        &self.modules
    }

    /// The entry followed by every referenced module.
    pub fn modules(&self) -> impl Iterator<Item = &StylesheetModule> {
        std::iter::once(&self.entry).chain(self.modules.iter())
    }

    pub fn module(&self, href: &str) -> Option<&StylesheetModule> {
        self.modules().find(|module| module.href == href)
    }

    /// Encoding the result is written in, as declared by `xsl:output`.
    /// The entry stylesheet takes precedence over the modules it pulls in.
    pub fn output_encoding(&self) -> Option<&str> {
        self.modules().find_map(|module| module.output_encoding.as_deref())
    }
}

fn scan(href: String, source: String) -> Result<StylesheetModule, TransformError> {
    let (references, output_encoding) = {
        let doc = roxmltree::Document::parse(&source).map_err(|e| TransformError::Stylesheet {
            href: href.clone(),
            message: e.to_string(),
        })?;
        let output_encoding = doc
            .root_element()
            .children()
            .filter(|n| n.tag_name().namespace() == Some(XSLT_NAMESPACE))
            .filter(|n| n.tag_name().name() == "output")
            .find_map(|n| n.attribute("encoding"))
            .map(str::to_string);
        (find_references(&href, &source, &doc)?, output_encoding)
    };
    Ok(StylesheetModule {
        href,
        source,
        references,
        output_encoding,
    })
}

fn find_references(
    href: &str,
    source: &str,
    doc: &roxmltree::Document<'_>,
) -> Result<Vec<Reference>, TransformError> {
    let mut references = Vec::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let tag = node.tag_name();
        if tag.namespace() != Some(XSLT_NAMESPACE) {
            continue;
        }
        let kind = match tag.name() {
            "include" => ReferenceKind::Include,
            "import" => ReferenceKind::Import,
            _ => continue,
        };
        let written = node.attribute("href").ok_or_else(|| TransformError::Stylesheet {
            href: href.to_string(),
            message: format!("xsl:{} without an href attribute", tag.name()),
        })?;
        let span =
            href_value_span(source, node.range().start).ok_or_else(|| TransformError::Stylesheet {
                href: href.to_string(),
                message: format!("cannot locate the href of xsl:{}", tag.name()),
            })?;
        references.push(Reference {
            kind,
            written: written.to_string(),
            resolved: resolve_href(href, written),
            span,
        });
    }
    Ok(references)
}

/// Locate the raw `href` value in the start tag beginning at `tag_start`.
/// The document has already been parsed, so the tag is well-formed.
fn href_value_span(source: &str, tag_start: usize) -> Option<Range<usize>> {
    let bytes = source.as_bytes();
    let skip_space = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        i
    };

    let mut i = tag_start + 1;
    while bytes
        .get(i)
        .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>' && *b != b'/')
    {
        i += 1;
    }
    loop {
        i = skip_space(i);
        let name_start = i;
        while bytes
            .get(i)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = &source[name_start..i];
        i = skip_space(i);
        if bytes.get(i) != Some(&b'=') {
            return None;
        }
        i = skip_space(i + 1);
        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_end = value_start + source[value_start..].find(quote as char)?;
        if name == "href" {
            return Some(value_start..value_end);
        }
        i = value_end + 1;
    }
}

/// Resolve `href` against the href of the module that references it.
pub fn resolve_href(base: &str, href: &str) -> String {
    if href.contains("://") || Path::new(href).is_absolute() {
        return href.to_string();
    }
    let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(href))
        .to_string_lossy()
        .into_owned()
}
