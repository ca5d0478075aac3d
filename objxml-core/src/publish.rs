//! Document publishing pipeline.
//!
//! Turns a serialized [`Document`] into its final text in one call: render
//! it, optionally run it through a stylesheet, and either hand the result
//! back or write it to disk.
//!
//! For more control over the individual steps, use [`Document::render`] and
//! [`crate::transform::apply_to_document`] directly.

use crate::error::Error;
use crate::transform::{apply_to_document, Params, Stylesheet, XsltEngine};
use crate::tree::{Document, RenderOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Specifies how to publish a document.
///
/// ```ignore
/// let spec = PublishSpec::new(&document)
///     .with_render(RenderOptions::default().pretty(true))
///     .with_stylesheet(&engine, &stylesheet)
///     .with_param("title", "People")
///     .with_output_path("people.html");
/// ```
pub struct PublishSpec<'a> {
    pub document: &'a Document,
    pub render: RenderOptions,
    /// Stylesheet applied to the rendered document, with the engine to run it.
    pub transform: Option<(&'a dyn XsltEngine, &'a Stylesheet)>,
    pub params: Params,
    /// If provided, content is written to this path instead of returned.
    pub output: Option<PathBuf>,
}

impl<'a> PublishSpec<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            render: RenderOptions::default(),
            transform: None,
            params: Params::new(),
            output: None,
        }
    }

    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_stylesheet(mut self, engine: &'a dyn XsltEngine, stylesheet: &'a Stylesheet) -> Self {
        self.transform = Some((engine, stylesheet));
        self
    }

    /// Adds a string parameter for the stylesheet.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params = self.params.string(name, value);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }
}

/// The output from a successful publish operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishArtifact {
    /// Content held in memory (no output path given).
    InMemory(String),
    /// Path to the written file.
    File(PathBuf),
}

/// Publishes a document as described by `spec`.
///
/// Without a stylesheet the rendered XML is produced, with a stylesheet the
/// engine's result. Either way written files are encoded in the render
/// encoding.
///
/// # Errors
///
/// Returns [`Error`] if rendering, the transform or file I/O fails.
pub fn publish(spec: PublishSpec<'_>) -> Result<PublishArtifact, Error> {
    match (spec.transform, spec.output) {
        (Some((engine, stylesheet)), output) => {
            let text =
                apply_to_document(engine, stylesheet, spec.document, &spec.params, &spec.render)?;
            match output {
                Some(path) => write_to_path(path, spec.render.encoding.encode(&text))
                    .map(PublishArtifact::File),
                None => Ok(PublishArtifact::InMemory(text)),
            }
        }
        (None, Some(path)) => {
            let bytes = spec.document.render_bytes(&spec.render)?;
            write_to_path(path, bytes).map(PublishArtifact::File)
        }
        (None, None) => Ok(PublishArtifact::InMemory(spec.document.render(&spec.render)?)),
    }
}

fn write_to_path(path: PathBuf, bytes: Vec<u8>) -> Result<PathBuf, Error> {
    fs::write(&path, &bytes).map_err(|source| Error::Output {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(path)
}
