//! Error types for serialization, rendering and transformation

use thiserror::Error;

/// An identifier cannot become a tag name.
///
/// Raised by [`crate::names::to_tag_name`] and fatal to the serialization
/// that triggered it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Name \"{name}\" is invalid: only letters and numbers are allowed")]
pub struct InvalidNameError {
    pub name: String,
}

impl InvalidNameError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Violations of the output tree's structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("document already has a root element <{0}>")]
    RootExists(String),
    #[error("node {0} does not belong to this document")]
    UnknownNode(usize),
    #[error("element <{0}> cannot hold both text and child elements")]
    MixedContent(String),
}

/// Errors raised while turning a value graph into a [`crate::tree::Document`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    /// A scalar's `Display` implementation reported a formatting failure.
    #[error("value could not be rendered as text")]
    UnrenderableValue,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Errors raised while rendering a document to text.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unsupported output encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),

    #[error("document has no root element")]
    EmptyDocument,
}

impl From<quick_xml::Error> for RenderError {
    fn from(err: quick_xml::Error) -> Self {
        RenderError::Write(std::io::Error::other(err.to_string()))
    }
}

/// Errors raised by the stylesheet boundary.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to read stylesheet '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stylesheet '{href}' was not found")]
    IncludeNotFound { href: String },

    #[error("stylesheet '{href}' is not well-formed XML: {message}")]
    Stylesheet { href: String, message: String },

    #[error("XSLT engine not available: {0}")]
    EngineNotFound(String),

    #[error("XSLT engine failed: {0}")]
    Engine(String),
}

/// Any failure along the serialize → render → transform → publish pipeline.
///
/// Stage errors are carried unchanged so callers can still match on them.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to write '{path}': {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
