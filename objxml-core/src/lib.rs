//! Object graphs to XML, and XML through XSLT
//!
//!     This crate turns in-memory values (records, collections, maps and rows from a relational
//!     mapping layer) into an XML tree meant for templating: hand the tree to an XSL stylesheet
//!     and get HTML, a report or any other text out the other side.
//!
//!     TLDR:
//!         - Values describe themselves through the Classify trait; the serializer never inspects
//!           concrete types.
//!         - Every generated tag name goes through the name normalizer (bumpy-case to hyphenated).
//!         - Relational rows follow foreign keys and joins, with a traversal stack breaking cycles.
//!         - Serialization is one-directional. There is no way back from XML to values.
//!
//! Architecture
//!
//!     The serializer core is small and free of I/O. It classifies each value into a closed set
//!     of shapes (./shape.rs) and writes into an abstract tree sink (./tree/mod.rs). Everything
//!     around it is a collaborator that can be swapped: the tree is rendered by quick-xml, the
//!     transform step is an engine trait with an xsltproc implementation behind a feature flag.
//!
//!     This is a pure lib: it powers objxml-cli but does not print, read env vars (beyond the
//!     xsltproc override) or install a tracing subscriber.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── names.rs                # Identifier -> tag name normalization
//!     ├── shape.rs                # Classify trait, Shape, plain records
//!     ├── relational.rs           # RelationalRecord capability
//!     ├── serializer.rs           # The recursive walk
//!     ├── tree
//!     │   ├── mod.rs              # TreeSink + Document arena
//!     │   └── render.rs           # Text output (encoding, indentation)
//!     ├── transform
//!     │   ├── resolver.rs         # Stylesheet include resolution
//!     │   ├── stylesheet.rs       # Stylesheet bundles
//!     │   └── xsltproc.rs         # xsltproc engine
//!     ├── publish.rs              # Render / transform / write in one call
//!     └── lib.rs
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     ├── common                  # In-memory relational fixtures
//!     ├── serialize               # Serializer behaviour on whole documents
//!     └── transform               # Stylesheet bundles and the xsltproc engine
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include these
//!     in the mod.
//!
//! Core Algorithm
//!
//!     The walk dispatches on the shape of each value, in a fixed priority order: absent values
//!     produce nothing, sequences and mappings produce `<item>` children, relational records
//!     follow their columns and joins, plain records produce one child per field, and anything
//!     else becomes text. Relational records push their (kind, identity) key while their
//!     columns are written; a foreign key pointing at a record already on the path is dropped,
//!     which is what keeps cyclic graphs finite. Callers can also exclude relationships by
//!     (kind, name): an excluded foreign key is written as the referenced identity, an excluded
//!     join is left out.
//!
//!     Recursion depth on plain records, sequences and mappings is bounded only by the input.
//!     Self-referencing plain values (through Rc cycles, say) will not terminate.
//!
//! Library Choices
//!
//!     quick-xml writes the output, roxmltree reads stylesheets, chrono formats date/time values
//!     and regex drives the name normalizer. XSLT itself is left to libxslt: we shell out to
//!     xsltproc instead of binding the C library.
//!
pub mod error;
pub mod names;
pub mod publish;
pub mod relational;
pub mod serializer;
pub mod shape;
pub mod transform;
pub mod tree;

pub use error::{Error, InvalidNameError, RenderError, SerializeError, TransformError, TreeError};
pub use names::to_tag_name;
pub use publish::{publish, PublishArtifact, PublishSpec};
pub use relational::{Column, ColumnValue, Join, RecordKey, Relational, RelationalRecord, Timestamp};
pub use serializer::{Bindings, Exclusions, Serializer, SerializerOptions, DEFAULT_ROOT_TAG};
pub use shape::{Classify, Member, QueryResults, Record, Scalar, Shape};
pub use tree::{Document, Encoding, NodeId, RenderOptions, TreeSink};

/// Serialize `bindings` with default options and render them as compact ASCII XML.
pub fn to_xml_string(bindings: &Bindings<'_>) -> Result<String, Error> {
    serializer::to_string(
        &SerializerOptions::default(),
        &RenderOptions::default(),
        bindings,
    )
}
