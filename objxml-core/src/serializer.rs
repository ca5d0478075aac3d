//! Object graph → XML tree serialization
//!
//! A [`Serializer`] walks a set of named root values ([`Bindings`]) and builds
//! a fresh [`Document`] for every call. Each value is classified once (see
//! [`crate::shape`]) and dispatched on its shape:
//!
//! - named values (bindings, record fields) become a child tagged with the
//!   normalized name, or nothing at all when the value is absent;
//! - sequence elements become `<item>` children, mapping entries
//!   `<item key="...">` children;
//! - relational records follow the relational protocol below;
//! - everything else becomes text through `Display`.
//!
//! Relational records
//!
//!     The record's identity goes into an `id` attribute and its key is pushed
//!     on the traversal stack for the duration of the record. Columns are
//!     written in declared order: nulls are skipped, excluded foreign keys are
//!     written as the referenced identity, and a foreign key whose target is
//!     already on the stack is dropped silently. Joins follow the columns; an
//!     excluded join produces no element at all.
//!
//!     The stack holds the current path only. It is owned by a single
//!     top-level call and popped on every exit from a record, so sibling
//!     subtrees never see each other's entries.
//!
//! Any error aborts the call and the partially built document is dropped.

use crate::error::{Error, InvalidNameError, SerializeError};
use crate::names::{is_xml_name, to_tag_name};
use crate::relational::{Column, ColumnValue, RecordKey, RelationalRecord};
use crate::shape::{Classify, Member, Shape};
use crate::tree::{Document, NodeId, RenderOptions, TreeSink};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use tracing::{debug, trace};

/// Root element name used when none is configured.
pub const DEFAULT_ROOT_TAG: &str = "root-wrapper-tag";

/// Element name for sequence elements, mapping entries and join rows.
pub const ITEM_TAG: &str = "item";

const KEY_ATTRIBUTE: &str = "key";
const ID_ATTRIBUTE: &str = "id";

/// Relationships that must not be traversed, as `(kind, relationship)` pairs.
///
/// An excluded foreign key is written as the referenced row's identity; an
/// excluded join is left out entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exclusions {
    pairs: BTreeMap<String, BTreeSet<String>>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Exclusions::insert`].
    pub fn with(mut self, kind: impl Into<String>, relationship: impl Into<String>) -> Self {
        self.insert(kind, relationship);
        self
    }

    /// Returns `false` if the pair was already present.
    pub fn insert(&mut self, kind: impl Into<String>, relationship: impl Into<String>) -> bool {
        self.pairs
            .entry(kind.into())
            .or_default()
            .insert(relationship.into())
    }

    pub fn contains(&self, kind: &str, relationship: &str) -> bool {
        self.pairs
            .get(kind)
            .is_some_and(|names| names.contains(relationship))
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pairs ordered by kind, then relationship.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().flat_map(|(kind, names)| {
            names
                .iter()
                .map(move |name| (kind.as_str(), name.as_str()))
        })
    }
}

impl<K: Into<String>, R: Into<String>> FromIterator<(K, R)> for Exclusions {
    fn from_iter<I: IntoIterator<Item = (K, R)>>(iter: I) -> Self {
        let mut exclusions = Exclusions::new();
        for (kind, relationship) in iter {
            exclusions.insert(kind, relationship);
        }
        exclusions
    }
}

/// Settings for one [`Serializer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Name of the document's root element. Used verbatim, not normalized.
    pub root_tag_name: String,
    pub exclusions: Exclusions,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            root_tag_name: DEFAULT_ROOT_TAG.to_string(),
            exclusions: Exclusions::new(),
        }
    }
}

impl SerializerOptions {
    pub fn with_root_tag_name(mut self, name: impl Into<String>) -> Self {
        self.root_tag_name = name.into();
        self
    }

    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn exclude(mut self, kind: impl Into<String>, relationship: impl Into<String>) -> Self {
        self.exclusions.insert(kind, relationship);
        self
    }
}

/// Named root values, serialized in the order they were bound.
///
/// ```ignore
/// let bindings = Bindings::new()
///     .bind("firstName", &"Michael Alyn")
///     .bind("listOfNumbers", &vec![1, 2]);
/// ```
#[derive(Default)]
pub struct Bindings<'a> {
    entries: Vec<(Cow<'a, str>, Member<'a>)>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<T: Classify + 'a>(mut self, name: impl Into<Cow<'a, str>>, value: &'a T) -> Self {
        self.insert(name, Member::Borrowed(value));
        self
    }

    /// Bind a value the bindings take ownership of.
    pub fn bind_owned<T: Classify + 'a>(mut self, name: impl Into<Cow<'a, str>>, value: T) -> Self {
        self.insert(name, Member::owned(value));
        self
    }

    pub fn insert(&mut self, name: impl Into<Cow<'a, str>>, value: Member<'a>) {
        self.entries.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Classify)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_ref(), value.get()))
    }
}

impl<'a, N, T> FromIterator<(N, &'a T)> for Bindings<'a>
where
    N: Into<Cow<'a, str>>,
    T: Classify + 'a,
{
    fn from_iter<I: IntoIterator<Item = (N, &'a T)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, Member::Borrowed(value));
        }
        bindings
    }
}

/// Serializes value graphs into XML documents.
///
/// A serializer holds configuration only. Every call builds and returns its
/// own [`Document`], so documents from earlier calls stay valid and a
/// serializer can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    options: SerializerOptions,
}

impl Serializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// Serialize each binding under a child of the root element named after
    /// the binding. Absent values are skipped.
    pub fn serialize(&self, bindings: &Bindings<'_>) -> Result<Document, SerializeError> {
        let mut document = Document::new();
        self.serialize_into(&mut document, bindings)?;
        debug!(
            root = %self.options.root_tag_name,
            nodes = document.len(),
            "serialized document"
        );
        Ok(document)
    }

    /// Serialize one value directly into the root element.
    pub fn serialize_single(&self, value: &dyn Classify) -> Result<Document, SerializeError> {
        let mut document = Document::new();
        self.serialize_single_into(&mut document, value)?;
        debug!(
            root = %self.options.root_tag_name,
            nodes = document.len(),
            "serialized single value"
        );
        Ok(document)
    }

    /// [`Serializer::serialize`] against any [`TreeSink`]. Returns the root.
    pub fn serialize_into<S: TreeSink>(
        &self,
        sink: &mut S,
        bindings: &Bindings<'_>,
    ) -> Result<NodeId, SerializeError> {
        debug!(
            root = %self.options.root_tag_name,
            bindings = bindings.len(),
            exclusions = self.options.exclusions.len(),
            "serializing bindings"
        );
        let root = self.create_root(sink)?;
        let mut traversal = Traversal::new(sink, &self.options.exclusions);
        for (name, value) in bindings.iter() {
            traversal.named(root, name, value)?;
        }
        Ok(root)
    }

    /// [`Serializer::serialize_single`] against any [`TreeSink`].
    pub fn serialize_single_into<S: TreeSink>(
        &self,
        sink: &mut S,
        value: &dyn Classify,
    ) -> Result<NodeId, SerializeError> {
        let root = self.create_root(sink)?;
        Traversal::new(sink, &self.options.exclusions).item(root, value)?;
        Ok(root)
    }

    fn create_root<S: TreeSink>(&self, sink: &mut S) -> Result<NodeId, SerializeError> {
        let name = &self.options.root_tag_name;
        if !is_xml_name(name) {
            return Err(InvalidNameError::new(name.as_str()).into());
        }
        Ok(sink.create_root(name)?)
    }
}

/// Serialize `bindings` and render the resulting document as text.
pub fn to_string(
    options: &SerializerOptions,
    render: &RenderOptions,
    bindings: &Bindings<'_>,
) -> Result<String, Error> {
    let document = Serializer::new(options.clone()).serialize(bindings)?;
    Ok(document.render(render)?)
}

/// State of one top-level serialization call.
struct Traversal<'s, S> {
    sink: &'s mut S,
    exclusions: &'s Exclusions,
    /// Records on the path from the root to the current node.
    stack: Vec<RecordKey>,
}

impl<'s, S: TreeSink> Traversal<'s, S> {
    fn new(sink: &'s mut S, exclusions: &'s Exclusions) -> Self {
        Self {
            sink,
            exclusions,
            stack: Vec::new(),
        }
    }

    /// A named value: a child element tagged with the normalized name.
    fn named(
        &mut self,
        parent: NodeId,
        name: &str,
        value: &dyn Classify,
    ) -> Result<(), SerializeError> {
        let tag = to_tag_name(name)?;
        let shape = value.classify();
        if let Shape::Absent = shape {
            return Ok(());
        }
        let node = self.sink.create_child(parent, &tag)?;
        self.emit(node, shape)
    }

    /// Serialize `value` into an existing node.
    fn item(&mut self, node: NodeId, value: &dyn Classify) -> Result<(), SerializeError> {
        self.emit(node, value.classify())
    }

    fn emit(&mut self, node: NodeId, shape: Shape<'_>) -> Result<(), SerializeError> {
        match shape {
            Shape::Absent => Ok(()),
            Shape::Sequence(members) => {
                for member in members {
                    let item = self.sink.create_child(node, ITEM_TAG)?;
                    self.item(item, member.get())?;
                }
                Ok(())
            }
            Shape::Mapping(entries) => {
                for (key, member) in entries {
                    let item = self.sink.create_child(node, ITEM_TAG)?;
                    self.sink.set_attribute(item, KEY_ATTRIBUTE, &key)?;
                    self.item(item, member.get())?;
                }
                Ok(())
            }
            Shape::Relational(record) => self.relational(node, record),
            Shape::Record(fields) => {
                for (name, member) in fields {
                    self.named(node, &name, member.get())?;
                }
                Ok(())
            }
            Shape::Scalar(value) => self.text(node, &*value),
        }
    }

    fn relational(
        &mut self,
        node: NodeId,
        record: &dyn RelationalRecord,
    ) -> Result<(), SerializeError> {
        let key = record.key();
        self.sink.set_attribute(node, ID_ATTRIBUTE, &key.identity)?;
        trace!(record = %key, depth = self.stack.len(), "entering relational record");

        self.stack.push(key);
        let result = self.relational_body(node, record);
        self.stack.pop();
        result
    }

    fn relational_body(
        &mut self,
        node: NodeId,
        record: &dyn RelationalRecord,
    ) -> Result<(), SerializeError> {
        let kind = record.kind();

        for Column { name, value } in record.columns() {
            if value.is_null() {
                continue;
            }
            let tag = to_tag_name(&name)?;
            match value {
                ColumnValue::Null => {}
                ColumnValue::Reference(target) => {
                    if self.exclusions.contains(kind, &name) {
                        self.text_child(node, &tag, &target.identity())?;
                    } else if self.on_stack(&target.key()) {
                        trace!(kind, column = %name, target = %target.key(), "suppressed cyclic reference");
                    } else {
                        let child = self.sink.create_child(node, &tag)?;
                        self.relational(child, target.as_ref())?;
                    }
                }
                ColumnValue::Timestamp(timestamp) => self.text_child(node, &tag, &timestamp)?,
                ColumnValue::Value(value) => self.text_child(node, &tag, &*value)?,
            }
        }

        for join in record.joins() {
            if self.exclusions.contains(kind, &join.name) {
                trace!(kind, join = %join.name, "skipped excluded join");
                continue;
            }
            let join_node = self.sink.create_child(node, &to_tag_name(&join.name)?)?;
            for row in &join.rows {
                let item = self.sink.create_child(join_node, ITEM_TAG)?;
                self.relational(item, row.as_ref())?;
            }
        }

        Ok(())
    }

    fn on_stack(&self, key: &RecordKey) -> bool {
        self.stack.contains(key)
    }

    fn text_child(
        &mut self,
        parent: NodeId,
        tag: &str,
        value: &dyn fmt::Display,
    ) -> Result<(), SerializeError> {
        let node = self.sink.create_child(parent, tag)?;
        self.text(node, value)
    }

    fn text(&mut self, node: NodeId, value: &dyn fmt::Display) -> Result<(), SerializeError> {
        let mut text = String::new();
        write!(text, "{value}").map_err(|_| SerializeError::UnrenderableValue)?;
        Ok(self.sink.set_text(node, &text)?)
    }
}
