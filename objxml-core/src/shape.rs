//! Value classification
//!
//! The serializer accepts anything that implements [`Classify`]. Classifying a
//! value yields exactly one [`Shape`], and the serializer dispatches on that
//! shape with a single `match`:
//!
//! | Shape        | Output                                                        |
//! |--------------|---------------------------------------------------------------|
//! | `Absent`     | nothing at all                                                |
//! | `Sequence`   | one `<item>` per element, in iteration order                  |
//! | `Mapping`    | one `<item key="...">` per entry, in the map's iteration order |
//! | `Relational` | the relational record protocol (see [`crate::relational`])    |
//! | `Record`     | one child per named field, absent fields omitted              |
//! | `Scalar`     | text content, produced through `Display`                      |
//!
//! Implementations are provided for the standard collections, primitives,
//! strings, `chrono` date/time values and `serde_json::Value`. Structs opt in
//! as plain records with [`plain_record!`](crate::plain_record), or are built
//! dynamically with [`Record`].

use crate::relational::Timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, TimeZone};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::relational::RelationalRecord;

/// Anything the serializer can walk.
pub trait Classify {
    fn classify(&self) -> Shape<'_>;
}

/// A child value yielded by a sequence, mapping or record.
///
/// Most containers lend out references to values they own; lazily produced
/// values (query results, computed fields) are handed over as owned boxes.
pub enum Member<'a> {
    Borrowed(&'a dyn Classify),
    Owned(Box<dyn Classify + 'a>),
}

impl<'a> Member<'a> {
    pub fn owned<T: Classify + 'a>(value: T) -> Self {
        Member::Owned(Box::new(value))
    }

    pub fn get(&self) -> &dyn Classify {
        match self {
            Member::Borrowed(value) => *value,
            Member::Owned(value) => value.as_ref(),
        }
    }
}

pub type Members<'a> = Box<dyn Iterator<Item = Member<'a>> + 'a>;
pub type Entries<'a> = Box<dyn Iterator<Item = (String, Member<'a>)> + 'a>;
pub type Fields<'a> = Box<dyn Iterator<Item = (Cow<'a, str>, Member<'a>)> + 'a>;

/// The closed set of shapes a value can take.
pub enum Shape<'a> {
    Absent,
    Sequence(Members<'a>),
    Mapping(Entries<'a>),
    Relational(&'a dyn RelationalRecord),
    /// A plain record: named fields, each serialized under its own tag.
    Record(Fields<'a>),
    Scalar(Box<dyn fmt::Display + 'a>),
}

impl<'a> Shape<'a> {
    /// A sequence over borrowed elements.
    pub fn sequence<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: 'a,
        T: Classify + 'a,
    {
        Shape::Sequence(Box::new(
            items.into_iter().map(|item| Member::Borrowed(item)),
        ))
    }

    /// A mapping over borrowed key/value pairs; keys are stringified.
    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
        I::IntoIter: 'a,
        K: fmt::Display + ?Sized + 'a,
        V: Classify + 'a,
    {
        Shape::Mapping(Box::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), Member::Borrowed(value))),
        ))
    }

    pub fn scalar<T: fmt::Display + 'a>(value: T) -> Self {
        Shape::Scalar(Box::new(value))
    }

    /// Short name of the shape, used in trace output.
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Absent => "absent",
            Shape::Sequence(_) => "sequence",
            Shape::Mapping(_) => "mapping",
            Shape::Relational(_) => "relational",
            Shape::Record(_) => "record",
            Shape::Scalar(_) => "scalar",
        }
    }
}

impl<T: Classify> Classify for Option<T> {
    fn classify(&self) -> Shape<'_> {
        match self {
            Some(value) => value.classify(),
            None => Shape::Absent,
        }
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn classify(&self) -> Shape<'_> {
        (**self).classify()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn classify(&self) -> Shape<'_> {
        self.as_ref().classify()
    }
}

impl<T: Classify + ?Sized> Classify for Rc<T> {
    fn classify(&self) -> Shape<'_> {
        self.as_ref().classify()
    }
}

impl<T: Classify + ?Sized> Classify for Arc<T> {
    fn classify(&self) -> Shape<'_> {
        self.as_ref().classify()
    }
}

impl<T: Classify> Classify for [T] {
    fn classify(&self) -> Shape<'_> {
        Shape::sequence(self)
    }
}

impl<T: Classify, const N: usize> Classify for [T; N] {
    fn classify(&self) -> Shape<'_> {
        Shape::sequence(self)
    }
}

impl<T: Classify> Classify for Vec<T> {
    fn classify(&self) -> Shape<'_> {
        Shape::sequence(self)
    }
}

impl<T: Classify> Classify for VecDeque<T> {
    fn classify(&self) -> Shape<'_> {
        Shape::sequence(self)
    }
}

impl<K: fmt::Display, V: Classify, S> Classify for HashMap<K, V, S> {
    fn classify(&self) -> Shape<'_> {
        Shape::mapping(self)
    }
}

impl<K: fmt::Display, V: Classify> Classify for BTreeMap<K, V> {
    fn classify(&self) -> Shape<'_> {
        Shape::mapping(self)
    }
}

macro_rules! scalar_classify {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Classify for $ty {
                fn classify(&self) -> Shape<'_> {
                    Shape::Scalar(Box::new(self))
                }
            }
        )*
    };
}

scalar_classify!(
    str, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl Classify for Cow<'_, str> {
    fn classify(&self) -> Shape<'_> {
        Shape::Scalar(Box::new(&**self))
    }
}

impl Classify for Timestamp {
    fn classify(&self) -> Shape<'_> {
        Shape::Scalar(Box::new(self))
    }
}

impl Classify for NaiveDate {
    fn classify(&self) -> Shape<'_> {
        Shape::scalar(Timestamp::Date(*self))
    }
}

impl Classify for NaiveDateTime {
    fn classify(&self) -> Shape<'_> {
        Shape::scalar(Timestamp::DateTime(*self))
    }
}

impl<Tz: TimeZone> Classify for DateTime<Tz> {
    fn classify(&self) -> Shape<'_> {
        let fixed = self.with_timezone(&self.offset().fix());
        Shape::scalar(Timestamp::Zoned(fixed))
    }
}

impl Classify for serde_json::Value {
    fn classify(&self) -> Shape<'_> {
        use serde_json::Value;
        match self {
            Value::Null => Shape::Absent,
            Value::Bool(value) => Shape::Scalar(Box::new(value)),
            Value::Number(value) => Shape::Scalar(Box::new(value)),
            Value::String(value) => Shape::Scalar(Box::new(value)),
            Value::Array(items) => Shape::sequence(items),
            Value::Object(map) => Shape::Mapping(Box::new(
                map.iter()
                    .map(|(key, value)| (key.clone(), Member::Borrowed(value))),
            )),
        }
    }
}

/// Forces any displayable value into the scalar shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalar<T>(pub T);

impl<T: fmt::Display> Classify for Scalar<T> {
    fn classify(&self) -> Shape<'_> {
        Shape::Scalar(Box::new(&self.0))
    }
}

/// A dynamically built plain record: an ordered bag of named fields.
///
/// ```ignore
/// let address = Record::new()
///     .field("street", "1 Main St")
///     .field("zipCode", 12345);
/// ```
#[derive(Default)]
pub struct Record<'a> {
    fields: Vec<(Cow<'a, str>, Box<dyn Classify + 'a>)>,
}

impl<'a> Record<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: Classify + 'a>(mut self, name: impl Into<Cow<'a, str>>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Classify + 'a>(&mut self, name: impl Into<Cow<'a, str>>, value: T) {
        self.fields.push((name.into(), Box::new(value)));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Classify for Record<'_> {
    fn classify(&self) -> Shape<'_> {
        Shape::Record(Box::new(self.fields.iter().map(|(name, value)| {
            (Cow::Borrowed(name.as_ref()), Member::Borrowed(value.as_ref()))
        })))
    }
}

/// A lazily fetched row set.
///
/// The fetch closure runs each time the value is classified, so the rows
/// reflect the data source at serialization time.
pub struct QueryResults<'q, T> {
    fetch: Box<dyn Fn() -> Vec<T> + 'q>,
}

impl<'q, T> QueryResults<'q, T> {
    pub fn new(fetch: impl Fn() -> Vec<T> + 'q) -> Self {
        Self {
            fetch: Box::new(fetch),
        }
    }
}

impl<'q, T: Classify + 'q> Classify for QueryResults<'q, T> {
    fn classify(&self) -> Shape<'_> {
        let rows = (self.fetch)();
        Shape::Sequence(Box::new(rows.into_iter().map(Member::owned)))
    }
}

/// Implement [`Classify`] for a struct as a plain record.
///
/// Fields are listed in the order they should be emitted. Rust field names
/// are usually snake_case, which the tag-name normalizer rejects, so a field
/// can carry a bumpy-case name with `as`:
///
/// ```ignore
/// struct Address {
///     street: String,
///     zip_code: Option<u32>,
/// }
///
/// objxml_core::plain_record!(Address { street, zip_code as "zipCode" });
/// ```
#[macro_export]
macro_rules! plain_record {
    ($ty:ty { $($field:ident $(as $name:literal)?),* $(,)? }) => {
        impl $crate::shape::Classify for $ty {
            fn classify(&self) -> $crate::shape::Shape<'_> {
                let fields: ::std::vec::Vec<(
                    ::std::borrow::Cow<'_, str>,
                    $crate::shape::Member<'_>,
                )> = ::std::vec![
                    $((
                        ::std::borrow::Cow::Borrowed($crate::__field_name!($field $(, $name)?)),
                        $crate::shape::Member::Borrowed(&self.$field),
                    )),*
                ];
                $crate::shape::Shape::Record(::std::boxed::Box::new(fields.into_iter()))
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $name:literal) => {
        $name
    };
}
