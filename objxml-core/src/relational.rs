//! Relational record capability
//!
//! Rows coming out of a relational-mapping layer are serialized through a
//! dedicated protocol instead of as plain records: the row's identity becomes
//! an `id` attribute, foreign keys are followed into nested elements, and
//! one-to-many joins become lists of `<item>` rows.
//!
//! The serializer never depends on a concrete ORM. Adapter code implements
//! [`RelationalRecord`] for whatever row type the data layer produces, handing
//! out columns and joins in their declared order:
//!
//! ```ignore
//! impl RelationalRecord for PhoneRow<'_> {
//!     fn kind(&self) -> &str { "PhoneNumber" }
//!     fn identity(&self) -> String { self.id.to_string() }
//!     fn columns(&self) -> Vec<Column<'_>> {
//!         vec![
//!             Column::new("person", ColumnValue::reference(self.person())),
//!             Column::new("number", ColumnValue::value(&self.number)),
//!         ]
//!     }
//! }
//! ```
//!
//! Two records are the same for cycle detection when their [`RecordKey`]s
//! (kind + identity) are equal.

use crate::shape::{Classify, Shape};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use std::borrow::Cow;
use std::fmt;

/// A row of a relational data source.
pub trait RelationalRecord {
    /// The record kind (table or mapped class name), used by exclusions.
    fn kind(&self) -> &str;

    /// The row's identity value, stringified.
    fn identity(&self) -> String;

    /// Columns in declared order.
    fn columns(&self) -> Vec<Column<'_>>;

    /// One-to-many relationships in declared order.
    fn joins(&self) -> Vec<Join<'_>> {
        Vec::new()
    }

    fn key(&self) -> RecordKey {
        RecordKey::new(self.kind(), self.identity())
    }
}

impl Classify for dyn RelationalRecord + '_ {
    fn classify(&self) -> Shape<'_> {
        Shape::Relational(self)
    }
}

/// Wraps a [`RelationalRecord`] so it can be handed to the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relational<R>(pub R);

impl<R: RelationalRecord> Classify for Relational<R> {
    fn classify(&self) -> Shape<'_> {
        Shape::Relational(&self.0)
    }
}

/// Identity of a record on the traversal stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub kind: String,
    pub identity: String,
}

impl RecordKey {
    pub fn new(kind: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identity: identity.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.identity)
    }
}

/// A named column and its current value.
pub struct Column<'a> {
    pub name: Cow<'a, str>,
    pub value: ColumnValue<'a>,
}

impl<'a> Column<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, value: ColumnValue<'a>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The value held by a column.
pub enum ColumnValue<'a> {
    /// SQL NULL; the column is skipped entirely.
    Null,
    /// A foreign key, resolved to the referenced row.
    Reference(Box<dyn RelationalRecord + 'a>),
    /// A date/time-typed column, emitted in ISO-8601 form.
    Timestamp(Timestamp),
    /// Any other column, emitted through `Display`.
    Value(Box<dyn fmt::Display + 'a>),
}

impl<'a> ColumnValue<'a> {
    pub fn value<T: fmt::Display + 'a>(value: T) -> Self {
        ColumnValue::Value(Box::new(value))
    }

    /// `Null` for `None`, otherwise the displayed value.
    pub fn optional<T: fmt::Display + 'a>(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Null, ColumnValue::value)
    }

    pub fn reference<R: RelationalRecord + 'a>(record: R) -> Self {
        ColumnValue::Reference(Box::new(record))
    }

    /// `Null` for a missing reference.
    pub fn optional_reference<R: RelationalRecord + 'a>(record: Option<R>) -> Self {
        record.map_or(ColumnValue::Null, ColumnValue::reference)
    }

    pub fn timestamp(value: impl Into<Timestamp>) -> Self {
        ColumnValue::Timestamp(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

/// A one-to-many relationship and its related rows, in the join's order.
pub struct Join<'a> {
    pub name: Cow<'a, str>,
    pub rows: Vec<Box<dyn RelationalRecord + 'a>>,
}

impl<'a> Join<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, rows: Vec<Box<dyn RelationalRecord + 'a>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a join from concrete rows.
    pub fn from_rows<R, I>(name: impl Into<Cow<'a, str>>, rows: I) -> Self
    where
        R: RelationalRecord + 'a,
        I: IntoIterator<Item = R>,
    {
        let rows = rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn RelationalRecord + 'a>)
            .collect();
        Self::new(name, rows)
    }
}

/// A date/time column value.
///
/// Displays in ISO-8601 form: `YYYY-MM-DD` for dates, and
/// `YYYY-MM-DDTHH:MM:SS` for date-times with microseconds appended only when
/// non-zero and the UTC offset appended for zoned values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl From<NaiveDate> for Timestamp {
    fn from(value: NaiveDate) -> Self {
        Timestamp::Date(value)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::DateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Zoned(value)
    }
}

/// Fractions are shown to the microsecond, and only when that is non-zero.
fn time_pattern(nanosecond: u32) -> &'static str {
    if nanosecond / 1_000 == 0 {
        "%Y-%m-%dT%H:%M:%S"
    } else {
        "%Y-%m-%dT%H:%M:%S%.6f"
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Timestamp::DateTime(datetime) => {
                write!(f, "{}", datetime.format(time_pattern(datetime.nanosecond())))
            }
            Timestamp::Zoned(datetime) => write!(
                f,
                "{}{}",
                datetime.format(time_pattern(datetime.nanosecond())),
                datetime.format("%:z")
            ),
        }
    }
}
