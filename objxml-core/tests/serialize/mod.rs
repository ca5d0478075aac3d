//! Serializer tests
//!
//! Whole documents built from plain values and from relational records.

mod relational;
mod values;
