//! In-memory relational fixtures.
//!
//! A tiny "database" of people, their phone numbers and websites. Rows are
//! plain structs; the `Person`, `PhoneNumber` and `Url` views borrow the
//! database and implement `RelationalRecord` on top of it, the way an ORM
//! adapter would.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use objxml_core::{
    Classify, Column, ColumnValue, Join, RelationalRecord, Shape,
};

pub struct PersonRow {
    pub id: u32,
    pub first_name: String,
    pub middle_initial: Option<String>,
    pub last_name: String,
    pub website: Option<u32>,
    pub joined: Option<NaiveDateTime>,
}

pub struct PhoneRow {
    pub id: u32,
    pub person: u32,
    pub phone_type: &'static str,
    pub country_code: i32,
    pub number: String,
}

pub struct UrlRow {
    pub id: u32,
    pub address: String,
}

#[derive(Default)]
pub struct Database {
    pub people: Vec<PersonRow>,
    pub phones: Vec<PhoneRow>,
    pub urls: Vec<UrlRow>,
}

impl Database {
    /// Michael Alyn Miller with a website and two phones, and Bob F. Bar with
    /// one phone.
    pub fn sample() -> Self {
        let mut db = Database::default();
        db.urls.push(UrlRow {
            id: 1,
            address: "http://www.strangeGizmo.com/".to_string(),
        });
        db.people.push(PersonRow {
            id: 1,
            first_name: "Michael Alyn".to_string(),
            middle_initial: None,
            last_name: "Miller".to_string(),
            website: Some(1),
            joined: None,
        });
        db.people.push(PersonRow {
            id: 2,
            first_name: "Bob".to_string(),
            middle_initial: Some("F".to_string()),
            last_name: "Bar".to_string(),
            website: None,
            joined: None,
        });
        db.add_phone(1, "voice", "555-1212");
        db.add_phone(1, "cell", "123-4567");
        db.add_phone(2, "voice", "262-2620");
        db
    }

    pub fn add_phone(&mut self, person: u32, phone_type: &'static str, number: &str) -> u32 {
        let id = self.phones.len() as u32 + 1;
        self.phones.push(PhoneRow {
            id,
            person,
            phone_type,
            country_code: 1,
            number: number.to_string(),
        });
        id
    }

    pub fn person(&self, id: u32) -> Option<Person<'_>> {
        self.people
            .iter()
            .find(|row| row.id == id)
            .map(|row| Person { db: self, row })
    }

    pub fn phone(&self, id: u32) -> Option<PhoneNumber<'_>> {
        self.phones
            .iter()
            .find(|row| row.id == id)
            .map(|row| PhoneNumber { db: self, row })
    }

    pub fn url(&self, id: u32) -> Option<Url<'_>> {
        self.urls
            .iter()
            .find(|row| row.id == id)
            .map(|row| Url { row })
    }

    /// `SELECT * FROM person`
    pub fn select_people(&self) -> Vec<Person<'_>> {
        self.people.iter().map(|row| Person { db: self, row }).collect()
    }
}

pub fn joined_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid fixture date")
}

pub struct Person<'db> {
    db: &'db Database,
    row: &'db PersonRow,
}

impl RelationalRecord for Person<'_> {
    fn kind(&self) -> &str {
        "Person"
    }

    fn identity(&self) -> String {
        self.row.id.to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("firstName", ColumnValue::value(&self.row.first_name)),
            Column::new(
                "middleInitial",
                ColumnValue::optional(self.row.middle_initial.as_ref()),
            ),
            Column::new("lastName", ColumnValue::value(&self.row.last_name)),
            Column::new(
                "website",
                ColumnValue::optional_reference(self.row.website.and_then(|id| self.db.url(id))),
            ),
            Column::new(
                "joined",
                self.row
                    .joined
                    .map_or(ColumnValue::Null, ColumnValue::timestamp),
            ),
        ]
    }

    fn joins(&self) -> Vec<Join<'_>> {
        let phones = self
            .db
            .phones
            .iter()
            .filter(|phone| phone.person == self.row.id)
            .map(|row| PhoneNumber { db: self.db, row });
        vec![Join::from_rows("phoneNumbers", phones)]
    }
}

impl Classify for Person<'_> {
    fn classify(&self) -> Shape<'_> {
        Shape::Relational(self)
    }
}

pub struct PhoneNumber<'db> {
    db: &'db Database,
    row: &'db PhoneRow,
}

impl RelationalRecord for PhoneNumber<'_> {
    fn kind(&self) -> &str {
        "PhoneNumber"
    }

    fn identity(&self) -> String {
        self.row.id.to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new(
                "person",
                ColumnValue::optional_reference(self.db.person(self.row.person)),
            ),
            Column::new("phoneType", ColumnValue::value(self.row.phone_type)),
            Column::new("countryCode", ColumnValue::value(self.row.country_code)),
            Column::new("number", ColumnValue::value(&self.row.number)),
        ]
    }
}

impl Classify for PhoneNumber<'_> {
    fn classify(&self) -> Shape<'_> {
        Shape::Relational(self)
    }
}

pub struct Url<'db> {
    row: &'db UrlRow,
}

impl RelationalRecord for Url<'_> {
    fn kind(&self) -> &str {
        "URL"
    }

    fn identity(&self) -> String {
        self.row.id.to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        vec![Column::new("address", ColumnValue::value(&self.row.address))]
    }
}

impl Classify for Url<'_> {
    fn classify(&self) -> Shape<'_> {
        Shape::Relational(self)
    }
}

/// The body of a rendered document: everything after the XML declaration,
/// without the trailing newline.
pub fn body(xml: &str) -> &str {
    xml.split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or(xml)
        .trim_end_matches('\n')
}
