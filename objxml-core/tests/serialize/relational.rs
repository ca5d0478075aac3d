//! Relational records: foreign keys, joins, exclusions and cycles.

use crate::common::{body, joined_at, Database};
use insta::assert_snapshot;
use objxml_core::{
    Bindings, Column, ColumnValue, Exclusions, QueryResults, Relational, RelationalRecord,
    RenderOptions, SerializeError, Serializer, SerializerOptions,
};

fn render_with(options: SerializerOptions, bindings: &Bindings<'_>) -> String {
    let doc = Serializer::new(options).serialize(bindings).unwrap();
    doc.render(&RenderOptions::default()).unwrap()
}

fn render(bindings: &Bindings<'_>) -> String {
    render_with(SerializerOptions::default(), bindings)
}

#[test]
fn test_person_with_website_and_phones() {
    let db = Database::sample();
    let malyn = db.person(1).unwrap();
    let xml = render(&Bindings::new().bind("person", &malyn));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><person id="1"><first-name>Michael Alyn</first-name><last-name>Miller</last-name><website id="1"><address>http://www.strangeGizmo.com/</address></website><phone-numbers><item id="1"><phone-type>voice</phone-type><country-code>1</country-code><number>555-1212</number></item><item id="2"><phone-type>cell</phone-type><country-code>1</country-code><number>123-4567</number></item></phone-numbers></person></root-wrapper-tag>"#);
}

#[test]
fn test_phone_number_includes_its_person() {
    let db = Database::sample();
    let phone = db.phone(1).unwrap();
    let xml = render(&Bindings::new().bind("phoneNumber", &phone));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><phone-number id="1"><person id="1"><first-name>Michael Alyn</first-name><last-name>Miller</last-name><website id="1"><address>http://www.strangeGizmo.com/</address></website><phone-numbers><item id="1"><phone-type>voice</phone-type><country-code>1</country-code><number>555-1212</number></item><item id="2"><phone-type>cell</phone-type><country-code>1</country-code><number>123-4567</number></item></phone-numbers></person><phone-type>voice</phone-type><country-code>1</country-code><number>555-1212</number></phone-number></root-wrapper-tag>"#);
}

#[test]
fn test_excluded_foreign_key_is_written_as_identity() {
    let db = Database::sample();
    let phone = db.phone(1).unwrap();
    let options = SerializerOptions::default().exclude("PhoneNumber", "person");
    let xml = render_with(options, &Bindings::new().bind("phoneNumber", &phone));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><phone-number id="1"><person>1</person><phone-type>voice</phone-type><country-code>1</country-code><number>555-1212</number></phone-number></root-wrapper-tag>"#);
}

#[test]
fn test_excluded_join_leaves_no_node() {
    let db = Database::sample();
    let people = QueryResults::new(|| db.select_people());
    let options = SerializerOptions::default()
        .with_exclusions(Exclusions::new().with("Person", "phoneNumbers"));
    let xml = render_with(options, &Bindings::new().bind("phoneList", &people));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><phone-list><item id="1"><first-name>Michael Alyn</first-name><last-name>Miller</last-name><website id="1"><address>http://www.strangeGizmo.com/</address></website></item><item id="2"><first-name>Bob</first-name><middle-initial>F</middle-initial><last-name>Bar</last-name></item></phone-list></root-wrapper-tag>"#);
    assert!(!xml.contains("phone-numbers"));
}

#[test]
fn test_sibling_paths_do_not_share_the_stack() {
    let db = Database::sample();
    let phones = vec![db.phone(1).unwrap(), db.phone(2).unwrap()];
    let options = SerializerOptions::default().exclude("Person", "phoneNumbers");
    let doc = Serializer::new(options)
        .serialize(&Bindings::new().bind("phones", &phones))
        .unwrap();

    let list = doc.find_path(&["phones"]).unwrap();
    for item in doc.children_named(list, "item") {
        let person = doc.find_child(item, "person").expect("person expanded");
        assert_eq!(doc.attribute(person, "id"), Some("1"));
        assert!(doc.find_child(person, "first-name").is_some());
    }
}

#[test]
fn test_timestamp_columns_use_iso_8601() {
    let mut db = Database::sample();
    db.people[1].joined = Some(joined_at(2006, 3, 1, 14, 5));
    let bob = db.person(2).unwrap();
    let options = SerializerOptions::default().exclude("Person", "phoneNumbers");
    let xml = render_with(options, &Bindings::new().bind("person", &bob));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><person id="2"><first-name>Bob</first-name><middle-initial>F</middle-initial><last-name>Bar</last-name><joined>2006-03-01T14:05:00</joined></person></root-wrapper-tag>"#);
}

#[test]
fn test_serialize_single_record() {
    let db = Database::sample();
    let url = db.url(1).unwrap();
    let doc = Serializer::default().serialize_single(&url).unwrap();
    let xml = doc.render(&RenderOptions::default()).unwrap();

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag id="1"><address>http://www.strangeGizmo.com/</address></root-wrapper-tag>"#);
}

/// Employees whose managers form a loop: 1 → 2 → 3 → 1.
struct Employee {
    id: u32,
    manager: u32,
    depth: u32,
}

impl Employee {
    fn new(id: u32) -> Self {
        Self {
            id,
            manager: id % 3 + 1,
            depth: 0,
        }
    }
}

impl RelationalRecord for Employee {
    fn kind(&self) -> &str {
        "Employee"
    }

    fn identity(&self) -> String {
        self.id.to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        // Guards the test itself against runaway recursion if cycle
        // suppression ever breaks.
        assert!(self.depth < 10, "cycle was not suppressed");
        let manager = Employee {
            depth: self.depth + 1,
            ..Employee::new(self.manager)
        };
        vec![
            Column::new("name", ColumnValue::value(format!("e{}", self.id))),
            Column::new("manager", ColumnValue::reference(manager)),
        ]
    }
}

#[test]
fn test_transitive_cycle_terminates() {
    let employee = Relational(Employee::new(1));
    let xml = render(&Bindings::new().bind("employee", &employee));

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><employee id="1"><name>e1</name><manager id="2"><name>e2</name><manager id="3"><name>e3</name></manager></manager></employee></root-wrapper-tag>"#);
}

struct BadColumn;

impl RelationalRecord for BadColumn {
    fn kind(&self) -> &str {
        "BadColumn"
    }

    fn identity(&self) -> String {
        "1".to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("fine", ColumnValue::value(1)),
            Column::new("not_fine", ColumnValue::value(2)),
        ]
    }
}

#[test]
fn test_invalid_column_name_aborts_serialization() {
    let record = Relational(BadColumn);
    let err = Serializer::default()
        .serialize(&Bindings::new().bind("record", &record))
        .unwrap_err();
    assert!(matches!(err, SerializeError::InvalidName(e) if e.name == "not_fine"));
}

struct NullOnly;

impl RelationalRecord for NullOnly {
    fn kind(&self) -> &str {
        "NullOnly"
    }

    fn identity(&self) -> String {
        "7".to_string()
    }

    fn columns(&self) -> Vec<Column<'_>> {
        vec![Column::new("nothing", ColumnValue::Null)]
    }
}

#[test]
fn test_null_columns_are_skipped() {
    let record = Relational(NullOnly);
    let xml = render(&Bindings::new().bind("record", &record));
    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><record id="7"/></root-wrapper-tag>"#);
}
