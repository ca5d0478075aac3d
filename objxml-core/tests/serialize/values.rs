//! Plain values: scalars, sequences, mappings and plain records.

use crate::common::body;
use chrono::NaiveDate;
use insta::assert_snapshot;
use objxml_core::{
    plain_record, Bindings, Classify, Encoding, QueryResults, Record, RenderOptions, Serializer,
    SerializerOptions,
};
use std::collections::BTreeMap;

fn render(bindings: &Bindings<'_>) -> String {
    let doc = Serializer::default().serialize(bindings).unwrap();
    doc.render(&RenderOptions::default()).unwrap()
}

struct Inner {
    eleven: i32,
    twelve: i32,
}

plain_record!(Inner { eleven, twelve });

struct Flag {
    is_first: bool,
}

plain_record!(Flag { is_first as "isFirst" });

struct MyObject {
    foo: i32,
    bar: i32,
    baz: Vec<i32>,
    faz: BTreeMap<&'static str, Box<dyn Classify>>,
    b: Inner,
    obj_list: BTreeMap<&'static str, Flag>,
}

plain_record!(MyObject { foo, bar, baz, faz, b, obj_list as "objList" });

fn my_object() -> MyObject {
    let mut faz: BTreeMap<&'static str, Box<dyn Classify>> = BTreeMap::new();
    faz.insert("one", Box::new(1));
    faz.insert("two", Box::new(2));
    faz.insert("three", Box::new("1&2"));

    let mut obj_list = BTreeMap::new();
    obj_list.insert("first", Flag { is_first: true });
    obj_list.insert("second", Flag { is_first: false });

    MyObject {
        foo: 1,
        bar: 2,
        baz: vec![1, 2, 3],
        faz,
        b: Inner {
            eleven: 11,
            twelve: 12,
        },
        obj_list,
    }
}

#[test]
fn test_scalars_are_named_after_bindings() {
    let bindings = Bindings::new()
        .bind("firstName", &"Michael Alyn")
        .bind("lastName", &"Miller")
        .bind("oneTwoThree", &123)
        .bind("myURL", &"http://www.strangeGizmo.com/");
    let xml = render(&bindings);

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"ASCII\"?>\n"));
    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><first-name>Michael Alyn</first-name><last-name>Miller</last-name><one-two-three>123</one-two-three><my-url>http://www.strangeGizmo.com/</my-url></root-wrapper-tag>"#);
}

#[test]
fn test_dictionaries() {
    let mut prop_d = BTreeMap::new();
    prop_d.insert("six", 6);
    prop_d.insert("seven", 7);
    prop_d.insert("eight", 8);

    let mut props: BTreeMap<&str, Box<dyn Classify>> = BTreeMap::new();
    props.insert("propA", Box::new(1));
    props.insert("propB", Box::new(2));
    props.insert("propC", Box::new(vec![3, 4, 5]));
    props.insert("propD", Box::new(prop_d));

    let bindings = Bindings::new().bind("foo", &"bar").bind("props", &props);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><foo>bar</foo><props><item key="propA">1</item><item key="propB">2</item><item key="propC"><item>3</item><item>4</item><item>5</item></item><item key="propD"><item key="eight">8</item><item key="seven">7</item><item key="six">6</item></item></props></root-wrapper-tag>"#);
}

#[test]
fn test_list_of_numbers_pretty() {
    let numbers = [1, 2];
    let bindings = Bindings::new()
        .bind("listOfNumbers", &numbers)
        .bind("foo", &"bar");
    let doc = Serializer::default().serialize(&bindings).unwrap();
    let xml = doc.render(&RenderOptions::default().pretty(true)).unwrap();

    assert_eq!(
        xml,
        concat!(
            "<?xml version=\"1.0\" encoding=\"ASCII\"?>\n",
            "<root-wrapper-tag>\n",
            "  <list-of-numbers>\n",
            "    <item>1</item>\n",
            "    <item>2</item>\n",
            "  </list-of-numbers>\n",
            "  <foo>bar</foo>\n",
            "</root-wrapper-tag>\n",
        )
    );
}

#[test]
fn test_complex_object() {
    let object = my_object();
    let bindings = Bindings::new().bind("myObject", &object);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @r#"<root-wrapper-tag><my-object><foo>1</foo><bar>2</bar><baz><item>1</item><item>2</item><item>3</item></baz><faz><item key="one">1</item><item key="three">1&amp;2</item><item key="two">2</item></faz><b><eleven>11</eleven><twelve>12</twelve></b><obj-list><item key="first"><is-first>true</is-first></item><item key="second"><is-first>false</is-first></item></obj-list></my-object></root-wrapper-tag>"#);
}

#[test]
fn test_absent_values_produce_no_nodes() {
    let record = Record::new()
        .field("present", "yes")
        .field("missing", None::<String>)
        .field("alsoMissing", serde_json::Value::Null);
    let nothing: Option<Vec<i32>> = None;
    let bindings = Bindings::new()
        .bind("record", &record)
        .bind("nothing", &nothing);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @"<root-wrapper-tag><record><present>yes</present></record></root-wrapper-tag>");
}

#[test]
fn test_absent_sequence_elements_keep_their_item() {
    let values = vec![Some(1), None, Some(3)];
    let bindings = Bindings::new().bind("values", &values);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @"<root-wrapper-tag><values><item>1</item><item/><item>3</item></values></root-wrapper-tag>");
}

#[test]
fn test_mapping_has_one_item_per_entry() {
    let mut map = std::collections::HashMap::new();
    for key in ["a", "b", "c", "d"] {
        map.insert(key, key.to_uppercase());
    }
    let bindings = Bindings::new().bind("letters", &map);
    let doc = Serializer::default().serialize(&bindings).unwrap();

    let letters = doc.find_path(&["letters"]).unwrap();
    let mut keys: Vec<&str> = doc
        .children_named(letters, "item")
        .map(|item| doc.attribute(item, "key").unwrap())
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["a", "b", "c", "d"]);

    for item in doc.children_named(letters, "item") {
        let key = doc.attribute(item, "key").unwrap();
        assert_eq!(doc.text(item), Some(key.to_uppercase().as_str()));
    }
}

#[test]
fn test_json_document() {
    let value = serde_json::json!({
        "title": "Report",
        "rows": [{"count": 1}, {"count": 2}],
        "note": null,
    });
    let doc = Serializer::new(SerializerOptions::default().with_root_tag_name("report"))
        .serialize_single(&value)
        .unwrap();

    let root = doc.root().unwrap();
    assert_eq!(doc.children(root).len(), 3);
    let title = doc.find_child(root, "item").unwrap();
    assert!(doc.attribute(title, "key").is_some());

    let rows = doc
        .children_named(root, "item")
        .find(|item| doc.attribute(*item, "key") == Some("rows"))
        .unwrap();
    let counts: Vec<&str> = doc
        .children_named(rows, "item")
        .filter_map(|row| doc.find_child(row, "item"))
        .filter_map(|count| doc.text(count))
        .collect();
    assert_eq!(counts, vec!["1", "2"]);

    let note = doc
        .children_named(root, "item")
        .find(|item| doc.attribute(*item, "key") == Some("note"))
        .unwrap();
    assert!(doc.children(note).is_empty());
    assert_eq!(doc.text(note), None);
}

#[test]
fn test_query_results_are_sequences() {
    let source = vec!["a", "b"];
    let results = QueryResults::new(|| source.iter().map(|s| s.to_uppercase()).collect());
    let bindings = Bindings::new().bind("letters", &results);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @"<root-wrapper-tag><letters><item>A</item><item>B</item></letters></root-wrapper-tag>");
}

#[test]
fn test_dates_are_iso_8601() {
    let date = NaiveDate::from_ymd_opt(2006, 7, 4).unwrap();
    let at = date.and_hms_opt(9, 30, 0).unwrap();
    let bindings = Bindings::new().bind("day", &date).bind("at", &at);
    let xml = render(&bindings);

    assert_snapshot!(body(&xml), @"<root-wrapper-tag><day>2006-07-04</day><at>2006-07-04T09:30:00</at></root-wrapper-tag>");
}

#[test]
fn test_non_ascii_text_in_each_encoding() {
    let bindings = Bindings::new().bind("city", &"Z\u{fc}rich \u{2192} Gen\u{e8}ve");
    let doc = Serializer::default().serialize(&bindings).unwrap();

    let ascii = doc.render(&RenderOptions::default()).unwrap();
    assert!(ascii.contains("<city>Z&#xFC;rich &#x2192; Gen&#xE8;ve</city>"));

    let latin1 = doc
        .render(&RenderOptions::new(Encoding::Latin1, false))
        .unwrap();
    assert!(latin1.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
    assert!(latin1.contains("<city>Z\u{fc}rich &#x2192; Gen\u{e8}ve</city>"));

    let utf8 = doc
        .render(&RenderOptions::new(Encoding::Utf8, false))
        .unwrap();
    assert!(utf8.contains("<city>Z\u{fc}rich \u{2192} Gen\u{e8}ve</city>"));
}

#[test]
fn test_custom_root_tag() {
    let options = SerializerOptions::default().with_root_tag_name("pyxslt");
    let doc = Serializer::new(options)
        .serialize(&Bindings::new().bind("foo", &"bar"))
        .unwrap();
    let xml = doc.render(&RenderOptions::default()).unwrap();
    assert_snapshot!(body(&xml), @"<pyxslt><foo>bar</foo></pyxslt>");
}

#[test]
fn test_empty_bindings_give_empty_root() {
    let xml = render(&Bindings::new());
    assert_snapshot!(body(&xml), @"<root-wrapper-tag/>");
}

#[test]
fn test_documents_from_separate_calls_are_independent() {
    let serializer = Serializer::default();
    let first = serializer
        .serialize(&Bindings::new().bind("a", &1))
        .unwrap();
    let second = serializer
        .serialize(&Bindings::new().bind("b", &2))
        .unwrap();

    assert!(first.find_path(&["a"]).is_some());
    assert!(first.find_path(&["b"]).is_none());
    assert!(second.find_path(&["b"]).is_some());
}
