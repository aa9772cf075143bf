mod common;

use common::*;
use sheetdb::{
    CellValue, Entity, Error, JsonAdapter, RowError, SheetDb, SheetError, SpreadsheetReader,
};
use std::sync::Arc;

#[test]
fn relations_resolve_to_shared_instances() {
    let mut db = SheetDb::new(car_store());
    let cars = db.read_all::<Car>(None).unwrap();
    assert_eq!(cars.len(), 4);
    assert_eq!(cars[1].year, 2021);

    let vw_a = cars[0].factory.as_ref().unwrap();
    let vw_b = cars[2].factory.as_ref().unwrap();
    assert_eq!(vw_a.name, "Volkswagen");
    assert!(Arc::ptr_eq(vw_a, vw_b));
    assert_eq!(cars[1].factory.as_ref().unwrap().name, "Tesla");
    assert!(cars[3].factory.is_none());

    // the referenced sheet was loaded once and is served from the same cache
    let factories = db.read_all::<CarFactory>(None).unwrap();
    assert!(Arc::ptr_eq(&factories[0], vw_a));
}

#[test]
fn unknown_reference_is_key_not_found() {
    let mut cars = CARS.to_vec();
    cars.push(&["BAD-404", "2022", "Unknown"]);
    let mut db = SheetDb::new(store_with(&[("CarFactory", FACTORIES), ("Car", cars.as_slice())]));

    let err = db.read_all::<Car>(None).unwrap_err();
    match err {
        Error::Row(RowError::KeyNotFound {
            entity,
            key,
            location,
        }) => {
            assert_eq!(entity, "CarFactory");
            assert_eq!(key, "Unknown");
            assert_eq!(location.row, 6);
            assert_eq!(location.column.as_deref(), Some("C"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn referenced_sheet_must_exist() {
    let mut db = SheetDb::new(store_with(&[("Car", CARS)]));
    let err = db.read_all::<Car>(None).unwrap_err();
    assert!(matches!(err, Error::Sheet(SheetError::SheetNotFound(ref s)) if s == "CarFactory"));
}

#[derive(Debug, Entity)]
struct Tag {
    label: String,
}

#[derive(Debug, Entity)]
struct Post {
    id: i64,
    tag: Option<Arc<Tag>>,
}

#[test]
fn keyless_entities_cannot_be_referenced() {
    let posts: &[&[&str]] = &[&["id", "tag"], &["1", "rust"]];
    let tags: &[&[&str]] = &[&["label"], &["rust"]];
    let mut db = SheetDb::new(store_with(&[("Post", posts), ("Tag", tags)]));

    assert_eq!(db.read_all::<Tag>(None).unwrap()[0].label, "rust");
    let err = db.read_all::<Post>(None).unwrap_err();
    assert!(matches!(err, Error::Row(RowError::NoKeyField { ref entity }) if entity == "Tag"));
}

#[test]
fn writing_a_keyless_reference_fails_before_touching_the_store() {
    let mut db = SheetDb::new(JsonAdapter::new());
    let post = Post {
        id: 1,
        tag: Some(Arc::new(Tag { label: "rust".into() })),
    };

    let err = db.write_all(vec![Arc::new(post)], None, false).unwrap_err();
    assert!(matches!(err, Error::Row(RowError::NoKeyField { ref entity }) if entity == "Tag"));
    assert!(!db.store().has_sheet("Tag").unwrap());
    assert!(!db.store().has_sheet("Post").unwrap());
}

#[derive(Debug, Entity)]
struct Left {
    id: i64,
    right: Option<Arc<Right>>,
}

#[derive(Debug, Entity)]
struct Right {
    id: i64,
    left: Option<Arc<Left>>,
}

#[test]
fn mutually_referencing_sheets_fail_instead_of_recursing() {
    let left: &[&[&str]] = &[&["id", "right"], &["1", "10"]];
    let right: &[&[&str]] = &[&["id", "left"], &["10", "1"]];
    let mut db = SheetDb::new(store_with(&[("Left", left), ("Right", right)]));

    let err = db.read_all::<Left>(None).unwrap_err();
    assert!(matches!(err, Error::CyclicLoad { ref entity, .. } if entity == "Left"));

    // the failed load leaves nothing half-cached behind
    let err = db.read_all::<Left>(None).unwrap_err();
    assert!(matches!(err, Error::CyclicLoad { .. }));
}

#[derive(Debug, Entity)]
struct Employee {
    id: i64,
    name: String,
    #[sheet(default)]
    boss: Option<Arc<Boss>>,
}

#[derive(Debug, Entity)]
struct Boss {
    id: i64,
    name: String,
}

#[test]
fn numeric_keys_match_across_text_and_number_cells() {
    let employees: &[&[&str]] = &[&["id", "name", "boss"], &["1", "Ann", "100"], &["2", "Ben", ""]];
    let mut store = store_with(&[("Employee", employees)]);
    fill(&mut store, "Boss", &[&["id", "name"], &["100", "Zed"]]);
    // key written as text in the referencing sheet
    sheetdb::SpreadsheetWriter::write_cell(
        &mut store,
        "Employee",
        1,
        2,
        sheetdb::CellData::from_value(" 100 "),
    )
    .unwrap();

    let mut db = SheetDb::new(store);
    let staff = db.read_all::<Employee>(None).unwrap();
    assert_eq!(staff[0].boss.as_ref().map(|b| b.name.as_str()), Some("Zed"));
    assert!(staff[1].boss.is_none());
}

#[derive(Debug, PartialEq, Entity)]
#[sheet(name = "CarFactory")]
struct Maker {
    id: String,
}

#[derive(Debug, Entity)]
#[sheet(name = "Car")]
struct Model {
    name: String,
    factory: Arc<Maker>,
}

#[test]
fn text_key_resolves_and_unknown_key_fails() {
    let makers: &[&[&str]] = &[&["id"], &["Toyota"]];
    let good: &[&[&str]] = &[&["name", "factory"], &["Corolla", "Toyota"]];
    let mut db = SheetDb::new(store_with(&[("CarFactory", makers), ("Car", good)]));
    let models = db.read_all::<Model>(None).unwrap();
    assert_eq!(models[0].factory.id, "Toyota");

    let bad: &[&[&str]] = &[&["name", "factory"], &["Mystery", "Unknown"]];
    let mut db = SheetDb::new(store_with(&[("CarFactory", makers), ("Car", bad)]));
    let err = db.read_all::<Model>(None).unwrap_err();
    assert!(matches!(err, Error::Row(RowError::KeyNotFound { ref key, .. }) if key == "Unknown"));
}

#[derive(Debug, Entity)]
struct Person {
    id: i64,
    name: String,
    #[sheet(default)]
    manager: Option<Arc<Person>>,
}

#[test]
fn self_referencing_type_builds_its_schema() {
    let mut db = SheetDb::new(JsonAdapter::new());
    let schema = db.schema::<Person>().unwrap();
    assert!(schema.fields[2].is_relation());
}

#[test]
fn self_referencing_sheet_without_references_loads() {
    let people: &[&[&str]] = &[&["id", "name", "manager"], &["1", "Ann", ""], &["2", "Ben", ""]];
    let mut db = SheetDb::new(store_with(&[("Person", people)]));
    let all = db.read_all::<Person>(None).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|p| p.manager.is_none()));
}

#[test]
fn self_referencing_rows_are_a_cyclic_load() {
    let people: &[&[&str]] = &[&["id", "name", "manager"], &["1", "Ann", ""], &["2", "Ben", "1"]];
    let mut db = SheetDb::new(store_with(&[("Person", people)]));
    let err = db.read_all::<Person>(None).unwrap_err();
    assert!(matches!(err, Error::CyclicLoad { ref entity, ref sheet } if entity == "Person" && sheet == "Person"));
}

#[test]
fn self_referencing_entities_write_their_own_keys() {
    let ann = Arc::new(Person {
        id: 1,
        name: "Ann".into(),
        manager: None,
    });
    let ben = Arc::new(Person {
        id: 2,
        name: "Ben".into(),
        manager: Some(Arc::clone(&ann)),
    });
    let mut db = SheetDb::new(JsonAdapter::new());
    db.write_all(vec![ann, ben], None, false).unwrap();

    let manager = db.store().read_cell("Person", 2, 2).unwrap().unwrap();
    assert_eq!(manager.value, CellValue::Int(1));
    assert_eq!(db.store().sheet_names().unwrap(), vec!["Person".to_string()]);
}
