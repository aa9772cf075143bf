mod common;

use common::*;
use sheetdb::{Error, RowError, SheetDb};

#[test]
fn steps_through_rows_on_demand() {
    let mut db = SheetDb::new(store_with(&[("User", USERS)]));
    let mut rows = db.read_iter::<User>(None).unwrap();
    assert_eq!(rows.sheet(), "User");

    let mut names = Vec::new();
    while rows.has_next().unwrap() {
        names.push(rows.next_entity().unwrap().name);
    }
    assert_eq!(names, ["Alice", "Bob", "Carol"]);

    let err = rows.next_entity().unwrap_err();
    assert!(matches!(err, Error::Row(RowError::Exhausted { ref sheet }) if sheet == "User"));
}

#[test]
fn collects_as_a_std_iterator() {
    let mut db = SheetDb::new(car_store());
    let plates = db
        .read_iter::<Car>(None)
        .unwrap()
        .map(|car| car.map(|c| c.plate))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(plates, ["ABC-123", "XYZ-999", "KKK-001", "NOF-000"]);
}

#[test]
fn iteration_does_not_fill_the_cache() {
    let mut db = SheetDb::new(store_with(&[("User", USERS)]));
    let first: Vec<User> = db
        .read_iter::<User>(None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let second: Vec<User> = db
        .read_iter::<User>(None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(db.read_all::<User>(None).unwrap().len(), 3);
}

#[test]
fn stops_after_the_first_bad_row() {
    let rows: &[&[&str]] = &[
        &["id", "name", "email"],
        &["1", "Alice", ""],
        &["2", "", ""],
        &["3", "Carl", ""],
    ];
    let mut db = SheetDb::new(store_with(&[("User", rows)]));
    let results: Vec<_> = db.read_iter::<User>(None).unwrap().collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().name, "Alice");
    assert!(matches!(
        results[1],
        Err(Error::Row(RowError::NullValue(ref location))) if location.row == 3 && location.field == "name"
    ));
}

#[test]
fn opening_an_iterator_checks_the_header() {
    let rows: &[&[&str]] = &[&["id"], &["1"]];
    let mut db = SheetDb::new(store_with(&[("User", rows)]));
    assert!(db.read_iter::<User>(None).is_err());
}

#[test]
fn header_only_sheet_has_nothing_next() {
    let rows: &[&[&str]] = &[&["id", "name", "email"]];
    let mut db = SheetDb::new(store_with(&[("User", rows)]));
    let mut iter = db.read_iter::<User>(None).unwrap();
    assert!(!iter.has_next().unwrap());
    assert!(iter.next().is_none());
}
