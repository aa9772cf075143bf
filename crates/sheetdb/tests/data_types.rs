mod common;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use common::*;
use sheetdb::{
    CellData, CellStyle, CellValue, Entity, Error, JsonAdapter, RowError, SheetDb,
    SpreadsheetReader, SpreadsheetWriter,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Entity)]
struct Sample {
    id: i64,
    flag: bool,
    ratio: f64,
    label: String,
    day: NaiveDate,
    at: NaiveDateTime,
    clock: NaiveTime,
    stamp: DateTime<Utc>,
    small: u8,
    maybe: Option<i32>,
}

fn sample() -> Sample {
    let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    Sample {
        id: 1,
        flag: true,
        ratio: 0.25,
        label: "Árvíztűrő tükörfúrógép".into(),
        day,
        at: day.and_hms_opt(13, 45, 30).unwrap(),
        clock: NaiveTime::from_hms_opt(7, 5, 0).unwrap(),
        stamp: Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap(),
        small: 200,
        maybe: None,
    }
}

#[test]
fn every_scalar_kind_survives_a_save() {
    let mut second = sample();
    second.id = 2;
    second.flag = false;
    second.maybe = Some(-3);

    let mut db = SheetDb::new(JsonAdapter::new());
    db.write_all(vec![Arc::new(sample()), Arc::new(second.clone())], None, false)
        .unwrap();
    let bytes = db.save_to_bytes().unwrap();

    let mut db = SheetDb::new(<JsonAdapter as SpreadsheetReader>::open_bytes(bytes).unwrap());
    let read = db.read_all::<Sample>(None).unwrap();
    assert_eq!(*read[0], sample());
    assert_eq!(*read[1], second);
}

#[test]
fn date_kinds_are_written_with_styles() {
    let mut db = SheetDb::new(JsonAdapter::new());
    db.write_all(vec![Arc::new(sample())], None, false).unwrap();
    let store = db.store();
    let style = |col| store.read_cell("Sample", 1, col).unwrap().unwrap().style;
    assert_eq!(style(4), Some(CellStyle::Date));
    assert_eq!(style(5), Some(CellStyle::DateTime));
    assert_eq!(style(6), Some(CellStyle::Time));
    assert_eq!(style(7), Some(CellStyle::DateTime));
    assert_eq!(style(0), None);
}

#[test]
fn dates_and_times_read_from_serial_numbers() {
    let rows: &[&[&str]] = &[
        &[
            "id", "flag", "ratio", "label", "day", "at", "clock", "stamp", "small", "maybe",
        ],
        &[
            "1", "TRUE", "1", "42", "45351", "45351.5", "0.75", "45291", "7", "2.9",
        ],
    ];
    let store = store_with(&[("Sample", rows)]);

    let mut db = SheetDb::new(store);
    let read = db.read_all::<Sample>(None).unwrap();
    let s = &read[0];
    assert!(s.flag);
    assert_eq!(s.ratio, 1.0);
    assert_eq!(s.label, "42");
    assert_eq!(s.day, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(
        s.at,
        NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    );
    assert_eq!(s.clock, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    assert_eq!(s.stamp, Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap());
    assert_eq!(s.maybe, Some(2));
}

#[test]
fn integers_out_of_range_for_the_field_type_are_rejected() {
    let mut row = vec![CellValue::Int(1)];
    row.extend([
        CellValue::Boolean(false),
        CellValue::Number(0.0),
        CellValue::Text("x".into()),
        CellValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        CellValue::Number(43831.0),
        CellValue::Number(0.5),
        CellValue::Number(43831.0),
        CellValue::Int(300),
    ]);

    let mut db = SheetDb::new(JsonAdapter::new());
    db.write_all(vec![Arc::new(sample())], None, false).unwrap();
    db.store_mut()
        .write_row(
            "Sample",
            1,
            row.into_iter().map(CellData::from_value).collect(),
        )
        .unwrap();
    db.invalidate::<Sample>();

    let err = db.read_all::<Sample>(None).unwrap_err();
    assert!(matches!(
        err,
        Error::Row(RowError::UnsupportedCellType { ref expected, ref location, .. })
            if expected == "u8" && location.field == "small"
    ));
}

#[derive(Debug, Entity)]
struct Day {
    id: i64,
    day: NaiveDate,
}

#[test]
fn serial_outside_the_calendar_is_an_unsupported_cell() {
    let mut store = JsonAdapter::new();
    store.create_sheet("Day").unwrap();
    store
        .write_row("Day", 0, vec![CellData::from_value("id"), CellData::from_value("day")])
        .unwrap();
    store
        .write_row(
            "Day",
            1,
            vec![CellData::from_value(1i64), CellData::from_value(CellValue::Number(1e10))],
        )
        .unwrap();

    let err = SheetDb::new(store).read_all::<Day>(None).unwrap_err();
    assert!(matches!(
        err,
        Error::Row(RowError::UnsupportedCellType { ref expected, ref location, .. })
            if expected == "date" && location.field == "day" && location.row == 2
    ));
}

#[derive(Debug, Entity)]
struct Counter {
    id: i64,
    hits: u64,
}

#[test]
fn unsigned_values_beyond_i64_are_refused_on_write() {
    let mut db = SheetDb::new(JsonAdapter::new());
    db.write_all(vec![Arc::new(Counter { id: 1, hits: i64::MAX as u64 })], None, false)
        .unwrap();
    db.invalidate::<Counter>();
    assert_eq!(db.read_all::<Counter>(None).unwrap()[0].hits, i64::MAX as u64);

    let err = db
        .write_all(vec![Arc::new(Counter { id: 2, hits: u64::MAX })], None, false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Row(RowError::ValueOutOfRange { ref entity, ref field, ref value, .. })
            if entity == "Counter" && field == "hits" && value == "18446744073709551615"
    ));
    // the refused write leaves the sheet as it was
    db.invalidate::<Counter>();
    assert_eq!(db.read_all::<Counter>(None).unwrap()[0].id, 1);
}
