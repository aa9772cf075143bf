use chrono::NaiveDate;
use sheetdb_workbook::{
    CellData, CellStyle, CellValue, SpreadsheetReader, SpreadsheetWriter, UmyaAdapter,
};

#[test]
fn umya_save_in_place_and_bytes() {
    let fixture = sheetdb_testkit::build_workbook(|_| {});

    let mut adapter = UmyaAdapter::open_path(fixture.path()).unwrap();
    adapter
        .write_cell("Sheet1", 0, 0, CellData::from_value(123.0))
        .unwrap();
    adapter.save().unwrap();

    let mut adapter2 = UmyaAdapter::open_path(fixture.path()).unwrap();
    assert_eq!(
        adapter2.read_cell("Sheet1", 0, 0).unwrap().unwrap().value,
        CellValue::Number(123.0)
    );

    adapter2
        .write_cell("Sheet1", 1, 0, CellData::from_value(456.0))
        .unwrap();
    let bytes = adapter2.save_to_bytes().unwrap();
    assert!(bytes.len() > 100, "Expected non-trivial XLSX byte output");
}

#[test]
fn dates_are_written_as_styled_serials() {
    let mut adapter = UmyaAdapter::new();
    let day = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    adapter
        .write_cell("Dates", 0, 0, CellData::from_value(day))
        .unwrap();

    let bytes = adapter.save_to_bytes().unwrap();
    let reopened = UmyaAdapter::open_bytes(bytes).unwrap();
    let cell = reopened.read_cell("Dates", 0, 0).unwrap().unwrap();
    assert_eq!(cell.value, CellValue::Number(45291.0));
    assert_eq!(cell.style, Some(CellStyle::Date));
}

#[test]
fn create_path_starts_without_sheets() {
    let scratch = sheetdb_testkit::scratch_path("new.xlsx");
    let mut adapter = UmyaAdapter::create_path(scratch.path()).unwrap();
    assert!(adapter.sheet_names().unwrap().is_empty());

    adapter
        .write_cell("User", 0, 0, CellData::from_value("id"))
        .unwrap();
    adapter.save().unwrap();
    assert!(scratch.path().exists());

    let reopened = UmyaAdapter::open_path(scratch.path()).unwrap();
    assert_eq!(reopened.sheet_names().unwrap(), ["User"]);
}
