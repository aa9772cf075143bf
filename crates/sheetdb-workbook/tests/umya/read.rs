use sheetdb_testkit::{build_workbook, fill_sheet};
use sheetdb_workbook::{CellValue, SpreadsheetReader, SpreadsheetWriter, UmyaAdapter};

#[test]
fn rows_and_cells_are_zero_based() {
    let fixture = build_workbook(|book| {
        fill_sheet(book, "User", &[&["id", "name"], &["1", "One"], &["2", "Two"]]);
    });
    let adapter = UmyaAdapter::open_path(fixture.path()).unwrap();

    let header = adapter.read_row("User", 0).unwrap().unwrap();
    assert_eq!(header[&0].value, CellValue::Text("id".into()));
    assert_eq!(header[&1].value, CellValue::Text("name".into()));

    assert_eq!(
        adapter.read_cell("User", 2, 1).unwrap().unwrap().value,
        CellValue::Text("Two".into())
    );
    assert!(adapter.has_row("User", 2).unwrap());
    assert!(!adapter.has_row("User", 3).unwrap());
    assert!(adapter.read_row("User", 3).unwrap().is_none());
}

#[test]
fn read_row_returns_only_that_rows_cells() {
    let fixture = build_workbook(|book| {
        fill_sheet(
            book,
            "Wide",
            &[
                &["a", "", "c", "", "e"],
                &["", "x", "", "", ""],
                &["1", "2", "3", "4", "5"],
            ],
        );
    });
    let adapter = UmyaAdapter::open_path(fixture.path()).unwrap();

    let first = adapter.read_row("Wide", 0).unwrap().unwrap();
    assert_eq!(first.keys().copied().collect::<Vec<_>>(), [0, 2, 4]);
    let second = adapter.read_row("Wide", 1).unwrap().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[&1].value, CellValue::Text("x".into()));
    assert_eq!(adapter.read_row("Wide", 2).unwrap().unwrap().len(), 5);
}

#[test]
fn formula_cells_carry_their_text() {
    let fixture = build_workbook(|book| {
        let sh = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sh.get_cell_mut((1, 1)).set_value_number(10); // A1
        sh.get_cell_mut((2, 1)).set_formula("A1*2"); // B1
    });

    let bytes = std::fs::read(fixture.path()).unwrap();
    let adapter = UmyaAdapter::open_bytes(bytes).unwrap();
    assert_eq!(
        adapter.read_cell("Sheet1", 0, 0).unwrap().unwrap().value,
        CellValue::Number(10.0)
    );
    assert_eq!(
        adapter
            .read_cell("Sheet1", 0, 1)
            .unwrap()
            .and_then(|c| c.formula),
        Some("=A1*2".to_string())
    );
}

#[test]
fn empty_sheet_has_no_rows() {
    let fixture = build_workbook(|book| {
        fill_sheet(book, "EmptySheet", &[]);
    });
    let mut adapter = UmyaAdapter::open_path(fixture.path()).unwrap();
    assert!(adapter.has_sheet("EmptySheet").unwrap());
    assert!(!adapter.has_row("EmptySheet", 0).unwrap());

    adapter.delete_sheet("EmptySheet").unwrap();
    assert!(!adapter.has_sheet("EmptySheet").unwrap());
}
