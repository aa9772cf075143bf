//! Fixture helpers shared by the SheetDb integration tests.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use umya_spreadsheet::Spreadsheet;

/// An `.xlsx` file living in its own temporary directory. The directory is
/// removed when the fixture is dropped.
pub struct XlsxFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl XlsxFixture {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A path inside a fresh temp directory where no file exists yet.
pub fn scratch_path(file_name: &str) -> XlsxFixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(file_name);
    XlsxFixture { _dir: dir, path }
}

/// Build a workbook with umya directly and write it to a temp file.
/// The workbook starts with a single empty `Sheet1`.
pub fn build_workbook(f: impl FnOnce(&mut Spreadsheet)) -> XlsxFixture {
    let fixture = scratch_path("fixture.xlsx");
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, fixture.path()).expect("write xlsx fixture");
    fixture
}

/// Fill one sheet (created when missing) from rows of text, starting at A1.
/// Cells whose text parses as a number are written as numbers; empty strings are skipped.
pub fn fill_sheet(book: &mut Spreadsheet, sheet: &str, rows: &[&[&str]]) {
    if book.get_sheet_by_name(sheet).is_none() {
        book.new_sheet(sheet).expect("new sheet");
    }
    let ws = book.get_sheet_by_name_mut(sheet).expect("sheet exists");
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let cell = ws.get_cell_mut((c as u32 + 1, r as u32 + 1));
            match text.parse::<f64>() {
                Ok(n) => {
                    cell.set_value_number(n);
                }
                Err(_) => {
                    cell.set_value(*text);
                }
            }
        }
    }
}
