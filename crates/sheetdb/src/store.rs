use crate::error::{Error, Result};
use sheetdb_workbook::{CellData, SpreadsheetIO, SpreadsheetReader, SpreadsheetWriter};
use std::collections::BTreeMap;

/// Object-safe view of a workbook store with errors lifted into [`Error`].
///
/// Lets the registry and its type-erased cascade writers work against any
/// backend without carrying the backend type parameter.
pub(crate) trait SheetStore: Send + Sync {
    fn sheet_count(&self) -> Result<usize>;
    fn has_sheet(&self, name: &str) -> Result<bool>;
    fn has_row(&self, sheet: &str, row: u32) -> Result<bool>;
    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<Option<CellData>>;
    fn read_row(&self, sheet: &str, row: u32) -> Result<Option<BTreeMap<u32, CellData>>>;
    fn create_sheet(&mut self, name: &str) -> Result<()>;
    fn delete_sheet(&mut self, name: &str) -> Result<()>;
    fn write_row(&mut self, sheet: &str, row: u32, cells: Vec<CellData>) -> Result<()>;
}

impl<S: SpreadsheetIO> SheetStore for S {
    fn sheet_count(&self) -> Result<usize> {
        Ok(self.sheet_names().map_err(Error::store)?.len())
    }

    fn has_sheet(&self, name: &str) -> Result<bool> {
        SpreadsheetReader::has_sheet(self, name).map_err(Error::store)
    }

    fn has_row(&self, sheet: &str, row: u32) -> Result<bool> {
        SpreadsheetReader::has_row(self, sheet, row).map_err(Error::store)
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<Option<CellData>> {
        SpreadsheetReader::read_cell(self, sheet, row, col).map_err(Error::store)
    }

    fn read_row(&self, sheet: &str, row: u32) -> Result<Option<BTreeMap<u32, CellData>>> {
        SpreadsheetReader::read_row(self, sheet, row).map_err(Error::store)
    }

    fn create_sheet(&mut self, name: &str) -> Result<()> {
        SpreadsheetWriter::create_sheet(self, name).map_err(Error::store)
    }

    fn delete_sheet(&mut self, name: &str) -> Result<()> {
        SpreadsheetWriter::delete_sheet(self, name).map_err(Error::store)
    }

    fn write_row(&mut self, sheet: &str, row: u32, cells: Vec<CellData>) -> Result<()> {
        SpreadsheetWriter::write_row(self, sheet, row, cells).map_err(Error::store)
    }
}

/// A row counts as data when it exists and its presence column holds
/// non-blank text. Reading stops at the first row that does not.
pub(crate) fn row_present(store: &dyn SheetStore, sheet: &str, row: u32, col: u32) -> Result<bool> {
    if !store.has_row(sheet, row)? {
        return Ok(false);
    }
    Ok(store
        .read_cell(sheet, row, col)?
        .and_then(|cell| cell.value.as_text())
        .is_some_and(|text| !text.trim().is_empty()))
}
