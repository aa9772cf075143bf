use sheetdb_common::{CellStyle, CellValue};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// One cell as exchanged with a store. Row and column positions are carried
/// by the caller, always zero-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellData {
    pub value: CellValue,
    pub formula: Option<String>,
    pub style: Option<CellStyle>,
}

impl CellData {
    pub fn from_value<V: IntoCellValue>(value: V) -> Self {
        Self {
            value: value.into_cell_value(),
            formula: None,
            style: None,
        }
    }

    pub fn from_formula(formula: impl Into<String>) -> Self {
        Self {
            value: CellValue::Empty,
            formula: Some(formula.into()),
            style: None,
        }
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Style a date-like value gets when the caller did not pick one.
    pub fn effective_style(&self) -> Option<CellStyle> {
        self.style.or(match self.value {
            CellValue::Date(_) => Some(CellStyle::Date),
            CellValue::DateTime(_) => Some(CellStyle::DateTime),
            CellValue::Time(_) => Some(CellStyle::Time),
            _ => None,
        })
    }
}

/// Local conversion trait so tests and callers can pass primitives directly
pub trait IntoCellValue {
    fn into_cell_value(self) -> CellValue;
}

impl<T: Into<CellValue>> IntoCellValue for T {
    fn into_cell_value(self) -> CellValue {
        self.into()
    }
}

/// Where `save_to` sends the serialized workbook.
pub enum SaveDestination<'a> {
    /// The path the store was opened from or created for.
    InPlace,
    Path(&'a Path),
    Writer(&'a mut dyn Write),
    Bytes,
}

pub trait SpreadsheetReader: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error>;

    fn has_sheet(&self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.sheet_names()?.iter().any(|s| s == name))
    }

    /// Constructor variants for different environments
    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Whether the row exists at all. A row that exists may still be blank.
    fn has_row(&self, sheet: &str, row: u32) -> Result<bool, Self::Error>;

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<Option<CellData>, Self::Error> {
        Ok(self
            .read_row(sheet, row)?
            .and_then(|mut cells| cells.remove(&col)))
    }

    /// All non-empty cells of a row keyed by column, or `None` if the row is absent.
    fn read_row(
        &self,
        sheet: &str,
        row: u32,
    ) -> Result<Option<BTreeMap<u32, CellData>>, Self::Error>;
}

pub trait SpreadsheetWriter: SpreadsheetReader {
    /// Start an empty workbook that `save()` will write to `path`.
    fn create_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error>;
    fn delete_sheet(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Creates the sheet, row and cell as needed.
    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error>;

    fn write_row(&mut self, sheet: &str, row: u32, cells: Vec<CellData>) -> Result<(), Self::Error> {
        for (col, data) in cells.into_iter().enumerate() {
            self.write_cell(sheet, row, col as u32, data)?;
        }
        Ok(())
    }

    fn save_to<'a>(&mut self, dest: SaveDestination<'a>) -> Result<Option<Vec<u8>>, Self::Error>;

    fn save(&mut self) -> Result<(), Self::Error> {
        self.save_to(SaveDestination::InPlace).map(|_| ())
    }

    fn save_to_bytes(&mut self) -> Result<Vec<u8>, Self::Error> {
        Ok(self
            .save_to(SaveDestination::Bytes)?
            .unwrap_or_default())
    }
}

pub trait SpreadsheetIO: SpreadsheetReader + SpreadsheetWriter {}

impl<T: SpreadsheetReader + SpreadsheetWriter> SpreadsheetIO for T {}
