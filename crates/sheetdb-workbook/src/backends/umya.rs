use crate::IoError;
use crate::traits::{CellData, SaveDestination, SpreadsheetReader, SpreadsheetWriter};
use parking_lot::RwLock;
use sheetdb_common::{CellStyle, CellValue};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use umya_spreadsheet::{reader::xlsx, CellRawValue, Spreadsheet, Worksheet};

/// `.xlsx` store over `umya-spreadsheet`. umya is 1-based; every index
/// crossing this adapter is shifted by one.
pub struct UmyaAdapter {
    workbook: RwLock<Spreadsheet>,
    original_path: Option<PathBuf>,
}

impl UmyaAdapter {
    pub fn new() -> Self {
        Self {
            workbook: RwLock::new(umya_spreadsheet::new_file_empty_worksheet()),
            original_path: None,
        }
    }

    fn convert_cell_value(cv: &umya_spreadsheet::CellValue) -> CellValue {
        let raw = cv.get_raw_value();
        if raw.is_empty() {
            return CellValue::Empty;
        }
        if raw.is_error() {
            return CellValue::Error(cv.get_value().to_string());
        }
        match raw {
            CellRawValue::Numeric(n) => CellValue::Number(*n),
            CellRawValue::Bool(b) => CellValue::Boolean(*b),
            CellRawValue::String(s) => CellValue::Text(s.to_string()),
            CellRawValue::RichText(rt) => CellValue::Text(rt.get_text().to_string()),
            CellRawValue::Lazy(s) => {
                let txt = s.as_ref();
                if let Ok(n) = txt.parse::<f64>() {
                    CellValue::Number(n)
                } else if txt.eq_ignore_ascii_case("TRUE") {
                    CellValue::Boolean(true)
                } else if txt.eq_ignore_ascii_case("FALSE") {
                    CellValue::Boolean(false)
                } else {
                    CellValue::Text(txt.to_string())
                }
            }
            CellRawValue::Error(_) => CellValue::Error(cv.get_value().to_string()),
            CellRawValue::Empty => CellValue::Empty,
        }
    }

    fn convert_cell(cell: &umya_spreadsheet::Cell) -> Option<CellData> {
        let cv = cell.get_cell_value();
        let formula = if cv.is_formula() {
            let f = cv.get_formula();
            if f.is_empty() {
                None
            } else if f.starts_with('=') {
                Some(f.to_string())
            } else {
                Some(format!("={f}"))
            }
        } else {
            None
        };
        let value = Self::convert_cell_value(cv);
        if value == CellValue::Empty && formula.is_none() {
            return None;
        }
        let style = cell
            .get_style()
            .get_number_format()
            .and_then(|nf| CellStyle::from_format_code(nf.get_format_code()));
        Some(CellData {
            value,
            formula,
            style,
        })
    }

    /// Runs `f` against a fully deserialized sheet.
    fn with_sheet<R>(
        &self,
        sheet: &str,
        f: impl FnOnce(&Worksheet) -> R,
    ) -> Result<R, IoError> {
        let mut wb = self.workbook.write();
        wb.read_sheet_by_name(sheet);
        let ws = wb
            .get_sheet_by_name(sheet)
            .ok_or_else(|| IoError::SheetNotFound(sheet.to_string()))?;
        Ok(f(ws))
    }

    fn write_workbook<W: Write + std::io::Seek>(&self, writer: W) -> Result<(), IoError> {
        let mut wb = self.workbook.write();
        let count = wb.get_sheet_count();
        for i in 0..count {
            wb.read_sheet(i);
        }
        umya_spreadsheet::writer::xlsx::write_writer(&*wb, writer)?;
        Ok(())
    }
}

impl Default for UmyaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetReader for UmyaAdapter {
    type Error = IoError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        // Need write lock to deserialize sheets lazily
        let mut wb = self.workbook.write();
        let count = wb.get_sheet_count();
        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            wb.read_sheet(i);
            if let Some(s) = wb.get_sheet(&i) {
                names.push(s.get_name().to_string());
            }
        }
        Ok(names)
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        // Full read so that save operations don't hit deserialization assertions
        let sheet = xlsx::read(path.as_ref())?;
        Ok(Self {
            workbook: RwLock::new(sheet),
            original_path: Some(path.as_ref().to_path_buf()),
        })
    }

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let sheet = xlsx::read_reader(Cursor::new(data), true)?;
        Ok(Self {
            workbook: RwLock::new(sheet),
            original_path: None,
        })
    }

    fn has_row(&self, sheet: &str, row: u32) -> Result<bool, Self::Error> {
        self.with_sheet(sheet, |ws| ws.get_highest_row() > row)
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<Option<CellData>, Self::Error> {
        self.with_sheet(sheet, |ws| {
            ws.get_cell((col + 1, row + 1)).and_then(Self::convert_cell)
        })
    }

    fn read_row(
        &self,
        sheet: &str,
        row: u32,
    ) -> Result<Option<BTreeMap<u32, CellData>>, Self::Error> {
        self.with_sheet(sheet, |ws| {
            if ws.get_highest_row() <= row {
                return None;
            }
            let cells = ws
                .get_collection_by_row(&(row + 1))
                .into_iter()
                .filter_map(|cell| {
                    let col = *cell.get_coordinate().get_col_num() - 1;
                    Self::convert_cell(cell).map(|data| (col, data))
                })
                .collect();
            Some(cells)
        })
    }
}

impl SpreadsheetWriter for UmyaAdapter {
    fn create_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        Ok(Self {
            workbook: RwLock::new(umya_spreadsheet::new_file_empty_worksheet()),
            original_path: Some(path.as_ref().to_path_buf()),
        })
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        let mut wb = self.workbook.write();
        if wb.get_sheet_by_name(name).is_none() {
            wb.new_sheet(name)
                .map_err(|e| IoError::from_backend("umya", e))?;
        }
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        let mut wb = self.workbook.write();
        if wb.get_sheet_by_name(name).is_some() {
            wb.remove_sheet_by_name(name)
                .map_err(|e| IoError::from_backend("umya", e))?;
        }
        Ok(())
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error> {
        let mut wb = self.workbook.write();
        // If sheet missing create before any deserialize attempts
        if wb.get_sheet_by_name(sheet).is_none() {
            wb.new_sheet(sheet)
                .map_err(|e| IoError::from_backend("umya", e))?;
            wb.read_sheet_collection();
        }
        let ws = wb
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| IoError::SheetNotFound(sheet.to_string()))?;
        let style = data.effective_style();
        // umya uses (col,row), 1-based
        let cell = ws.get_cell_mut((col + 1, row + 1));
        match &data.value {
            CellValue::Empty => {
                cell.set_blank();
            }
            CellValue::Boolean(b) => {
                cell.set_value_bool(*b);
            }
            CellValue::Int(i) => {
                cell.set_value_number(*i as f64);
            }
            CellValue::Number(n) => {
                cell.set_value_number(*n);
            }
            CellValue::Text(s) => {
                cell.set_value(s.clone());
            }
            CellValue::Error(e) => {
                cell.set_value(e.clone());
            }
            date_like @ (CellValue::Date(_) | CellValue::DateTime(_) | CellValue::Time(_)) => {
                if let Some(serial) = date_like.as_serial_number() {
                    cell.set_value_number(serial);
                }
            }
        }
        if let Some(f) = data.formula {
            // umya stores formula without leading '='
            cell.set_formula(f.strip_prefix('=').unwrap_or(&f));
        }
        if let Some(style) = style {
            cell.get_style_mut()
                .get_number_format_mut()
                .set_format_code(style.format_code());
        }
        Ok(())
    }

    fn save_to<'a>(&mut self, dest: SaveDestination<'a>) -> Result<Option<Vec<u8>>, Self::Error> {
        match dest {
            SaveDestination::InPlace => {
                let path = self.original_path.clone().ok_or_else(|| {
                    IoError::Unsupported("in-place save without an original path".to_string())
                })?;
                self.save_to(SaveDestination::Path(&path))
            }
            SaveDestination::Path(p) => {
                let file = std::fs::File::create(p)?;
                self.write_workbook(std::io::BufWriter::new(file))?;
                Ok(None)
            }
            SaveDestination::Writer(w) => {
                let mut buf = Cursor::new(Vec::new());
                self.write_workbook(&mut buf)?;
                w.write_all(buf.get_ref())?;
                Ok(None)
            }
            SaveDestination::Bytes => {
                let mut buf = Cursor::new(Vec::new());
                self.write_workbook(&mut buf)?;
                Ok(Some(buf.into_inner()))
            }
        }
    }
}
