use crate::IoError;
use crate::traits::{CellData, SaveDestination, SpreadsheetReader, SpreadsheetWriter};
use serde::{Deserialize, Serialize};
use sheetdb_common::{CellStyle, CellValue};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    /// Sheets in creation order.
    #[serde(default)]
    sheets: Vec<JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonSheet {
    name: String,
    /// row -> col -> cell
    #[serde(default)]
    rows: BTreeMap<u32, BTreeMap<u32, JsonCell>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    #[serde(default)]
    value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<CellStyle>,
}

impl From<CellData> for JsonCell {
    fn from(data: CellData) -> Self {
        let style = data.effective_style();
        JsonCell {
            value: data.value,
            formula: data.formula,
            style,
        }
    }
}

impl From<&JsonCell> for CellData {
    fn from(cell: &JsonCell) -> Self {
        CellData {
            value: cell.value.clone(),
            formula: cell.formula.clone(),
            style: cell.style,
        }
    }
}

/// Fully in-memory workbook, optionally persisted as a JSON document.
#[derive(Debug)]
pub struct JsonAdapter {
    data: JsonWorkbook,
    path: Option<PathBuf>,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self {
            data: JsonWorkbook {
                version: default_version(),
                sheets: Vec::new(),
            },
            path: None,
        }
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Number of rows holding at least one cell.
    pub fn row_count(&self, sheet: &str) -> usize {
        self.sheet(sheet).map(|s| s.rows.len()).unwrap_or(0)
    }

    fn sheet(&self, name: &str) -> Option<&JsonSheet> {
        self.data.sheets.iter().find(|s| s.name == name)
    }

    fn require_sheet(&self, name: &str) -> Result<&JsonSheet, IoError> {
        self.sheet(name)
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))
    }

    // Backend-specific helper (not part of SpreadsheetWriter)
    fn ensure_sheet_mut(&mut self, name: &str) -> &mut JsonSheet {
        let idx = match self.data.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.data.sheets.push(JsonSheet {
                    name: name.to_string(),
                    rows: BTreeMap::new(),
                });
                self.data.sheets.len() - 1
            }
        };
        &mut self.data.sheets[idx]
    }

    fn from_workbook(data: JsonWorkbook, path: Option<PathBuf>) -> Self {
        JsonAdapter { data, path }
    }
}

impl SpreadsheetReader for JsonAdapter {
    type Error = IoError;

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.data.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn has_sheet(&self, name: &str) -> Result<bool, Self::Error> {
        Ok(self.sheet(name).is_some())
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let data: JsonWorkbook = serde_json::from_reader(reader)?;
        Ok(Self::from_workbook(data, Some(path.as_ref().to_path_buf())))
    }

    fn open_bytes(bytes: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let data: JsonWorkbook = serde_json::from_slice(&bytes)?;
        Ok(Self::from_workbook(data, None))
    }

    fn has_row(&self, sheet: &str, row: u32) -> Result<bool, Self::Error> {
        Ok(self.require_sheet(sheet)?.rows.contains_key(&row))
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<Option<CellData>, Self::Error> {
        Ok(self
            .require_sheet(sheet)?
            .rows
            .get(&row)
            .and_then(|cells| cells.get(&col))
            .map(CellData::from))
    }

    fn read_row(
        &self,
        sheet: &str,
        row: u32,
    ) -> Result<Option<BTreeMap<u32, CellData>>, Self::Error> {
        Ok(self.require_sheet(sheet)?.rows.get(&row).map(|cells| {
            cells
                .iter()
                .map(|(col, cell)| (*col, CellData::from(cell)))
                .collect()
        }))
    }
}

impl SpreadsheetWriter for JsonAdapter {
    fn create_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        Ok(Self::from_workbook(
            JsonWorkbook {
                version: default_version(),
                sheets: Vec::new(),
            },
            Some(path.as_ref().to_path_buf()),
        ))
    }

    fn create_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        self.ensure_sheet_mut(name);
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> Result<(), Self::Error> {
        self.data.sheets.retain(|s| s.name != name);
        Ok(())
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        data: CellData,
    ) -> Result<(), Self::Error> {
        let cells = self.ensure_sheet_mut(sheet).rows.entry(row).or_default();
        if data.value == CellValue::Empty && data.formula.is_none() {
            cells.remove(&col);
        } else {
            cells.insert(col, JsonCell::from(data));
        }
        Ok(())
    }

    fn save_to<'a>(&mut self, dest: SaveDestination<'a>) -> Result<Option<Vec<u8>>, Self::Error> {
        match dest {
            SaveDestination::InPlace => {
                let path = self.path.clone().ok_or_else(|| {
                    IoError::Unsupported("in-place save without a bound path".to_string())
                })?;
                self.write_file(&path)?;
                Ok(None)
            }
            SaveDestination::Path(path) => {
                self.write_file(path)?;
                self.path = Some(path.to_path_buf());
                Ok(None)
            }
            SaveDestination::Writer(writer) => {
                let s = serde_json::to_string_pretty(&self.data)?;
                writer.write_all(s.as_bytes())?;
                Ok(None)
            }
            SaveDestination::Bytes => Ok(Some(serde_json::to_vec_pretty(&self.data)?)),
        }
    }
}

impl JsonAdapter {
    fn write_file(&self, path: &Path) -> Result<(), IoError> {
        let mut file = File::create(path)?;
        let s = serde_json::to_string_pretty(&self.data)?;
        file.write_all(s.as_bytes())?;
        Ok(())
    }
}
