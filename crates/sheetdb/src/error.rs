use sheetdb_common::column_letter;
use std::fmt;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Position of a failing cell, rendered the way a person finds it in the
/// workbook: sheet, 1-based row, column letter and the field it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocation {
    pub sheet: String,
    /// 1-based, as shown by spreadsheet applications.
    pub row: u32,
    pub column: Option<String>,
    pub field: String,
}

impl CellLocation {
    pub fn new(sheet: &str, row: u32, col: Option<u32>, field: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            row: row + 1,
            column: col.map(column_letter),
            field: field.to_string(),
        }
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "{}!{}{} (field `{}`)", self.sheet, col, self.row, self.field),
            None => write!(f, "{} row {} (field `{}`)", self.sheet, self.row, self.field),
        }
    }
}

/// Problems with an entity's declared shape. Raised before any row is read.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity `{entity}` declares no fields")]
    SchemaMissing { entity: String },

    #[error("entity `{entity}` has more than one key column: {}", fields.join(", "))]
    MultipleKeyColumn { entity: String, fields: Vec<String> },

    #[error("field `{entity}.{field}` has unsupported data type `{type_name}`")]
    UnsupportedDataType {
        entity: String,
        field: String,
        type_name: String,
    },

    #[error("entity `{entity}` has no field `{field}`")]
    UnknownField { entity: String, field: String },
}

/// Header row could not be matched to the entity's fields.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum MatchError {
    #[error("sheet `{sheet}` has no column for required field `{field}`")]
    ColumnNotFound { sheet: String, field: String },

    #[error("sheet `{sheet}` has several columns for field `{field}`: {}", headers.join(", "))]
    NonUniqueColumn {
        sheet: String,
        field: String,
        /// `A1 -> id` style descriptions of the colliding header cells.
        headers: Vec<String>,
    },
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum RowError {
    #[error("sheet `{sheet}` has no row {row}")]
    RowNotFound {
        sheet: String,
        /// 1-based.
        row: u32,
    },

    #[error("null value at {0}")]
    NullValue(CellLocation),

    #[error("cannot read {found} cell as {expected} at {location}")]
    UnsupportedCellType {
        location: CellLocation,
        found: String,
        expected: String,
    },

    #[error("key `{key}` not found in `{entity}` (referenced from {location})")]
    KeyNotFound {
        entity: String,
        key: String,
        location: CellLocation,
    },

    #[error("value {value} of `{entity}.{field}` does not fit a sheet {expected} cell")]
    ValueOutOfRange {
        entity: String,
        field: String,
        value: String,
        expected: String,
    },

    #[error("entity `{entity}` has no key field and cannot be referenced")]
    NoKeyField { entity: String },

    #[error("no more rows in sheet `{sheet}`")]
    Exhausted { sheet: String },
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SheetError {
    #[error("sheet `{0}` not found")]
    SheetNotFound(String),

    #[error("workbook has no sheets to save")]
    NoData,
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A type's sheet was requested while that same sheet was still loading,
    /// e.g. two entity types whose key columns reference each other.
    #[error("cyclic load of `{entity}` from sheet `{sheet}`")]
    CyclicLoad { entity: String, sheet: String },

    #[error("workbook store: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Store(Box::new(err))
    }

    /// Used by derived `encode_field` for an out-of-range field index.
    pub fn unknown_field(entity: &str, index: usize) -> Self {
        SchemaError::UnknownField {
            entity: entity.to_string(),
            field: format!("#{index}"),
        }
        .into()
    }
}
