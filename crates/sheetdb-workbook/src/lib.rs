//! Workbook stores for SheetDb.
//!
//! A store is anything implementing [`SpreadsheetReader`] and
//! [`SpreadsheetWriter`]: raw, zero-based cell access plus sheet management
//! and persistence. The entity layer never sees backend types.

pub mod backends;
pub mod error;
pub mod file_mode;
pub mod traits;

pub use backends::JsonAdapter;
#[cfg(feature = "umya")]
pub use backends::UmyaAdapter;
pub use error::IoError;
pub use file_mode::FileMode;
pub use traits::{
    CellData, IntoCellValue, SaveDestination, SpreadsheetIO, SpreadsheetReader,
    SpreadsheetWriter,
};

// Re-export for convenience
pub use sheetdb_common::{CellStyle, CellValue};
