use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const TIME_FORMAT: &str = "hh:mm:ss";

/// Presentation tag attached to a written cell.
///
/// The codec never reads these back; they only tell the store which number
/// format to apply so that dates stay readable when the workbook is opened by hand.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStyle {
    Date,
    DateTime,
    Time,
}

impl CellStyle {
    pub const ALL: [CellStyle; 3] = [CellStyle::Date, CellStyle::DateTime, CellStyle::Time];

    /// Excel number-format code for the style.
    pub fn format_code(self) -> &'static str {
        match self {
            CellStyle::Date => DATE_FORMAT,
            CellStyle::DateTime => DATE_TIME_FORMAT,
            CellStyle::Time => TIME_FORMAT,
        }
    }

    /// Recover the style from a number-format code previously produced by [`Self::format_code`].
    pub fn from_format_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.format_code().eq_ignore_ascii_case(code.trim()))
    }
}

impl Display for CellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellStyle::Date => "date",
            CellStyle::DateTime => "date-time",
            CellStyle::Time => "time",
        })
    }
}
