//! Type definitions for streamed workbooks

use crate::error::{ExcelError, Result};
use std::fmt;

/// Cell types of SpreadsheetML (`c/@t`), plus the model's general type.
///
/// Streaming only writes [`CellType::InlineString`]: the text is embedded in the
/// row itself, so no shared table has to be kept open until the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellType {
    /// `b`
    Bool,
    /// `d`, ISO 8601
    Date,
    /// `e`
    Error,
    /// `inlineStr`, text kept in the `is` element
    InlineString,
    /// `n`
    Numeric,
    /// `s`, index into the shared string table
    SharedString,
    /// `str`, cached result of a formula
    FormulaString,
    /// No explicit type
    General,
}

impl CellType {
    /// Parse a `t` attribute value.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "b" => Ok(CellType::Bool),
            "d" => Ok(CellType::Date),
            "e" => Ok(CellType::Error),
            "inlineStr" => Ok(CellType::InlineString),
            "n" => Ok(CellType::Numeric),
            "s" => Ok(CellType::SharedString),
            "str" => Ok(CellType::FormulaString),
            "" => Ok(CellType::General),
            other => Err(ExcelError::UnknownCellType(other.to_string())),
        }
    }

    /// The `t` attribute value to stream for this type.
    ///
    /// Every type other than inline string is rejected instead of being
    /// coerced into text.
    pub fn stream_code(self) -> Result<&'static str> {
        match self {
            CellType::InlineString => Ok("inlineStr"),
            CellType::Bool
            | CellType::Date
            | CellType::Error
            | CellType::Numeric
            | CellType::SharedString
            | CellType::FormulaString
            | CellType::General => Err(ExcelError::UnsupportedCellType(self)),
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CellType::Bool => "b",
            CellType::Date => "d",
            CellType::Error => "e",
            CellType::InlineString => "inlineStr",
            CellType::Numeric => "n",
            CellType::SharedString => "s",
            CellType::FormulaString => "str",
            CellType::General => "general",
        };
        f.write_str(code)
    }
}

/// A sheet declared on the builder: its name and its single header row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetDefinition {
    /// Sheet name as shown in the workbook tabs
    pub name: String,
    /// Header cells; their count fixes the column count of every row
    pub header: Vec<String>,
}

impl SheetDefinition {
    pub fn new<I, S>(name: &str, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SheetDefinition {
            name: name.to_string(),
            header: header.into_iter().map(|h| h.as_ref().to_string()).collect(),
        }
    }

    /// Number of columns every row of this sheet must have
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}
