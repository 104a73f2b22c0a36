//! Error types for the sheetstream library

use crate::types::CellType;
use thiserror::Error;

/// Result type alias for sheetstream operations
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Main error type for all streaming operations
#[derive(Error, Debug)]
pub enum ExcelError {
    /// The builder was already built, or a previous call on it failed
    #[error("StreamFileBuilder has already been built, functions may no longer be used")]
    AlreadyFinalized,

    /// Sheet definition rejected by the document generator
    #[error("Invalid sheet definition '{name}': {reason}")]
    InvalidSheetDefinition { name: String, reason: String },

    /// `build()` called without any sheet
    #[error("Cannot build a workbook without sheets")]
    NoSheets,

    /// Row write or sheet transition attempted while no sheet is open
    #[error("No current sheet")]
    NoActiveSheet,

    /// A row's cell count differs from the header length of its sheet
    #[error(
        "Invalid number of cells for sheet '{sheet}': expected {expected}, got {actual}. \
         All rows written to the same sheet must have as many cells as its header."
    )]
    ColumnCountMismatch {
        sheet: String,
        expected: usize,
        actual: usize,
    },

    /// `next_sheet()` called while the last sheet is active
    #[error("next_sheet() called, but already on last sheet ({sheet_count})")]
    AlreadyOnLastSheet { sheet_count: usize },

    /// Known cell type that streaming does not write
    #[error("Unsupported cell type: {0:?}")]
    UnsupportedCellType(CellType),

    /// Cell type code that is not part of SpreadsheetML
    #[error("Unknown cell type: '{0}'")]
    UnknownCellType(String),

    /// Generator output does not match the layout the template splitter relies on
    #[error("Unexpected sheet XML from generator: {0}")]
    MalformedGeneratedTemplate(String),

    /// Generator produced a sheet file whose path does not carry a valid index
    #[error("Unexpected sheet file name from generator: {0}")]
    UnexpectedSheetPath(String),

    /// `close()` after a sink failure; the archive would lack declared sheets
    #[error(
        "Workbook is incomplete: a write failed after {last_sheet} of {sheet_count} sheets were started"
    )]
    IncompleteWorkbook {
        sheet_count: usize,
        last_sheet: usize,
    },

    /// Archive entries opened, written or sealed out of order
    #[error("Archive entry sequence violated: {0}")]
    ArchiveSequence(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Zip container error wrapper
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}
