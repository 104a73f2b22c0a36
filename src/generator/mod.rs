//! Document generation for the static parts of a workbook
//!
//! The streaming core never renders workbook metadata itself. It asks a
//! [`Generator`] for every part of a complete workbook whose sheets contain only
//! their header row, writes the metadata parts verbatim and re-opens the sheet
//! documents to stream rows into them.

pub mod shared_strings;
pub mod workbook;

use crate::error::{ExcelError, Result};
use crate::types::SheetDefinition;
use indexmap::IndexMap;

pub use workbook::WorkbookGenerator;

pub const SHEET_PATH_PREFIX: &str = "xl/worksheets/sheet";
pub const SHEET_PATH_SUFFIX: &str = ".xml";

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Archive path of the sheet document for a 1-based sheet index
pub fn sheet_path(index: usize) -> String {
    format!("{}{}{}", SHEET_PATH_PREFIX, index, SHEET_PATH_SUFFIX)
}

/// Every part of a generated workbook, in the order it was produced
#[derive(Debug, Default)]
pub struct GeneratedParts {
    /// Sheet documents, keyed by archive path
    pub sheet_files: IndexMap<String, String>,
    /// All other parts, keyed by archive path
    pub other_files: IndexMap<String, Vec<u8>>,
}

/// Produces a complete workbook for a set of sheet definitions.
pub trait Generator {
    /// Check `candidate` before it is added next to `existing`.
    fn validate_sheet(&self, existing: &[SheetDefinition], candidate: &SheetDefinition) -> Result<()> {
        validate_sheet_definition(existing, candidate)
    }

    /// Render every part of the workbook.
    ///
    /// Each sheet document must contain its header row, exactly one
    /// `dimension` element covering that row and exactly one `</sheetData>`.
    fn generate(&self, sheets: &[SheetDefinition]) -> Result<GeneratedParts>;
}

/// Sheet name rules shared by Excel and the bundled generator.
pub fn validate_sheet_definition(
    existing: &[SheetDefinition],
    candidate: &SheetDefinition,
) -> Result<()> {
    let name = candidate.name.as_str();
    let invalid = |reason: String| ExcelError::InvalidSheetDefinition {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("sheet name must not be empty".to_string()));
    }
    let len = name.chars().count();
    if len > MAX_SHEET_NAME_LEN {
        return Err(invalid(format!(
            "sheet name is {} characters long, the limit is {}",
            len, MAX_SHEET_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_NAME_CHARS.contains(c)) {
        return Err(invalid(format!("sheet name contains '{}'", c)));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(invalid(
            "sheet name must not start or end with an apostrophe".to_string(),
        ));
    }
    let lowered = name.to_lowercase();
    if existing.iter().any(|s| s.name.to_lowercase() == lowered) {
        return Err(invalid("duplicate sheet name".to_string()));
    }
    Ok(())
}
