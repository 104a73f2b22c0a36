//! Splitting generated sheet documents around their row data
//!
//! The generator renders each sheet complete, with only the header row. To
//! stream more rows, the document is cut at its `</sheetData>` close tag:
//! everything before it is written when the sheet is opened, everything after
//! it when the sheet is sealed.
//!
//! The cut is made on literal text, not through an XML parser. It relies on
//! the generator emitting the dimension element and the close tag exactly once;
//! any other count fails instead of guessing.

use crate::cell_ref::dimension_ref;
use crate::error::{ExcelError, Result};
use crate::generator::{SHEET_PATH_PREFIX, SHEET_PATH_SUFFIX};

/// Close tag of the row container
pub const END_SHEET_DATA_TAG: &str = "</sheetData>";

/// The parts of a sheet document written before and after its streamed rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTemplate {
    /// Everything up to the row data close tag, header row included
    pub prefix: String,
    /// Everything after the row data close tag
    pub suffix: String,
}

/// Split the generated document of a sheet with `column_count` columns and
/// `row_count` rendered rows.
///
/// The dimension element is dropped: once rows are appended it would declare a
/// smaller range than the sheet holds, and a missing dimension is valid while
/// a wrong one is not.
pub fn split_sheet_template(xml: &str, column_count: usize, row_count: usize) -> Result<SheetTemplate> {
    let without_dimension = remove_dimension_tag(xml, column_count, row_count)?;
    split_at_sheet_data_end(&without_dimension)
}

fn dimension_tag(column_count: usize, row_count: usize) -> String {
    format!(
        "<dimension ref=\"{}\"></dimension>",
        dimension_ref(column_count, row_count)
    )
}

fn remove_dimension_tag(xml: &str, column_count: usize, row_count: usize) -> Result<String> {
    let tag = dimension_tag(column_count, row_count);
    let start = find_unique(xml, &tag).ok_or_else(|| {
        ExcelError::MalformedGeneratedTemplate(format!(
            "expected exactly one {} in sheet XML",
            tag
        ))
    })?;

    let mut out = String::with_capacity(xml.len() - tag.len());
    out.push_str(&xml[..start]);
    out.push_str(&xml[start + tag.len()..]);
    Ok(out)
}

fn split_at_sheet_data_end(xml: &str) -> Result<SheetTemplate> {
    let start = find_unique(xml, END_SHEET_DATA_TAG).ok_or_else(|| {
        ExcelError::MalformedGeneratedTemplate(format!(
            "expected exactly one {} in sheet XML",
            END_SHEET_DATA_TAG
        ))
    })?;

    Ok(SheetTemplate {
        prefix: xml[..start].to_string(),
        suffix: xml[start + END_SHEET_DATA_TAG.len()..].to_string(),
    })
}

/// Byte offset of `needle` when it occurs exactly once in `haystack`
fn find_unique(haystack: &str, needle: &str) -> Option<usize> {
    let mut matches = haystack.match_indices(needle).map(|(i, _)| i);
    match (matches.next(), matches.next()) {
        (Some(start), None) => Some(start),
        _ => None,
    }
}

/// Parse the 1-based sheet index out of `xl/worksheets/sheet<N>.xml`.
///
/// The index must lie within `1..=sheet_count`.
pub fn parse_sheet_index(path: &str, sheet_count: usize) -> Result<usize> {
    let unexpected = || ExcelError::UnexpectedSheetPath(path.to_string());

    let digits = path
        .strip_prefix(SHEET_PATH_PREFIX)
        .and_then(|rest| rest.strip_suffix(SHEET_PATH_SUFFIX))
        .ok_or_else(unexpected)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unexpected());
    }

    let index: usize = digits.parse().map_err(|_| unexpected())?;
    if index < 1 || index > sheet_count {
        return Err(unexpected());
    }
    Ok(index)
}

/// Whether `path` names a sheet document, valid index or not
pub fn is_sheet_path(path: &str) -> bool {
    path.starts_with(SHEET_PATH_PREFIX) && path.ends_with(SHEET_PATH_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Generator, WorkbookGenerator};
    use crate::types::SheetDefinition;

    const SHEET: &str = concat!(
        r#"<?xml version="1.0"?><worksheet><dimension ref="A1:B1"></dimension>"#,
        r#"<sheetData><row r="1"><c r="A1"/><c r="B1"/></row></sheetData>"#,
        r#"<pageMargins/></worksheet>"#
    );

    #[test]
    fn test_split_sheet_template() {
        let template = split_sheet_template(SHEET, 2, 1).unwrap();
        assert_eq!(
            template.prefix,
            r#"<?xml version="1.0"?><worksheet><sheetData><row r="1"><c r="A1"/><c r="B1"/></row>"#
        );
        assert_eq!(template.suffix, "<pageMargins/></worksheet>");
    }

    #[test]
    fn test_reassembly_without_rows_drops_only_dimension() {
        let template = split_sheet_template(SHEET, 2, 1).unwrap();
        let reassembled = format!(
            "{}{}{}",
            template.prefix, END_SHEET_DATA_TAG, template.suffix
        );
        assert_eq!(
            reassembled,
            SHEET.replace(r#"<dimension ref="A1:B1"></dimension>"#, "")
        );
    }

    #[test]
    fn test_empty_sheet_uses_anchor_dimension() {
        let xml = r#"<worksheet><dimension ref="A1"></dimension><sheetData></sheetData></worksheet>"#;
        let template = split_sheet_template(xml, 0, 1).unwrap();
        assert_eq!(template.prefix, "<worksheet><sheetData>");
        assert_eq!(template.suffix, "</worksheet>");
    }

    #[test]
    fn test_dimension_must_match_extent() {
        // Declared for three columns, generated for two
        assert!(matches!(
            split_sheet_template(SHEET, 3, 1),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));
    }

    #[test]
    fn test_duplicate_dimension_fails() {
        let xml = SHEET.replace(
            "<sheetData>",
            r#"<dimension ref="A1:B1"></dimension><sheetData>"#,
        );
        assert!(matches!(
            split_sheet_template(&xml, 2, 1),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));
    }

    #[test]
    fn test_sheet_data_close_tag_must_be_unique() {
        let missing = SHEET.replace("</sheetData>", "");
        assert!(matches!(
            split_sheet_template(&missing, 2, 1),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));

        let doubled = SHEET.replace("</sheetData>", "</sheetData></sheetData>");
        assert!(matches!(
            split_sheet_template(&doubled, 2, 1),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));
    }

    // Pinned to the bundled generator so a change in its sheet layout shows up here
    #[test]
    fn test_split_generated_sheet() {
        let sheets = vec![SheetDefinition::new("Sheet1", ["A", "B"])];
        let parts = WorkbookGenerator::new().generate(&sheets).unwrap();
        let xml = &parts.sheet_files["xl/worksheets/sheet1.xml"];

        let template = split_sheet_template(xml, 2, 1).unwrap();
        assert_eq!(
            template.prefix,
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
                "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
                "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
                "<sheetViews><sheetView workbookViewId=\"0\"/></sheetViews>",
                "<sheetFormatPr defaultRowHeight=\"15\"/>",
                "<sheetData><row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>1</v></c></row>",
            )
        );
        assert_eq!(
            template.suffix,
            "<pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/></worksheet>"
        );
    }

    #[test]
    fn test_parse_sheet_index() {
        assert_eq!(parse_sheet_index("xl/worksheets/sheet1.xml", 3).unwrap(), 1);
        assert_eq!(parse_sheet_index("xl/worksheets/sheet3.xml", 3).unwrap(), 3);

        for path in [
            "xl/worksheets/sheet0.xml",
            "xl/worksheets/sheet4.xml",
            "xl/worksheets/sheet.xml",
            "xl/worksheets/sheet-1.xml",
            "xl/worksheets/sheet+1.xml",
            "xl/worksheets/sheetA.xml",
            "xl/worksheets/sheet1.xml.bak",
            "xl/styles.xml",
        ] {
            assert!(
                matches!(
                    parse_sheet_index(path, 3),
                    Err(ExcelError::UnexpectedSheetPath(_))
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_is_sheet_path() {
        assert!(is_sheet_path("xl/worksheets/sheet1.xml"));
        assert!(is_sheet_path("xl/worksheets/sheetX.xml"));
        assert!(!is_sheet_path("xl/worksheets/_rels/sheet1.xml.rels"));
        assert!(!is_sheet_path("xl/workbook.xml"));
    }
}
