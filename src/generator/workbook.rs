//! Bundled generator rendering a minimal SpreadsheetML package

use super::shared_strings::SharedStrings;
use super::{sheet_path, GeneratedParts, Generator};
use crate::cell_ref::{cell_ref, dimension_ref};
use crate::config::DocumentProperties;
use crate::error::Result;
use crate::types::SheetDefinition;
use crate::xml_writer::XmlWriter;
use chrono::SecondsFormat;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Generator for a workbook whose sheets hold one header row of shared strings.
#[derive(Debug, Clone, Default)]
pub struct WorkbookGenerator {
    properties: DocumentProperties,
}

impl WorkbookGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: DocumentProperties) -> Self {
        WorkbookGenerator { properties }
    }

    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }
}

impl Generator for WorkbookGenerator {
    fn generate(&self, sheets: &[SheetDefinition]) -> Result<GeneratedParts> {
        for (i, sheet) in sheets.iter().enumerate() {
            self.validate_sheet(&sheets[..i], sheet)?;
        }

        let mut parts = GeneratedParts::default();
        let mut shared_strings = SharedStrings::new();

        for (i, sheet) in sheets.iter().enumerate() {
            let xml = render(|w| write_sheet(w, sheet, &mut shared_strings))?;
            // XmlWriter only emits UTF-8 from &str input
            let xml = String::from_utf8(xml)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            parts.sheet_files.insert(sheet_path(i + 1), xml);
        }

        let others = &mut parts.other_files;
        others.insert(
            "[Content_Types].xml".to_string(),
            render(|w| write_content_types(w, sheets.len()))?,
        );
        others.insert("_rels/.rels".to_string(), render(write_root_rels)?);
        others.insert(
            "docProps/core.xml".to_string(),
            render(|w| write_core_props(w, &self.properties))?,
        );
        others.insert(
            "docProps/app.xml".to_string(),
            render(|w| write_app_props(w, &self.properties, sheets))?,
        );
        others.insert(
            "xl/workbook.xml".to_string(),
            render(|w| write_workbook_xml(w, sheets))?,
        );
        others.insert(
            "xl/_rels/workbook.xml.rels".to_string(),
            render(|w| write_workbook_rels(w, sheets.len()))?,
        );
        others.insert("xl/styles.xml".to_string(), render(write_styles)?);
        others.insert(
            "xl/sharedStrings.xml".to_string(),
            render(|w| shared_strings.write_xml(w))?,
        );

        Ok(parts)
    }
}

fn render<F>(write: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut XmlWriter<Vec<u8>>) -> Result<()>,
{
    let mut writer = XmlWriter::new(Vec::with_capacity(1024));
    write(&mut writer)?;
    writer.into_inner()
}

fn write_sheet<W: std::io::Write>(
    w: &mut XmlWriter<W>,
    sheet: &SheetDefinition,
    shared_strings: &mut SharedStrings,
) -> Result<()> {
    w.declaration()?;
    w.start_element("worksheet")?;
    w.attribute("xmlns", MAIN_NS)?;
    w.attribute("xmlns:r", REL_NS)?;
    w.close_start_tag()?;

    // Only the header row exists at generation time
    w.start_element("dimension")?;
    w.attribute("ref", &dimension_ref(sheet.column_count(), 1))?;
    w.close_start_tag()?;
    w.end_element("dimension")?;

    w.write_str("<sheetViews><sheetView workbookViewId=\"0\"/></sheetViews>")?;
    w.write_str("<sheetFormatPr defaultRowHeight=\"15\"/>")?;

    w.start_element("sheetData")?;
    w.close_start_tag()?;
    w.start_element("row")?;
    w.attribute_int("r", 1)?;
    w.close_start_tag()?;
    for (col, value) in sheet.header.iter().enumerate() {
        let index = shared_strings.add_string(value);
        w.start_element("c")?;
        w.attribute("r", &cell_ref(col, 0))?;
        w.attribute("t", "s")?;
        w.close_start_tag()?;
        w.start_element("v")?;
        w.close_start_tag()?;
        w.write_str(itoa::Buffer::new().format(index))?;
        w.end_element("v")?;
        w.end_element("c")?;
    }
    w.end_element("row")?;
    w.end_element("sheetData")?;

    w.write_str(
        "<pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>",
    )?;
    w.end_element("worksheet")
}

fn write_content_types<W: std::io::Write>(w: &mut XmlWriter<W>, sheet_count: usize) -> Result<()> {
    w.declaration()?;
    w.write_str(
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    )?;
    for index in 1..=sheet_count {
        w.start_element("Override")?;
        w.attribute("PartName", &format!("/{}", sheet_path(index)))?;
        w.attribute(
            "ContentType",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        )?;
        w.close_empty_element()?;
    }
    w.write_str(
        "<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
<Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>\
<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
</Types>",
    )
}

fn write_root_rels<W: std::io::Write>(w: &mut XmlWriter<W>) -> Result<()> {
    w.declaration()?;
    w.write_str(
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
<Relationship Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties\" Target=\"docProps/app.xml\"/>\
</Relationships>",
    )
}

fn write_core_props<W: std::io::Write>(
    w: &mut XmlWriter<W>,
    properties: &DocumentProperties,
) -> Result<()> {
    let created = properties
        .created_or_now()
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    w.declaration()?;
    w.write_str(
        "<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
    )?;
    w.text_element("dc:creator", &properties.creator)?;
    w.text_element("cp:lastModifiedBy", &properties.creator)?;
    for name in ["dcterms:created", "dcterms:modified"] {
        w.start_element(name)?;
        w.attribute("xsi:type", "dcterms:W3CDTF")?;
        w.close_start_tag()?;
        w.write_str(&created)?;
        w.end_element(name)?;
    }
    w.end_element("cp:coreProperties")
}

fn write_app_props<W: std::io::Write>(
    w: &mut XmlWriter<W>,
    properties: &DocumentProperties,
    sheets: &[SheetDefinition],
) -> Result<()> {
    w.declaration()?;
    w.write_str(
        "<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\" \
xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\">",
    )?;
    w.text_element("Application", &properties.application)?;
    w.write_str("<DocSecurity>0</DocSecurity><ScaleCrop>false</ScaleCrop>")?;

    w.write_str(
        "<HeadingPairs><vt:vector size=\"2\" baseType=\"variant\">\
<vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant><vt:variant><vt:i4>",
    )?;
    w.write_str(itoa::Buffer::new().format(sheets.len()))?;
    w.write_str("</vt:i4></vt:variant></vt:vector></HeadingPairs>")?;

    w.write_str("<TitlesOfParts><vt:vector baseType=\"lpstr\"")?;
    w.attribute_int("size", sheets.len())?;
    w.close_start_tag()?;
    for sheet in sheets {
        w.text_element("vt:lpstr", &sheet.name)?;
    }
    w.write_str("</vt:vector></TitlesOfParts>")?;

    w.write_str(
        "<LinksUpToDate>false</LinksUpToDate><SharedDoc>false</SharedDoc>\
<HyperlinksChanged>false</HyperlinksChanged><AppVersion>1.0</AppVersion></Properties>",
    )
}

fn write_workbook_xml<W: std::io::Write>(
    w: &mut XmlWriter<W>,
    sheets: &[SheetDefinition],
) -> Result<()> {
    w.declaration()?;
    w.start_element("workbook")?;
    w.attribute("xmlns", MAIN_NS)?;
    w.attribute("xmlns:r", REL_NS)?;
    w.close_start_tag()?;

    w.start_element("sheets")?;
    w.close_start_tag()?;
    for (i, sheet) in sheets.iter().enumerate() {
        let sheet_id = i + 1;
        w.start_element("sheet")?;
        w.attribute("name", &sheet.name)?;
        w.attribute_int("sheetId", sheet_id)?;
        w.attribute("r:id", &format!("rId{}", sheet_id))?;
        w.close_empty_element()?;
    }
    w.end_element("sheets")?;

    w.end_element("workbook")
}

fn write_workbook_rels<W: std::io::Write>(w: &mut XmlWriter<W>, sheet_count: usize) -> Result<()> {
    w.declaration()?;
    w.start_element("Relationships")?;
    w.attribute("xmlns", PACKAGE_REL_NS)?;
    w.close_start_tag()?;

    let mut relationship = |id: usize, kind: &str, target: &str| -> Result<()> {
        w.start_element("Relationship")?;
        w.attribute("Id", &format!("rId{}", id))?;
        w.attribute("Type", &format!("{}/{}", REL_NS, kind))?;
        w.attribute("Target", target)?;
        w.close_empty_element()
    };

    for index in 1..=sheet_count {
        relationship(index, "worksheet", &format!("worksheets/sheet{}.xml", index))?;
    }
    relationship(sheet_count + 1, "styles", "styles.xml")?;
    relationship(sheet_count + 2, "sharedStrings", "sharedStrings.xml")?;

    w.end_element("Relationships")
}

fn write_styles<W: std::io::Write>(w: &mut XmlWriter<W>) -> Result<()> {
    w.declaration()?;
    w.write_str(
        r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1">
<font><sz val="11"/><name val="Calibri"/></font>
</fonts>
<fills count="2">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
</fills>
<borders count="1">
<border><left/><right/><top/><bottom/><diagonal/></border>
</borders>
<cellStyleXfs count="1">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
</cellStyleXfs>
<cellXfs count="1">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
</cellXfs>
</styleSheet>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sheets() -> Vec<SheetDefinition> {
        vec![
            SheetDefinition::new("Orders", ["Id", "Customer"]),
            SheetDefinition::new("R&D", ["Id"]),
        ]
    }

    #[test]
    fn test_generates_every_part() {
        let parts = WorkbookGenerator::new().generate(&sheets()).unwrap();

        let sheet_paths: Vec<_> = parts.sheet_files.keys().cloned().collect();
        assert_eq!(
            sheet_paths,
            ["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"]
        );
        for path in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/sharedStrings.xml",
        ] {
            assert!(parts.other_files.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_sheet_document_layout() {
        let parts = WorkbookGenerator::new().generate(&sheets()).unwrap();
        let orders = &parts.sheet_files["xl/worksheets/sheet1.xml"];

        assert_eq!(orders.matches(r#"<dimension ref="A1:B1"></dimension>"#).count(), 1);
        assert_eq!(orders.matches("</sheetData>").count(), 1);
        assert!(orders.contains(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#
        ));

        // "Id" is shared with the first sheet
        let second = &parts.sheet_files["xl/worksheets/sheet2.xml"];
        assert!(second.contains(r#"<c r="A1" t="s"><v>0</v></c>"#));
        assert!(second.contains(r#"<dimension ref="A1:A1"></dimension>"#));
    }

    #[test]
    fn test_workbook_lists_sheets_escaped() {
        let parts = WorkbookGenerator::new().generate(&sheets()).unwrap();
        let workbook = String::from_utf8(parts.other_files["xl/workbook.xml"].clone()).unwrap();
        assert!(workbook.contains(r#"<sheet name="Orders" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"<sheet name="R&amp;D" sheetId="2" r:id="rId2"/>"#));

        let content_types =
            String::from_utf8(parts.other_files["[Content_Types].xml"].clone()).unwrap();
        assert!(content_types.contains(r#"PartName="/xl/worksheets/sheet2.xml""#));
    }

    #[test]
    fn test_core_props_use_fixed_timestamp() {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let generator = WorkbookGenerator::with_properties(
            DocumentProperties::default()
                .with_creator("exports")
                .with_created(created),
        );
        let parts = generator.generate(&sheets()).unwrap();
        let core = String::from_utf8(parts.other_files["docProps/core.xml"].clone()).unwrap();
        assert!(core.contains("<dc:creator>exports</dc:creator>"));
        assert!(core.contains(">2024-01-02T03:04:05Z</dcterms:created>"));
    }

    #[test]
    fn test_rejects_duplicate_sheets() {
        let duplicate = vec![
            SheetDefinition::new("Data", ["A"]),
            SheetDefinition::new("data", ["B"]),
        ];
        let err = WorkbookGenerator::new().generate(&duplicate).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ExcelError::InvalidSheetDefinition { .. }
        ));
    }
}
