//! Shared strings table for the header cells

use crate::error::Result;
use crate::xml_writer::XmlWriter;
use indexmap::IndexSet;
use std::io::Write;

/// Shared strings table that deduplicates strings across the workbook
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: IndexSet<String>,
    references: usize,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string and get its index
    pub fn add_string(&mut self, s: &str) -> usize {
        self.references += 1;
        if let Some(index) = self.strings.get_index_of(s) {
            return index;
        }
        self.strings.insert_full(s.to_string()).0
    }

    /// Get number of unique strings
    pub fn count(&self) -> usize {
        self.strings.len()
    }

    /// Write shared strings XML
    pub fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;

        writer.start_element("sst")?;
        writer.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        writer.attribute_int("count", self.references)?;
        writer.attribute_int("uniqueCount", self.strings.len())?;
        writer.close_start_tag()?;

        for s in &self.strings {
            writer.start_element("si")?;
            writer.close_start_tag()?;
            writer.text_run(s)?;
            writer.end_element("si")?;
        }

        writer.end_element("sst")?;
        writer.flush()
    }
}
