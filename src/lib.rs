//! # sheetstream
//!
//! Stream XLSX workbooks row by row to any writer, with memory bounded by a
//! single row.
//!
//! ## Features
//!
//! - **True streaming**: every row is flushed to the output before `write_row` returns
//! - **Multiple sheets**: each with a fixed header row, written one after another
//! - **Always valid**: closing early still writes every declared sheet
//! - **Pluggable**: bring your own document generator or archive sink
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheetstream::StreamFileBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = StreamFileBuilder::for_path("export.xlsx")?;
//! builder.add_sheet("Users", &["Id", "Name", "Email"])?;
//! builder.add_sheet("Groups", &["Id", "Name"])?;
//!
//! let mut stream = builder.build()?;
//! stream.write_row(&["1", "Alice", "alice@example.com"])?;
//! stream.write_row(&["2", "Bob", "bob@example.com"])?;
//!
//! stream.next_sheet()?;
//! stream.write_row(&["10", "Admins"])?;
//!
//! stream.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Only text cells are written, as inline strings. Sheets must be visited in
//! the order they were added and cannot be revisited.

pub mod cell_ref;
pub mod config;
pub mod error;
pub mod generator;
pub mod stream;
pub mod types;
pub mod xml_writer;

pub use config::{DocumentProperties, StreamOptions};
pub use error::{ExcelError, Result};
pub use generator::{GeneratedParts, Generator, WorkbookGenerator};
pub use stream::{
    ArchiveSink, EntryMethod, StreamFile, StreamFileBuilder, StreamingZipSink, ZipArchiveSink,
};
pub use types::{CellType, SheetDefinition};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_stream_smoke() {
        let mut builder = StreamFileBuilder::new(Vec::new());
        builder.add_sheet("Sheet1", &["Name"]).unwrap();
        let mut stream = builder.build().unwrap();
        stream.write_row(&["Alice"]).unwrap();
        let bytes = stream.close().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains("<t>Alice</t>"));
    }
}
