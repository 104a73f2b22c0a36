//! Streaming writer splicing rows into generated sheet documents
//!
//! The flow is strictly forward:
//!
//! 1. [`StreamFileBuilder`] collects sheet names and header rows, asks the
//!    generator for the whole workbook once, writes the metadata parts and cuts
//!    every sheet document into a [`SheetTemplate`].
//! 2. [`StreamFile`] opens one sheet entry at a time, writes its prefix, streams
//!    rows, then writes `</sheetData>` and the suffix before moving on.
//! 3. [`EntrySequencer`] keeps the archive entries in sheet order and stores
//!    sheet bodies uncompressed so each row reaches the sink when it is written.

pub mod archive;
pub mod builder;
pub mod sheet;
pub mod stream_file;
pub mod streaming_zip;
pub mod template;

pub use archive::{
    ArchiveSink, EntryHandle, EntryMethod, EntryOptions, EntrySequencer, ZipArchiveSink,
};
pub use builder::StreamFileBuilder;
pub use sheet::ActiveSheet;
pub use stream_file::StreamFile;
pub use streaming_zip::StreamingZipSink;
pub use template::{split_sheet_template, SheetTemplate};
