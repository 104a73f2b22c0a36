//! Archive entries for the streamed container
//!
//! [`ArchiveSink`] is the entry-oriented contract the stream writes through;
//! [`ZipArchiveSink`] implements it over a zip writer. [`EntrySequencer`] sits
//! on top and enforces the order: metadata parts are written whole, sheet
//! bodies are opened one at a time for indices `1, 2, 3, …` and always use
//! [`EntryMethod::Stored`].
//!
//! A deflate encoder keeps input until it has enough to emit a block, so rows
//! written into a deflated entry would not reach the sink until the entry is
//! finished. Stored entries pass every write straight through.

use crate::error::{ExcelError, Result};
use crate::generator::sheet_path;
use std::io::{Seek, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// How the bytes of an entry are stored in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryMethod {
    /// Uncompressed; writes are visible to the sink immediately
    Stored,
    /// Deflate at the given level (`None` for the zip default)
    Deflated { level: Option<i64> },
}

/// Options for one archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub method: EntryMethod,
    /// Write ZIP64 headers so the entry may exceed 4 GiB
    pub large_file: bool,
}

impl EntryOptions {
    pub fn new(method: EntryMethod) -> Self {
        EntryOptions {
            method,
            large_file: false,
        }
    }

    pub fn stored() -> Self {
        Self::new(EntryMethod::Stored)
    }

    pub fn with_large_file(mut self, large_file: bool) -> Self {
        self.large_file = large_file;
        self
    }
}

/// Entry-oriented output the stream writes to.
///
/// Creating an entry ends the previous one; bytes go to the most recently
/// created entry.
pub trait ArchiveSink {
    /// Value handed back once the archive is complete
    type Output;

    fn create_entry(&mut self, path: &str, options: EntryOptions) -> Result<()>;

    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Push everything written so far down to the underlying output
    fn flush(&mut self) -> Result<()>;

    /// Seal the last entry and the archive itself
    fn finish(self) -> Result<Self::Output>;
}

/// [`ArchiveSink`] writing a zip archive to any seekable writer
pub struct ZipArchiveSink<W: Write + Seek> {
    zip: ZipWriter<W>,
}

impl<W: Write + Seek> ZipArchiveSink<W> {
    pub fn new(writer: W) -> Self {
        ZipArchiveSink {
            zip: ZipWriter::new(writer),
        }
    }
}

impl<W: Write + Seek> ArchiveSink for ZipArchiveSink<W> {
    type Output = W;

    fn create_entry(&mut self, path: &str, options: EntryOptions) -> Result<()> {
        let file_options = match options.method {
            EntryMethod::Stored => {
                FileOptions::<()>::default().compression_method(CompressionMethod::Stored)
            }
            EntryMethod::Deflated { level } => FileOptions::<()>::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(level),
        }
        .large_file(options.large_file);

        self.zip.start_file(path, file_options)?;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.zip.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.zip.flush()?;
        Ok(())
    }

    fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

/// Exclusive handle to the sheet entry currently open in an [`EntrySequencer`].
///
/// Not `Clone`: sealing consumes it, so a sealed entry cannot be written again.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryHandle {
    sheet_index: usize,
}

impl EntryHandle {
    /// 1-based index of the sheet this entry holds
    pub fn sheet_index(&self) -> usize {
        self.sheet_index
    }
}

/// Orders the entries written to an [`ArchiveSink`].
pub struct EntrySequencer<S: ArchiveSink> {
    sink: S,
    open_sheet: Option<usize>,
    last_sheet: usize,
    large_sheets: bool,
}

impl<S: ArchiveSink> EntrySequencer<S> {
    pub fn new(sink: S, large_sheets: bool) -> Self {
        EntrySequencer {
            sink,
            open_sheet: None,
            last_sheet: 0,
            large_sheets,
        }
    }

    /// Write a complete non-sheet part as one entry
    pub fn write_file(&mut self, path: &str, data: &[u8], method: EntryMethod) -> Result<()> {
        if let Some(index) = self.open_sheet {
            return Err(ExcelError::ArchiveSequence(format!(
                "cannot write '{}' while sheet {} is open",
                path, index
            )));
        }
        self.sink.create_entry(path, EntryOptions::new(method))?;
        self.sink.write(data)?;
        log::debug!("wrote {} ({} bytes)", path, data.len());
        Ok(())
    }

    /// Open the stored entry for the next sheet; `index` must follow the last one opened
    pub fn open_sheet(&mut self, index: usize) -> Result<EntryHandle> {
        if let Some(open) = self.open_sheet {
            return Err(ExcelError::ArchiveSequence(format!(
                "cannot open sheet {} while sheet {} is open",
                index, open
            )));
        }
        if index != self.last_sheet + 1 {
            return Err(ExcelError::ArchiveSequence(format!(
                "sheet {} opened after sheet {}",
                index, self.last_sheet
            )));
        }

        let path = sheet_path(index);
        self.sink.create_entry(
            &path,
            EntryOptions::stored().with_large_file(self.large_sheets),
        )?;
        self.open_sheet = Some(index);
        self.last_sheet = index;
        log::debug!("opened {}", path);

        Ok(EntryHandle {
            sheet_index: index,
        })
    }

    pub fn write(&mut self, handle: &EntryHandle, data: &[u8]) -> Result<()> {
        if self.open_sheet != Some(handle.sheet_index) {
            return Err(ExcelError::ArchiveSequence(format!(
                "sheet {} is not the open entry",
                handle.sheet_index
            )));
        }
        self.sink.write(data)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    /// Close the entry of `handle`; nothing more can be written to it
    pub fn seal(&mut self, handle: EntryHandle) -> Result<()> {
        if self.open_sheet != Some(handle.sheet_index) {
            return Err(ExcelError::ArchiveSequence(format!(
                "sheet {} is not the open entry",
                handle.sheet_index
            )));
        }
        self.sink.flush()?;
        self.open_sheet = None;
        log::debug!("sealed sheet {}", handle.sheet_index);
        Ok(())
    }

    /// Finish the archive; every sheet entry must be sealed
    pub fn finish(self) -> Result<S::Output> {
        if let Some(index) = self.open_sheet {
            return Err(ExcelError::ArchiveSequence(format!(
                "sheet {} is still open",
                index
            )));
        }
        self.sink.finish()
    }

    /// Index of the last sheet entry opened, `0` before the first
    pub fn last_sheet(&self) -> usize {
        self.last_sheet
    }
}
