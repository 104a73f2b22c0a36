//! The live stream: sheet lifecycle and row writing

use super::archive::{ArchiveSink, EntrySequencer};
use super::sheet::ActiveSheet;
use super::template::{SheetTemplate, END_SHEET_DATA_TAG};
use crate::error::{ExcelError, Result};
use crate::types::CellType;

/// A declared sheet as the stream needs it
#[derive(Debug)]
pub(crate) struct SheetSlot {
    pub(crate) name: String,
    pub(crate) column_count: usize,
    pub(crate) template: SheetTemplate,
}

#[derive(Debug)]
enum StreamState {
    NoSheetYet,
    Active(ActiveSheet),
    /// A sink failure interrupted a row or a transition
    Failed,
}

/// A workbook being streamed, produced by
/// [`StreamFileBuilder::build`](super::StreamFileBuilder::build).
///
/// Rows go to the current sheet. Sheets are visited in the order they were
/// added; once left, a sheet cannot be written again. Every successful
/// [`write_row`](StreamFile::write_row) is flushed to the sink before it
/// returns.
///
/// Calls must not be made concurrently on one stream; separate streams are
/// independent.
pub struct StreamFile<S: ArchiveSink> {
    sequencer: EntrySequencer<S>,
    sheets: Vec<SheetSlot>,
    state: StreamState,
    row_buffer: Vec<u8>,
}

impl<S: ArchiveSink> StreamFile<S> {
    pub(crate) fn new(sequencer: EntrySequencer<S>, sheets: Vec<SheetSlot>) -> Self {
        StreamFile {
            sequencer,
            sheets,
            state: StreamState::NoSheetYet,
            row_buffer: Vec::with_capacity(4096),
        }
    }

    /// Write a row of text cells to the current sheet.
    ///
    /// The row must have exactly as many cells as the sheet's header.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetstream::StreamFileBuilder;
    /// use std::io::Cursor;
    ///
    /// let mut builder = StreamFileBuilder::new(Cursor::new(Vec::new()));
    /// builder.add_sheet("People", &["Name", "City"])?;
    /// let mut stream = builder.build()?;
    ///
    /// stream.write_row(&["Alice", "New York"])?;
    /// assert!(stream.write_row(&["Bob"]).is_err());
    ///
    /// stream.close()?;
    /// # Ok::<(), sheetstream::ExcelError>(())
    /// ```
    pub fn write_row<T: AsRef<str>>(&mut self, cells: &[T]) -> Result<()> {
        self.write_row_as(cells, CellType::InlineString)
    }

    /// Write a row whose cells all have `cell_type`.
    ///
    /// Only [`CellType::InlineString`] can be streamed; any other type fails
    /// with [`ExcelError::UnsupportedCellType`] and writes nothing.
    pub fn write_row_as<T: AsRef<str>>(&mut self, cells: &[T], cell_type: CellType) -> Result<()> {
        let StreamState::Active(sheet) = &mut self.state else {
            return Err(ExcelError::NoActiveSheet);
        };
        let type_code = sheet.check_row(cells.len(), cell_type)?;

        let written = sheet.write_row(&mut self.sequencer, &mut self.row_buffer, cells, type_code);
        if written.is_err() {
            // The entry may hold half a row now
            self.state = StreamState::Failed;
        }
        written
    }

    /// Write several rows to the current sheet, stopping at the first failure
    pub fn write_rows<I, R, T>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[T]>,
        T: AsRef<str>,
    {
        for row in rows {
            self.write_row(row.as_ref())?;
        }
        Ok(())
    }

    /// Finish the current sheet and move to the next one.
    ///
    /// Fails with [`ExcelError::AlreadyOnLastSheet`] on the last sheet, leaving
    /// it writable. Any other failure leaves the stream without a current sheet.
    pub fn next_sheet(&mut self) -> Result<()> {
        let next_index = match &self.state {
            StreamState::NoSheetYet => 1,
            StreamState::Active(sheet) if sheet.index() >= self.sheets.len() => {
                return Err(ExcelError::AlreadyOnLastSheet {
                    sheet_count: self.sheets.len(),
                })
            }
            StreamState::Active(sheet) => sheet.index() + 1,
            StreamState::Failed => return Err(ExcelError::NoActiveSheet),
        };

        // Failed until the next sheet is fully open
        let previous = std::mem::replace(&mut self.state, StreamState::Failed);
        if let StreamState::Active(sheet) = previous {
            self.end_sheet(sheet)?;
        }
        let sheet = self.start_sheet(next_index)?;
        self.state = StreamState::Active(sheet);
        Ok(())
    }

    /// Finish every remaining sheet and the archive, returning the sink's output.
    ///
    /// Sheets never visited are written with their header row only, so every
    /// sheet the workbook declares has a document. After a failed write or
    /// transition this fails with [`ExcelError::IncompleteWorkbook`] instead of
    /// finishing an archive that lacks sheets.
    pub fn close(mut self) -> Result<S::Output> {
        match self.state {
            StreamState::NoSheetYet => self.next_sheet()?,
            StreamState::Failed => {
                return Err(ExcelError::IncompleteWorkbook {
                    sheet_count: self.sheets.len(),
                    last_sheet: self.sequencer.last_sheet(),
                })
            }
            StreamState::Active(_) => {}
        }

        while let StreamState::Active(sheet) = &self.state {
            if sheet.index() >= self.sheets.len() {
                break;
            }
            log::debug!(
                "closing: sheet {} done, advancing to sheet {}",
                sheet.index(),
                sheet.index() + 1
            );
            self.next_sheet()?;
        }

        if let StreamState::Active(sheet) =
            std::mem::replace(&mut self.state, StreamState::Failed)
        {
            self.end_sheet(sheet)?;
        }
        self.sequencer.finish()
    }

    /// Number of sheets in the workbook
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// 1-based index of the current sheet
    pub fn current_sheet_index(&self) -> Option<usize> {
        self.active().map(ActiveSheet::index)
    }

    pub fn current_sheet_name(&self) -> Option<&str> {
        self.active().map(ActiveSheet::name)
    }

    /// Rows written to the current sheet, header included
    pub fn row_count(&self) -> Option<usize> {
        self.active().map(ActiveSheet::row_count)
    }

    fn active(&self) -> Option<&ActiveSheet> {
        match &self.state {
            StreamState::Active(sheet) => Some(sheet),
            _ => None,
        }
    }

    fn start_sheet(&mut self, index: usize) -> Result<ActiveSheet> {
        let slot = &self.sheets[index - 1];
        let entry = self.sequencer.open_sheet(index)?;
        self.sequencer.write(&entry, slot.template.prefix.as_bytes())?;
        self.sequencer.flush()?;
        Ok(ActiveSheet::new(&slot.name, slot.column_count, entry))
    }

    fn end_sheet(&mut self, sheet: ActiveSheet) -> Result<()> {
        let slot = &self.sheets[sheet.index() - 1];
        self.sequencer
            .write(sheet.entry(), END_SHEET_DATA_TAG.as_bytes())?;
        self.sequencer
            .write(sheet.entry(), slot.template.suffix.as_bytes())?;
        log::debug!(
            "sheet {} '{}' finished with {} rows",
            sheet.index(),
            sheet.name(),
            sheet.row_count()
        );
        self.sequencer.seal(sheet.into_entry())
    }
}
