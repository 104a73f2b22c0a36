//! The sheet currently being streamed and its row writer

use super::archive::{ArchiveSink, EntryHandle, EntrySequencer};
use crate::cell_ref::push_cell_ref;
use crate::error::{ExcelError, Result};
use crate::types::CellType;
use crate::xml_writer::{escape_into, needs_space_preserve};

/// The one sheet whose archive entry is open.
///
/// Row numbers and the column count live here, per stream, so independent
/// streams never share counters.
#[derive(Debug)]
pub struct ActiveSheet {
    index: usize,
    name: String,
    row_count: usize,
    column_count: usize,
    entry: EntryHandle,
}

impl ActiveSheet {
    /// A freshly opened sheet whose prefix (header row included) is written
    pub(crate) fn new(name: &str, column_count: usize, entry: EntryHandle) -> Self {
        ActiveSheet {
            index: entry.sheet_index(),
            name: name.to_string(),
            row_count: 1,
            column_count,
            entry,
        }
    }

    /// 1-based sheet index
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows written so far, the header being row 1
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub(crate) fn entry(&self) -> &EntryHandle {
        &self.entry
    }

    pub(crate) fn into_entry(self) -> EntryHandle {
        self.entry
    }

    /// Validate a row before anything is written; returns the `t` attribute value.
    pub(crate) fn check_row(&self, cell_count: usize, cell_type: CellType) -> Result<&'static str> {
        let type_code = cell_type.stream_code()?;
        if cell_count != self.column_count {
            return Err(ExcelError::ColumnCountMismatch {
                sheet: self.name.clone(),
                expected: self.column_count,
                actual: cell_count,
            });
        }
        Ok(type_code)
    }

    /// Render one row into `buffer`, write it as a single chunk and flush the sink.
    ///
    /// The caller has validated the row with [`ActiveSheet::check_row`].
    pub(crate) fn write_row<S, T>(
        &mut self,
        sequencer: &mut EntrySequencer<S>,
        buffer: &mut Vec<u8>,
        cells: &[T],
        type_code: &str,
    ) -> Result<()>
    where
        S: ArchiveSink,
        T: AsRef<str>,
    {
        let row_number = self.row_count + 1;
        let mut num_buffer = itoa::Buffer::new();

        buffer.clear();
        buffer.extend_from_slice(b"<row r=\"");
        buffer.extend_from_slice(num_buffer.format(row_number).as_bytes());
        buffer.extend_from_slice(b"\">");

        for (col, value) in cells.iter().enumerate() {
            let value = value.as_ref();

            buffer.extend_from_slice(b"<c r=\"");
            push_cell_ref(buffer, &mut num_buffer, col, row_number - 1);
            buffer.extend_from_slice(b"\" t=\"");
            buffer.extend_from_slice(type_code.as_bytes());

            // Readers trim unmarked leading and trailing whitespace
            if needs_space_preserve(value) {
                buffer.extend_from_slice(b"\"><is><t xml:space=\"preserve\">");
            } else {
                buffer.extend_from_slice(b"\"><is><t>");
            }
            escape_into(buffer, value);
            buffer.extend_from_slice(b"</t></is></c>");
        }

        buffer.extend_from_slice(b"</row>");

        sequencer.write(&self.entry, buffer)?;
        sequencer.flush()?;
        self.row_count = row_number;
        log::trace!("sheet {} row {} written", self.index, row_number);
        Ok(())
    }
}
