//! One-shot collection of sheet definitions

use super::archive::{ArchiveSink, EntrySequencer, ZipArchiveSink};
use super::streaming_zip::StreamingZipSink;
use super::stream_file::{SheetSlot, StreamFile};
use super::template::{is_sheet_path, parse_sheet_index, split_sheet_template, SheetTemplate};
use crate::config::StreamOptions;
use crate::error::{ExcelError, Result};
use crate::generator::{Generator, WorkbookGenerator};
use crate::types::SheetDefinition;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

/// Collects sheets and their header rows, then starts the stream.
///
/// Once [`build`](StreamFileBuilder::build) was called, or any call failed,
/// every further call fails with [`ExcelError::AlreadyFinalized`].
///
/// # Examples
///
/// ```
/// use sheetstream::StreamFileBuilder;
///
/// // Any `Write` works, seekable or not
/// let mut builder = StreamFileBuilder::new(Vec::new());
/// builder.add_sheet("Orders", &["Id", "Amount"])?;
/// builder.add_sheet("Refunds", &["Id"])?;
///
/// let mut stream = builder.build()?;
/// stream.write_row(&["1", "9.99"])?;
/// stream.next_sheet()?;
/// stream.write_row(&["1"])?;
///
/// let bytes = stream.close()?;
/// assert!(!bytes.is_empty());
/// # Ok::<(), sheetstream::ExcelError>(())
/// ```
pub struct StreamFileBuilder<S: ArchiveSink, G: Generator = WorkbookGenerator> {
    sink: Option<S>,
    generator: G,
    options: StreamOptions,
    sheets: Vec<SheetDefinition>,
    finalized: bool,
}

impl<W: Write> StreamFileBuilder<StreamingZipSink<W>> {
    /// Builder writing the workbook to `writer`, which need not be seekable
    pub fn new(writer: W) -> Self {
        Self::with_sink(StreamingZipSink::new(writer))
    }
}

impl<W: Write + Seek> StreamFileBuilder<ZipArchiveSink<W>> {
    /// Builder for a seekable `writer`; entry sizes go into the local headers
    pub fn new_seekable(writer: W) -> Self {
        Self::with_sink(ZipArchiveSink::new(writer))
    }
}

impl StreamFileBuilder<ZipArchiveSink<File>> {
    /// Builder writing to the file at `path`, created or truncated
    pub fn for_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new_seekable(file))
    }
}

impl<S: ArchiveSink> StreamFileBuilder<S> {
    /// Builder writing through any archive sink
    pub fn with_sink(sink: S) -> Self {
        StreamFileBuilder {
            sink: Some(sink),
            generator: WorkbookGenerator::new(),
            options: StreamOptions::default(),
            sheets: Vec::new(),
            finalized: false,
        }
    }
}

impl<S: ArchiveSink, G: Generator> StreamFileBuilder<S, G> {
    /// Replace the generator rendering the workbook's static parts
    pub fn with_generator<H: Generator>(self, generator: H) -> StreamFileBuilder<S, H> {
        StreamFileBuilder {
            sink: self.sink,
            generator,
            options: self.options,
            sheets: self.sheets,
            finalized: self.finalized,
        }
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare the next sheet and its header row.
    ///
    /// Every row later written to the sheet must have as many cells as
    /// `header`. Names must be unique; a rejected sheet finalizes the builder.
    pub fn add_sheet<I, T>(&mut self, name: &str, header: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        if self.finalized {
            return Err(ExcelError::AlreadyFinalized);
        }

        let sheet = SheetDefinition::new(name, header);
        if let Err(e) = self.generator.validate_sheet(&self.sheets, &sheet) {
            self.finalized = true;
            return Err(e);
        }
        self.sheets.push(sheet);
        Ok(())
    }

    /// Number of sheets declared so far
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Write the workbook metadata and open the first sheet for rows.
    pub fn build(&mut self) -> Result<StreamFile<S>> {
        if self.finalized {
            return Err(ExcelError::AlreadyFinalized);
        }
        self.finalized = true;

        if self.sheets.is_empty() {
            return Err(ExcelError::NoSheets);
        }
        let sink = self.sink.take().ok_or(ExcelError::AlreadyFinalized)?;

        let sheet_count = self.sheets.len();
        log::debug!("building workbook with {} sheets", sheet_count);
        let parts = self.generator.generate(&self.sheets)?;

        // Split every sheet before anything reaches the sink
        let mut templates: Vec<Option<SheetTemplate>> = vec![None; sheet_count];
        for (path, xml) in &parts.sheet_files {
            let index = parse_sheet_index(path, sheet_count)?;
            let slot = &mut templates[index - 1];
            if slot.is_some() {
                return Err(ExcelError::MalformedGeneratedTemplate(format!(
                    "more than one document for sheet {}",
                    index
                )));
            }
            let column_count = self.sheets[index - 1].column_count();
            // The generator renders the header as row 1
            *slot = Some(split_sheet_template(xml, column_count, 1)?);
        }

        let slots = self
            .sheets
            .iter()
            .zip(templates)
            .enumerate()
            .map(|(i, (sheet, template))| -> Result<SheetSlot> {
                let template = template.ok_or_else(|| {
                    ExcelError::MalformedGeneratedTemplate(format!(
                        "no document for sheet {}",
                        i + 1
                    ))
                })?;
                Ok(SheetSlot {
                    name: sheet.name.clone(),
                    column_count: sheet.column_count(),
                    template,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut sequencer = EntrySequencer::new(sink, self.options.large_sheets);
        for (path, data) in &parts.other_files {
            if is_sheet_path(path) {
                return Err(ExcelError::UnexpectedSheetPath(path.clone()));
            }
            sequencer.write_file(path, data, self.options.metadata_method)?;
        }

        let mut stream = StreamFile::new(sequencer, slots);
        stream.next_sheet()?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratedParts;
    use crate::stream::archive::tests::{RecordingSink, SinkEvent};
    use crate::stream::archive::EntryMethod;

    fn builder() -> StreamFileBuilder<RecordingSink> {
        StreamFileBuilder::with_sink(RecordingSink::default())
    }

    /// Generator returning canned parts
    struct FixedGenerator(fn() -> GeneratedParts);

    impl Generator for FixedGenerator {
        fn generate(&self, _sheets: &[SheetDefinition]) -> Result<GeneratedParts> {
            Ok((self.0)())
        }
    }

    fn one_sheet_parts(path: &str, xml: &str) -> GeneratedParts {
        let mut parts = GeneratedParts::default();
        parts.sheet_files.insert(path.to_string(), xml.to_string());
        parts
    }

    #[test]
    fn test_add_sheet_after_build() {
        let mut builder = builder();
        builder.add_sheet("Sheet1", ["A"]).unwrap();
        let _stream = builder.build().unwrap();

        assert!(matches!(
            builder.add_sheet("Sheet2", ["B"]),
            Err(ExcelError::AlreadyFinalized)
        ));
        assert!(matches!(builder.build(), Err(ExcelError::AlreadyFinalized)));
    }

    #[test]
    fn test_failed_add_sheet_poisons_builder() {
        let mut builder = builder();
        builder.add_sheet("Data", ["A"]).unwrap();
        assert!(matches!(
            builder.add_sheet("Data", ["B"]),
            Err(ExcelError::InvalidSheetDefinition { .. })
        ));
        assert!(matches!(
            builder.add_sheet("Other", ["C"]),
            Err(ExcelError::AlreadyFinalized)
        ));
        assert!(matches!(builder.build(), Err(ExcelError::AlreadyFinalized)));
        assert_eq!(builder.sheet_count(), 1);
    }

    #[test]
    fn test_build_without_sheets() {
        let mut builder = builder();
        assert!(matches!(builder.build(), Err(ExcelError::NoSheets)));
        assert!(matches!(
            builder.add_sheet("Late", ["A"]),
            Err(ExcelError::AlreadyFinalized)
        ));
    }

    #[test]
    fn test_build_writes_metadata_then_opens_first_sheet() {
        let mut builder = builder().with_options(
            StreamOptions::default().with_metadata_method(EntryMethod::Stored),
        );
        builder.add_sheet("Sheet1", ["A", "B"]).unwrap();
        builder.add_sheet("Sheet2", ["X"]).unwrap();

        let stream = builder.build().unwrap();
        assert_eq!(stream.current_sheet_index(), Some(1));
        assert_eq!(stream.current_sheet_name(), Some("Sheet1"));
        assert_eq!(stream.sheet_count(), 2);

        let events = stream.close().unwrap();
        let created: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Create(path, _) => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            created,
            [
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "docProps/app.xml",
                "xl/workbook.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/sharedStrings.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );
    }

    #[test]
    fn test_build_rejects_malformed_template() {
        let mut builder = builder().with_generator(FixedGenerator(|| {
            one_sheet_parts(
                "xl/worksheets/sheet1.xml",
                "<worksheet><sheetData></sheetData></worksheet>",
            )
        }));
        builder.add_sheet("Sheet1", ["A"]).unwrap();
        assert!(matches!(
            builder.build(),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));
    }

    #[test]
    fn test_build_rejects_out_of_range_sheet_path() {
        let mut builder = builder().with_generator(FixedGenerator(|| {
            one_sheet_parts(
                "xl/worksheets/sheet2.xml",
                r#"<worksheet><dimension ref="A1:A1"></dimension><sheetData></sheetData></worksheet>"#,
            )
        }));
        builder.add_sheet("Sheet1", ["A"]).unwrap();
        assert!(matches!(
            builder.build(),
            Err(ExcelError::UnexpectedSheetPath(path)) if path == "xl/worksheets/sheet2.xml"
        ));
    }

    #[test]
    fn test_build_requires_a_document_per_sheet() {
        let mut builder = builder().with_generator(FixedGenerator(|| {
            one_sheet_parts(
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><dimension ref="A1:A1"></dimension><sheetData></sheetData></worksheet>"#,
            )
        }));
        builder.add_sheet("Sheet1", ["A"]).unwrap();
        builder.add_sheet("Sheet2", ["B"]).unwrap();
        assert!(matches!(
            builder.build(),
            Err(ExcelError::MalformedGeneratedTemplate(_))
        ));
    }
}
