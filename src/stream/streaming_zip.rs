//! Zip output for writers that cannot seek
//!
//! Every entry is written with a data descriptor (general purpose flag bit 3):
//! the local header carries a zero CRC and zero sizes, the real values follow the
//! entry data and are repeated in the central directory. Nothing already written
//! is revisited, so the output can be a socket, a pipe or an HTTP body.

use super::archive::{ArchiveSink, EntryMethod, EntryOptions};
use crate::error::{ExcelError, Result};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Write};

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x0606_4b50;
const ZIP64_LOCATOR_SIG: u32 = 0x0706_4b50;
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Sizes follow the data (bit 3), names are UTF-8 (bit 11)
const FLAGS: u16 = 0x0808;
const VERSION_DEFAULT: u16 = 20;
const VERSION_ZIP64: u16 = 45;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

const U32_LIMIT: u64 = 0xFFFF_FFFF;
const U16_LIMIT: u64 = 0xFFFF;

/// Writer counting what reached it, standing in for a stream position
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn put(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    fn u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn u64(&mut self, value: u64) -> Result<()> {
        self.put(&value.to_le_bytes())
    }
}

struct OpenEntry {
    name: String,
    header_offset: u64,
    data_offset: u64,
    method: u16,
    zip64: bool,
    crc: Crc32,
    uncompressed: u64,
    encoder: Option<DeflateEncoder<Vec<u8>>>,
}

struct FinishedEntry {
    name: String,
    header_offset: u64,
    method: u16,
    zip64: bool,
    crc: u32,
    compressed: u64,
    uncompressed: u64,
}

/// [`ArchiveSink`] writing a zip archive to any writer, seekable or not.
///
/// Stored entries pass every write straight to the writer. Deflated entries
/// hand over whatever the encoder has emitted after each write.
pub struct StreamingZipSink<W: Write> {
    output: CountingWriter<W>,
    entries: Vec<FinishedEntry>,
    current: Option<OpenEntry>,
    dos_time: u16,
    dos_date: u16,
}

impl<W: Write> StreamingZipSink<W> {
    pub fn new(writer: W) -> Self {
        let (dos_time, dos_date) = dos_timestamp(Local::now().naive_local());
        StreamingZipSink {
            output: CountingWriter {
                inner: writer,
                written: 0,
            },
            entries: Vec::new(),
            current: None,
            dos_time,
            dos_date,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.output.inner
    }

    /// Bytes handed to the writer so far
    pub fn bytes_written(&self) -> u64 {
        self.output.written
    }

    fn finish_entry(&mut self) -> Result<()> {
        let Some(mut entry) = self.current.take() else {
            return Ok(());
        };

        if let Some(encoder) = entry.encoder.take() {
            let tail = encoder.finish()?;
            self.output.put(&tail)?;
        }
        let compressed = self.output.written - entry.data_offset;
        let crc = entry.crc.finalize();

        if !entry.zip64 && (compressed >= U32_LIMIT || entry.uncompressed >= U32_LIMIT) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "entry '{}' exceeds 4 GiB without large file headers",
                    entry.name
                ),
            )
            .into());
        }

        self.output.u32(DATA_DESCRIPTOR_SIG)?;
        self.output.u32(crc)?;
        if entry.zip64 {
            self.output.u64(compressed)?;
            self.output.u64(entry.uncompressed)?;
        } else {
            self.output.u32(compressed as u32)?;
            self.output.u32(entry.uncompressed as u32)?;
        }

        self.entries.push(FinishedEntry {
            name: entry.name,
            header_offset: entry.header_offset,
            method: entry.method,
            zip64: entry.zip64,
            crc,
            compressed,
            uncompressed: entry.uncompressed,
        });
        Ok(())
    }

    fn write_central_header(&mut self, index: usize) -> Result<()> {
        let entry = &self.entries[index];
        let out = &mut self.output;
        let zip64 = entry.zip64
            || entry.compressed >= U32_LIMIT
            || entry.uncompressed >= U32_LIMIT
            || entry.header_offset >= U32_LIMIT;
        let version = if zip64 { VERSION_ZIP64 } else { VERSION_DEFAULT };

        out.u32(CENTRAL_HEADER_SIG)?;
        out.u16(version)?; // made by, MS-DOS host
        out.u16(version)?; // needed
        out.u16(FLAGS)?;
        out.u16(entry.method)?;
        out.u16(self.dos_time)?;
        out.u16(self.dos_date)?;
        out.u32(entry.crc)?;
        if zip64 {
            out.u32(U32_LIMIT as u32)?;
            out.u32(U32_LIMIT as u32)?;
        } else {
            out.u32(entry.compressed as u32)?;
            out.u32(entry.uncompressed as u32)?;
        }
        out.u16(entry.name.len() as u16)?;
        out.u16(if zip64 { 28 } else { 0 })?; // extra len
        out.u16(0)?; // comment len
        out.u16(0)?; // disk number start
        out.u16(0)?; // internal attrs
        out.u32(0)?; // external attrs
        out.u32(if zip64 {
            U32_LIMIT as u32
        } else {
            entry.header_offset as u32
        })?;
        out.put(entry.name.as_bytes())?;

        if zip64 {
            out.u16(ZIP64_EXTRA_ID)?;
            out.u16(24)?;
            out.u64(entry.uncompressed)?;
            out.u64(entry.compressed)?;
            out.u64(entry.header_offset)?;
        }
        Ok(())
    }
}

impl<W: Write> ArchiveSink for StreamingZipSink<W> {
    type Output = W;

    fn create_entry(&mut self, path: &str, options: EntryOptions) -> Result<()> {
        self.finish_entry()?;

        if path.len() as u64 > U16_LIMIT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry name is {} bytes long", path.len()),
            )
            .into());
        }

        let (method, encoder) = match options.method {
            EntryMethod::Stored => (METHOD_STORED, None),
            EntryMethod::Deflated { level } => (
                METHOD_DEFLATED,
                Some(DeflateEncoder::new(Vec::new(), compression(level))),
            ),
        };
        let zip64 = options.large_file;
        let header_offset = self.output.written;
        let out = &mut self.output;

        out.u32(LOCAL_HEADER_SIG)?;
        out.u16(if zip64 { VERSION_ZIP64 } else { VERSION_DEFAULT })?;
        out.u16(FLAGS)?;
        out.u16(method)?;
        out.u16(self.dos_time)?;
        out.u16(self.dos_date)?;
        out.u32(0)?; // crc, in data descriptor
        if zip64 {
            out.u32(U32_LIMIT as u32)?;
            out.u32(U32_LIMIT as u32)?;
        } else {
            out.u32(0)?;
            out.u32(0)?;
        }
        out.u16(path.len() as u16)?;
        out.u16(if zip64 { 20 } else { 0 })?; // extra len
        out.put(path.as_bytes())?;
        if zip64 {
            out.u16(ZIP64_EXTRA_ID)?;
            out.u16(16)?;
            out.u64(0)?;
            out.u64(0)?;
        }

        self.current = Some(OpenEntry {
            name: path.to_string(),
            header_offset,
            data_offset: self.output.written,
            method,
            zip64,
            crc: Crc32::new(),
            uncompressed: 0,
            encoder,
        });
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let entry = self.current.as_mut().ok_or_else(|| {
            ExcelError::ArchiveSequence("write without an open entry".to_string())
        })?;
        entry.crc.update(data);
        entry.uncompressed += data.len() as u64;

        match &mut entry.encoder {
            Some(encoder) => {
                encoder.write_all(data)?;
                let pending = encoder.get_mut();
                self.output.put(pending)?;
                pending.clear();
            }
            None => self.output.put(data)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.output.inner.flush()?;
        Ok(())
    }

    fn finish(mut self) -> Result<W> {
        self.finish_entry()?;

        let central_dir_offset = self.output.written;
        for index in 0..self.entries.len() {
            self.write_central_header(index)?;
        }
        let central_dir_size = self.output.written - central_dir_offset;
        let count = self.entries.len() as u64;

        let out = &mut self.output;
        if count >= U16_LIMIT || central_dir_offset >= U32_LIMIT || central_dir_size >= U32_LIMIT {
            let record_offset = out.written;
            out.u32(ZIP64_END_OF_CENTRAL_DIR_SIG)?;
            out.u64(44)?; // size of the remaining record
            out.u16(VERSION_ZIP64)?;
            out.u16(VERSION_ZIP64)?;
            out.u32(0)?; // this disk
            out.u32(0)?; // disk with central dir
            out.u64(count)?;
            out.u64(count)?;
            out.u64(central_dir_size)?;
            out.u64(central_dir_offset)?;

            out.u32(ZIP64_LOCATOR_SIG)?;
            out.u32(0)?;
            out.u64(record_offset)?;
            out.u32(1)?; // total disks
        }

        out.u32(END_OF_CENTRAL_DIR_SIG)?;
        out.u16(0)?; // disk number
        out.u16(0)?; // disk with central dir
        out.u16(count.min(U16_LIMIT) as u16)?;
        out.u16(count.min(U16_LIMIT) as u16)?;
        out.u32(central_dir_size.min(U32_LIMIT) as u32)?;
        out.u32(central_dir_offset.min(U32_LIMIT) as u32)?;
        out.u16(0)?; // comment len
        out.inner.flush()?;

        log::debug!(
            "zip finished: {} entries, {} bytes",
            count,
            self.output.written
        );
        Ok(self.output.inner)
    }
}

fn compression(level: Option<i64>) -> Compression {
    level
        .map(|level| Compression::new(level.clamp(0, 9) as u32))
        .unwrap_or_default()
}

/// MS-DOS `(time, date)` pair; years outside 1980..=2107 are clamped
fn dos_timestamp(at: NaiveDateTime) -> (u16, u16) {
    let year = at.year().clamp(1980, 2107) as u16;
    let time = ((at.hour() as u16) << 11) | ((at.minute() as u16) << 5) | (at.second() as u16 / 2);
    let date = ((year - 1980) << 9) | ((at.month() as u16) << 5) | at.day() as u16;
    (time, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::{Cursor, Read};
    use zip::{CompressionMethod, ZipArchive};

    /// Writer without `Seek`
    #[derive(Default)]
    struct WriteOnly(Vec<u8>);

    impl Write for WriteOnly {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn read(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> (CompressionMethod, String) {
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        (file.compression(), content)
    }

    #[test]
    fn test_archive_over_write_only_output() {
        let mut sink = StreamingZipSink::new(WriteOnly::default());
        sink.create_entry("a.xml", EntryOptions::new(EntryMethod::Deflated { level: Some(6) }))
            .unwrap();
        sink.write(b"<a>").unwrap();
        sink.write(&b"x".repeat(10_000)).unwrap();
        sink.write(b"</a>").unwrap();
        sink.create_entry("b.xml", EntryOptions::stored()).unwrap();
        sink.write(b"<b>").unwrap();
        sink.flush().unwrap();
        sink.write(b"</b>").unwrap();
        let output = sink.finish().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(output.0)).unwrap();
        assert_eq!(archive.len(), 2);

        let (method, content) = read(&mut archive, "a.xml");
        assert_eq!(method, CompressionMethod::Deflated);
        assert_eq!(content, format!("<a>{}</a>", "x".repeat(10_000)));

        let (method, content) = read(&mut archive, "b.xml");
        assert_eq!(method, CompressionMethod::Stored);
        assert_eq!(content, "<b></b>");
    }

    #[test]
    fn test_stored_writes_reach_output_immediately() {
        let mut sink = StreamingZipSink::new(Vec::new());
        sink.create_entry("sheet.xml", EntryOptions::stored()).unwrap();
        let before = sink.bytes_written();

        sink.write(b"<row r=\"2\"/>").unwrap();
        assert_eq!(sink.bytes_written(), before + 12);
        assert!(sink.get_ref().ends_with(b"<row r=\"2\"/>"));
    }

    #[test]
    fn test_large_file_entries_are_readable() {
        let mut sink = StreamingZipSink::new(Vec::new());
        sink.create_entry("meta.xml", EntryOptions::stored()).unwrap();
        sink.write(b"<m/>").unwrap();
        sink.create_entry("big.xml", EntryOptions::stored().with_large_file(true))
            .unwrap();
        sink.write(b"<big/>").unwrap();
        let bytes = sink.finish().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(read(&mut archive, "meta.xml").1, "<m/>");
        assert_eq!(read(&mut archive, "big.xml").1, "<big/>");
    }

    #[test]
    fn test_empty_archive() {
        let bytes = StreamingZipSink::new(Vec::new()).finish().unwrap();
        assert_eq!(bytes.len(), 22);
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_write_without_entry() {
        let mut sink = StreamingZipSink::new(Vec::new());
        assert!(matches!(
            sink.write(b"x"),
            Err(ExcelError::ArchiveSequence(_))
        ));
    }

    #[test]
    fn test_dos_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(13, 45, 30)
            .unwrap();
        assert_eq!(dos_timestamp(at), (28079, 22705));
    }
}
