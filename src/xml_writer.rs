//! Optimized XML writer with minimal allocations

use crate::error::Result;
use std::io::Write;

/// Whether `text` needs `xml:space="preserve"` to keep leading or trailing whitespace
#[inline]
pub fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

/// Append `text` to `buffer` escaped for element content and attribute values.
///
/// Carriage returns are written as a character reference so a reader's line-end
/// normalisation does not turn them into `\n`. Characters XML 1.0 cannot carry
/// are replaced with U+FFFD.
pub fn escape_into(buffer: &mut Vec<u8>, text: &str) {
    let mut start = 0;
    for (i, c) in text.char_indices() {
        let replacement: &[u8] = match c {
            '&' => b"&amp;",
            '<' => b"&lt;",
            '>' => b"&gt;",
            '"' => b"&quot;",
            '\'' => b"&apos;",
            '\r' => b"&#xD;",
            '\t' | '\n' => continue,
            c if is_xml_char(c) => continue,
            _ => "\u{FFFD}".as_bytes(),
        };
        buffer.extend_from_slice(&text.as_bytes()[start..i]);
        buffer.extend_from_slice(replacement);
        start = i + c.len_utf8();
    }
    buffer.extend_from_slice(&text.as_bytes()[start..]);
}

#[inline]
fn is_xml_char(c: char) -> bool {
    !(c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}')
}

/// Fast XML writer that writes directly to output without intermediate buffers
pub struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    num_buffer: itoa::Buffer,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(8192), // 8KB buffer
            num_buffer: itoa::Buffer::new(),
        }
    }

    /// Write raw bytes directly
    #[inline]
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > 4096 {
            self.flush()?;
        }
        Ok(())
    }

    /// Write string data
    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_raw(s.as_bytes())
    }

    /// Write the standalone XML declaration followed by a newline
    pub fn declaration(&mut self) -> Result<()> {
        self.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")
    }

    /// Write XML element start tag
    #[inline]
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"<")?;
        self.write_str(name)
    }

    /// Write XML element end tag
    #[inline]
    pub fn end_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"</")?;
        self.write_str(name)?;
        self.write_raw(b">")
    }

    /// Close the current start tag as a self-closing element
    #[inline]
    pub fn close_empty_element(&mut self) -> Result<()> {
        self.write_raw(b"/>")
    }

    /// Write attribute
    #[inline]
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_escaped(value)?;
        self.write_raw(b"\"")
    }

    /// Write attribute with integer value
    #[inline]
    pub fn attribute_int(&mut self, name: &str, value: usize) -> Result<()> {
        self.buffer.push(b' ');
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b"=\"");
        self.buffer
            .extend_from_slice(self.num_buffer.format(value).as_bytes());
        self.write_raw(b"\"")
    }

    /// Close start tag
    #[inline]
    pub fn close_start_tag(&mut self) -> Result<()> {
        self.write_raw(b">")
    }

    /// Write a complete `<name>text</name>` element with escaped text
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start_element(name)?;
        self.close_start_tag()?;
        self.write_escaped(text)?;
        self.end_element(name)
    }

    /// Write a `<t>` text element, marked `xml:space="preserve"` when its
    /// leading or trailing whitespace would otherwise be trimmed
    pub fn text_run(&mut self, text: &str) -> Result<()> {
        self.start_element("t")?;
        if needs_space_preserve(text) {
            self.attribute("xml:space", "preserve")?;
        }
        self.close_start_tag()?;
        self.write_escaped(text)?;
        self.end_element("t")
    }

    /// Write text content with XML escaping
    #[inline]
    pub fn write_escaped(&mut self, text: &str) -> Result<()> {
        escape_into(&mut self.buffer, text);
        if self.buffer.len() > 4096 {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Flush buffer to underlying writer
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(text: &str) -> String {
        let mut buffer = Vec::new();
        escape_into(&mut buffer, text);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_xml_writer() {
        let mut output = Vec::new();
        let mut writer = XmlWriter::new(&mut output);

        writer.start_element("root").unwrap();
        writer.attribute("attr", "value").unwrap();
        writer.attribute_int("count", 42).unwrap();
        writer.close_start_tag().unwrap();
        writer.text_element("t", "a&b").unwrap();
        writer.start_element("empty").unwrap();
        writer.close_empty_element().unwrap();
        writer.end_element("root").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<root attr=\"value\" count=\"42\"><t>a&amp;b</t><empty/></root>"
        );
    }

    #[test]
    fn test_xml_escaping() {
        assert_eq!(
            escaped("<test>&value</test>"),
            "&lt;test&gt;&amp;value&lt;/test&gt;"
        );
        assert_eq!(escaped(r#"say "hi" it's"#), "say &quot;hi&quot; it&apos;s");
        assert_eq!(escaped("plain text ünïcødé"), "plain text ünïcødé");
    }

    #[test]
    fn test_xml_escaping_whitespace_and_control_chars() {
        assert_eq!(escaped("a\tb\nc"), "a\tb\nc");
        assert_eq!(escaped("a\r\nb"), "a&#xD;\nb");
        assert_eq!(escaped("bell\u{7}"), "bell\u{FFFD}");
        assert_eq!(escaped("\u{FFFF}"), "\u{FFFD}");
    }
}
