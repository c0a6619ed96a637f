use crate::{Encoding, WriterError, OUTPUT_BUFFER_SIZE};

/// Buffered code-point-to-byte transport for the emitter.
///
/// The emitter appends code points to the working buffer; `flush` encodes the
/// buffered text into the configured output encoding and hands it to the byte
/// sink. UTF-16 output is produced unit by unit from the UTF-8 working
/// buffer.
pub struct Writer<'w> {
    output: Option<&'w mut dyn std::io::Write>,
    /// The working buffer. This always contains valid UTF-8.
    buffer: String,
    /// The output in its encoded form, possibly UTF-16.
    raw_buffer: Vec<u8>,
    encoding: Encoding,
}

impl<'w> Default for Writer<'w> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> Writer<'w> {
    pub fn new() -> Self {
        Self {
            output: None,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
            encoding: Encoding::Any,
        }
    }

    /// Set a generic output handler.
    pub fn set_output(&mut self, output: &'w mut dyn std::io::Write) {
        assert!(self.output.is_none(), "output already set");
        self.output = Some(output);
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert_eq!(self.encoding, Encoding::Any, "encoding already set");
        self.encoding = encoding;
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn push(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    pub(crate) fn push_str(&mut self, string: &str) {
        self.buffer.push_str(string);
    }

    /// Flush the accumulated characters to the output.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        assert!(self.output.is_some(), "no output set on writer");
        assert_ne!(self.encoding, Encoding::Any, "no encoding set on writer");

        if self.buffer.is_empty() {
            return Ok(());
        }

        if self.encoding == Encoding::Utf8 {
            let to_emit = self.buffer.as_bytes();
            self.output
                .as_mut()
                .expect("no output set on writer")
                .write_all(to_emit)?;
            self.buffer.clear();
            return Ok(());
        }

        let big_endian = match self.encoding {
            Encoding::Utf16Le => false,
            Encoding::Utf16Be => true,
            Encoding::Any | Encoding::Utf8 => unreachable!("unhandled encoding"),
        };
        for unit in self.buffer.encode_utf16() {
            let bytes = if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            };
            self.raw_buffer.extend(bytes);
        }
        self.output
            .as_mut()
            .expect("no output set on writer")
            .write_all(&self.raw_buffer)?;
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16le_output_carries_bom_units() {
        let mut sink = Vec::new();
        {
            let mut writer = Writer::new();
            writer.set_output(&mut sink);
            writer.set_encoding(Encoding::Utf16Le);
            writer.push('\u{feff}');
            writer.push_str("a\n");
            writer.flush().unwrap();
        }
        assert_eq!(sink, vec![0xFF, 0xFE, 0x61, 0x00, 0x0A, 0x00]);
    }
}
