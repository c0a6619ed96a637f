use std::collections::VecDeque;

use encoding_rs::{Decoder, UTF_16BE, UTF_16LE};

use crate::{chars, Encoding, Mark, ReaderError, INPUT_BUFFER_SIZE, INPUT_RAW_BUFFER_SIZE};

const BOM_UTF8: &[u8] = b"\xEF\xBB\xBF";
const BOM_UTF16LE: &[u8] = b"\xFF\xFE";
const BOM_UTF16BE: &[u8] = b"\xFE\xFF";

/// Buffered byte-to-code-point transport with encoding detection.
///
/// The reader inspects the first bytes of the stream for a BOM, falling back
/// to a zero-byte heuristic over the first four bytes, and thereafter
/// produces a lazily refilled buffer of code points. UTF-16 input is decoded
/// incrementally through `encoding_rs`; UTF-8 is validated natively so that
/// invalid sequences are reported with their exact byte offset.
///
/// Code points forbidden by YAML 1.2 (C0 controls except tab and breaks, DEL,
/// surrogate halves, BOM in content position) are rejected as they enter the
/// buffer.
pub struct Reader<'r> {
    input: Option<&'r mut dyn std::io::Read>,
    /// Raw, possibly non-UTF-8 bytes as handed to us by the input.
    raw: VecDeque<u8>,
    /// Decoded code points, always valid UTF-8.
    buffer: VecDeque<char>,
    encoding: Encoding,
    utf16: Option<Decoder>,
    /// Bytes consumed from the raw stream, for error offsets.
    offset: usize,
    mark: Mark,
    eof: bool,
}

impl<'r> Default for Reader<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Reader<'r> {
    pub fn new() -> Self {
        Self {
            input: None,
            raw: VecDeque::with_capacity(INPUT_RAW_BUFFER_SIZE),
            buffer: VecDeque::with_capacity(INPUT_BUFFER_SIZE),
            encoding: Encoding::Any,
            utf16: None,
            offset: 0,
            mark: Mark::default(),
            eof: false,
        }
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::Read) {
        assert!(self.input.is_none(), "input already set");
        self.input = Some(input);
    }

    /// Set the source encoding, overriding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert!(self.encoding == Encoding::Any, "encoding already set");
        self.encoding = encoding;
    }

    /// The detected (or forced) stream encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The mark of the next unread code point.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Ensure at least `length` code points are buffered, or EOF was reached.
    pub(crate) fn cache(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.buffer.len() >= length {
            return Ok(());
        }
        self.update_buffer(length)
    }

    /// Look at the `k`-th unread code point. Call [`Self::cache`] first.
    pub(crate) fn peek(&self, k: usize) -> Option<char> {
        self.buffer.get(k).copied()
    }

    pub(crate) fn check(&self, ch: char) -> bool {
        self.peek(0) == Some(ch)
    }

    pub(crate) fn check_at(&self, ch: char, k: usize) -> bool {
        self.peek(k) == Some(ch)
    }

    pub(crate) fn is_z(&self) -> bool {
        self.peek(0).is_none()
    }

    pub(crate) fn is_blank(&self) -> bool {
        chars::is_blank(self.peek(0))
    }

    pub(crate) fn is_blank_at(&self, k: usize) -> bool {
        chars::is_blank(self.peek(k))
    }

    pub(crate) fn is_break(&self) -> bool {
        chars::is_break(self.peek(0))
    }

    pub(crate) fn is_break_at(&self, k: usize) -> bool {
        chars::is_break(self.peek(k))
    }

    pub(crate) fn is_breakz(&self) -> bool {
        chars::is_breakz(self.peek(0))
    }

    pub(crate) fn is_blankz(&self) -> bool {
        chars::is_blankz(self.peek(0))
    }

    pub(crate) fn is_blankz_at(&self, k: usize) -> bool {
        chars::is_blankz(self.peek(k))
    }

    pub(crate) fn is_alpha(&self) -> bool {
        chars::is_alpha(self.peek(0))
    }

    pub(crate) fn is_digit(&self) -> bool {
        self.peek(0).is_some_and(|ch| ch.is_ascii_digit())
    }

    pub(crate) fn as_digit(&self) -> u32 {
        self.peek(0)
            .and_then(|ch| ch.to_digit(10))
            .expect("expected a decimal digit")
    }

    pub(crate) fn is_hex_at(&self, k: usize) -> bool {
        self.peek(k).is_some_and(|ch| ch.is_ascii_hexdigit())
    }

    pub(crate) fn as_hex_at(&self, k: usize) -> u32 {
        self.peek(k)
            .and_then(|ch| ch.to_digit(16))
            .expect("expected a hex digit")
    }

    pub(crate) fn is_bom(&self) -> bool {
        chars::is_bom(self.peek(0))
    }

    /// Consume one code point, updating the mark.
    pub(crate) fn skip(&mut self) {
        let popped = self.buffer.pop_front().expect("skip past end of buffer");
        self.mark.index += popped.len_utf8() as u64;
        self.mark.column += 1;
    }

    /// Consume `n` code points.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.skip();
        }
    }

    /// Consume one line break, updating the mark.
    pub(crate) fn skip_line(&mut self) {
        if self.peek(0) == Some('\r') && self.peek(1) == Some('\n') {
            self.buffer.drain(0..2);
            self.mark.index += 2;
            self.mark.column = 0;
            self.mark.line += 1;
        } else if let Some(front) = self.peek(0) {
            if chars::is_break(front) {
                self.buffer.pop_front();
                self.mark.index += front.len_utf8() as u64;
                self.mark.column = 0;
                self.mark.line += 1;
            }
        }
    }

    /// Consume one code point into `string`.
    pub(crate) fn read_char(&mut self, string: &mut String) {
        let popped = self.buffer.pop_front().expect("read past end of buffer");
        string.push(popped);
        self.mark.index += popped.len_utf8() as u64;
        self.mark.column += 1;
    }

    /// Consume a line break into `string`, normalizing CR and CRLF to LF.
    /// Unicode breaks wider than two UTF-8 bytes are preserved as-is.
    pub(crate) fn read_break(&mut self, string: &mut String) {
        if self.peek(0) == Some('\r') && self.peek(1) == Some('\n') {
            string.push('\n');
            self.buffer.drain(0..2);
            self.mark.index += 2;
            self.mark.column = 0;
            self.mark.line += 1;
        } else if let Some(front) = self.peek(0) {
            if chars::is_break(front) {
                self.buffer.pop_front();
                if front.len_utf8() == 3 {
                    string.push(front);
                } else {
                    string.push('\n');
                }
                self.mark.index += front.len_utf8() as u64;
                self.mark.column = 0;
                self.mark.line += 1;
            }
        }
    }

    fn update_raw(&mut self) -> Result<(), ReaderError> {
        if self.eof || self.raw.len() >= INPUT_RAW_BUFFER_SIZE {
            return Ok(());
        }
        let len_before = self.raw.len();
        self.raw.resize(INPUT_RAW_BUFFER_SIZE, 0);
        let contiguous = self.raw.make_contiguous();
        let write_to = &mut contiguous[len_before..];
        let size_read = self
            .input
            .as_mut()
            .expect("no input set on reader")
            .read(write_to)?;
        self.raw.truncate(len_before + size_read);
        if size_read == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Pick the stream encoding from a BOM, or from the zero-byte pattern of
    /// the first bytes, defaulting to UTF-8.
    fn determine_encoding(&mut self) -> Result<(), ReaderError> {
        while !self.eof && self.raw.len() < 4 {
            self.update_raw()?;
        }
        let starts_with = |bom: &[u8]| {
            self.raw.len() >= bom.len() && self.raw.iter().zip(bom).all(|(a, b)| a == b)
        };
        if starts_with(BOM_UTF16LE) {
            self.encoding = Encoding::Utf16Le;
            self.raw.drain(0..2);
            self.offset += 2;
        } else if starts_with(BOM_UTF16BE) {
            self.encoding = Encoding::Utf16Be;
            self.raw.drain(0..2);
            self.offset += 2;
        } else if starts_with(BOM_UTF8) {
            self.encoding = Encoding::Utf8;
            self.raw.drain(0..3);
            self.offset += 3;
        } else if self.raw.len() >= 2 && self.raw[0] == 0 && self.raw[1] != 0 {
            self.encoding = Encoding::Utf16Be;
        } else if self.raw.len() >= 2 && self.raw[0] != 0 && self.raw[1] == 0 {
            self.encoding = Encoding::Utf16Le;
        } else {
            self.encoding = Encoding::Utf8;
        }
        if self.utf16.is_none() {
            self.utf16 = match self.encoding {
                Encoding::Utf16Le => Some(UTF_16LE.new_decoder_without_bom_handling()),
                Encoding::Utf16Be => Some(UTF_16BE.new_decoder_without_bom_handling()),
                _ => None,
            };
        }
        Ok(())
    }

    fn update_buffer(&mut self, length: usize) -> Result<(), ReaderError> {
        assert!(self.input.is_some(), "no input set on reader");
        if self.eof && self.raw.is_empty() {
            return Ok(());
        }
        if self.encoding == Encoding::Any {
            self.determine_encoding()?;
        }
        let mut first = true;
        while self.buffer.len() < length {
            if self.eof && self.raw.is_empty() {
                return Ok(());
            }
            if !first || self.raw.is_empty() {
                self.update_raw()?;
            }
            first = false;
            match self.encoding {
                Encoding::Utf8 | Encoding::Any => self.decode_utf8()?,
                Encoding::Utf16Le | Encoding::Utf16Be => self.decode_utf16()?,
            }
        }
        Ok(())
    }

    /// Decode as many complete UTF-8 sequences as the raw buffer holds.
    fn decode_utf8(&mut self) -> Result<(), ReaderError> {
        loop {
            let Some(first) = self.raw.front().copied() else {
                return Ok(());
            };
            let (width, mut value) = utf8_width_and_initial(first);
            if width == 0 {
                return Err(ReaderError::InvalidUtf8 {
                    offset: self.offset,
                    value: first,
                });
            }
            if self.raw.len() < width {
                if self.eof {
                    return Err(ReaderError::Problem {
                        problem: "incomplete UTF-8 octet sequence",
                        offset: self.offset,
                        value: first as u32,
                    });
                }
                return Ok(());
            }
            for i in 1..width {
                let trailing = self.raw[i];
                if trailing & 0xC0 != 0x80 {
                    return Err(ReaderError::InvalidUtf8 {
                        offset: self.offset + i,
                        value: trailing,
                    });
                }
                value = (value << 6) + (trailing as u32 & 0x3F);
            }
            let overlong = !(width == 1
                || width == 2 && value >= 0x80
                || width == 3 && value >= 0x800
                || width == 4 && value >= 0x10000);
            if overlong {
                return Err(ReaderError::Problem {
                    problem: "overlong UTF-8 sequence",
                    offset: self.offset,
                    value,
                });
            }
            let Some(ch) = char::from_u32(value) else {
                return Err(ReaderError::Problem {
                    problem: "invalid Unicode character",
                    offset: self.offset,
                    value,
                });
            };
            self.raw.drain(0..width);
            self.offset += width;
            self.push_char(ch)?;
        }
    }

    /// Decode buffered UTF-16 bytes through `encoding_rs`.
    fn decode_utf16(&mut self) -> Result<(), ReaderError> {
        let last = self.eof;
        let decoder = self.utf16.as_mut().expect("UTF-16 decoder not installed");
        let src = self.raw.make_contiguous();
        let mut out = String::with_capacity(src.len() * 3 + 4);
        let (result, read) = decoder.decode_to_string_without_replacement(src, &mut out, last);
        match result {
            encoding_rs::DecoderResult::Malformed(..) => {
                return Err(ReaderError::InvalidUtf16 {
                    offset: self.offset + read,
                });
            }
            encoding_rs::DecoderResult::InputEmpty | encoding_rs::DecoderResult::OutputFull => {}
        }
        self.raw.drain(0..read);
        self.offset += read;
        for ch in out.chars() {
            self.push_char(ch)?;
        }
        Ok(())
    }

    /// Admit a decoded code point into the buffer, rejecting characters the
    /// YAML spec forbids in a stream.
    fn push_char(&mut self, ch: char) -> Result<(), ReaderError> {
        let allowed = ch == '\x09'
            || ch == '\x0A'
            || ch == '\x0D'
            || ch >= '\x20' && ch <= '\x7E'
            || ch == '\u{0085}'
            || ch >= '\u{00A0}' && ch <= '\u{D7FF}'
            || ch >= '\u{E000}' && ch <= '\u{FFFD}'
            || ch >= '\u{10000}' && ch <= '\u{10FFFF}';
        if !allowed {
            return Err(ReaderError::Problem {
                problem: "control characters are not allowed",
                offset: self.offset,
                value: ch as u32,
            });
        }
        self.buffer.push_back(ch);
        Ok(())
    }
}

fn utf8_width_and_initial(initial: u8) -> (usize, u32) {
    let initial = initial as u32;
    if initial & 0x80 == 0 {
        (1, initial & 0x7F)
    } else if initial & 0xE0 == 0xC0 {
        (2, initial & 0x1F)
    } else if initial & 0xF0 == 0xE0 {
        (3, initial & 0x0F)
    } else if initial & 0xF8 == 0xF0 {
        (4, initial & 0x07)
    } else {
        (0, 0)
    }
}
