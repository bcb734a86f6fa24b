//! The input window: chunk accumulation, absolute offsets, line accounting
//! and buffer compaction.

use std::fmt;

use memchr::memchr2_iter;

/// A position in the original byte stream.
///
/// `offset` points at the first byte of the construct an event describes.
/// `line_start` is the absolute offset of the first byte of that line, so
/// the zero-based column is `offset - line_start`. Lines count from 1;
/// `\r\n` and a lone `\r` each advance the counter exactly once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// Absolute byte offset of the first byte of the current line.
    pub line_start: usize,
    /// Absolute byte offset of the located byte.
    pub offset: usize,
}

impl Location {
    /// Zero-based column within the line, in bytes.
    #[inline]
    pub const fn column(&self) -> usize {
        self.offset - self.line_start
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column())
    }
}

/// Accumulated, not yet released input bytes.
///
/// All positions handed out by this type are absolute stream offsets.
/// [`compact`] drops an already scanned prefix and bumps `base`; stored
/// offsets stay valid because slices resolve through `offset - base`.
///
/// [`compact`]: Window::compact
#[derive(Debug)]
pub(crate) struct Window {
    buffer: Vec<u8>,
    /// Absolute stream offset of `buffer[0]`.
    base: usize,
    /// Absolute stream offset of the scan cursor.
    pos: usize,
    /// `false` once `finish` was called.
    more_expected: bool,
    line: u32,
    line_start: usize,
    /// The last scanned byte was `\r`; a directly following `\n` must not
    /// count as a second line break.
    pending_cr: bool,
}

impl Window {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            base: 0,
            pos: 0,
            more_expected: true,
            line: 1,
            line_start: 0,
            pending_cr: false,
        }
    }

    /// Appends a chunk of input.
    ///
    /// # Panics
    ///
    /// Panics if called after [`finish`](Self::finish) — that is a
    /// programmer error, not a parse error.
    pub fn feed(&mut self, chunk: &[u8]) {
        assert!(self.more_expected, "feed() called after finish()");
        self.buffer.extend_from_slice(chunk);
    }

    /// Signals that no further input will arrive.
    pub fn finish(&mut self) {
        self.more_expected = false;
    }

    #[inline]
    pub fn more_expected(&self) -> bool {
        self.more_expected
    }

    /// Absolute offset of the scan cursor.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Absolute offset one past the last buffered byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.base + self.buffer.len()
    }

    /// Unscanned bytes, from the cursor to the end of the buffer.
    #[inline]
    pub fn rest(&self) -> &[u8] {
        &self.buffer[self.pos - self.base..]
    }

    /// Buffered bytes from the absolute offset `start` to the end.
    #[inline]
    pub fn suffix(&self, start: usize) -> &[u8] {
        &self.buffer[start - self.base..]
    }

    /// Zero-copy view of the absolute range `start..end`.
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &[u8] {
        &self.buffer[start - self.base..end - self.base]
    }

    /// The source location of the byte the cursor is at.
    #[inline]
    pub fn location(&self) -> Location {
        Location {
            line: self.line,
            line_start: self.line_start,
            offset: self.pos,
        }
    }

    /// Moves the cursor to the absolute offset `to`, accounting line
    /// breaks in the range it moved over.
    pub fn advance_to(&mut self, to: usize) {
        debug_assert!(self.pos <= to && to <= self.end());
        let start = self.pos - self.base;
        let end = to - self.base;
        let region = &self.buffer[start..end];
        if region.is_empty() {
            return;
        }
        let mut pending_cr = self.pending_cr;
        for i in memchr2_iter(b'\r', b'\n', region) {
            let after = self.base + start + i + 1;
            if region[i] == b'\r' {
                self.line += 1;
            } else if !(i > 0 && region[i - 1] == b'\r' || i == 0 && pending_cr) {
                self.line += 1;
            }
            self.line_start = after;
            pending_cr = false;
        }
        self.pending_cr = region.last() == Some(&b'\r');
        self.pos = to;
    }

    /// Consumes a single byte.
    #[inline]
    pub fn bump(&mut self) {
        self.advance_to(self.pos + 1);
    }

    /// Computes the location of `target` from a known earlier location by
    /// counting line breaks in between. Both offsets must still be
    /// buffered. Used to report positions inside a construct without
    /// moving the cursor.
    pub fn location_within(&self, from: Location, target: usize) -> Location {
        debug_assert!(from.offset <= target);
        let mut line = from.line;
        let mut line_start = from.line_start;
        let region = self.slice(from.offset, target);
        for i in memchr2_iter(b'\r', b'\n', region) {
            if region[i] == b'\n' && i > 0 && region[i - 1] == b'\r' {
                line_start = from.offset + i + 1;
            } else {
                line += 1;
                line_start = from.offset + i + 1;
            }
        }
        Location {
            line,
            line_start,
            offset: target,
        }
    }

    /// Number of buffered bytes that already lie behind the cursor.
    #[inline]
    pub fn scanned_prefix(&self) -> usize {
        self.pos - self.base
    }

    /// Drops buffered bytes before the absolute offset `keep_from`.
    ///
    /// `keep_from` must not exceed the cursor and must not cut into data
    /// still referenced by a resume point; the caller derives it from the
    /// parser state checkpoint.
    pub fn compact(&mut self, keep_from: usize) {
        debug_assert!(self.base <= keep_from && keep_from <= self.pos);
        let cut = keep_from - self.base;
        if cut > 0 {
            self.buffer.drain(..cut);
            self.base = keep_from;
        }
    }
}
