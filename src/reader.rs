//! The event reader: feeds input into the state machine and delivers
//! typed, located events.
//!
//! Two delivery modes share one event order. Pull mode hands out one
//! event per [`read_event`] call; callback mode drains events into a
//! closure that may stop the parse early. In both modes exactly one
//! [`Event::StartDocument`] comes first and exactly one
//! [`Event::EndDocument`] comes last, also after a fatal error.
//!
//! Events borrow from the reader's buffer, so `Reader` intentionally does
//! not implement `Iterator`; the borrow ends when [`read_event`] is
//! called again, which is also the moment the buffer may be compacted.
//!
//! [`read_event`]: Reader::read_event

use std::borrow::Cow;
use std::ops::ControlFlow;

use crate::chars::Edition;
use crate::errors::{ErrorKind, XmlError};
use crate::events::{Attribute, Event};
use crate::input::{Location, Window};
use crate::parser::{normalize_newlines, Machine, Raw, RawAttr, RawText, Span, Step};

/// Scanned-prefix length that triggers buffer compaction between events.
const COMPACT_THRESHOLD: usize = 4096;

/// Parser configuration.
///
/// Read it with [`Reader::config`] and change it with
/// [`Reader::config_mut`], preferably before the first event is pulled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    /// Reject `--` inside comments, as the XML grammar demands. When
    /// enabled a violation is the fatal [`ErrorKind::DoubleHyphenInComment`].
    ///
    /// Default: `false`.
    pub check_comments: bool,
    /// Reject a repeated attribute name within one tag with the fatal
    /// [`ErrorKind::AttributeNotUnique`]. When disabled, duplicates are
    /// delivered in source order and the policy is the consumer's.
    ///
    /// Default: `false`.
    pub check_duplicate_attributes: bool,
    /// Which edition of the XML 1.0 name rules to apply.
    ///
    /// Default: [`Edition::Fifth`].
    pub edition: Edition,
}

/// A resumable streaming XML reader.
///
/// Input arrives through [`feed`] in chunks of arbitrary size — the
/// parser suspends mid-construct at chunk boundaries and resumes when
/// more bytes arrive. [`finish`] marks the end of input. For input that
/// is already complete in memory, [`from_str`] / [`from_bytes`] do both
/// in one step.
///
/// ```
/// use flux_xml::{Event, Reader};
///
/// let mut reader = Reader::new();
/// reader.feed(b"<greeting lang=\"en\">hel");
/// reader.feed(b"lo</greeting>");
/// reader.finish();
///
/// let mut names = Vec::new();
/// while let Some(event) = reader.read_event() {
///     match event {
///         Event::StartElement { name, attributes, .. } => {
///             assert_eq!(attributes[0].value, "en");
///             names.push(name.into_owned());
///         }
///         Event::Characters { text, .. } => assert_eq!(text, "hello"),
///         _ => {}
///     }
/// }
/// assert_eq!(names, ["greeting"]);
/// assert!(reader.is_done());
/// ```
///
/// [`feed`]: Reader::feed
/// [`finish`]: Reader::finish
/// [`from_str`]: Reader::from_str
/// [`from_bytes`]: Reader::from_bytes
#[derive(Debug)]
pub struct Reader {
    window: Window,
    machine: Machine,
    /// `EndDocument` has been handed out; the stream is closed.
    finished: bool,
}

impl Reader {
    /// Creates a streaming reader awaiting input via [`Reader::feed`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a streaming reader with an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            window: Window::new(),
            machine: Machine::new(config),
            finished: false,
        }
    }

    /// Creates a reader over a complete in-memory document.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut reader = Self::new();
        reader.feed(bytes);
        reader.finish();
        reader
    }

    /// Creates a reader over a complete in-memory document.
    pub fn from_str(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.machine.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.machine.config
    }

    /// Appends a chunk of input. Chunk boundaries may fall anywhere,
    /// including inside tags, attribute values, comments, CDATA and
    /// multi-byte characters.
    ///
    /// # Panics
    ///
    /// Panics if called after [`finish`](Reader::finish).
    pub fn feed(&mut self, chunk: &[u8]) {
        self.window.feed(chunk);
    }

    /// Declares the end of input. Constructs still open at this point
    /// surface as the appropriate error event on the next
    /// [`read_event`](Reader::read_event) call.
    pub fn finish(&mut self) {
        self.window.finish();
    }

    /// `true` once [`Event::EndDocument`] has been returned; every later
    /// [`read_event`](Reader::read_event) call returns `None`.
    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Absolute byte offset of the scan cursor.
    pub fn buffer_position(&self) -> usize {
        self.window.pos()
    }

    /// Source location of the scan cursor.
    pub fn location(&self) -> Location {
        self.window.location()
    }

    /// Pulls the next event.
    ///
    /// Returns `None` in two situations: the parser needs more input
    /// (neither [`feed`] nor [`finish`] pending data is available), or
    /// the stream already delivered [`Event::EndDocument`] — use
    /// [`is_done`] to tell them apart.
    ///
    /// [`feed`]: Reader::feed
    /// [`finish`]: Reader::finish
    /// [`is_done`]: Reader::is_done
    pub fn read_event(&mut self) -> Option<Event<'_>> {
        if self.finished {
            return None;
        }
        while !self.machine.has_events() {
            if self.machine.is_done() {
                return None;
            }
            self.maybe_compact();
            if self.machine.advance(&mut self.window) == Step::NeedData
                && !self.machine.has_events()
            {
                return None;
            }
        }
        let raw = self.machine.pop_event()?;
        if matches!(raw, Raw::EndDocument { .. }) {
            self.finished = true;
        }
        match materialize(&self.window, raw) {
            Ok(event) => Some(event),
            Err((error, location)) => {
                self.machine.abort(self.window.location());
                Some(Event::Error { error, location })
            }
        }
    }

    /// Drains events into `callback` until it breaks, input runs out or
    /// the document ends.
    pub fn for_each_event<F>(&mut self, mut callback: F)
    where
        F: FnMut(Event<'_>) -> ControlFlow<()>,
    {
        while let Some(event) = self.read_event() {
            if callback(event).is_break() {
                break;
            }
        }
    }

    /// Compaction runs only between events: the FIFO must be empty and
    /// nothing before the parser state's checkpoint may still be needed.
    fn maybe_compact(&mut self) {
        if self.machine.has_events() {
            return;
        }
        if self.window.scanned_prefix() <= COMPACT_THRESHOLD {
            return;
        }
        let keep = self
            .machine
            .checkpoint()
            .unwrap_or_else(|| self.window.pos())
            .min(self.window.pos());
        self.window.compact(keep);
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

type MaterializeError = (XmlError, Location);

/// Turns an offset-based raw event into a borrowed [`Event`]. UTF-8
/// validation of string payloads happens here; a violation aborts the
/// stream with [`ErrorKind::InvalidUtf8`].
fn materialize(window: &Window, raw: Raw) -> Result<Event<'_>, MaterializeError> {
    match raw {
        Raw::StartDocument { loc } => Ok(Event::StartDocument { location: loc }),
        Raw::EndDocument { loc } => Ok(Event::EndDocument { location: loc }),
        Raw::Prolog { attrs, loc } => Ok(Event::Prolog {
            attributes: attributes(window, attrs, loc)?,
            location: loc,
        }),
        Raw::Doctype { content, loc } => Ok(Event::Doctype {
            content: Cow::Borrowed(window.slice(content.start, content.end)),
            location: loc,
        }),
        Raw::StartElement { name, attrs, loc } => Ok(Event::StartElement {
            name: name_str(window, name, loc)?,
            attributes: attributes(window, attrs, loc)?,
            location: loc,
        }),
        Raw::EndElement { name, loc } => Ok(Event::EndElement {
            name: name_str(window, name, loc)?,
            location: loc,
        }),
        Raw::Characters { text, loc } => Ok(Event::Characters {
            text: text_cow(window, text, loc)?,
            location: loc,
        }),
        Raw::Cdata { text, loc } => Ok(Event::Cdata {
            text: span_text(window, text, loc)?,
            location: loc,
        }),
        Raw::Comment { text, loc } => Ok(Event::Comment {
            text: span_text(window, text, loc)?,
            location: loc,
        }),
        Raw::Pi { target, data, loc } => Ok(Event::ProcessingInstruction {
            target: name_str(window, target, loc)?,
            data: span_text(window, data, loc)?,
            location: loc,
        }),
        Raw::Error { error, loc } => Ok(Event::Error {
            error,
            location: loc,
        }),
    }
}

fn name_str(window: &Window, span: Span, loc: Location) -> Result<Cow<'_, str>, MaterializeError> {
    match std::str::from_utf8(window.slice(span.start, span.end)) {
        Ok(name) => Ok(Cow::Borrowed(name)),
        Err(e) => Err((
            XmlError::with_detail(ErrorKind::InvalidUtf8, e.to_string()),
            loc,
        )),
    }
}

fn span_text(window: &Window, span: Span, loc: Location) -> Result<Cow<'_, str>, MaterializeError> {
    normalize_newlines(window.slice(span.start, span.end)).map_err(|e| (e, loc))
}

fn text_cow(
    window: &Window,
    text: RawText,
    loc: Location,
) -> Result<Cow<'_, str>, MaterializeError> {
    match text {
        RawText::Span(span) => span_text(window, span, loc),
        RawText::Owned(text) => Ok(Cow::Owned(text)),
    }
}

fn attributes(
    window: &Window,
    attrs: Vec<RawAttr>,
    loc: Location,
) -> Result<Vec<Attribute<'_>>, MaterializeError> {
    attrs
        .into_iter()
        .map(|attr| {
            Ok(Attribute {
                name: name_str(window, attr.name, loc)?,
                value: text_cow(window, attr.value, loc)?,
            })
        })
        .collect()
}
