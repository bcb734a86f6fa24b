//! The suspendable parser state machine.
//!
//! The machine consumes bytes from a [`Window`] and pushes offset-based
//! [`Raw`] events onto its FIFO; the reader materializes them into
//! borrowed [`Event`]s. Every state that can run out of bytes mid-scan
//! carries the minimal payload needed to re-enter the same logical
//! position after a refill, so nothing lives in stack frames across a
//! suspension.
//!
//! States either consume bytes and stay, transition, push an event, or
//! suspend with [`Flow::Suspend`]. The first fatal error pushes one
//! [`Raw::Error`] followed by [`Raw::EndDocument`] and parks the machine
//! in [`ParserState::Done`].
//!
//! [`Event`]: crate::events::Event

use std::borrow::Cow;
use std::collections::VecDeque;

use crate::errors::{ErrorKind, XmlError};
use crate::escape::{resolve_reference, Resolved};
use crate::input::{Location, Window};
use crate::reader::Config;

mod bang;
mod bom;
mod element;
mod pi;

pub(crate) use element::ElementFrame;

/// An absolute byte range in the input stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }
}

/// Text payload of a queued event: either still a slice of the window or
/// already rewritten (entity resolution, line-break normalization).
#[derive(Debug)]
pub(crate) enum RawText {
    Span(Span),
    Owned(String),
}

/// An attribute collected while scanning a tag.
#[derive(Debug)]
pub(crate) struct RawAttr {
    pub name: Span,
    pub value: RawText,
}

/// An event in offset form, waiting in the machine's FIFO.
#[derive(Debug)]
pub(crate) enum Raw {
    StartDocument {
        loc: Location,
    },
    EndDocument {
        loc: Location,
    },
    Prolog {
        attrs: Vec<RawAttr>,
        loc: Location,
    },
    Doctype {
        content: Span,
        loc: Location,
    },
    StartElement {
        name: Span,
        attrs: Vec<RawAttr>,
        loc: Location,
    },
    EndElement {
        name: Span,
        loc: Location,
    },
    Characters {
        text: RawText,
        loc: Location,
    },
    Cdata {
        text: Span,
        loc: Location,
    },
    Comment {
        text: Span,
        loc: Location,
    },
    Pi {
        target: Span,
        data: Span,
        loc: Location,
    },
    Error {
        error: XmlError,
        loc: Location,
    },
}

/// Every position the parser can suspend at, with its resume payload.
///
/// Offsets and spans stored here are absolute stream offsets; they stay
/// valid across buffer compaction because slices resolve through the
/// window base.
#[derive(Debug)]
pub(crate) enum ParserState {
    /// Offset 0: byte-order-mark sniffing.
    Start,
    /// Between constructs; skips whitespace.
    Content,
    /// Inside a character data run that began at `start`.
    Text { start: usize, loc: Location },
    /// After `&` in text context; `loc` points at the `&`.
    EntityRef { loc: Location },
    /// After `<`.
    TagStart { loc: Location },
    /// After `<!`; needs up to 7 bytes of lookahead.
    Bang { loc: Location },
    /// Scanning an element name that began at `name_start`.
    OpenTagName { loc: Location, name_start: usize },
    /// After `</`, scanning the name.
    CloseTagName { loc: Location, name_start: usize },
    /// Close tag name done; optional whitespace, then `>` required.
    CloseTagEnd { loc: Location, name: Span },
    /// Between attributes of an open tag or prolog.
    Attributes { el: ElementFrame },
    /// Scanning an attribute name that began at `attr_start`.
    AttrName { el: ElementFrame, attr_start: usize },
    /// Attribute name done; optional whitespace, then `=` required.
    AttrEq { el: ElementFrame, attr_name: Span },
    /// After `=`; optional whitespace, then a quote required.
    AttrQuote { el: ElementFrame, attr_name: Span },
    /// Inside a quoted attribute value. `acc` holds the rewritten prefix
    /// when an entity reference already forced a copy; `value_start` is
    /// the begin of the still unflushed raw run.
    AttrValue {
        el: ElementFrame,
        attr_name: Span,
        quote: u8,
        value_start: usize,
        acc: String,
    },
    /// After `&` inside an attribute value; `amp` points at the `&`.
    AttrEntity {
        el: ElementFrame,
        attr_name: Span,
        quote: u8,
        amp: Location,
        acc: String,
    },
    /// After `/` in a tag; `>` required. `slash` locates the `/` for the
    /// synthesized end element.
    SelfClose { el: ElementFrame, slash: Location },
    /// After `?` in a prolog; `>` required.
    PrologEnd { el: ElementFrame },
    /// Inside `<!--`; content began at `start`.
    Comment { loc: Location, start: usize },
    /// Inside `<![CDATA[`; content began at `start`.
    CData { loc: Location, start: usize },
    /// Inside `<!DOCTYPE`; `depth` balances `<` against `>`.
    Doctype {
        loc: Location,
        start: usize,
        depth: u32,
    },
    /// Scanning a processing instruction target.
    PiTarget { loc: Location, start: usize },
    /// Whitespace between a PI target and its data.
    PiWs { loc: Location, target: Span },
    /// Inside PI data, scanning for `?>`.
    PiData {
        loc: Location,
        target: Span,
        start: usize,
    },
    /// Terminal state; reached after `EndDocument` was queued.
    Done,
}

/// What a state handler decided.
pub(crate) enum Flow {
    /// Transitioned; keep running within the same buffer.
    Continue(ParserState),
    /// Out of bytes; park in the carried state and ask for more input.
    Suspend(ParserState),
    /// Unrecoverable; emit the error and shut the stream down.
    Fatal(XmlError, Location),
}

/// Outcome of one [`Machine::advance`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    /// At least one event is queued.
    Ready,
    /// No progress possible until more input is fed (or `finish` is
    /// called).
    NeedData,
}

/// The parser core: current state, configuration and the event FIFO.
#[derive(Debug)]
pub(crate) struct Machine {
    state: ParserState,
    queue: VecDeque<Raw>,
    pub(crate) config: Config,
}

impl Machine {
    pub fn new(config: Config) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(Raw::StartDocument {
            loc: Location {
                line: 1,
                line_start: 0,
                offset: 0,
            },
        });
        Self {
            state: ParserState::Start,
            queue,
            config,
        }
    }

    #[inline]
    pub fn pop_event(&mut self) -> Option<Raw> {
        self.queue.pop_front()
    }

    #[inline]
    pub fn has_events(&self) -> bool {
        !self.queue.is_empty()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self.state, ParserState::Done)
    }

    /// The earliest absolute offset the current resume point still
    /// references. Bytes before it may be compacted away.
    pub fn checkpoint(&self) -> Option<usize> {
        match &self.state {
            ParserState::Start | ParserState::Content | ParserState::Done => None,
            ParserState::TagStart { loc }
            | ParserState::Bang { loc }
            | ParserState::EntityRef { loc } => Some(loc.offset),
            ParserState::Text { start, .. }
            | ParserState::OpenTagName {
                name_start: start, ..
            }
            | ParserState::CloseTagName {
                name_start: start, ..
            }
            | ParserState::Comment { start, .. }
            | ParserState::CData { start, .. }
            | ParserState::Doctype { start, .. }
            | ParserState::PiTarget { start, .. } => Some(*start),
            ParserState::CloseTagEnd { name, .. } => Some(name.start),
            ParserState::Attributes { el }
            | ParserState::AttrName { el, .. }
            | ParserState::AttrEq { el, .. }
            | ParserState::AttrQuote { el, .. }
            | ParserState::AttrValue { el, .. }
            | ParserState::AttrEntity { el, .. }
            | ParserState::SelfClose { el, .. }
            | ParserState::PrologEnd { el } => Some(el.name.start),
            ParserState::PiWs { target, .. } | ParserState::PiData { target, .. } => {
                Some(target.start)
            }
        }
    }

    /// Abandons the stream after a materialization failure: drops queued
    /// events and closes with `EndDocument`.
    pub fn abort(&mut self, end_loc: Location) {
        self.queue.clear();
        self.queue.push_back(Raw::EndDocument { loc: end_loc });
        self.state = ParserState::Done;
    }

    /// Runs the state machine until at least one event is queued or the
    /// buffer runs dry.
    pub fn advance(&mut self, window: &mut Window) -> Step {
        debug_assert!(!self.is_done());
        loop {
            let state = std::mem::replace(&mut self.state, ParserState::Done);
            let flow = match state {
                ParserState::Start => self.start(window),
                ParserState::Content => self.content(window),
                ParserState::Text { start, loc } => self.text(window, start, loc),
                ParserState::EntityRef { loc } => self.entity_ref(window, loc),
                ParserState::TagStart { loc } => self.tag_start(window, loc),
                ParserState::Bang { loc } => self.bang(window, loc),
                ParserState::OpenTagName { loc, name_start } => {
                    self.open_tag_name(window, loc, name_start)
                }
                ParserState::CloseTagName { loc, name_start } => {
                    self.close_tag_name(window, loc, name_start)
                }
                ParserState::CloseTagEnd { loc, name } => self.close_tag_end(window, loc, name),
                ParserState::Attributes { el } => self.attributes(window, el),
                ParserState::AttrName { el, attr_start } => {
                    self.attr_name(window, el, attr_start)
                }
                ParserState::AttrEq { el, attr_name } => self.attr_eq(window, el, attr_name),
                ParserState::AttrQuote { el, attr_name } => {
                    self.attr_quote(window, el, attr_name)
                }
                ParserState::AttrValue {
                    el,
                    attr_name,
                    quote,
                    value_start,
                    acc,
                } => self.attr_value(window, el, attr_name, quote, value_start, acc),
                ParserState::AttrEntity {
                    el,
                    attr_name,
                    quote,
                    amp,
                    acc,
                } => self.attr_entity(window, el, attr_name, quote, amp, acc),
                ParserState::SelfClose { el, slash } => self.self_close(window, el, slash),
                ParserState::PrologEnd { el } => self.prolog_end(window, el),
                ParserState::Comment { loc, start } => self.comment(window, loc, start),
                ParserState::CData { loc, start } => self.cdata(window, loc, start),
                ParserState::Doctype { loc, start, depth } => {
                    self.doctype(window, loc, start, depth)
                }
                ParserState::PiTarget { loc, start } => self.pi_target(window, loc, start),
                ParserState::PiWs { loc, target } => self.pi_ws(window, loc, target),
                ParserState::PiData { loc, target, start } => {
                    self.pi_data(window, loc, target, start)
                }
                ParserState::Done => return Step::Ready,
            };
            match flow {
                Flow::Continue(next) => {
                    self.state = next;
                    if self.has_events() {
                        return Step::Ready;
                    }
                }
                Flow::Suspend(next) => {
                    self.state = next;
                    return Step::NeedData;
                }
                Flow::Fatal(error, loc) => {
                    self.fatal(window, error, loc);
                    return Step::Ready;
                }
            }
        }
    }

    fn fatal(&mut self, window: &Window, error: XmlError, loc: Location) {
        self.queue.push_back(Raw::Error { error, loc });
        self.queue.push_back(Raw::EndDocument {
            loc: window.location(),
        });
        self.state = ParserState::Done;
    }

    #[inline]
    fn push(&mut self, raw: Raw) {
        self.queue.push_back(raw);
    }

    /// Content state: skip whitespace, then decide between markup, an
    /// entity reference, character data and end of input.
    fn content(&mut self, window: &mut Window) -> Flow {
        match window.rest().iter().position(|&b| !crate::chars::is_whitespace(b)) {
            Some(i) => window.advance_to(window.pos() + i),
            None => {
                window.advance_to(window.end());
                return if window.more_expected() {
                    Flow::Suspend(ParserState::Content)
                } else {
                    self.push(Raw::EndDocument {
                        loc: window.location(),
                    });
                    Flow::Continue(ParserState::Done)
                };
            }
        }
        let loc = window.location();
        match window.rest()[0] {
            b'<' => {
                window.bump();
                Flow::Continue(ParserState::TagStart { loc })
            }
            b'&' => {
                window.bump();
                Flow::Continue(ParserState::EntityRef { loc })
            }
            _ => Flow::Continue(ParserState::Text {
                start: loc.offset,
                loc,
            }),
        }
    }

    /// Text state: scan for `<` or `&`, emitting the run scanned so far
    /// when one is found. At a clean end of input the trailing run is
    /// flushed and the document closes.
    fn text(&mut self, window: &mut Window, start: usize, loc: Location) -> Flow {
        match memchr::memchr2(b'<', b'&', window.rest()) {
            Some(i) => {
                let at = window.pos() + i;
                window.advance_to(at);
                if at > start {
                    self.push(Raw::Characters {
                        text: RawText::Span(Span::new(start, at)),
                        loc,
                    });
                }
                if window.rest()[0] == b'<' {
                    Flow::Continue(ParserState::Content)
                } else {
                    let amp = window.location();
                    window.bump();
                    Flow::Continue(ParserState::EntityRef { loc: amp })
                }
            }
            None => {
                window.advance_to(window.end());
                if window.more_expected() {
                    Flow::Suspend(ParserState::Text { start, loc })
                } else {
                    let end = window.pos();
                    if end > start {
                        self.push(Raw::Characters {
                            text: RawText::Span(Span::new(start, end)),
                            loc,
                        });
                    }
                    Flow::Continue(ParserState::Content)
                }
            }
        }
    }

    /// Entity reference in text context. Resolved references become their
    /// own `Characters` event; unknown well-formed references pass
    /// through as the literal `&name;` slice.
    fn entity_ref(&mut self, window: &mut Window, loc: Location) -> Flow {
        let body_start = loc.offset + 1;
        match scan_reference(window, body_start) {
            ReferenceScan::Complete(end) => {
                let text = match resolve_body(window, body_start, end) {
                    Ok(Resolved::Named(s)) => RawText::Owned(s.to_string()),
                    Ok(Resolved::Char(c)) => RawText::Owned(c.to_string()),
                    Ok(Resolved::Unknown) => RawText::Span(Span::new(loc.offset, end + 1)),
                    Err(error) => return Flow::Fatal(error, loc),
                };
                window.advance_to(end + 1);
                self.push(Raw::Characters { text, loc });
                let after = window.location();
                Flow::Continue(ParserState::Text {
                    start: after.offset,
                    loc: after,
                })
            }
            ReferenceScan::NeedData => Flow::Suspend(ParserState::EntityRef { loc }),
            ReferenceScan::Malformed => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidEntityReference), loc)
            }
            ReferenceScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside entity reference"),
                loc,
            ),
        }
    }
}

/// Outcome of scanning for the `;` of an entity reference.
pub(crate) enum ReferenceScan {
    /// The `;` sits at this absolute offset.
    Complete(usize),
    NeedData,
    /// A byte that cannot be part of a reference body.
    Malformed,
    /// Final end of input before the `;`.
    Eof,
}

/// Scans from `body_start` for the terminating `;` of a reference.
///
/// The cursor is not moved; references are short and are re-scanned from
/// scratch after a refill.
pub(crate) fn scan_reference(window: &Window, body_start: usize) -> ReferenceScan {
    for (i, &b) in window.suffix(body_start).iter().enumerate() {
        match b {
            b';' => return ReferenceScan::Complete(body_start + i),
            b'&' | b'<' | b'>' | b'"' | b'\'' => return ReferenceScan::Malformed,
            b if crate::chars::is_whitespace(b) => return ReferenceScan::Malformed,
            _ => {}
        }
    }
    if window.more_expected() {
        ReferenceScan::NeedData
    } else {
        ReferenceScan::Eof
    }
}

/// Resolves the reference body stored at `body_start..end`.
pub(crate) fn resolve_body(
    window: &Window,
    body_start: usize,
    end: usize,
) -> Result<Resolved, XmlError> {
    let body = std::str::from_utf8(window.slice(body_start, end))
        .map_err(|_| XmlError::new(ErrorKind::InvalidEntityReference))?;
    resolve_reference(body)
}

/// Validates UTF-8 and folds `\r\n` and lone `\r` into `\n`.
///
/// Borrowed when the input contains no `\r`.
pub(crate) fn normalize_newlines(bytes: &[u8]) -> Result<Cow<'_, str>, XmlError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| XmlError::with_detail(ErrorKind::InvalidUtf8, e.to_string()))?;
    match memchr::memchr(b'\r', bytes) {
        None => Ok(Cow::Borrowed(text)),
        Some(_) => {
            let mut out = String::with_capacity(text.len());
            let mut rest = text;
            while let Some(i) = rest.find('\r') {
                out.push_str(&rest[..i]);
                out.push('\n');
                rest = &rest[i + 1..];
                if rest.as_bytes().first() == Some(&b'\n') {
                    rest = &rest[1..];
                }
            }
            out.push_str(rest);
            Ok(Cow::Owned(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_borrows_when_clean() {
        let out = normalize_newlines(b"plain\ntext").unwrap();
        assert_eq!(out, "plain\ntext");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_folds_crlf_and_cr() {
        assert_eq!(normalize_newlines(b"a\r\nb\rc\nd").unwrap(), "a\nb\nc\nd");
        assert_eq!(normalize_newlines(b"\r\r\n").unwrap(), "\n\n");
    }

    #[test]
    fn normalize_rejects_bad_utf8() {
        let err = normalize_newlines(&[b'a', 0xFF]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUtf8);
    }
}
