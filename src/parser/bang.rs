//! `<!` markup: comments, CDATA sections and the DOCTYPE declaration.

use memchr::{memchr2_iter, memchr_iter};

use crate::errors::{ErrorKind, XmlError};
use crate::input::{Location, Window};
use crate::parser::{Flow, Machine, ParserState, Raw, Span};

const COMMENT_OPEN: &[u8] = b"--";
const CDATA_OPEN: &[u8] = b"[CDATA[";
const DOCTYPE_OPEN: &[u8] = b"DOCTYPE";

impl Machine {
    /// After `<!`: needs up to 7 bytes to decide between `--`, `[CDATA[`
    /// and `DOCTYPE`, suspending while the buffered prefix is still
    /// compatible with one of them.
    pub(super) fn bang(&mut self, window: &mut Window, loc: Location) -> Flow {
        let rest = window.rest();
        if rest.is_empty() {
            return if window.more_expected() {
                Flow::Suspend(ParserState::Bang { loc })
            } else {
                Flow::Fatal(
                    XmlError::with_detail(ErrorKind::UnexpectedEof, "after `<!`"),
                    window.location(),
                )
            };
        }
        if rest.starts_with(COMMENT_OPEN) {
            window.advance_to(window.pos() + COMMENT_OPEN.len());
            let start = window.pos();
            return Flow::Continue(ParserState::Comment { loc, start });
        }
        if rest.starts_with(CDATA_OPEN) {
            window.advance_to(window.pos() + CDATA_OPEN.len());
            let start = window.pos();
            return Flow::Continue(ParserState::CData { loc, start });
        }
        if rest.starts_with(DOCTYPE_OPEN) {
            // The emitted content begins at the `D`.
            let start = window.pos();
            window.advance_to(window.pos() + DOCTYPE_OPEN.len());
            return Flow::Continue(ParserState::Doctype {
                loc,
                start,
                depth: 1,
            });
        }
        let partial = |pat: &[u8]| rest.len() < pat.len() && pat.starts_with(rest);
        if partial(COMMENT_OPEN) || partial(CDATA_OPEN) || partial(DOCTYPE_OPEN) {
            if window.more_expected() {
                return Flow::Suspend(ParserState::Bang { loc });
            }
            let kind = if partial(COMMENT_OPEN) {
                ErrorKind::UnterminatedComment
            } else if partial(CDATA_OPEN) {
                ErrorKind::UnterminatedCdata
            } else {
                ErrorKind::UnterminatedDoctype
            };
            return Flow::Fatal(XmlError::new(kind), loc);
        }
        Flow::Fatal(XmlError::new(ErrorKind::InvalidBang), window.location())
    }

    /// Inside a comment: scan for `-->`. The content bytes stay buffered
    /// from `start`, so a terminator split by a chunk boundary is found
    /// by re-checking the two bytes before each candidate `>`.
    pub(super) fn comment(&mut self, window: &mut Window, loc: Location, start: usize) -> Flow {
        let found = {
            let rest = window.rest();
            let mut found = None;
            for i in memchr_iter(b'>', rest) {
                let gt = window.pos() + i;
                if gt >= start + 2 && window.slice(gt - 2, gt) == b"--" {
                    found = Some(gt);
                    break;
                }
            }
            found
        };
        match found {
            Some(gt) => {
                let content = Span::new(start, gt - 2);
                if self.config.check_comments {
                    if let Some(bad) = find_double_hyphen(window, content) {
                        let err_loc = window.location_within(loc, bad);
                        window.advance_to(gt + 1);
                        return Flow::Fatal(
                            XmlError::new(ErrorKind::DoubleHyphenInComment),
                            err_loc,
                        );
                    }
                }
                window.advance_to(gt + 1);
                self.push(Raw::Comment { text: content, loc });
                Flow::Continue(ParserState::Content)
            }
            None => {
                // Keep the trailing two bytes unscanned so a `-->` split
                // across the refill is still seen as one terminator.
                let target = window.pos().max(window.end().saturating_sub(2)).max(start);
                window.advance_to(target);
                if window.more_expected() {
                    Flow::Suspend(ParserState::Comment { loc, start })
                } else {
                    window.advance_to(window.end());
                    Flow::Fatal(XmlError::new(ErrorKind::UnterminatedComment), loc)
                }
            }
        }
    }

    /// Inside a CDATA section: scan for `]]>`, same tail discipline as
    /// comments.
    pub(super) fn cdata(&mut self, window: &mut Window, loc: Location, start: usize) -> Flow {
        let found = {
            let rest = window.rest();
            let mut found = None;
            for i in memchr_iter(b'>', rest) {
                let gt = window.pos() + i;
                if gt >= start + 2 && window.slice(gt - 2, gt) == b"]]" {
                    found = Some(gt);
                    break;
                }
            }
            found
        };
        match found {
            Some(gt) => {
                let content = Span::new(start, gt - 2);
                window.advance_to(gt + 1);
                self.push(Raw::Cdata { text: content, loc });
                Flow::Continue(ParserState::Content)
            }
            None => {
                let target = window.pos().max(window.end().saturating_sub(2)).max(start);
                window.advance_to(target);
                if window.more_expected() {
                    Flow::Suspend(ParserState::CData { loc, start })
                } else {
                    window.advance_to(window.end());
                    Flow::Fatal(XmlError::new(ErrorKind::UnterminatedCdata), loc)
                }
            }
        }
    }

    /// Inside `<!DOCTYPE`: balance `<` against `>` so that markup
    /// declarations of an internal subset close correctly. Quoted `>`
    /// inside external identifiers is not special-cased.
    pub(super) fn doctype(
        &mut self,
        window: &mut Window,
        loc: Location,
        start: usize,
        mut depth: u32,
    ) -> Flow {
        let found = {
            let rest = window.rest();
            let mut found = None;
            for i in memchr2_iter(b'<', b'>', rest) {
                if rest[i] == b'<' {
                    depth += 1;
                } else {
                    depth -= 1;
                    if depth == 0 {
                        found = Some(window.pos() + i);
                        break;
                    }
                }
            }
            found
        };
        match found {
            Some(gt) => {
                // Content runs from just after `<!` up to, not including,
                // the balancing `>`.
                let content = Span::new(start, gt);
                window.advance_to(gt + 1);
                self.push(Raw::Doctype { content, loc });
                Flow::Continue(ParserState::Content)
            }
            None => {
                window.advance_to(window.end());
                if window.more_expected() {
                    Flow::Suspend(ParserState::Doctype { loc, start, depth })
                } else {
                    Flow::Fatal(XmlError::new(ErrorKind::UnterminatedDoctype), loc)
                }
            }
        }
    }
}

/// Position of the first `--` pair inside the comment content, if any.
fn find_double_hyphen(window: &Window, content: Span) -> Option<usize> {
    let bytes = window.slice(content.start, content.end);
    for p in memchr_iter(b'-', bytes) {
        if bytes.get(p + 1) == Some(&b'-') {
            return Some(content.start + p);
        }
    }
    None
}
