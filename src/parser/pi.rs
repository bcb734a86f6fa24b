//! Processing instructions and the hand-off to the XML declaration.

use memchr::memchr_iter;

use crate::errors::{ErrorKind, XmlError};
use crate::input::{Location, Window};
use crate::parser::element::{scan_name, skip_whitespace, ElementFrame, NameScan, TagCtx};
use crate::parser::{Flow, Machine, ParserState, Raw, Span};

impl Machine {
    /// After `<?`: scan the target name. A target that lowercases to
    /// `xml` is the document prolog and continues with pseudo-attributes;
    /// anything else is an ordinary processing instruction.
    pub(super) fn pi_target(&mut self, window: &mut Window, loc: Location, start: usize) -> Flow {
        match scan_name(window, start, self.config.edition) {
            NameScan::Done(target) => {
                if window.slice(target.start, target.end).eq_ignore_ascii_case(b"xml") {
                    Flow::Continue(ParserState::Attributes {
                        el: ElementFrame {
                            loc,
                            name: target,
                            attrs: Vec::new(),
                            ctx: TagCtx::Prolog,
                        },
                    })
                } else {
                    Flow::Continue(ParserState::PiWs { loc, target })
                }
            }
            NameScan::NeedData => Flow::Suspend(ParserState::PiTarget { loc, start }),
            NameScan::Invalid => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidName), window.location())
            }
            NameScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside processing instruction"),
                window.location(),
            ),
        }
    }

    /// Whitespace between the PI target and its data.
    pub(super) fn pi_ws(&mut self, window: &mut Window, loc: Location, target: Span) -> Flow {
        match skip_whitespace(window) {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::PiWs { loc, target })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside processing instruction"),
                        window.location(),
                    )
                }
            }
            Some(_) => Flow::Continue(ParserState::PiData {
                loc,
                target,
                start: window.pos(),
            }),
        }
    }

    /// PI data: scan for `?>`, keeping one trailing byte unscanned so a
    /// terminator split across chunks is still found.
    pub(super) fn pi_data(
        &mut self,
        window: &mut Window,
        loc: Location,
        target: Span,
        start: usize,
    ) -> Flow {
        let found = {
            let rest = window.rest();
            let mut found = None;
            for i in memchr_iter(b'>', rest) {
                let gt = window.pos() + i;
                if gt > start && window.slice(gt - 1, gt) == b"?" {
                    found = Some(gt);
                    break;
                }
            }
            found
        };
        match found {
            Some(gt) => {
                let data = Span::new(start, gt - 1);
                window.advance_to(gt + 1);
                self.push(Raw::Pi { target, data, loc });
                Flow::Continue(ParserState::Content)
            }
            None => {
                let target_pos = window.pos().max(window.end().saturating_sub(1)).max(start);
                window.advance_to(target_pos);
                if window.more_expected() {
                    Flow::Suspend(ParserState::PiData { loc, target, start })
                } else {
                    window.advance_to(window.end());
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside processing instruction"),
                        window.location(),
                    )
                }
            }
        }
    }
}
