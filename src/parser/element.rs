//! Open and close tags, the attribute loop and prolog pseudo-attributes.

use crate::chars::{self, Utf8Step};
use crate::errors::{ErrorKind, XmlError};
use crate::input::{Location, Window};
use crate::parser::{
    normalize_newlines, resolve_body, scan_reference, Flow, Machine, ParserState, Raw, RawAttr,
    RawText, ReferenceScan, Span,
};

/// Whether a tag frame collects element attributes or the prolog's
/// pseudo-attributes. The two share the whole attribute machinery; the
/// context only changes how the tag may close (`>` vs `?>`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum TagCtx {
    Element,
    Prolog,
}

/// Element state accumulated between `<` and the closing `>`.
#[derive(Debug)]
pub(crate) struct ElementFrame {
    /// Location of the `<`.
    pub loc: Location,
    /// Element name (or the PI target `xml` for a prolog frame).
    pub name: Span,
    /// Attributes collected so far, in source order.
    pub attrs: Vec<RawAttr>,
    pub ctx: TagCtx,
}

/// Outcome of scanning a name production.
pub(crate) enum NameScan {
    /// Name complete; the delimiter byte is not consumed.
    Done(Span),
    NeedData,
    /// The first character cannot start a name, a later byte is not valid
    /// UTF-8, or a multi-byte character is cut off by the final EOF.
    Invalid,
    /// Final end of input before the first name character.
    Eof,
}

/// Scans a name that begins at `start`, decoding UTF-8 incrementally.
/// A truncated multi-byte sequence at the end of the buffer suspends.
pub(crate) fn scan_name(window: &mut Window, start: usize, edition: chars::Edition) -> NameScan {
    loop {
        let rest = window.rest();
        match chars::decode(rest) {
            Utf8Step::Char { c, len } => {
                let valid = if window.pos() == start {
                    chars::is_name_start(c, edition)
                } else {
                    chars::is_name_char(c, edition)
                };
                if valid {
                    window.advance_to(window.pos() + len);
                } else if window.pos() == start {
                    return NameScan::Invalid;
                } else {
                    return NameScan::Done(Span::new(start, window.pos()));
                }
            }
            Utf8Step::Incomplete => {
                if window.more_expected() {
                    return NameScan::NeedData;
                }
                // Final EOF. An empty tail ends a started name cleanly;
                // leftover bytes are a truncated character.
                return if !rest.is_empty() {
                    NameScan::Invalid
                } else if window.pos() > start {
                    NameScan::Done(Span::new(start, window.pos()))
                } else {
                    NameScan::Eof
                };
            }
            Utf8Step::Invalid => return NameScan::Invalid,
        }
    }
}

/// Skips over whitespace and returns the byte the cursor stopped at, or
/// `None` when the buffer ran dry.
pub(crate) fn skip_whitespace(window: &mut Window) -> Option<u8> {
    match window.rest().iter().position(|&b| !chars::is_whitespace(b)) {
        Some(i) => {
            window.advance_to(window.pos() + i);
            Some(window.rest()[0])
        }
        None => {
            window.advance_to(window.end());
            None
        }
    }
}

impl Machine {
    /// After `<`: dispatch on the next byte.
    pub(super) fn tag_start(&mut self, window: &mut Window, loc: Location) -> Flow {
        match window.rest().first().copied() {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::TagStart { loc })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                        window.location(),
                    )
                }
            }
            Some(b'?') => {
                window.bump();
                Flow::Continue(ParserState::PiTarget {
                    loc,
                    start: window.pos(),
                })
            }
            Some(b'!') => {
                window.bump();
                Flow::Continue(ParserState::Bang { loc })
            }
            Some(b'/') => {
                window.bump();
                Flow::Continue(ParserState::CloseTagName {
                    loc,
                    name_start: window.pos(),
                })
            }
            Some(_) => match chars::decode(window.rest()) {
                Utf8Step::Char { c, .. } if chars::is_name_start(c, self.config.edition) => {
                    Flow::Continue(ParserState::OpenTagName {
                        loc,
                        name_start: window.pos(),
                    })
                }
                Utf8Step::Incomplete if window.more_expected() => {
                    Flow::Suspend(ParserState::TagStart { loc })
                }
                _ => Flow::Fatal(XmlError::new(ErrorKind::InvalidTagStart), window.location()),
            },
        }
    }

    pub(super) fn open_tag_name(
        &mut self,
        window: &mut Window,
        loc: Location,
        name_start: usize,
    ) -> Flow {
        match scan_name(window, name_start, self.config.edition) {
            NameScan::Done(name) => Flow::Continue(ParserState::Attributes {
                el: ElementFrame {
                    loc,
                    name,
                    attrs: Vec::new(),
                    ctx: TagCtx::Element,
                },
            }),
            NameScan::NeedData => Flow::Suspend(ParserState::OpenTagName { loc, name_start }),
            NameScan::Invalid => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidName), window.location())
            }
            NameScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                window.location(),
            ),
        }
    }

    pub(super) fn close_tag_name(
        &mut self,
        window: &mut Window,
        loc: Location,
        name_start: usize,
    ) -> Flow {
        match scan_name(window, name_start, self.config.edition) {
            NameScan::Done(name) => Flow::Continue(ParserState::CloseTagEnd { loc, name }),
            NameScan::NeedData => Flow::Suspend(ParserState::CloseTagName { loc, name_start }),
            NameScan::Invalid => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidName), window.location())
            }
            NameScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside close tag"),
                window.location(),
            ),
        }
    }

    /// Optional whitespace after a close tag name, then the required `>`.
    pub(super) fn close_tag_end(&mut self, window: &mut Window, loc: Location, name: Span) -> Flow {
        match skip_whitespace(window) {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::CloseTagEnd { loc, name })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside close tag"),
                        window.location(),
                    )
                }
            }
            Some(b'>') => {
                window.bump();
                self.push(Raw::EndElement { name, loc });
                Flow::Continue(ParserState::Content)
            }
            Some(_) => Flow::Fatal(
                XmlError::new(ErrorKind::ExpectedGreaterThan),
                window.location(),
            ),
        }
    }

    /// The attribute loop of an open tag or prolog.
    pub(super) fn attributes(&mut self, window: &mut Window, el: ElementFrame) -> Flow {
        match skip_whitespace(window) {
            None => {
                return if window.more_expected() {
                    Flow::Suspend(ParserState::Attributes { el })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                        window.location(),
                    )
                }
            }
            Some(b'>') => {
                return match el.ctx {
                    TagCtx::Element => {
                        window.bump();
                        self.push(Raw::StartElement {
                            name: el.name,
                            attrs: el.attrs,
                            loc: el.loc,
                        });
                        Flow::Continue(ParserState::Content)
                    }
                    TagCtx::Prolog => Flow::Fatal(
                        XmlError::with_detail(
                            ErrorKind::ExpectedGreaterThan,
                            "expected `?>` to close the XML declaration",
                        ),
                        window.location(),
                    ),
                }
            }
            Some(b'/') if el.ctx == TagCtx::Element => {
                let slash = window.location();
                window.bump();
                return Flow::Continue(ParserState::SelfClose { el, slash });
            }
            Some(b'?') if el.ctx == TagCtx::Prolog => {
                window.bump();
                return Flow::Continue(ParserState::PrologEnd { el });
            }
            Some(_) => {}
        }
        match chars::decode(window.rest()) {
            Utf8Step::Char { c, .. } if chars::is_name_start(c, self.config.edition) => {
                Flow::Continue(ParserState::AttrName {
                    el,
                    attr_start: window.pos(),
                })
            }
            Utf8Step::Incomplete if window.more_expected() => {
                Flow::Suspend(ParserState::Attributes { el })
            }
            _ => Flow::Fatal(
                XmlError::with_detail(
                    ErrorKind::InvalidName,
                    match el.ctx {
                        TagCtx::Element => "expected attribute name, `/` or `>`",
                        TagCtx::Prolog => "expected pseudo-attribute or `?>`",
                    },
                ),
                window.location(),
            ),
        }
    }

    pub(super) fn attr_name(
        &mut self,
        window: &mut Window,
        el: ElementFrame,
        attr_start: usize,
    ) -> Flow {
        match scan_name(window, attr_start, self.config.edition) {
            NameScan::Done(attr_name) => {
                if self.config.check_duplicate_attributes {
                    let name = window.slice(attr_name.start, attr_name.end);
                    if el
                        .attrs
                        .iter()
                        .any(|a| window.slice(a.name.start, a.name.end) == name)
                    {
                        let mut loc = window.location();
                        loc.offset = attr_start;
                        return Flow::Fatal(
                            XmlError::with_detail(
                                ErrorKind::AttributeNotUnique,
                                String::from_utf8_lossy(name).into_owned(),
                            ),
                            loc,
                        );
                    }
                }
                Flow::Continue(ParserState::AttrEq { el, attr_name })
            }
            NameScan::NeedData => Flow::Suspend(ParserState::AttrName { el, attr_start }),
            NameScan::Invalid => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidName), window.location())
            }
            NameScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                window.location(),
            ),
        }
    }

    /// Optional whitespace, then the required `=`.
    pub(super) fn attr_eq(&mut self, window: &mut Window, el: ElementFrame, attr_name: Span) -> Flow {
        match skip_whitespace(window) {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::AttrEq { el, attr_name })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                        window.location(),
                    )
                }
            }
            Some(b'=') => {
                window.bump();
                Flow::Continue(ParserState::AttrQuote { el, attr_name })
            }
            Some(_) => Flow::Fatal(XmlError::new(ErrorKind::ExpectedEquals), window.location()),
        }
    }

    /// Optional whitespace, then the required opening quote.
    pub(super) fn attr_quote(
        &mut self,
        window: &mut Window,
        el: ElementFrame,
        attr_name: Span,
    ) -> Flow {
        match skip_whitespace(window) {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::AttrQuote { el, attr_name })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                        window.location(),
                    )
                }
            }
            Some(quote @ (b'"' | b'\'')) => {
                window.bump();
                Flow::Continue(ParserState::AttrValue {
                    el,
                    attr_name,
                    quote,
                    value_start: window.pos(),
                    acc: String::new(),
                })
            }
            Some(_) => Flow::Fatal(XmlError::new(ErrorKind::ExpectedQuote), window.location()),
        }
    }

    /// Inside a quoted value: scan for the closing quote, an entity
    /// reference or the forbidden `<`.
    pub(super) fn attr_value(
        &mut self,
        window: &mut Window,
        mut el: ElementFrame,
        attr_name: Span,
        quote: u8,
        value_start: usize,
        mut acc: String,
    ) -> Flow {
        match memchr::memchr3(quote, b'&', b'<', window.rest()) {
            Some(i) => {
                let at = window.pos() + i;
                let byte = window.rest()[i];
                window.advance_to(at);
                match byte {
                    b'&' => {
                        if at > value_start {
                            match normalize_newlines(window.slice(value_start, at)) {
                                Ok(run) => acc.push_str(&run),
                                Err(error) => return Flow::Fatal(error, window.location()),
                            }
                        }
                        let amp = window.location();
                        window.bump();
                        Flow::Continue(ParserState::AttrEntity {
                            el,
                            attr_name,
                            quote,
                            amp,
                            acc,
                        })
                    }
                    b'<' => Flow::Fatal(
                        XmlError::new(ErrorKind::LessThanInAttributeValue),
                        window.location(),
                    ),
                    _ => {
                        // The closing quote: finalize the value.
                        let value = if acc.is_empty() {
                            RawText::Span(Span::new(value_start, at))
                        } else {
                            match normalize_newlines(window.slice(value_start, at)) {
                                Ok(run) => acc.push_str(&run),
                                Err(error) => return Flow::Fatal(error, window.location()),
                            }
                            RawText::Owned(acc)
                        };
                        el.attrs.push(RawAttr {
                            name: attr_name,
                            value,
                        });
                        window.bump();
                        Flow::Continue(ParserState::Attributes { el })
                    }
                }
            }
            None => {
                window.advance_to(window.end());
                if window.more_expected() {
                    Flow::Suspend(ParserState::AttrValue {
                        el,
                        attr_name,
                        quote,
                        value_start,
                        acc,
                    })
                } else {
                    Flow::Fatal(
                        XmlError::new(ErrorKind::UnterminatedAttributeValue),
                        window.location(),
                    )
                }
            }
        }
    }

    /// Entity reference inside an attribute value; the resolution lands
    /// in the accumulator instead of its own event.
    pub(super) fn attr_entity(
        &mut self,
        window: &mut Window,
        el: ElementFrame,
        attr_name: Span,
        quote: u8,
        amp: Location,
        mut acc: String,
    ) -> Flow {
        let body_start = amp.offset + 1;
        match scan_reference(window, body_start) {
            ReferenceScan::Complete(end) => {
                match resolve_body(window, body_start, end) {
                    Ok(crate::escape::Resolved::Named(s)) => acc.push_str(s),
                    Ok(crate::escape::Resolved::Char(c)) => acc.push(c),
                    Ok(crate::escape::Resolved::Unknown) => {
                        // Keep the reference as written, `&` and `;`
                        // included.
                        match std::str::from_utf8(window.slice(amp.offset, end + 1)) {
                            Ok(s) => acc.push_str(s),
                            Err(_) => {
                                return Flow::Fatal(
                                    XmlError::new(ErrorKind::InvalidEntityReference),
                                    amp,
                                )
                            }
                        }
                    }
                    Err(error) => return Flow::Fatal(error, amp),
                }
                window.advance_to(end + 1);
                Flow::Continue(ParserState::AttrValue {
                    el,
                    attr_name,
                    quote,
                    value_start: end + 1,
                    acc,
                })
            }
            ReferenceScan::NeedData => Flow::Suspend(ParserState::AttrEntity {
                el,
                attr_name,
                quote,
                amp,
                acc,
            }),
            ReferenceScan::Malformed => {
                Flow::Fatal(XmlError::new(ErrorKind::InvalidEntityReference), amp)
            }
            ReferenceScan::Eof => Flow::Fatal(
                XmlError::with_detail(ErrorKind::UnexpectedEof, "inside entity reference"),
                amp,
            ),
        }
    }

    /// After `/` in a tag: `>` must follow, then both the start and the
    /// synthesized end element are queued.
    pub(super) fn self_close(
        &mut self,
        window: &mut Window,
        el: ElementFrame,
        slash: Location,
    ) -> Flow {
        match window.rest().first().copied() {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::SelfClose { el, slash })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside tag"),
                        window.location(),
                    )
                }
            }
            Some(b'>') => {
                window.bump();
                self.push(Raw::StartElement {
                    name: el.name,
                    attrs: el.attrs,
                    loc: el.loc,
                });
                self.push(Raw::EndElement {
                    name: el.name,
                    loc: slash,
                });
                Flow::Continue(ParserState::Content)
            }
            Some(_) => Flow::Fatal(
                XmlError::new(ErrorKind::ExpectedGreaterThan),
                window.location(),
            ),
        }
    }

    /// After `?` in a prolog: `>` must follow.
    pub(super) fn prolog_end(&mut self, window: &mut Window, el: ElementFrame) -> Flow {
        match window.rest().first().copied() {
            None => {
                if window.more_expected() {
                    Flow::Suspend(ParserState::PrologEnd { el })
                } else {
                    Flow::Fatal(
                        XmlError::with_detail(ErrorKind::UnexpectedEof, "inside XML declaration"),
                        window.location(),
                    )
                }
            }
            Some(b'>') => {
                window.bump();
                self.push(Raw::Prolog {
                    attrs: el.attrs,
                    loc: el.loc,
                });
                Flow::Continue(ParserState::Content)
            }
            Some(_) => Flow::Fatal(
                XmlError::new(ErrorKind::ExpectedGreaterThan),
                window.location(),
            ),
        }
    }
}
