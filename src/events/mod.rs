//! Typed events produced by the reader.
//!
//! Events borrow their names and content out of the reader's input buffer
//! wherever possible; payloads that had to be rewritten (resolved entity
//! references, normalized line breaks) are carried as owned [`Cow`] data.
//! A borrowed event is valid until the next call into the reader — copy it
//! with [`Event::into_owned`] to keep it longer.

use std::borrow::Cow;

use crate::errors::XmlError;
use crate::input::Location;

/// One attribute of a start element or prolog, in source order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute<'a> {
    /// Attribute name, possibly carrying a namespace prefix. Borrowed
    /// from the input buffer.
    pub name: Cow<'a, str>,
    /// Attribute value with entity references resolved and line breaks
    /// normalized. Borrowed when the raw value needed no rewriting.
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    /// Creates an attribute from a `(name, value)` pair.
    pub fn new(name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Copies the attribute out of the input buffer.
    pub fn into_owned(self) -> Attribute<'static> {
        Attribute {
            name: Cow::Owned(self.name.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// A parse event with the source location of its first byte.
///
/// A successful parse always yields exactly one [`StartDocument`] first
/// and exactly one [`EndDocument`] last. A failed parse yields exactly one
/// [`Error`] followed by [`EndDocument`].
///
/// [`StartDocument`]: Event::StartDocument
/// [`EndDocument`]: Event::EndDocument
/// [`Error`]: Event::Error
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event<'a> {
    /// The stream opened. Always the first event.
    StartDocument {
        /// Start of the input.
        location: Location,
    },
    /// The stream is complete. Always the last event, also after an error.
    EndDocument {
        /// Position one past the last scanned byte.
        location: Location,
    },
    /// The XML declaration `<?xml ...?>` with its pseudo-attributes
    /// (`version`, `encoding`, `standalone`) in source order.
    Prolog {
        /// Pseudo-attributes of the declaration.
        attributes: Vec<Attribute<'a>>,
        /// Position of the `<`.
        location: Location,
    },
    /// A `<!DOCTYPE ...>` declaration. The content is the raw byte run
    /// between `<!` and the balancing `>`, internal subset included.
    Doctype {
        /// Raw declaration bytes, `DOCTYPE` keyword included.
        content: Cow<'a, [u8]>,
        /// Position of the `<`.
        location: Location,
    },
    /// An opening tag. A self-closing tag `<a/>` produces this event
    /// immediately followed by [`Event::EndElement`].
    StartElement {
        /// Qualified element name.
        name: Cow<'a, str>,
        /// Attributes in source order.
        attributes: Vec<Attribute<'a>>,
        /// Position of the `<`.
        location: Location,
    },
    /// A closing tag, or the synthesized end of a self-closing tag (then
    /// located at the `/`).
    EndElement {
        /// Qualified element name.
        name: Cow<'a, str>,
        /// Position of the `<`, or of the `/` for a self-closing tag.
        location: Location,
    },
    /// A run of character data. Runs are never coalesced across entity
    /// references: `a&amp;b` yields three `Characters` events.
    Characters {
        /// Text with line breaks normalized to `\n`.
        text: Cow<'a, str>,
        /// Position of the first byte of the run.
        location: Location,
    },
    /// The content of a `<![CDATA[...]]>` section, delimiters excluded.
    Cdata {
        /// Raw character data with line breaks normalized to `\n`.
        text: Cow<'a, str>,
        /// Position of the `<`.
        location: Location,
    },
    /// The content of a `<!--...-->` comment, delimiters excluded.
    Comment {
        /// Comment text with line breaks normalized to `\n`.
        text: Cow<'a, str>,
        /// Position of the `<`.
        location: Location,
    },
    /// A processing instruction `<?target data?>`.
    ProcessingInstruction {
        /// The PI target (first name after `<?`).
        target: Cow<'a, str>,
        /// Everything between the target and `?>`, leading whitespace
        /// stripped. Empty for `<?target?>`.
        data: Cow<'a, str>,
        /// Position of the `<`.
        location: Location,
    },
    /// A fatal parse error. Followed by [`Event::EndDocument`]; no
    /// further content events are produced.
    Error {
        /// What went wrong.
        error: XmlError,
        /// Position of the offending byte.
        location: Location,
    },
}

impl<'a> Event<'a> {
    /// The source location of the first byte of this event's construct.
    pub fn location(&self) -> Location {
        match self {
            Event::StartDocument { location }
            | Event::EndDocument { location }
            | Event::Prolog { location, .. }
            | Event::Doctype { location, .. }
            | Event::StartElement { location, .. }
            | Event::EndElement { location, .. }
            | Event::Characters { location, .. }
            | Event::Cdata { location, .. }
            | Event::Comment { location, .. }
            | Event::ProcessingInstruction { location, .. }
            | Event::Error { location, .. } => *location,
        }
    }

    /// Copies all borrowed payloads out of the input buffer so the event
    /// can outlive the reader.
    pub fn into_owned(self) -> Event<'static> {
        match self {
            Event::StartDocument { location } => Event::StartDocument { location },
            Event::EndDocument { location } => Event::EndDocument { location },
            Event::Prolog {
                attributes,
                location,
            } => Event::Prolog {
                attributes: attributes.into_iter().map(Attribute::into_owned).collect(),
                location,
            },
            Event::Doctype { content, location } => Event::Doctype {
                content: Cow::Owned(content.into_owned()),
                location,
            },
            Event::StartElement {
                name,
                attributes,
                location,
            } => Event::StartElement {
                name: Cow::Owned(name.into_owned()),
                attributes: attributes.into_iter().map(Attribute::into_owned).collect(),
                location,
            },
            Event::EndElement { name, location } => Event::EndElement {
                name: Cow::Owned(name.into_owned()),
                location,
            },
            Event::Characters { text, location } => Event::Characters {
                text: Cow::Owned(text.into_owned()),
                location,
            },
            Event::Cdata { text, location } => Event::Cdata {
                text: Cow::Owned(text.into_owned()),
                location,
            },
            Event::Comment { text, location } => Event::Comment {
                text: Cow::Owned(text.into_owned()),
                location,
            },
            Event::ProcessingInstruction {
                target,
                data,
                location,
            } => Event::ProcessingInstruction {
                target: Cow::Owned(target.into_owned()),
                data: Cow::Owned(data.into_owned()),
                location,
            },
            Event::Error { error, location } => Event::Error { error, location },
        }
    }
}
