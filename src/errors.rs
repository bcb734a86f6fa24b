//! Error management module

use std::fmt;

/// The kind of a fatal parse error.
///
/// The parser never recovers: the first error becomes a single
/// [`Event::Error`], followed by [`Event::EndDocument`], after which the
/// stream is closed.
///
/// [`Event::Error`]: crate::events::Event::Error
/// [`Event::EndDocument`]: crate::events::Event::EndDocument
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A UTF-16 byte order mark (`FE FF` or `FF FE`) was found at offset 0.
    /// Only UTF-8 input is supported.
    Utf16NotSupported,
    /// The input ended while the parser was inside a construct that
    /// requires more bytes (an open tag, an entity reference, a prolog).
    UnexpectedEof,
    /// The byte following `<` can start neither a name nor markup.
    InvalidTagStart,
    /// The bytes following `<!` are not `--`, `[CDATA[` or `DOCTYPE`.
    InvalidBang,
    /// A name was required but the current character cannot start one,
    /// or a malformed UTF-8 sequence was found inside a name.
    InvalidName,
    /// An attribute name was not followed by `=`.
    ExpectedEquals,
    /// An attribute value did not start with `"` or `'`.
    ExpectedQuote,
    /// `>` was required at this position.
    ExpectedGreaterThan,
    /// A raw `<` inside an attribute value.
    LessThanInAttributeValue,
    /// The input ended inside `<!--` without a closing `-->`.
    UnterminatedComment,
    /// The input ended inside `<![CDATA[` without a closing `]]>`.
    UnterminatedCdata,
    /// The input ended inside `<!DOCTYPE` without the balancing `>`.
    UnterminatedDoctype,
    /// The input ended inside a quoted attribute value.
    UnterminatedAttributeValue,
    /// A malformed entity or character reference, for example `&;`,
    /// `&#xZZ;` or a code point outside the Unicode scalar range.
    InvalidEntityReference,
    /// `--` inside a comment. Only reported when
    /// [`Config::check_comments`] is enabled.
    ///
    /// [`Config::check_comments`]: crate::reader::Config::check_comments
    DoubleHyphenInComment,
    /// The same attribute name appeared twice in one tag. Only reported
    /// when [`Config::check_duplicate_attributes`] is enabled.
    ///
    /// [`Config::check_duplicate_attributes`]: crate::reader::Config::check_duplicate_attributes
    AttributeNotUnique,
    /// A malformed UTF-8 sequence in content that is delivered as `str`.
    InvalidUtf8,
}

impl ErrorKind {
    /// A short human readable description of the error kind.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Utf16NotSupported => "UTF-16 input is not supported, expected UTF-8",
            Self::UnexpectedEof => "unexpected end of input",
            Self::InvalidTagStart => "invalid character after `<`",
            Self::InvalidBang => "only comments, CDATA and DOCTYPE can start with `<!`",
            Self::InvalidName => "invalid character in name",
            Self::ExpectedEquals => "expected `=` after attribute name",
            Self::ExpectedQuote => "expected `\"` or `'` before attribute value",
            Self::ExpectedGreaterThan => "expected `>`",
            Self::LessThanInAttributeValue => "`<` is not allowed in attribute values",
            Self::UnterminatedComment => "comment is missing the closing `-->`",
            Self::UnterminatedCdata => "CDATA section is missing the closing `]]>`",
            Self::UnterminatedDoctype => "DOCTYPE is missing the closing `>`",
            Self::UnterminatedAttributeValue => "attribute value is missing the closing quote",
            Self::InvalidEntityReference => "malformed entity reference",
            Self::DoubleHyphenInComment => "`--` is not allowed inside comments",
            Self::AttributeNotUnique => "duplicate attribute name",
            Self::InvalidUtf8 => "malformed UTF-8 sequence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A fatal parse error, carried by [`Event::Error`].
///
/// [`Event::Error`]: crate::events::Event::Error
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XmlError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Optional context, for example the offending entity name.
    pub detail: Option<String>,
}

impl XmlError {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub(crate) fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for XmlError {}

impl From<ErrorKind> for XmlError {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
