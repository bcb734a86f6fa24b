//! Entity and character reference resolution.

use std::borrow::Cow;

use memchr::memchr2_iter;

use crate::errors::{ErrorKind, XmlError};

#[cfg(test)]
use pretty_assertions::assert_eq;

/// Resolves the five predefined XML entities. Returns `None` for anything
/// else.
///
/// ```
/// # use flux_xml::escape::resolve_predefined_entity;
/// assert_eq!(resolve_predefined_entity("lt"), Some("<"));
/// assert_eq!(resolve_predefined_entity("gt"), Some(">"));
/// assert_eq!(resolve_predefined_entity("amp"), Some("&"));
/// assert_eq!(resolve_predefined_entity("apos"), Some("'"));
/// assert_eq!(resolve_predefined_entity("quot"), Some("\""));
///
/// assert_eq!(resolve_predefined_entity("nbsp"), None);
/// ```
pub const fn resolve_predefined_entity(entity: &str) -> Option<&'static str> {
    // match over strings is not allowed in const functions
    let s = match entity.as_bytes() {
        b"lt" => "<",
        b"gt" => ">",
        b"amp" => "&",
        b"apos" => "'",
        b"quot" => "\"",
        _ => return None,
    };
    Some(s)
}

/// Outcome of resolving the body of one `&...;` reference.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Resolved {
    /// One of the five predefined entities.
    Named(&'static str),
    /// A `&#N;` / `&#xH;` character reference.
    Char(char),
    /// A well-formed named reference this parser does not know; the raw
    /// `&name;` text passes through to the consumer unchanged.
    Unknown,
}

/// Resolves `body`, the text between `&` and `;`.
pub(crate) fn resolve_reference(body: &str) -> Result<Resolved, XmlError> {
    if let Some(digits) = body.strip_prefix('#') {
        return parse_number(digits).map(Resolved::Char);
    }
    if body.is_empty() {
        return Err(XmlError::new(ErrorKind::InvalidEntityReference));
    }
    match resolve_predefined_entity(body) {
        Some(s) => Ok(Resolved::Named(s)),
        None => Ok(Resolved::Unknown),
    }
}

/// Parses the digits of a character reference (after `&#`) into a scalar
/// value. `x` selects hexadecimal.
fn parse_number(digits: &str) -> Result<char, XmlError> {
    let code = match digits.strip_prefix('x') {
        Some(hex) => parse_hexadecimal(hex),
        None => parse_decimal(digits),
    }?;
    if code == 0 {
        return Err(XmlError::with_detail(
            ErrorKind::InvalidEntityReference,
            "NUL character reference",
        ));
    }
    match char::from_u32(code) {
        Some(c) => Ok(c),
        None => Err(XmlError::with_detail(
            ErrorKind::InvalidEntityReference,
            format!("invalid code point {}", code),
        )),
    }
}

fn parse_hexadecimal(digits: &str) -> Result<u32, XmlError> {
    // maximum code is 0x10FFFF => 6 characters
    if digits.is_empty() || digits.len() > 6 {
        return Err(XmlError::new(ErrorKind::InvalidEntityReference));
    }
    let mut code = 0;
    for b in digits.bytes() {
        code <<= 4;
        code += match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            b => {
                return Err(XmlError::with_detail(
                    ErrorKind::InvalidEntityReference,
                    format!("`{}` is not a hexadecimal digit", b as char),
                ))
            }
        } as u32;
    }
    Ok(code)
}

fn parse_decimal(digits: &str) -> Result<u32, XmlError> {
    // maximum code is 0x10FFFF = 1114111 => 7 characters
    if digits.is_empty() || digits.len() > 7 {
        return Err(XmlError::new(ErrorKind::InvalidEntityReference));
    }
    let mut code = 0;
    for b in digits.bytes() {
        code *= 10;
        code += match b {
            b'0'..=b'9' => b - b'0',
            b => {
                return Err(XmlError::with_detail(
                    ErrorKind::InvalidEntityReference,
                    format!("`{}` is not a decimal digit", b as char),
                ))
            }
        } as u32;
    }
    Ok(code)
}

/// Replaces all `&...;` references in `raw` with their values.
///
/// Follows the same rules as the event stream: the five predefined
/// entities and numeric character references are resolved, unknown named
/// references are left in place verbatim. Returns `Cow::Borrowed` when the
/// input contains no resolvable reference.
///
/// ```
/// # use flux_xml::escape::unescape;
/// # use std::borrow::Cow;
/// assert_eq!(unescape("a&lt;b&#33;").unwrap(), "a<b!");
/// assert_eq!(unescape("&custom;").unwrap(), "&custom;");
/// assert!(matches!(unescape("plain").unwrap(), Cow::Borrowed(_)));
/// assert!(unescape("&#xZZ;").is_err());
/// ```
pub fn unescape(raw: &str) -> Result<Cow<'_, str>, XmlError> {
    let bytes = raw.as_bytes();
    let mut unescaped = None;
    let mut last_end = 0;
    let mut iter = memchr2_iter(b'&', b';', bytes);
    while let Some(start) = iter.by_ref().find(|p| bytes[*p] == b'&') {
        match iter.next() {
            Some(end) if bytes[end] == b';' => {
                let replacement = match resolve_reference(&raw[start + 1..end])? {
                    Resolved::Named(s) => s,
                    Resolved::Char(c) => {
                        let unescaped = unescaped.get_or_insert_with(|| String::with_capacity(raw.len()));
                        unescaped.push_str(&raw[last_end..start]);
                        unescaped.push(c);
                        last_end = end + 1;
                        continue;
                    }
                    // Keep the reference as written.
                    Resolved::Unknown => continue,
                };
                let unescaped = unescaped.get_or_insert_with(|| String::with_capacity(raw.len()));
                unescaped.push_str(&raw[last_end..start]);
                unescaped.push_str(replacement);
                last_end = end + 1;
            }
            _ => {
                return Err(XmlError::with_detail(
                    ErrorKind::InvalidEntityReference,
                    "missing `;` after `&`",
                ))
            }
        }
    }

    match unescaped {
        Some(mut unescaped) => {
            unescaped.push_str(&raw[last_end..]);
            Ok(Cow::Owned(unescaped))
        }
        None => Ok(Cow::Borrowed(raw)),
    }
}

#[test]
fn predefined() {
    assert_eq!(
        unescape("&lt;&amp;test&apos;&quot;&gt;").unwrap(),
        "<&test'\">"
    );
}

#[test]
fn character_references() {
    assert_eq!(unescape("&#x30;").unwrap(), "0");
    assert_eq!(unescape("&#48;").unwrap(), "0");
    assert_eq!(unescape("&#x1F600;").unwrap(), "\u{1F600}");
    assert!(unescape("&#0;").is_err());
    assert!(unescape("&#x110000;").is_err());
    assert!(unescape("&#12q;").is_err());
    assert!(unescape("&#;").is_err());
}

#[test]
fn unknown_entities_pass_through() {
    let unchanged = unescape("&foo;&lt;").unwrap();
    assert_eq!(unchanged, "&foo;<");
    let untouched = unescape("&foo;").unwrap();
    assert!(matches!(untouched, Cow::Borrowed(_)));
}

#[test]
fn unterminated() {
    assert!(unescape("a&lt").is_err());
}
