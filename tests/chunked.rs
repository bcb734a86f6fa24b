//! Resumability across arbitrary chunk boundaries.
//!
//! The guarantee under test: for any partition of the input into chunks,
//! the event sequence is identical to parsing the whole input in one
//! shot, and the parser suspends rather than failing wherever a boundary
//! falls inside a construct.

use flux_xml::{Event, Reader};
use pretty_assertions::assert_eq;

mod helpers;
use helpers::{events_bytes, events_chunked, loc};

/// Parses `input` split at every possible two-part boundary and in every
/// fixed chunk size up to 8 bytes, asserting the sequences all match the
/// one-shot parse.
fn assert_chunk_invariant(input: &[u8]) {
    let expected = events_bytes(input);
    for split in 0..=input.len() {
        let got = events_chunked([&input[..split], &input[split..]]);
        assert_eq!(got, expected, "two-part split at {}", split);
    }
    for size in 1..=8 {
        let got = events_chunked(input.chunks(size));
        assert_eq!(got, expected, "chunk size {}", size);
    }
}

#[test]
fn boundary_in_tag_name() {
    let mut reader = Reader::new();
    reader.feed(b"<roo");
    assert!(matches!(
        reader.read_event(),
        Some(Event::StartDocument { .. })
    ));
    // Suspended inside the name: no event yet.
    assert_eq!(reader.read_event(), None);
    assert!(!reader.is_done());

    reader.feed(b"t/>");
    reader.finish();
    match reader.read_event() {
        Some(Event::StartElement { name, location, .. }) => {
            assert_eq!(name, "root");
            assert_eq!(location, loc(1, 0, 0));
        }
        other => panic!("expected start element, got {:?}", other),
    }
    match reader.read_event() {
        Some(Event::EndElement { name, location }) => {
            assert_eq!(name, "root");
            assert_eq!(location, loc(1, 0, 5));
        }
        other => panic!("expected end element, got {:?}", other),
    }
    assert!(matches!(
        reader.read_event(),
        Some(Event::EndDocument { .. })
    ));
}

#[test]
fn invariant_plain_document() {
    assert_chunk_invariant(b"<a id=\"1\">hi<b/></a>");
}

#[test]
fn invariant_entities() {
    assert_chunk_invariant(b"<p title=\"a&lt;b\">x&amp;y&#x21;&unknown;</p>");
}

#[test]
fn invariant_comment_and_cdata() {
    assert_chunk_invariant(b"<r><!-- c -- ->--><![CDATA[ ]] ]>x]]></r>");
}

#[test]
fn invariant_doctype_with_subset() {
    assert_chunk_invariant(b"<!DOCTYPE e [<!ENTITY a \"b\">]><e/>");
}

#[test]
fn invariant_prolog_and_pi() {
    assert_chunk_invariant(b"<?xml version=\"1.0\" encoding=\"utf-8\"?><?go fast??><r/>");
}

#[test]
fn invariant_multibyte_characters() {
    assert_chunk_invariant("<données über=\"ja\">caf\u{e9} \u{1F600}</données>".as_bytes());
}

#[test]
fn invariant_line_breaks() {
    assert_chunk_invariant(b"<a>\r\nx\r y\n</a>\n<!--\r\n-->");
}

#[test]
fn invariant_errors_are_chunk_stable() {
    // The error kind and location must not depend on chunking either.
    assert_chunk_invariant(b"<x a=\"<\"/>");
    assert_chunk_invariant(b"<t>&#xZZ;</t>");
}

#[test]
fn feeding_while_suspended_in_attribute_value() {
    let mut reader = Reader::new();
    reader.feed(b"<a href=\"http://e");
    assert!(matches!(
        reader.read_event(),
        Some(Event::StartDocument { .. })
    ));
    assert_eq!(reader.read_event(), None);
    reader.feed(b"xample.com\">");
    reader.finish();
    match reader.read_event() {
        Some(Event::StartElement { attributes, .. }) => {
            assert_eq!(attributes[0].value, "http://example.com");
        }
        other => panic!("expected start element, got {:?}", other),
    }
}

#[test]
fn comment_terminator_split_between_every_byte() {
    // `-->` split in all ways, including after each dash.
    for split in 0..=4 {
        let input = b"<!--x-->";
        let boundary = 4 + split;
        let got = events_chunked([&input[..boundary], &input[boundary..]]);
        assert_eq!(got, events_bytes(input), "split at {}", boundary);
    }
}

#[test]
fn compaction_does_not_disturb_long_streams() {
    // Enough elements to push the scanned prefix well past the
    // compaction threshold, fed in small chunks.
    let mut doc = String::from("<list>");
    for i in 0..600 {
        doc.push_str(&format!("<item n=\"{}\">value {}</item>", i, i));
    }
    doc.push_str("</list>");

    let mut reader = Reader::new();
    let mut items = 0;
    let mut texts = 0;
    for chunk in doc.as_bytes().chunks(17) {
        reader.feed(chunk);
        while let Some(event) = reader.read_event() {
            match event {
                Event::StartElement { name, .. } if name == "item" => items += 1,
                Event::Characters { .. } => texts += 1,
                _ => {}
            }
        }
    }
    reader.finish();
    while reader.read_event().is_some() {}
    assert!(reader.is_done());
    assert_eq!(items, 600);
    assert_eq!(texts, 600);
    // The buffer must not have retained the whole document.
    assert_eq!(reader.buffer_position(), doc.len());
}

#[test]
fn one_byte_at_a_time_whole_grammar() {
    let input = b"<?xml version=\"1.0\"?><!DOCTYPE d><d a='1'>t&gt;<!--c--><![CDATA[z]]><e/></d>";
    let expected = events_bytes(input);
    let got = events_chunked(input.chunks(1));
    assert_eq!(got, expected);
}
