//! Source location accounting: line numbers, line starts, byte offsets.

use flux_xml::{Event, Reader};
use pretty_assertions::assert_eq;

mod helpers;
use helpers::{body, events, events_chunked, loc};

/// `line` must equal one plus the number of normalized line breaks
/// before the event, and offsets must never go backwards.
fn assert_location_invariants(input: &str) {
    let all = events(input);
    let bytes = input.as_bytes();
    let mut previous = 0;
    for event in &all {
        let at = event.location();
        assert!(at.offset >= previous, "offsets regressed in {:?}", all);
        previous = at.offset;

        let mut breaks = 0;
        let mut i = 0;
        while i < at.offset {
            match bytes[i] {
                b'\r' => {
                    breaks += 1;
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                }
                b'\n' => breaks += 1,
                _ => {}
            }
            i += 1;
        }
        assert_eq!(
            at.line,
            1 + breaks,
            "line of {:?} at offset {}",
            event,
            at.offset
        );
        assert!(at.line_start <= at.offset);
    }
}

#[test]
fn single_line_offsets() {
    assert_location_invariants(r#"<a id="1">hi<b/></a>"#);
}

#[test]
fn multi_line_document() {
    assert_location_invariants("<a>\n  <b>text</b>\n  <c/>\n</a>\n");
}

#[test]
fn cr_and_crlf_documents() {
    assert_location_invariants("<a>\r\n<b/>\r<c/>\r\n</a>");
    assert_location_invariants("<a>\r<b/>\r</a>");
}

#[test]
fn line_breaks_in_markup_count_too() {
    assert_location_invariants("<a\n  x=\"1\"\n  y=\"2\n3\"><!--\n--></a>");
}

#[test]
fn elements_on_later_lines() {
    let all = body("<a>\n<b/>\n</a>");
    assert_eq!(
        all[1],
        Event::StartElement {
            name: "b".into(),
            attributes: vec![],
            location: loc(2, 4, 4),
        }
    );
    assert_eq!(
        all[3],
        Event::EndElement {
            name: "a".into(),
            location: loc(3, 9, 9),
        }
    );
}

#[test]
fn column_is_offset_minus_line_start() {
    let all = body("<a>\n  <b/>\n</a>");
    match &all[1] {
        Event::StartElement { location, .. } => {
            assert_eq!(location.line, 2);
            assert_eq!(location.column(), 2);
        }
        other => panic!("expected start element, got {:?}", other),
    }
}

#[test]
fn crlf_counts_one_line() {
    let all = body("<a>\r\n<b/></a>");
    assert_eq!(
        all[1],
        Event::StartElement {
            name: "b".into(),
            attributes: vec![],
            // Offset still indexes the raw bytes, CR included.
            location: loc(2, 5, 5),
        }
    );
}

#[test]
fn lone_cr_counts_one_line() {
    let all = body("<a>\r<b/></a>");
    assert_eq!(
        all[1],
        Event::StartElement {
            name: "b".into(),
            attributes: vec![],
            location: loc(2, 4, 4),
        }
    );
}

#[test]
fn crlf_split_across_chunks_counts_once() {
    let all = events_chunked([&b"<a>\r"[..], &b"\n<b/></a>"[..]]);
    let starts: Vec<_> = all
        .iter()
        .filter_map(|event| match event {
            Event::StartElement { name, location, .. } => Some((name.to_string(), *location)),
            _ => None,
        })
        .collect();
    assert_eq!(starts, [("a".to_string(), loc(1, 0, 0)), ("b".to_string(), loc(2, 5, 5))]);
}

#[test]
fn end_document_sits_at_the_end() {
    let input = "<a/>\n";
    match events(input).last() {
        Some(Event::EndDocument { location }) => {
            assert_eq!(location.offset, input.len());
            assert_eq!(location.line, 2);
        }
        other => panic!("expected end document, got {:?}", other),
    }
}

#[test]
fn error_location_is_at_the_offending_byte() {
    let mut reader = Reader::from_str("<a>\n<x b=\"<\"/></a>");
    let mut error_at = None;
    while let Some(event) = reader.read_event() {
        if let Event::Error { location, .. } = event {
            error_at = Some(location);
        }
    }
    // The `<` inside the value sits on line 2 at byte 10.
    assert_eq!(error_at, Some(loc(2, 4, 10)));
}

#[test]
fn text_location_spans_lines() {
    let all = body("<a>one\ntwo</a>");
    assert_eq!(
        all[1],
        Event::Characters {
            text: "one\ntwo".into(),
            location: loc(1, 0, 3),
        }
    );
    assert_eq!(
        all[2],
        Event::EndElement {
            name: "a".into(),
            location: loc(2, 7, 10),
        }
    );
}
