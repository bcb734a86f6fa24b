//! Shared helpers for the integration tests.

#![allow(dead_code)]

use flux_xml::{Config, ErrorKind, Event, Location, Reader};

/// Shorthand for building an expected location.
pub fn loc(line: u32, line_start: usize, offset: usize) -> Location {
    Location {
        line,
        line_start,
        offset,
    }
}

/// Parses a complete document and returns every event, owned.
pub fn events(input: &str) -> Vec<Event<'static>> {
    events_bytes(input.as_bytes())
}

/// Parses complete byte input and returns every event, owned.
pub fn events_bytes(input: &[u8]) -> Vec<Event<'static>> {
    events_with(input, Config::default())
}

/// Parses complete byte input under the given configuration.
pub fn events_with(input: &[u8], config: Config) -> Vec<Event<'static>> {
    let mut reader = Reader::with_config(config);
    reader.feed(input);
    reader.finish();
    drain(&mut reader)
}

/// Feeds the input in the given chunks, draining events after every
/// chunk, and returns the full event sequence.
pub fn events_chunked<'a, I>(chunks: I) -> Vec<Event<'static>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut reader = Reader::new();
    let mut out = Vec::new();
    for chunk in chunks {
        reader.feed(chunk);
        while let Some(event) = reader.read_event() {
            out.push(event.into_owned());
        }
    }
    reader.finish();
    out.extend(drain(&mut reader));
    out
}

/// Pulls every remaining event out of the reader, owned.
pub fn drain(reader: &mut Reader) -> Vec<Event<'static>> {
    let mut out = Vec::new();
    while let Some(event) = reader.read_event() {
        out.push(event.into_owned());
    }
    out
}

/// Events between `StartDocument` and `EndDocument`, with both stripped.
/// Asserts the document marker invariant on the way.
pub fn body(input: &str) -> Vec<Event<'static>> {
    strip_markers(events(input))
}

/// Checks the document-marker bracketing and returns the inner events.
pub fn strip_markers(mut all: Vec<Event<'static>>) -> Vec<Event<'static>> {
    assert!(
        matches!(all.first(), Some(Event::StartDocument { .. })),
        "first event must be StartDocument: {:?}",
        all.first()
    );
    assert!(
        matches!(all.last(), Some(Event::EndDocument { .. })),
        "last event must be EndDocument: {:?}",
        all.last()
    );
    all.remove(0);
    all.pop();
    all
}

/// Asserts that parsing `input` fails with exactly one error of `kind`,
/// followed by `EndDocument` and nothing else, and returns the error's
/// location.
pub fn expect_error(input: &[u8], kind: ErrorKind) -> Location {
    expect_error_with(input, kind, Config::default())
}

/// As [`expect_error`], with a custom configuration.
pub fn expect_error_with(input: &[u8], kind: ErrorKind, config: Config) -> Location {
    let all = events_with(input, config);
    let errors: Vec<_> = all
        .iter()
        .filter_map(|event| match event {
            Event::Error { error, location } => Some((error.clone(), *location)),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1, "expected exactly one error in {:?}", all);
    let (error, location) = errors[0].clone();
    assert_eq!(error.kind, kind, "unexpected kind, detail: {:?}", error.detail);
    match &all[all.len() - 2..] {
        [Event::Error { .. }, Event::EndDocument { .. }] => {}
        tail => panic!("error must be followed only by EndDocument, got {:?}", tail),
    }
    location
}
