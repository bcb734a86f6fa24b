//! Resumable streaming XML reader.
//!
//! ## Description
//!
//! - [`Reader`]: a pull reader over UTF-8 byte chunks. Feed input in
//!   pieces of any size; the parser suspends mid-construct at chunk
//!   boundaries and picks up where it left off when more bytes arrive.
//! - [`Event`]: typed events whose names, text and CDATA content are
//!   zero-copy slices of the input buffer wherever the source allows it.
//! - [`Location`]: every event carries the line, line start and absolute
//!   byte offset of the first byte of its construct.
//!
//! ## Examples
//!
//! ### Pulling events from chunked input
//!
//! ```rust
//! use flux_xml::{Event, Reader};
//!
//! let mut reader = Reader::new();
//! let mut text = String::new();
//!
//! // Chunk boundaries may fall anywhere, even inside a tag name.
//! for chunk in [&b"<doc><par"[..], &b"a>one</para></doc>"[..]] {
//!     reader.feed(chunk);
//!     while let Some(event) = reader.read_event() {
//!         if let Event::Characters { text: t, .. } = event {
//!             text.push_str(&t);
//!         }
//!     }
//! }
//! reader.finish();
//! while reader.read_event().is_some() {}
//!
//! assert_eq!(text, "one");
//! assert!(reader.is_done());
//! ```
//!
//! ### Callback mode with early exit
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use flux_xml::{Event, Reader};
//!
//! let mut reader = Reader::from_str("<a><b/><c/></a>");
//! let mut seen = 0;
//! reader.for_each_event(|event| {
//!     if let Event::StartElement { .. } = event {
//!         seen += 1;
//!         if seen == 2 {
//!             return ControlFlow::Break(());
//!         }
//!     }
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(seen, 2);
//! ```
//!
//! ## Errors
//!
//! The parser does not recover: the first violation is delivered as a
//! single [`Event::Error`] followed by [`Event::EndDocument`], and the
//! stream closes. Events produced before the error remain valid.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chars;
mod errors;
mod input;
mod parser;

pub mod escape;
pub mod events;
pub mod reader;

// reexports
pub use chars::Edition;
pub use errors::{ErrorKind, XmlError};
pub use events::{Attribute, Event};
pub use input::Location;
pub use reader::{Config, Reader};
