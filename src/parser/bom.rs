//! Byte-order-mark sniffing at the very start of the stream.

use crate::errors::{ErrorKind, XmlError};
use crate::input::Window;
use crate::parser::{Flow, Machine, ParserState};

/// UTF-8 BOM, consumed silently when present.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// UTF-16 BOMs, big and little endian. Fatal: this parser reads UTF-8
/// only.
const UTF16_BE_BOM: &[u8] = b"\xFE\xFF";
const UTF16_LE_BOM: &[u8] = b"\xFF\xFE";

impl Machine {
    /// Initial state at offset 0. Decides between a rejected UTF-16 BOM,
    /// a skipped UTF-8 BOM and plain content, suspending while the first
    /// bytes could still become a BOM.
    pub(super) fn start(&mut self, window: &mut Window) -> Flow {
        let rest = window.rest();
        if rest.starts_with(UTF16_BE_BOM) || rest.starts_with(UTF16_LE_BOM) {
            return Flow::Fatal(
                XmlError::new(ErrorKind::Utf16NotSupported),
                window.location(),
            );
        }
        if rest.starts_with(UTF8_BOM) {
            window.advance_to(window.pos() + UTF8_BOM.len());
            return Flow::Continue(ParserState::Content);
        }
        let undecided = (rest.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(rest))
            || (rest.len() < UTF16_BE_BOM.len() && UTF16_BE_BOM.starts_with(rest))
            || (rest.len() < UTF16_LE_BOM.len() && UTF16_LE_BOM.starts_with(rest));
        if undecided && window.more_expected() {
            return Flow::Suspend(ParserState::Start);
        }
        // Not a BOM (or a truncated one at final EOF): treat as content.
        Flow::Continue(ParserState::Content)
    }
}

#[cfg(test)]
mod tests {
    use crate::events::Event;
    use crate::reader::Reader;
    use pretty_assertions::assert_eq;

    #[test]
    fn utf16_boms_are_fatal() {
        for bom in [b"\xFE\xFF", b"\xFF\xFE"] {
            let mut input = bom.to_vec();
            input.extend_from_slice(b"<x/>");
            let mut reader = Reader::from_bytes(&input);
            assert!(matches!(
                reader.read_event(),
                Some(Event::StartDocument { .. })
            ));
            match reader.read_event() {
                Some(Event::Error { error, location }) => {
                    assert_eq!(error.kind, crate::ErrorKind::Utf16NotSupported);
                    assert_eq!(location.offset, 0);
                }
                other => panic!("expected error, got {:?}", other),
            }
            assert!(matches!(
                reader.read_event(),
                Some(Event::EndDocument { .. })
            ));
            assert_eq!(reader.read_event(), None);
        }
    }

    #[test]
    fn utf8_bom_is_skipped() {
        let mut reader = Reader::from_bytes(b"\xEF\xBB\xBF<x/>");
        assert!(matches!(
            reader.read_event(),
            Some(Event::StartDocument { .. })
        ));
        match reader.read_event() {
            Some(Event::StartElement { name, location, .. }) => {
                assert_eq!(name, "x");
                assert_eq!(location.offset, 3);
            }
            other => panic!("expected start element, got {:?}", other),
        }
    }

    #[test]
    fn bom_split_across_chunks() {
        let mut reader = Reader::new();
        reader.feed(b"\xEF");
        assert!(matches!(
            reader.read_event(),
            Some(Event::StartDocument { .. })
        ));
        assert_eq!(reader.read_event(), None);
        reader.feed(b"\xBB\xBF<x/>");
        reader.finish();
        assert!(matches!(
            reader.read_event(),
            Some(Event::StartElement { .. })
        ));
    }
}
