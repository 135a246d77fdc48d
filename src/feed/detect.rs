use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::FeedError;

/// Feed dialect, decided by the document's root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    /// Anything else; carries the root element's local name.
    Unknown(String),
}

/// Classifies a raw document by its root element.
///
/// Only reads up to the first element. The match is on the local name, so
/// namespace prefixes are ignored, and it is case-insensitive: `<rss>` is
/// RSS, `<feed>` is Atom.
///
/// # Errors
///
/// [`FeedError::MalformedDocument`] if the bytes are not well-formed XML up to
/// the root element or contain no element at all.
pub fn detect(bytes: &[u8]) -> Result<FeedFormat, FeedError> {
    let mut reader = Reader::from_reader(bytes);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return Ok(classify(name));
            }
            Ok(Event::Eof) => {
                return Err(FeedError::MalformedDocument(
                    "document has no root element".to_string(),
                ))
            }
            Err(e) => return Err(FeedError::MalformedDocument(e.to_string())),
            // Declaration, doctype, comments, processing instructions, stray
            // whitespace or a BOM ahead of the root
            Ok(_) => {}
        }
    }
}

fn classify(root: String) -> FeedFormat {
    if root.eq_ignore_ascii_case("rss") {
        FeedFormat::Rss
    } else if root.eq_ignore_ascii_case("feed") {
        FeedFormat::Atom
    } else {
        FeedFormat::Unknown(root)
    }
}
