//! Normalization of RSS 2.0 and Atom documents into [`NormalizedItem`]s.
//!
//! Both dialects are decoded with a streaming `quick-xml` reader that tracks
//! the path of local element names, so namespace prefixes such as
//! `content:encoded` are matched by their local part.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::date::parse_date;
use super::detect::{detect, FeedFormat};
use super::error::FeedError;
use crate::util::hostname;

const RSS: &str = "RSS";
const ATOM: &str = "Atom";

/// A feed entry in the format-agnostic shape used for merging and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    /// Entry title prefixed with its source label, e.g. `[example.com] Post`.
    pub title: String,
    /// Entry URL, empty if the source had none.
    pub link: String,
    /// `None` when the source date was empty or unrecognized.
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
}

impl NormalizedItem {
    fn new(
        source_label: &str,
        title: &str,
        link: String,
        date: &str,
        description: String,
        fallback_description: String,
    ) -> Self {
        let description = if description.is_empty() {
            fallback_description
        } else {
            description
        };

        Self {
            title: format!("[{source_label}] {title}"),
            link,
            published_at: parse_date(date),
            description,
        }
    }
}

/// Normalizes a feed fetched from `feed_url`, labelling items with its host.
///
/// See [`normalize`] for the meaning of `limit` and the errors returned.
pub fn normalize_feed(
    bytes: &[u8],
    feed_url: &str,
    limit: usize,
) -> Result<Vec<NormalizedItem>, FeedError> {
    normalize(bytes, &hostname(feed_url), limit)
}

/// Decodes an RSS or Atom document into normalized items.
///
/// Items keep document order. At most `limit` items are returned; `0` means
/// no limit. The whole document is decoded regardless, so a broken tail is
/// still reported.
///
/// # Errors
///
/// - [`FeedError::MalformedDocument`] if no root element can be read
/// - [`FeedError::UnknownFormat`] if the root is neither `<rss>` nor `<feed>`
/// - [`FeedError::Decode`] if the body is not well-formed XML
pub fn normalize(
    bytes: &[u8],
    source_label: &str,
    limit: usize,
) -> Result<Vec<NormalizedItem>, FeedError> {
    match detect(bytes)? {
        FeedFormat::Rss => {
            let mut visitor = RssVisitor::new(source_label, limit);
            walk(bytes, RSS, &mut visitor)?;
            Ok(visitor.items)
        }
        FeedFormat::Atom => {
            let mut visitor = AtomVisitor::new(source_label, limit);
            walk(bytes, ATOM, &mut visitor)?;
            Ok(visitor.items)
        }
        FeedFormat::Unknown(root) => Err(FeedError::UnknownFormat(root)),
    }
}

/// Callbacks driven by [`walk`]. `path` holds the local names of all open
/// elements, root first, including the element being opened or closed.
trait ElementVisitor {
    fn open(&mut self, path: &[String], element: &BytesStart<'_>, reader: &Reader<&[u8]>)
        -> Result<(), FeedError>;
    fn text(&mut self, path: &[String], text: &str);
    fn close(&mut self, path: &[String]);
}

fn walk(bytes: &[u8], format: &'static str, visitor: &mut impl ElementVisitor) -> Result<(), FeedError> {
    let mut reader = Reader::from_reader(bytes);
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| FeedError::decode(format, e))? {
            Event::Start(e) => {
                path.push(local_name(&e));
                visitor.open(&path, &e, &reader)?;
            }
            Event::Empty(e) => {
                path.push(local_name(&e));
                visitor.open(&path, &e, &reader)?;
                visitor.close(&path);
                path.pop();
            }
            Event::End(_) => {
                visitor.close(&path);
                path.pop();
            }
            Event::Text(e) => {
                if !path.is_empty() {
                    let text = e.unescape().map_err(|e| FeedError::decode(format, e))?;
                    visitor.text(&path, &text);
                }
            }
            Event::CData(e) => {
                visitor.text(&path, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match path.last() {
        Some(open) => Err(FeedError::decode(
            format,
            format!("unexpected end of document inside <{open}>"),
        )),
        None => Ok(()),
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Returns the value of attribute `key` (matched by local name), if present.
fn attribute(
    element: &BytesStart<'_>,
    key: &[u8],
    reader: &Reader<&[u8]>,
    format: &'static str,
) -> Result<Option<String>, FeedError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| FeedError::decode(format, e))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| FeedError::decode(format, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn should_keep(kept: usize, limit: usize) -> bool {
    limit == 0 || kept < limit
}

// ============================================================================
// RSS 2.0
// ============================================================================

#[derive(Default)]
struct RssItemFields {
    title: String,
    link: String,
    pub_date: String,
    description: String,
    encoded: String,
}

struct RssVisitor<'a> {
    source_label: &'a str,
    limit: usize,
    current: Option<RssItemFields>,
    items: Vec<NormalizedItem>,
}

impl<'a> RssVisitor<'a> {
    fn new(source_label: &'a str, limit: usize) -> Self {
        Self {
            source_label,
            limit,
            current: None,
            items: Vec::new(),
        }
    }

    /// `<rss><channel><item>`; the root was already classified.
    fn is_item(path: &[String]) -> bool {
        path.len() == 3 && path[1] == "channel" && path[2] == "item"
    }

    /// The field a direct child of the current item fills, if any.
    fn field<'f>(&'f mut self, path: &[String]) -> Option<&'f mut String> {
        let fields = self.current.as_mut()?;
        if path.len() != 4 || !Self::is_item(&path[..3]) {
            return None;
        }
        match path[3].as_str() {
            "title" => Some(&mut fields.title),
            "link" => Some(&mut fields.link),
            "pubDate" => Some(&mut fields.pub_date),
            "description" => Some(&mut fields.description),
            "encoded" => Some(&mut fields.encoded),
            _ => None,
        }
    }
}

impl ElementVisitor for RssVisitor<'_> {
    fn open(
        &mut self,
        path: &[String],
        _element: &BytesStart<'_>,
        _reader: &Reader<&[u8]>,
    ) -> Result<(), FeedError> {
        if Self::is_item(path) {
            self.current = Some(RssItemFields::default());
        } else if let Some(target) = self.field(path) {
            // A later `itunes:title` or `media:description` replaces the
            // earlier sibling.
            target.clear();
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) {
        if let Some(target) = self.field(path) {
            target.push_str(text);
        }
    }

    fn close(&mut self, path: &[String]) {
        if !Self::is_item(path) {
            return;
        }
        let Some(fields) = self.current.take() else {
            return;
        };
        if should_keep(self.items.len(), self.limit) {
            self.items.push(NormalizedItem::new(
                self.source_label,
                fields.title.trim(),
                fields.link.trim().to_string(),
                &fields.pub_date,
                fields.description.trim().to_string(),
                fields.encoded.trim().to_string(),
            ));
        }
    }
}

// ============================================================================
// Atom
// ============================================================================

#[derive(Default)]
struct AtomEntryFields {
    title: String,
    link: Option<String>,
    updated: String,
    summary: String,
    content: String,
}

struct AtomVisitor<'a> {
    source_label: &'a str,
    limit: usize,
    current: Option<AtomEntryFields>,
    items: Vec<NormalizedItem>,
}

impl<'a> AtomVisitor<'a> {
    fn new(source_label: &'a str, limit: usize) -> Self {
        Self {
            source_label,
            limit,
            current: None,
            items: Vec::new(),
        }
    }

    /// `<feed><entry>`
    fn is_entry(path: &[String]) -> bool {
        path.len() == 2 && path[1] == "entry"
    }

    fn field<'f>(&'f mut self, path: &[String]) -> Option<&'f mut String> {
        let fields = self.current.as_mut()?;
        if path.len() != 3 || !Self::is_entry(&path[..2]) {
            return None;
        }
        match path[2].as_str() {
            "title" => Some(&mut fields.title),
            "updated" => Some(&mut fields.updated),
            "summary" => Some(&mut fields.summary),
            "content" => Some(&mut fields.content),
            _ => None,
        }
    }
}

impl ElementVisitor for AtomVisitor<'_> {
    fn open(
        &mut self,
        path: &[String],
        element: &BytesStart<'_>,
        reader: &Reader<&[u8]>,
    ) -> Result<(), FeedError> {
        if Self::is_entry(path) {
            self.current = Some(AtomEntryFields::default());
            return Ok(());
        }
        if let Some(target) = self.field(path) {
            target.clear();
            return Ok(());
        }

        let Some(fields) = self.current.as_mut() else {
            return Ok(());
        };
        if path.len() != 3 || !Self::is_entry(&path[..2]) || path[2] != "link" {
            return Ok(());
        }

        // First link that is the alternate representation wins; a missing
        // or empty rel means alternate.
        if fields.link.is_none() {
            let rel = attribute(element, b"rel", reader, ATOM)?.unwrap_or_default();
            if rel.is_empty() || rel == "alternate" {
                let href = attribute(element, b"href", reader, ATOM)?.unwrap_or_default();
                fields.link = Some(href);
            }
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) {
        if let Some(target) = self.field(path) {
            target.push_str(text);
        }
    }

    fn close(&mut self, path: &[String]) {
        if !Self::is_entry(path) {
            return;
        }
        let Some(fields) = self.current.take() else {
            return;
        };
        if should_keep(self.items.len(), self.limit) {
            self.items.push(NormalizedItem::new(
                self.source_label,
                fields.title.trim(),
                fields.link.unwrap_or_default().trim().to_string(),
                &fields.updated,
                fields.summary.trim().to_string(),
                fields.content.trim().to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>Article 1</title>
      <link>https://example.com/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description>Desc 1</description>
    </item>
    <item>
      <title>Article 2</title>
      <link>https://example.com/2</link>
      <pubDate>Tue, 02 Jan 2024 00:00:00 +0000</pubDate>
      <description>Desc 2</description>
    </item>
    <item>
      <title>Article 3</title>
      <link>https://example.com/3</link>
      <pubDate>Wed, 03 Jan 2024 00:00:00 +0000</pubDate>
      <description>Desc 3</description>
    </item>
  </channel>
</rss>"#;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <link href="https://atom.example.com/" rel="alternate"/>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://atom.example.com/1" rel="alternate"/>
    <updated>2024-03-01T10:00:00Z</updated>
    <summary>Atom Desc 1</summary>
  </entry>
  <entry>
    <title>Atom Entry 2</title>
    <link href="https://atom.example.com/2/edit" rel="edit"/>
    <link href="https://atom.example.com/2"/>
    <updated>2024-03-02T10:00:00Z</updated>
    <summary>Atom Desc 2</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_rss_items_in_document_order() {
        let items = normalize_feed(SAMPLE_RSS.as_bytes(), "https://example.com/feed", 10).unwrap();
        assert_eq!(items.len(), 3);

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "[example.com] Article 1",
                "[example.com] Article 2",
                "[example.com] Article 3"
            ]
        );
        assert_eq!(items[0].link, "https://example.com/1");
        assert_eq!(items[0].description, "Desc 1");
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_rss_limit_keeps_first_items() {
        let items = normalize(SAMPLE_RSS.as_bytes(), "example.com", 2).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "[example.com] Article 1");
        assert_eq!(items[1].title, "[example.com] Article 2");
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let items = normalize(SAMPLE_RSS.as_bytes(), "example.com", 0).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_rss_content_encoded_fallback() {
        let xml = r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <item>
    <title>Full text</title>
    <description></description>
    <content:encoded><![CDATA[<p>Body <b>here</b></p>]]></content:encoded>
  </item>
  <item>
    <title>Both</title>
    <description>Short</description>
    <content:encoded>Long</content:encoded>
  </item>
</channel>
</rss>"#;
        let items = normalize(xml.as_bytes(), "blog.example", 0).unwrap();
        assert_eq!(items[0].description, "<p>Body <b>here</b></p>");
        assert_eq!(items[1].description, "Short");
    }

    #[test]
    fn test_rss_namespaced_sibling_replaces_field() {
        let xml = r#"<rss version="2.0"
    xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
    xmlns:media="http://search.yahoo.com/mrss/">
<channel>
  <item>
    <title>Episode 1</title>
    <itunes:title>Episode 1</itunes:title>
    <description>Show notes</description>
    <media:description>Alt</media:description>
  </item>
</channel>
</rss>"#;
        let items = normalize(xml.as_bytes(), "pod.example", 0).unwrap();
        assert_eq!(items[0].title, "[pod.example] Episode 1");
        assert_eq!(items[0].description, "Alt");
    }

    #[test]
    fn test_rss_later_sibling_wins_even_when_empty() {
        let xml = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel><item>
<title>Plain</title><dc:title>Dublin Core</dc:title>
<link>https://e.com/a</link><link/>
</item></channel></rss>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].title, "[e.com] Dublin Core");
        assert_eq!(items[0].link, "");
    }

    #[test]
    fn test_rss_nested_markup_text_not_captured() {
        let xml = r#"<rss><channel><item>
<title>Outer</title>
<description>Intro <b>bold</b> tail</description>
</item></channel></rss>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].description, "Intro  tail");
    }

    #[test]
    fn test_rss_missing_fields_produce_empty_values() {
        let xml = r#"<rss version="2.0"><channel><item></item></channel></rss>"#;
        let items = normalize(xml.as_bytes(), "host", 0).unwrap();
        assert_eq!(
            items,
            vec![NormalizedItem {
                title: "[host] ".to_string(),
                link: String::new(),
                published_at: None,
                description: String::new(),
            }]
        );
    }

    #[test]
    fn test_rss_unparseable_date_is_absent() {
        let xml = r#"<rss><channel><item><title>x</title><pubDate>yesterday</pubDate></item></channel></rss>"#;
        let items = normalize(xml.as_bytes(), "host", 0).unwrap();
        assert_eq!(items[0].published_at, None);
    }

    #[test]
    fn test_rss_entities_unescaped() {
        let xml = r#"<rss><channel><item><title>Tom &amp; Jerry</title><link>https://e.com/?a=1&amp;b=2</link></item></channel></rss>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].title, "[e.com] Tom & Jerry");
        assert_eq!(items[0].link, "https://e.com/?a=1&b=2");
    }

    #[test]
    fn test_rss_ignores_channel_level_fields() {
        let xml = r#"<rss xmlns:atom="http://www.w3.org/2005/Atom"><channel>
<title>Channel</title>
<link>https://channel.example.com/</link>
<atom:link href="https://channel.example.com/feed" rel="self"/>
<item><title>Only</title><link>https://channel.example.com/only</link></item>
</channel></rss>"#;
        let items = normalize(xml.as_bytes(), "channel.example.com", 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://channel.example.com/only");
    }

    #[test]
    fn test_rss_empty_channel() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        assert!(normalize(xml.as_bytes(), "host", 10).unwrap().is_empty());
    }

    #[test]
    fn test_atom_entries_and_link_selection() {
        let items =
            normalize_feed(SAMPLE_ATOM.as_bytes(), "https://atom.example.com/feed", 10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "[atom.example.com] Atom Entry 1");
        assert_eq!(items[0].link, "https://atom.example.com/1");
        // rel="edit" is skipped, the rel-less link is taken
        assert_eq!(items[1].link, "https://atom.example.com/2");
        assert_eq!(
            items[1].published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap())
        );
        assert_eq!(items[1].description, "Atom Desc 2");
    }

    #[test]
    fn test_atom_first_alternate_link_wins() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
<title>Multi</title>
<link rel="self" href="https://e.com/self"/>
<link rel="alternate" href="https://e.com/first"/>
<link href="https://e.com/second"/>
</entry></feed>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].link, "https://e.com/first");
    }

    #[test]
    fn test_atom_no_alternate_link_is_empty() {
        let xml = r#"<feed><entry><title>t</title><link rel="enclosure" href="https://e.com/a.mp3"/></entry></feed>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].link, "");
    }

    #[test]
    fn test_atom_content_fallback_and_limit() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
<entry><title type="html">One</title><content type="html">&lt;p&gt;Full&lt;/p&gt;</content></entry>
<entry><title>Two</title></entry>
<entry><title>Three</title></entry>
</feed>"#;
        let items = normalize(xml.as_bytes(), "e.com", 2).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "[e.com] One");
        assert_eq!(items[0].description, "<p>Full</p>");
        assert_eq!(items[1].description, "");
    }

    #[test]
    fn test_atom_xhtml_title_keeps_only_direct_text() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
<title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Hello <b>World</b></div></title>
<summary>Sum</summary>
</entry></feed>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].title, "[e.com] ");
        assert_eq!(items[0].description, "Sum");
    }

    #[test]
    fn test_atom_duplicate_summary_last_wins() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
<entry><title>t</title><summary>First</summary><media:summary>Second</media:summary></entry>
</feed>"#;
        let items = normalize(xml.as_bytes(), "e.com", 0).unwrap();
        assert_eq!(items[0].description, "Second");
    }

    #[test]
    fn test_unknown_root_is_error() {
        let result = normalize(b"<foo><bar/></foo>", "host", 10);
        match result {
            Err(FeedError::UnknownFormat(name)) => assert_eq!(name, "foo"),
            other => panic!("Expected UnknownFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(matches!(
            normalize(b"<not valid xml", "host", 10),
            Err(FeedError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_broken_body_is_decode_error() {
        let xml = r#"<rss><channel><item><title>x</titel></item></channel></rss>"#;
        assert!(matches!(
            normalize(xml.as_bytes(), "host", 10),
            Err(FeedError::Decode { format: "RSS", .. })
        ));
    }

    #[test]
    fn test_truncated_body_is_decode_error_even_past_limit() {
        let xml = r#"<feed><entry><title>one</title></entry><entry><title>two"#;
        assert!(matches!(
            normalize(xml.as_bytes(), "host", 1),
            Err(FeedError::Decode { format: "Atom", .. })
        ));
    }

    #[test]
    fn test_unknown_entity_is_decode_error() {
        let xml = r#"<rss><channel><item><title>a&nbsp;b</title></item></channel></rss>"#;
        assert!(matches!(
            normalize(xml.as_bytes(), "host", 10),
            Err(FeedError::Decode { .. })
        ));
    }
}
