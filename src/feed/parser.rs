use chrono::DateTime;
use quick_xml::errors::IllFormedError;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use thiserror::Error;

/// Placeholder feed title when the channel has no `<title>`.
pub const UNKNOWN_FEED_TITLE: &str = "Unknown Feed";
/// Placeholder entry title.
pub const NO_TITLE: &str = "No Title";
/// Placeholder entry description.
pub const NO_DESCRIPTION: &str = "No Description";
/// Placeholder entry publication date.
pub const NO_DATE: &str = "No Date";

/// Errors raised when the input is not an XML document at all.
///
/// Missing or empty sub-elements are never errors; they fall back to the
/// placeholder constants in this module.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The tokenizer rejected the input (unclosed markup, bad attributes, ...).
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The input contained no element at all.
    #[error("XML parse error: document has no root element")]
    NoRootElement,
    /// Character data appeared before the first element.
    #[error("XML parse error: text before root element")]
    TextBeforeRoot,
}

/// One `<item>` of a feed, with placeholders substituted for missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Free-form date text exactly as the feed published it.
    pub pub_date: String,
    /// RFC 3339 rendering of `pub_date`, when it is a recognizable RFC 2822/3339 date.
    pub published_parsed: Option<String>,
}

/// A normalized feed: title, site link, and entries in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResult {
    pub feed_title: String,
    pub feed_link: String,
    pub entries: Vec<FeedEntry>,
}

impl FeedResult {
    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for FeedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeedResult", 4)?;
        state.serialize_field("feedTitle", &self.feed_title)?;
        state.serialize_field("feedLink", &self.feed_link)?;
        state.serialize_field("totalEntries", &self.total_entries())?;
        state.serialize_field("entries", &self.entries)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
        }
    }

    fn finish(self) -> FeedEntry {
        let pub_date = non_empty(self.pub_date);
        let published_parsed = pub_date.as_deref().and_then(parse_pub_date);
        FeedEntry {
            title: non_empty(self.title).unwrap_or_else(|| NO_TITLE.to_string()),
            link: non_empty(self.link).unwrap_or_default(),
            description: non_empty(self.description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            pub_date: pub_date.unwrap_or_else(|| NO_DATE.to_string()),
            published_parsed,
        }
    }
}

/// First-match text wins, but an empty first match still counts as "found"
/// and degrades to the placeholder.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_pub_date(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.to_rfc3339())
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    ChannelTitle,
    ChannelLink,
    Item { index: usize, field: Field },
}

struct Capture {
    target: Target,
    depth: usize,
    text: String,
}

/// Tree walker that projects the element stream onto a [`FeedResult`].
///
/// Tracks the open-element path so that `channel > title` only matches a
/// direct child, and every open `<item>` captures the first descendant of
/// each field name.
#[derive(Default)]
struct Projector {
    path: Vec<Vec<u8>>,
    items: Vec<ItemBuilder>,
    open_items: Vec<(usize, usize)>,
    captures: Vec<Capture>,
    channel_title: Option<String>,
    channel_link: Option<String>,
    seen_root: bool,
}

impl Projector {
    fn open(&mut self, name: &[u8], self_closing: bool) {
        self.seen_root = true;
        let depth = self.path.len() + 1;

        if name == b"item" {
            let index = self.items.len();
            self.items.push(ItemBuilder::default());
            if !self_closing {
                self.open_items.push((index, depth));
            }
        } else if let Some(field) = Field::from_name(name) {
            for &(index, _) in &self.open_items {
                let target = Target::Item { index, field };
                if self.items[index].slot(field).is_none() && !self.is_capturing(target) {
                    self.captures.push(Capture {
                        target,
                        depth,
                        text: String::new(),
                    });
                }
            }
        }

        if self.path.last().map(Vec::as_slice) == Some(b"channel".as_slice()) {
            let target = match name {
                b"title" if self.channel_title.is_none() => Some(Target::ChannelTitle),
                b"link" if self.channel_link.is_none() => Some(Target::ChannelLink),
                _ => None,
            };
            if let Some(target) = target.filter(|t| !self.is_capturing(*t)) {
                self.captures.push(Capture {
                    target,
                    depth,
                    text: String::new(),
                });
            }
        }

        self.path.push(name.to_vec());
        if self_closing {
            self.close_top();
        }
    }

    /// Closes the nearest open element named `name` and everything opened
    /// after it. Stray end tags with no open counterpart are dropped.
    fn close(&mut self, name: &[u8]) {
        let Some(position) = self.path.iter().rposition(|open| open.as_slice() == name) else {
            tracing::debug!(
                tag = %String::from_utf8_lossy(name),
                "Ignoring end tag with no open element"
            );
            return;
        };
        while self.path.len() > position {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        let depth = self.path.len();
        let mut i = 0;
        while i < self.captures.len() {
            if self.captures[i].depth == depth {
                let capture = self.captures.swap_remove(i);
                self.store(capture);
            } else {
                i += 1;
            }
        }
        self.open_items.retain(|&(_, item_depth)| item_depth != depth);
        self.path.pop();
    }

    fn store(&mut self, capture: Capture) {
        let text = capture.text.trim().to_string();
        match capture.target {
            Target::ChannelTitle => self.channel_title = Some(text),
            Target::ChannelLink => self.channel_link = Some(text),
            Target::Item { index, field } => {
                let slot = self.items[index].slot(field);
                if slot.is_none() {
                    *slot = Some(text);
                }
            }
        }
    }

    fn is_capturing(&self, target: Target) -> bool {
        self.captures.iter().any(|c| c.target == target)
    }

    fn push_text(&mut self, text: &str) {
        for capture in &mut self.captures {
            capture.text.push_str(text);
        }
    }

    fn finish(mut self) -> Result<FeedResult, ParseError> {
        if !self.seen_root {
            return Err(ParseError::NoRootElement);
        }
        if !self.path.is_empty() {
            tracing::debug!(unclosed = self.path.len(), "Closing unterminated elements at EOF");
        }
        while !self.path.is_empty() {
            self.close_top();
        }

        Ok(FeedResult {
            feed_title: non_empty(self.channel_title)
                .unwrap_or_else(|| UNKNOWN_FEED_TITLE.to_string()),
            feed_link: non_empty(self.channel_link).unwrap_or_default(),
            entries: self.items.into_iter().map(ItemBuilder::finish).collect(),
        })
    }
}

/// Resolves entity and character references one at a time. A reference
/// that cannot be resolved stays in the output as written.
fn unescape_lenient(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape(raw) {
        return text;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let end = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .map(|i| i + 1);
        match end {
            Some(end) if tail[end..].starts_with(';') => {
                let reference = &tail[..=end];
                match unescape(reference) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        tracing::debug!(reference, "Keeping raw text for unresolvable entity");
                        out.push_str(reference);
                    }
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parses raw feed text into a [`FeedResult`].
///
/// - Feed title: first `<title>` directly under a `<channel>`, else [`UNKNOWN_FEED_TITLE`].
/// - Entries: one per `<item>` in document order; `title`, `link`,
///   `description` and `pubDate` each take the first matching descendant and
///   default independently when absent or empty.
///
/// Mismatched and missing end tags are recovered rather than rejected, so a
/// truncated or sloppily closed feed still yields its items.
///
/// # Errors
///
/// Returns [`ParseError`] only when the input is not XML at all: the
/// tokenizer fails, there is no element, or text precedes the first element.
/// No partial result is produced in that case.
///
/// # Security
///
/// `quick-xml` (0.37) never expands `<!ENTITY>` declarations, so XXE payloads
/// in a hostile feed are inert. Unknown entity references keep their raw text.
pub fn parse_feed(text: &str) -> Result<FeedResult, ParseError> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut projector = Projector::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => projector.open(e.name().as_ref(), false),
            Ok(Event::Empty(e)) => projector.open(e.name().as_ref(), true),
            Ok(Event::End(e)) => projector.close(e.name().as_ref()),
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(&e);
                if !projector.seen_root {
                    if raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}').is_empty() {
                        continue;
                    }
                    return Err(ParseError::TextBeforeRoot);
                }
                if !projector.captures.is_empty() {
                    projector.push_text(&unescape_lenient(&raw));
                }
            }
            Ok(Event::CData(e)) => projector.push_text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(tag))) => {
                tracing::debug!(tag = %tag, "Unclosed element at end of document");
                break;
            }
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    let result = projector.finish()?;
    tracing::debug!(
        feed_title = %result.feed_title,
        entries = result.total_entries(),
        "Parsed feed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(title: &str, link: &str, description: &str, pub_date: &str) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            link: link.to_string(),
            description: description.to_string(),
            pub_date: pub_date.to_string(),
            published_parsed: None,
        }
    }

    #[test]
    fn test_unclosed_channel_still_parses() {
        let xml = "<rss><channel><title>Example</title><item><title>Hello</title><link>http://x</link></item></rss>";
        let result = parse_feed(xml).unwrap();

        assert_eq!(
            result,
            FeedResult {
                feed_title: "Example".to_string(),
                feed_link: String::new(),
                entries: vec![entry("Hello", "http://x", NO_DESCRIPTION, NO_DATE)],
            }
        );
    }

    #[test]
    fn test_full_rss_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>MarketWatch.com - Real-time Headlines</title>
    <link>https://www.marketwatch.com</link>
    <item>
      <title>Stocks rise</title>
      <link>https://example.com/a</link>
      <description><![CDATA[Markets <b>up</b> today]]></description>
      <pubDate>Tue, 10 Jun 2025 14:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Bonds &amp; yields</title>
      <link>https://example.com/b</link>
    </item>
  </channel>
</rss>"#;
        let result = parse_feed(xml).unwrap();

        assert_eq!(result.feed_title, "MarketWatch.com - Real-time Headlines");
        assert_eq!(result.feed_link, "https://www.marketwatch.com");
        assert_eq!(result.total_entries(), 2);

        let first = &result.entries[0];
        assert_eq!(first.title, "Stocks rise");
        assert_eq!(first.description, "Markets <b>up</b> today");
        assert_eq!(first.pub_date, "Tue, 10 Jun 2025 14:30:00 GMT");
        assert_eq!(
            first.published_parsed.as_deref(),
            Some("2025-06-10T14:30:00+00:00")
        );

        assert_eq!(result.entries[1].title, "Bonds & yields");
        assert_eq!(result.entries[1].pub_date, NO_DATE);
        assert_eq!(result.entries[1].published_parsed, None);
    }

    #[test]
    fn test_missing_fields_default_independently() {
        let xml = "<rss><channel><title>T</title>\
            <item><link>https://example.com/1</link></item>\
            <item><title>Only title</title><pubDate>yesterday</pubDate></item>\
            <item/>\
            </channel></rss>";
        let result = parse_feed(xml).unwrap();

        assert_eq!(
            result.entries,
            vec![
                entry(NO_TITLE, "https://example.com/1", NO_DESCRIPTION, NO_DATE),
                entry("Only title", "", NO_DESCRIPTION, "yesterday"),
                entry(NO_TITLE, "", NO_DESCRIPTION, NO_DATE),
            ]
        );
    }

    #[test]
    fn test_empty_first_match_uses_placeholder() {
        let xml = "<rss><channel><item><title></title><description>   </description>\
            <title>Second</title></item></channel></rss>";
        let result = parse_feed(xml).unwrap();

        assert_eq!(result.entries[0].title, NO_TITLE);
        assert_eq!(result.entries[0].description, NO_DESCRIPTION);
    }

    #[test]
    fn test_missing_channel_title_is_unknown_feed() {
        let result = parse_feed("<rss><channel><item><title>A</title></item></channel></rss>").unwrap();
        assert_eq!(result.feed_title, UNKNOWN_FEED_TITLE);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_item_title_is_not_channel_title() {
        let xml = "<rss><channel><item><title>Item</title></item><title>Channel</title></channel></rss>";
        let result = parse_feed(xml).unwrap();
        assert_eq!(result.feed_title, "Channel");
        assert_eq!(result.entries[0].title, "Item");
    }

    #[test]
    fn test_title_outside_channel_ignored() {
        let result = parse_feed("<rss><title>Stray</title></rss>").unwrap();
        assert_eq!(result.feed_title, UNKNOWN_FEED_TITLE);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_prefixed_elements_do_not_match() {
        let xml = r#"<rss xmlns:atom="http://www.w3.org/2005/Atom"><channel>
            <atom:link href="https://example.com/self" rel="self"/>
            <link>https://example.com</link>
            <item><dc:title>prefixed</dc:title></item>
        </channel></rss>"#;
        let result = parse_feed(xml).unwrap();
        assert_eq!(result.feed_link, "https://example.com");
        assert_eq!(result.entries[0].title, NO_TITLE);
    }

    #[test]
    fn test_nested_markup_text_is_concatenated() {
        let xml = "<rss><channel><item><description>Hello <em>big</em> world</description></item></channel></rss>";
        let result = parse_feed(xml).unwrap();
        assert_eq!(result.entries[0].description, "Hello big world");
    }

    #[test]
    fn test_unknown_entity_keeps_raw_text() {
        let xml = "<rss><channel><item><title>A&nbsp;B</title></item></channel></rss>";
        let result = parse_feed(xml).unwrap();
        assert_eq!(result.entries[0].title, "A&nbsp;B");
    }

    #[test]
    fn test_known_entities_resolved_next_to_unknown() {
        let xml = "<rss><channel><title>A &amp; B&nbsp;C &#38; D</title>\
                   <item><title>&lt;x&gt; &bogus; &amp</title></item></channel></rss>";
        let result = parse_feed(xml).unwrap();
        assert_eq!(result.feed_title, "A & B&nbsp;C & D");
        assert_eq!(result.entries[0].title, "<x> &bogus; &amp");
    }

    #[test]
    fn test_non_xml_input_is_parse_error() {
        assert!(matches!(
            parse_feed("just some plain text"),
            Err(ParseError::TextBeforeRoot)
        ));
        assert!(matches!(
            parse_feed("hello <b>world"),
            Err(ParseError::TextBeforeRoot)
        ));
        assert!(matches!(parse_feed(""), Err(ParseError::NoRootElement)));
        assert!(matches!(parse_feed("  \n "), Err(ParseError::NoRootElement)));
        assert!(matches!(parse_feed("<not valid xml"), Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_parse_error_message() {
        let err = parse_feed("").unwrap_err();
        assert!(err.to_string().contains("XML parse error"));
    }

    #[test]
    fn test_rfc3339_pub_date_parsed() {
        let xml = "<rss><channel><item><pubDate>2024-01-01T00:00:00Z</pubDate></item></channel></rss>";
        let result = parse_feed(xml).unwrap();
        assert_eq!(
            result.entries[0].published_parsed.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_json_shape() {
        let xml = "<rss><channel><title>Example</title><item><title>Hello</title><link>http://x</link></item></channel></rss>";
        let json = serde_json::to_value(parse_feed(xml).unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "feedTitle": "Example",
                "feedLink": "",
                "totalEntries": 1,
                "entries": [{
                    "title": "Hello",
                    "link": "http://x",
                    "description": "No Description",
                    "pubDate": "No Date",
                    "publishedParsed": null
                }]
            })
        );
    }

    proptest! {
        #[test]
        fn prop_item_count_and_order_preserved(titles in proptest::collection::vec("[a-zA-Z0-9 ]{1,20}", 0..30)) {
            let mut xml = String::from("<rss><channel><title>P</title>");
            for title in &titles {
                xml.push_str(&format!("<item><title>{}</title></item>", title));
            }
            xml.push_str("</channel></rss>");

            let result = parse_feed(&xml).unwrap();
            prop_assert_eq!(result.entries.len(), titles.len());
            for (entry, title) in result.entries.iter().zip(&titles) {
                let expected = if title.trim().is_empty() { NO_TITLE } else { title.trim() };
                prop_assert_eq!(entry.title.as_str(), expected);
            }
        }
    }
}
