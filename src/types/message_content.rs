use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static RECORD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\},\s*\{").unwrap());

/// One record returned by the search engine, flattened to display lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The record's fields, one per line, HTML removed.
    pub lines: Vec<String>,
}

impl SearchResult {
    /// Returns the record as newline-separated text.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// The body of a message.
///
/// Search-engine output arrives as the stringified list of result records.
/// It is decoded into [`MessageContent::SearchResults`] once, when the message
/// enters the client, so nothing downstream inspects the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain conversational text.
    Text(String),
    /// Search-engine results, one entry per record.
    SearchResults(Vec<SearchResult>),
}

impl MessageContent {
    /// Decodes a wire `content` string.
    ///
    /// Only messages flagged `searchResponse` are candidates for record
    /// decoding; a flagged message whose body is not a record list stays
    /// plain text.
    pub fn from_wire(raw: String, search_response: bool) -> Self {
        if search_response && let Some(results) = parse_search_records(&raw) {
            return MessageContent::SearchResults(results);
        }
        MessageContent::Text(raw)
    }

    /// Returns the display parts of the content.
    pub fn parts(&self) -> Vec<String> {
        match self {
            MessageContent::Text(text) => vec![text.clone()],
            MessageContent::SearchResults(results) => {
                results.iter().map(SearchResult::text).collect()
            }
        }
    }

    /// Returns the plain text, if this is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::SearchResults(_) => None,
        }
    }

    /// Returns true if this is search-engine output.
    pub fn is_search_results(&self) -> bool {
        matches!(self, MessageContent::SearchResults(_))
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

fn parse_search_records(raw: &str) -> Option<Vec<SearchResult>> {
    let body = raw.trim().strip_prefix("[{")?.strip_suffix("}]")?;
    let body = HTML_TAG.replace_all(body, "");
    let results = RECORD_BOUNDARY
        .split(&body)
        .map(|record| SearchResult {
            lines: record
                .split(", '")
                .map(|field| field.trim().to_string())
                .filter(|field| !field.is_empty())
                .collect(),
        })
        .filter(|result| !result.lines.is_empty())
        .collect::<Vec<_>>();
    if results.is_empty() {
        None
    } else {
        Some(results)
    }
}
