use crate::error::{Result, ScoutError};
use reqwest::Url;

/// Query parameter the search page filters on
pub const KEYWORD_PARAM: &str = "sk";

/// Free-text search keyword for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    keyword: String,
}

impl SearchQuery {
    /// Keywords that already arrive percent-encoded are decoded once here so
    /// that building the URL never encodes them a second time.
    pub fn new(keyword: &str) -> Self {
        let trimmed = keyword.trim();
        let keyword = if looks_percent_encoded(trimmed) {
            urlencoding::decode(trimmed)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| trimmed.to_string())
        } else {
            trimmed.to_string()
        };
        Self { keyword }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_empty()
    }

    /// Search page URL; an empty keyword yields the unfiltered listing page
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if !self.keyword.is_empty() {
            url.query_pairs_mut()
                .append_pair(KEYWORD_PARAM, &self.keyword);
        }
        url
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ScoutError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

/// True when the text contains at least one `%XX` escape, every `%` starts
/// a valid escape, and the escapes decode to UTF-8.
fn looks_percent_encoded(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut saw_escape = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return false;
            }
            saw_escape = true;
            i += 3;
        } else {
            i += 1;
        }
    }

    saw_escape && urlencoding::decode(text).is_ok()
}
