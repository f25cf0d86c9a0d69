use crate::error::Result;
use async_trait::async_trait;
use reqwest::Url;

/// Raw page as returned by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
}

/// Source of HTML pages.
/// Implementations must return `ScoutError::Status` for any non-200
/// response and `ScoutError::Transport` when no response arrived.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;

    /// Name used in log lines
    fn source_name(&self) -> &'static str;
}
