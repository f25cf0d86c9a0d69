pub mod extract;
pub mod tabelog;
pub mod traits;
pub mod types;

pub use extract::{DetailSelectors, ListingSelectors};
pub use tabelog::HttpFetcher;
pub use traits::{FetchedPage, PageFetcher};
pub use types::SearchQuery;
