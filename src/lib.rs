pub mod config;
pub mod error;
pub mod geocode;
pub mod map;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod store;

pub use config::AppConfig;
pub use error::{Result, ScoutError};
pub use pipeline::{IngestPipeline, ItemOutcome, PipelineOptions, RunSummary};
pub use store::Store;
