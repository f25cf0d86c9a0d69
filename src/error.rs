use thiserror::Error;

/// Errors surfaced by the ingestion pipeline and its collaborators
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Missing or malformed configuration, fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure before a response was received
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response arrived but was not a 200
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// Geocoding service answered with an error status
    #[error("geocoding failed ({status}): {message}")]
    Geocode { status: String, message: String },

    #[error("database error while {context}: {source}")]
    Database {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    /// Run stopped before every listing was processed
    #[error("run for '{keyword}' cancelled")]
    Cancelled { keyword: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoutError {
    pub fn database(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Database {
            context: context.into(),
            source,
        }
    }

    /// True when the database rejected a write because of a UNIQUE or
    /// PRIMARY KEY constraint.
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            Self::Database { source, .. } => is_unique_violation(source),
            _ => false,
        }
    }
}

/// SQLite reports every constraint failure under one primary code; the
/// extended code tells a uniqueness clash apart from a foreign key miss.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
