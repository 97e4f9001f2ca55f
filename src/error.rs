//! Typed errors for the scraping library.

use thiserror::Error;

/// Failures reported by the navigation capability.
///
/// `NotFound` is a structural mismatch between the expected and the rendered
/// page. An attribute that is simply absent is not an error; see
/// [`Navigator::element_attribute`](crate::navigator::Navigator::element_attribute).
#[derive(Debug, Error)]
pub enum NavError {
    #[error("element not found: {locator}")]
    NotFound { locator: String },

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("browser error: {0}")]
    Driver(#[source] anyhow::Error),
}

impl NavError {
    pub fn not_found(locator: impl std::fmt::Display) -> Self {
        Self::NotFound {
            locator: locator.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that end one scraper's run. They never cross into other scrapers.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavError),

    #[error("login to {site} failed: {reason}")]
    LoginFailed { site: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern {pattern:?} for role {role:?}: {source}")]
    Pattern {
        role: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NavResult<T> = std::result::Result<T, NavError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
