//! Job-posting harvester: crawls job boards with a headless browser, keeps the
//! listings whose titles match the configured roles, extracts their details
//! and stores them without duplicates.

pub mod browser;
pub mod classifier;
pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod extractor;
pub mod login;
pub mod model;
pub mod navigator;
pub mod pipeline;
pub mod sites;
pub mod store;
pub mod testing;

pub use classifier::RoleClassifier;
pub use config::{Credentials, RolePatternTable};
pub use error::{ConfigError, ExportError, NavError, ScrapeError, StoreError};
pub use model::{JobField, JobId, JobRecord, ListingReference, RoleSet, SearchCriterion};
pub use pipeline::{IngestionPipeline, RunSummary, ScraperOutcome, ScraperReport};
pub use store::{JobFilter, JobStore, MemoryStore, SqliteStore};
