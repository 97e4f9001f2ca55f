//! Site-specific scrapers. Each one knows its own search URLs, selectors and
//! pagination; the pipeline only sees [`SiteScraper`].

mod kariera;
mod linkedin;

pub use kariera::KarieraScraper;
pub use linkedin::LinkedInScraper;

use crate::crawler::CrawlOutcome;
use crate::error::ScrapeError;
use crate::extractor::ExtractOutcome;
use crate::model::{ListingReference, SearchCriterion};

/// The two-phase contract every site implements: list, then extract.
pub trait SiteScraper {
    fn name(&self) -> &str;

    /// Collects references to postings whose titles match a role.
    fn crawl(
        &mut self,
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
    ) -> Result<CrawlOutcome, ScrapeError>;

    /// Visits each reference's detail page.
    fn extract(&mut self, references: Vec<ListingReference>) -> Result<ExtractOutcome, ScrapeError>;
}

pub(crate) fn encode_query(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}
