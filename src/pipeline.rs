//! Runs every site scraper through crawl, extract and store.

use std::fmt;
use std::sync::Arc;

use crate::model::SearchCriterion;
use crate::sites::SiteScraper;
use crate::store::JobStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScraperOutcome {
    Completed,
    /// The crawl matched nothing, so there was nothing to extract.
    NoListings,
    /// The scraper stopped early. Other scrapers are unaffected.
    Failed(String),
}

/// What one scraper achieved during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperReport {
    pub site: String,
    pub scanned: usize,
    pub matched: usize,
    pub crawl_exceptions: usize,
    pub extracted: usize,
    pub extraction_failures: usize,
    pub inserted: usize,
    pub outcome: ScraperOutcome,
}

impl ScraperReport {
    fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            scanned: 0,
            matched: 0,
            crawl_exceptions: 0,
            extracted: 0,
            extraction_failures: 0,
            inserted: 0,
            outcome: ScraperOutcome::Completed,
        }
    }
}

impl fmt::Display for ScraperReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: matched {}/{} listings, {} exceptions, extracted {} ({} failed), {} new",
            self.site,
            self.matched,
            self.scanned,
            self.crawl_exceptions,
            self.extracted,
            self.extraction_failures,
            self.inserted
        )?;
        match &self.outcome {
            ScraperOutcome::Completed => Ok(()),
            ScraperOutcome::NoListings => write!(f, " (no listings)"),
            ScraperOutcome::Failed(reason) => write!(f, " (failed: {reason})"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<ScraperReport>,
}

impl RunSummary {
    pub fn total_inserted(&self) -> usize {
        self.reports.iter().map(|r| r.inserted).sum()
    }

    pub fn report(&self, site: &str) -> Option<&ScraperReport> {
        self.reports.iter().find(|r| r.site == site)
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn JobStore>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Runs the scrapers one after another. A scraper that fails is reported
    /// and the next one still runs.
    pub async fn run(
        &self,
        scrapers: &mut [Box<dyn SiteScraper>],
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for scraper in scrapers.iter_mut() {
            let report = self
                .run_one(scraper.as_mut(), criteria, max_per_criterion)
                .await;
            tracing::info!(site = %report.site, "{report}");
            summary.reports.push(report);
        }

        tracing::info!(
            scrapers = summary.reports.len(),
            inserted = summary.total_inserted(),
            "Ingestion finished"
        );
        summary
    }

    async fn run_one(
        &self,
        scraper: &mut dyn SiteScraper,
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
    ) -> ScraperReport {
        let mut report = ScraperReport::new(scraper.name());

        let crawl = match scraper.crawl(criteria, max_per_criterion) {
            Ok(crawl) => crawl,
            Err(e) => {
                tracing::error!(site = %report.site, error = %e, "Crawl failed");
                report.outcome = ScraperOutcome::Failed(e.to_string());
                return report;
            }
        };
        report.scanned = crawl.stats.scanned;
        report.matched = crawl.len();
        report.crawl_exceptions = crawl.stats.exceptions;

        if crawl.is_empty() {
            tracing::warn!(site = %report.site, "No jobs found during search");
            report.outcome = ScraperOutcome::NoListings;
            return report;
        }

        let extracted = match scraper.extract(crawl.into_references()) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::error!(site = %report.site, error = %e, "Extraction failed");
                report.outcome = ScraperOutcome::Failed(e.to_string());
                return report;
            }
        };
        report.extracted = extracted.records.len();
        report.extraction_failures = extracted.failed;

        if extracted.records.is_empty() {
            return report;
        }

        match self.store.insert_many(&extracted.records).await {
            Ok(inserted) => report.inserted = inserted,
            Err(e) => {
                tracing::error!(site = %report.site, error = %e, "Storing postings failed");
                report.outcome = ScraperOutcome::Failed(e.to_string());
            }
        }
        report
    }
}
