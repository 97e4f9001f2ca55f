use std::sync::Arc;
use std::time::Duration;

use super::{encode_query, SiteScraper};
use crate::classifier::RoleClassifier;
use crate::crawler::{CrawlOutcome, IdSource, ListingCrawler, ListingLayout, Pagination};
use crate::error::ScrapeError;
use crate::extractor::{DetailExtractor, DetailLayout, ExtractOutcome, FieldRule};
use crate::model::{JobField, ListingReference, SearchCriterion};
use crate::navigator::{Clock, Locator, Navigator};

const NAME: &str = "kariera";
const BASE_URL: &str = "https://www.kariera.gr";
const SETTLE: Duration = Duration::from_secs(2);
const DETAIL_ROOT: &str = r#"//main[@class="ant-layout-content"]/section"#;

/// Greek job board with numbered pagination. Searches are by title only.
pub struct KarieraScraper<N, C> {
    nav: N,
    clock: C,
    classifier: Arc<RoleClassifier>,
    listing: ListingLayout,
    pagination: Pagination,
    detail: DetailLayout,
}

impl<N: Navigator, C: Clock> KarieraScraper<N, C> {
    pub fn new(nav: N, clock: C, classifier: Arc<RoleClassifier>) -> Self {
        Self {
            nav,
            clock,
            classifier,
            listing: listing_layout(),
            pagination: Pagination::PageNumbers {
                items: Locator::css("li.ant-pagination-item"),
                number_attribute: "title".to_string(),
                page_param: "page".to_string(),
            },
            detail: detail_layout(),
        }
    }

    pub fn search_url(criterion: &SearchCriterion) -> String {
        format!("{BASE_URL}/en/jobs?title={}", encode_query(&criterion.keywords))
    }
}

impl<N: Navigator, C: Clock> SiteScraper for KarieraScraper<N, C> {
    fn name(&self) -> &str {
        NAME
    }

    fn crawl(
        &mut self,
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
    ) -> Result<CrawlOutcome, ScrapeError> {
        if criteria.iter().any(|c| c.location.is_some()) {
            tracing::warn!(site = NAME, "Location filter is not supported, searching all of Greece");
        }
        tracing::info!(site = NAME, criteria = criteria.len(), "Gathering job posts");

        let crawler = ListingCrawler::new(&self.listing, &self.pagination, &self.classifier)
            .with_settle(SETTLE);
        let outcome =
            crawler.crawl_all(&self.nav, &self.clock, criteria, max_per_criterion, Self::search_url);

        tracing::info!(
            site = NAME,
            matched = outcome.len(),
            scanned = outcome.stats.scanned,
            exceptions = outcome.stats.exceptions,
            "Job posts identified"
        );
        Ok(outcome)
    }

    fn extract(&mut self, references: Vec<ListingReference>) -> Result<ExtractOutcome, ScrapeError> {
        let extractor = DetailExtractor::new(&self.detail, NAME).with_settle(SETTLE);
        Ok(extractor.extract_all(&self.nav, &self.clock, references))
    }
}

fn listing_layout() -> ListingLayout {
    let anchor = Locator::xpath(".//div[1]/div[1]/div[2]/div[2]/a");
    ListingLayout {
        entries: Locator::xpath("//*[@data-testid='job-card']"),
        title: anchor.clone(),
        link: anchor,
        id: IdSource::UrlSegment {
            marker: "/en/jobs/".to_string(),
        },
        base_url: BASE_URL.to_string(),
        dismiss: Some(Locator::css("#CybotCookiebotDialogBodyButtonDecline")),
    }
}

fn detail_layout() -> DetailLayout {
    let at = |path: &str| Locator::xpath(format!("{DETAIL_ROOT}{path}"));
    DetailLayout {
        title: at("/div[1]/div/div/div[1]/div/div"),
        fields: vec![
            FieldRule::single(JobField::Company, at("/div[2]/div[1]/div[1]/section/div[1]/a[1]"))
                .or_default("-"),
            FieldRule::single(JobField::Location, at("/div[2]/div[1]/div[2]/div[1]/div[1]/a"))
                .optional(),
            FieldRule::single(JobField::Type, at("/div[2]/div[1]/div[2]/div[1]/div[4]/a"))
                .optional(),
            FieldRule::single(JobField::Level, at("/div[2]/div[1]/div[2]/div[1]/div[3]/a"))
                .optional(),
            FieldRule::single(JobField::Industry, at("/div[2]/div[1]/div[2]/div[2]/div[1]/a"))
                .optional(),
            FieldRule::single(JobField::Workplace, at("/div[2]/div[1]/div[2]/div[2]/div[2]/a"))
                .or_default("On-site"),
            FieldRule::single(JobField::Description, at("/div[2]/div[2]")).optional(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolePatternTable;
    use crate::model::JobId;
    use crate::testing::{FakeElement, FakeNavigator, FakePage, RecordingClock};

    fn classifier() -> Arc<RoleClassifier> {
        Arc::new(RoleClassifier::new(&RolePatternTable::default()).unwrap())
    }

    fn card(slug: &str, title: &str) -> FakeElement {
        FakeElement::new().with_child(
            Locator::xpath(".//div[1]/div[1]/div[2]/div[2]/a"),
            FakeElement::text(title).with_attribute("href", format!("/en/jobs/{slug}")),
        )
    }

    fn results(cards: Vec<FakeElement>, pages: &[u32]) -> FakePage {
        let items = Locator::css("li.ant-pagination-item");
        FakePage::new(1200)
            .with_all(Locator::xpath("//*[@data-testid='job-card']"), cards)
            .with_all(
                items,
                pages
                    .iter()
                    .map(|n| FakeElement::new().with_attribute("title", n.to_string())),
            )
    }

    #[test]
    fn walks_numbered_pages_and_ignores_location() {
        let criterion = SearchCriterion::new("Data Analyst").with_location("Athens");
        let search = KarieraScraper::<FakeNavigator, RecordingClock>::search_url(&criterion);
        assert_eq!(search, "https://www.kariera.gr/en/jobs?title=Data%20Analyst");

        let nav = FakeNavigator::new()
            .with_page(
                search.clone(),
                results(
                    vec![card("1001", "Junior Data Analyst"), card("1002", "Accountant")],
                    &[1, 2],
                )
                .with(
                    Locator::css("#CybotCookiebotDialogBodyButtonDecline"),
                    FakeElement::new(),
                ),
            )
            .with_page(
                format!("{search}&page=2"),
                results(vec![card("1003", "Data Analyst (BI)")], &[1, 2]),
            );
        let mut scraper = KarieraScraper::new(nav, RecordingClock::new(), classifier());

        let outcome = scraper.crawl(&[criterion], 250).unwrap();

        let ids: Vec<_> = outcome.references().iter().map(|r| r.external_id.clone()).collect();
        assert_eq!(ids, [JobId::new("1001"), JobId::new("1003")]);
        assert_eq!(outcome.references()[0].url, "https://www.kariera.gr/en/jobs/1001");
        assert_eq!(outcome.stats.scanned, 3);
    }

    #[test]
    fn missing_company_and_workplace_take_defaults() {
        let at = |path: &str| Locator::xpath(format!("{DETAIL_ROOT}{path}"));
        let page = FakePage::new(1500)
            .with(at("/div[1]/div/div/div[1]/div/div"), FakeElement::text("Data Analyst"))
            .with(at("/div[2]/div[1]/div[2]/div[1]/div[1]/a"), FakeElement::text("Athens"))
            .with(at("/div[2]/div[1]/div[2]/div[1]/div[4]/a"), FakeElement::text("Full time"))
            .with(at("/div[2]/div[1]/div[2]/div[1]/div[3]/a"), FakeElement::text("Entry level"))
            .with(at("/div[2]/div[1]/div[2]/div[2]/div[1]/a"), FakeElement::text("Retail"))
            .with(at("/div[2]/div[2]"), FakeElement::text("Dashboards and SQL."));
        let url = "https://www.kariera.gr/en/jobs/1001";
        let nav = FakeNavigator::new().with_page(url, page);
        let mut scraper = KarieraScraper::new(nav, RecordingClock::new(), classifier());

        let reference = ListingReference {
            external_id: JobId::new("1001"),
            url: url.to_string(),
            matched_roles: crate::model::RoleSet::new(["Data Analyst".to_string()].into())
                .unwrap(),
        };
        let outcome = scraper.extract(vec![reference]).unwrap();

        let record = &outcome.records[0];
        assert_eq!(record.get(JobField::Company), Some("-"));
        assert_eq!(record.get(JobField::Workplace), Some("On-site"));
        assert_eq!(record.get(JobField::Level), Some("Entry level"));
        assert_eq!(record.source, "kariera");
    }

    #[test]
    fn posting_without_level_is_still_stored() {
        let at = |path: &str| Locator::xpath(format!("{DETAIL_ROOT}{path}"));
        let url = "https://www.kariera.gr/en/jobs/2002";
        let page = FakePage::new(1500)
            .with(at("/div[1]/div/div/div[1]/div/div"), FakeElement::text("ML Engineer"))
            .with(at("/div[2]/div[1]/div[2]/div[1]/div[4]/a"), FakeElement::text("Full time"));
        let nav = FakeNavigator::new().with_page(url, page);
        let mut scraper = KarieraScraper::new(nav, RecordingClock::new(), classifier());
        let reference = ListingReference {
            external_id: JobId::new("2002"),
            url: url.to_string(),
            matched_roles: crate::model::RoleSet::new(["ML Engineer".to_string()].into())
                .unwrap(),
        };

        let outcome = scraper.extract(vec![reference]).unwrap();

        assert_eq!(outcome.failed, 0);
        let record = &outcome.records[0];
        assert_eq!(record.get(JobField::Type), Some("Full time"));
        assert_eq!(record.get(JobField::Level), None);
        assert_eq!(record.get(JobField::Location), None);
        assert_eq!(record.get(JobField::Company), Some("-"));
    }
}
