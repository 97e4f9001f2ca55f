use std::sync::Arc;
use std::time::Duration;

use super::{encode_query, SiteScraper};
use crate::classifier::RoleClassifier;
use crate::config::Credentials;
use crate::crawler::{CrawlOutcome, IdSource, ListingCrawler, ListingLayout, Pagination};
use crate::error::ScrapeError;
use crate::extractor::{DetailExtractor, DetailLayout, ExtractOutcome, FieldRule};
use crate::login::LoginForm;
use crate::model::{JobField, ListingReference, SearchCriterion};
use crate::navigator::{Clock, Locator, Navigator};

const NAME: &str = "linkedin";
const BASE_URL: &str = "https://www.linkedin.com/";
const SETTLE: Duration = Duration::from_millis(2500);
const DETAIL_ROOT: &str = r#"//div[@role="main"]/div[1]/div/div/div[1]"#;

/// Public job search with infinite scroll. Detail pages need a signed-in
/// session, so extraction logs in first.
pub struct LinkedInScraper<N, C> {
    nav: N,
    clock: C,
    classifier: Arc<RoleClassifier>,
    credentials: Option<Credentials>,
    signed_in: bool,
    listing: ListingLayout,
    pagination: Pagination,
    detail: DetailLayout,
    login: LoginForm,
}

impl<N: Navigator, C: Clock> LinkedInScraper<N, C> {
    pub fn new(nav: N, clock: C, classifier: Arc<RoleClassifier>) -> Self {
        Self {
            nav,
            clock,
            classifier,
            credentials: None,
            signed_in: false,
            listing: listing_layout(),
            pagination: Pagination::InfiniteScroll {
                show_more: Some(Locator::css(
                    "button.infinite-scroller__show-more-button--visible",
                )),
            },
            detail: detail_layout(),
            login: login_form(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn search_url(criterion: &SearchCriterion) -> String {
        let mut url = format!(
            "{BASE_URL}jobs/search?keywords={}",
            encode_query(&criterion.keywords)
        );
        if let Some(location) = &criterion.location {
            url.push_str("&location=");
            url.push_str(&encode_query(location));
        }
        url
    }

    fn ensure_signed_in(&mut self) -> Result<(), ScrapeError> {
        if self.signed_in {
            return Ok(());
        }
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ScrapeError::LoginFailed {
                site: NAME.to_string(),
                reason: "no credentials configured".to_string(),
            })?;
        self.login.sign_in(&self.nav, NAME, credentials)?;
        self.signed_in = true;
        Ok(())
    }
}

impl<N: Navigator, C: Clock> SiteScraper for LinkedInScraper<N, C> {
    fn name(&self) -> &str {
        NAME
    }

    fn crawl(
        &mut self,
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
    ) -> Result<CrawlOutcome, ScrapeError> {
        tracing::info!(site = NAME, criteria = criteria.len(), "Gathering job posts");
        let crawler = ListingCrawler::new(&self.listing, &self.pagination, &self.classifier)
            .with_settle(SETTLE);
        let outcome =
            crawler.crawl_all(&self.nav, &self.clock, criteria, max_per_criterion, Self::search_url);

        if outcome.stats.exceptions > 0 {
            tracing::warn!(site = NAME, corrupted = outcome.stats.exceptions, "Corrupted listing entries");
        }
        tracing::info!(
            site = NAME,
            matched = outcome.len(),
            scanned = outcome.stats.scanned,
            "Matched jobs gathered"
        );
        Ok(outcome)
    }

    fn extract(&mut self, references: Vec<ListingReference>) -> Result<ExtractOutcome, ScrapeError> {
        self.ensure_signed_in()?;
        let extractor = DetailExtractor::new(&self.detail, NAME).with_settle(SETTLE);
        Ok(extractor.extract_all(&self.nav, &self.clock, references))
    }
}

fn listing_layout() -> ListingLayout {
    ListingLayout {
        entries: Locator::xpath("//ul[contains(@class, 'jobs-search__results-list')]/li"),
        title: Locator::xpath(".//h3[contains(@class, 'base-search-card__title')]"),
        link: Locator::xpath(".//a[contains(@class, 'base-card__full-link')]"),
        id: IdSource::Attribute {
            locator: Some(Locator::xpath("./div")),
            name: "data-entity-urn".to_string(),
            separator: Some(':'),
        },
        base_url: BASE_URL.to_string(),
        dismiss: None,
    }
}

fn detail_layout() -> DetailLayout {
    let at = |path: &str| Locator::xpath(format!("{DETAIL_ROOT}{path}"));
    DetailLayout {
        title: at("/h1"),
        fields: vec![
            FieldRule::single(JobField::Company, at("/div[1]/span[1]/span[1]")).optional(),
            FieldRule::single(JobField::Location, at("/div[1]/span[1]/span[2]")).optional(),
            FieldRule::single(JobField::Workplace, at("/div[1]/span[1]/span[3]")).optional(),
            FieldRule::split(at("/div[2]/ul/li[1]/span"), " · ", [JobField::Type, JobField::Level])
                .optional(),
            FieldRule::split(
                at("/div[2]/ul/li[2]/span"),
                " · ",
                [JobField::CompanySize, JobField::Industry],
            )
            .strip_suffix(JobField::CompanySize, " employees")
            .optional(),
            FieldRule::single(JobField::Published, at("/div[1]/span[2]/span[1]")).optional(),
            FieldRule::single(
                JobField::Description,
                Locator::xpath(r#"//div[@role="main"]/section/div[1]/div"#),
            )
            .optional(),
        ],
    }
}

fn login_form() -> LoginForm {
    LoginForm {
        url: BASE_URL.to_string(),
        username: Locator::css("#session_key"),
        password: Locator::css("#session_password"),
        submit: Locator::css(".sign-in-form__submit-button"),
        signed_in: Locator::css("#global-nav"),
        form_timeout: Duration::from_secs(5),
        auth_timeout: Duration::from_secs(100),
    }
}
