use std::sync::Arc;

use futures::TryStreamExt;
use job_harvest::config::{Credentials, RolePatternTable};
use job_harvest::navigator::Locator;
use job_harvest::sites::{KarieraScraper, LinkedInScraper, SiteScraper};
use job_harvest::testing::{FakeClick, FakeElement, FakeNavigator, FakePage, RecordingClock};
use job_harvest::{
    IngestionPipeline, JobField, JobFilter, JobId, JobStore, MemoryStore, RoleClassifier,
    ScraperOutcome, SearchCriterion, SqliteStore,
};

const LINKEDIN_DETAIL: &str = r#"//div[@role="main"]/div[1]/div/div/div[1]"#;
const KARIERA_DETAIL: &str = r#"//main[@class="ant-layout-content"]/section"#;

fn classifier() -> Arc<RoleClassifier> {
    Arc::new(RoleClassifier::new(&RolePatternTable::default()).unwrap())
}

fn criteria() -> Vec<SearchCriterion> {
    vec![SearchCriterion::new("Data Scientist").with_location("Greece")]
}

fn linkedin_card(id: &str, title: &str) -> FakeElement {
    FakeElement::new()
        .with_child(
            Locator::xpath("./div"),
            FakeElement::new().with_attribute("data-entity-urn", format!("urn:li:jobPosting:{id}")),
        )
        .with_child(
            Locator::xpath(".//h3[contains(@class, 'base-search-card__title')]"),
            FakeElement::text(title),
        )
        .with_child(
            Locator::xpath(".//a[contains(@class, 'base-card__full-link')]"),
            FakeElement::new().with_attribute("href", format!("https://www.linkedin.com/jobs/view/{id}")),
        )
}

fn linkedin_detail(title: &str, criteria_cell: &str) -> FakePage {
    let at = |path: &str| Locator::xpath(format!("{LINKEDIN_DETAIL}{path}"));
    FakePage::new(2000)
        .with(at("/h1"), FakeElement::text(title))
        .with(at("/div[1]/span[1]/span[1]"), FakeElement::text("Acme"))
        .with(at("/div[1]/span[1]/span[2]"), FakeElement::text("Athens, Greece"))
        .with(at("/div[2]/ul/li[1]/span"), FakeElement::text(criteria_cell))
        .with(at("/div[2]/ul/li[2]/span"), FakeElement::text("51-200 employees · Software"))
        .with(at("/div[1]/span[2]/span[1]"), FakeElement::text("1 day ago"))
        .with(
            Locator::xpath(r#"//div[@role="main"]/section/div[1]/div"#),
            FakeElement::text("Train and ship models."),
        )
}

fn with_linkedin_login(nav: FakeNavigator) -> FakeNavigator {
    let feed = "https://www.linkedin.com/feed/";
    nav.with_page(
        "https://www.linkedin.com/",
        FakePage::new(100)
            .with(Locator::css("#session_key"), FakeElement::new())
            .with(Locator::css("#session_password"), FakeElement::new())
            .with(
                Locator::css(".sign-in-form__submit-button"),
                FakeElement::new().on_click(FakeClick::Navigate(feed.to_string())),
            ),
    )
    .with_page(feed, FakePage::new(100).with(Locator::css("#global-nav"), FakeElement::new()))
}

/// Three listings: two match a role, one does not.
fn linkedin_site() -> FakeNavigator {
    let search = LinkedInScraper::<FakeNavigator, RecordingClock>::search_url(&criteria()[0]);
    with_linkedin_login(FakeNavigator::new())
        .with_page(
            search,
            FakePage::new(900).with_all(
                Locator::xpath("//ul[contains(@class, 'jobs-search__results-list')]/li"),
                [
                    linkedin_card("123", "Senior Data Scientist"),
                    linkedin_card("124", "Office Manager"),
                    linkedin_card("125", "Machine Learning Engineer"),
                ],
            ),
        )
        .with_page(
            "https://www.linkedin.com/jobs/view/123",
            linkedin_detail("Senior Data Scientist", "Full-time · Mid-Senior level"),
        )
        .with_page(
            "https://www.linkedin.com/jobs/view/125",
            linkedin_detail("Machine Learning Engineer", "Full-time"),
        )
}

fn kariera_site() -> FakeNavigator {
    let search = KarieraScraper::<FakeNavigator, RecordingClock>::search_url(&criteria()[0]);
    let at = |path: &str| Locator::xpath(format!("{KARIERA_DETAIL}{path}"));
    FakeNavigator::new()
        .with_page(
            search,
            FakePage::new(1200).with(
                Locator::xpath("//*[@data-testid='job-card']"),
                FakeElement::new().with_child(
                    Locator::xpath(".//div[1]/div[1]/div[2]/div[2]/a"),
                    FakeElement::text("Data Scientist").with_attribute("href", "/en/jobs/9001"),
                ),
            ),
        )
        .with_page(
            "https://www.kariera.gr/en/jobs/9001",
            FakePage::new(1500)
                .with(at("/div[1]/div/div/div[1]/div/div"), FakeElement::text("Data Scientist"))
                .with(at("/div[2]/div[1]/div[2]/div[1]/div[1]/a"), FakeElement::text("Athens"))
                .with(at("/div[2]/div[1]/div[2]/div[1]/div[4]/a"), FakeElement::text("Full time"))
                .with(at("/div[2]/div[1]/div[2]/div[1]/div[3]/a"), FakeElement::text("Mid level"))
                .with(at("/div[2]/div[1]/div[2]/div[2]/div[1]/a"), FakeElement::text("Banking"))
                .with(at("/div[2]/div[2]"), FakeElement::text("Credit risk models.")),
        )
}

fn linkedin_scraper() -> Box<dyn SiteScraper> {
    Box::new(
        LinkedInScraper::new(linkedin_site(), RecordingClock::new(), classifier())
            .with_credentials(Credentials::new("ada@example.com", "secret")),
    )
}

#[tokio::test]
async fn only_classified_listings_are_extracted_and_stored() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = IngestionPipeline::new(store.clone());
    let mut scrapers = vec![linkedin_scraper()];

    let summary = pipeline.run(&mut scrapers, &criteria(), 250).await;

    let report = summary.report("linkedin").unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(report.extracted, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.outcome, ScraperOutcome::Completed);

    let ml = store.get(&JobId::new("125")).await.unwrap();
    assert!(ml.roles.contains("ML Engineer"));
    assert_eq!(ml.get(JobField::Type), Some("Full-time"));
    assert_eq!(ml.get(JobField::Level), None);
    assert!(store.get(&JobId::new("124")).await.is_none());
}

#[tokio::test]
async fn repeated_runs_keep_one_record_per_id() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let pipeline = IngestionPipeline::new(store.clone());
    let mut scrapers = vec![linkedin_scraper()];

    let first = pipeline.run(&mut scrapers, &criteria(), 250).await;
    let second = pipeline.run(&mut scrapers, &criteria(), 250).await;

    assert_eq!(first.total_inserted(), 2);
    assert_eq!(second.total_inserted(), 0);
    let stored: Vec<_> = store
        .find(&JobFilter::all().with_role("Data Scientist"))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, JobId::new("123"));
    assert_eq!(stored[0].get(JobField::Level), Some("Mid-Senior level"));
}

#[tokio::test]
async fn login_failure_ends_only_that_scraper() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let pipeline = IngestionPipeline::new(store.clone());
    let mut scrapers: Vec<Box<dyn SiteScraper>> = vec![
        Box::new(LinkedInScraper::new(linkedin_site(), RecordingClock::new(), classifier())),
        Box::new(KarieraScraper::new(kariera_site(), RecordingClock::new(), classifier())),
    ];

    let summary = pipeline.run(&mut scrapers, &criteria(), 250).await;

    let linkedin = summary.report("linkedin").unwrap();
    assert_eq!(linkedin.matched, 2);
    assert_eq!(linkedin.inserted, 0);
    assert!(matches!(linkedin.outcome, ScraperOutcome::Failed(_)));

    let kariera = summary.report("kariera").unwrap();
    assert_eq!(kariera.outcome, ScraperOutcome::Completed);
    assert_eq!(kariera.inserted, 1);

    let stored: Vec<_> = store.find(&JobFilter::all()).try_collect().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source, "kariera");
    assert_eq!(stored[0].get(JobField::Company), Some("-"));
}
