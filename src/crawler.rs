//! Walks a search results view and collects references to matching postings.

use std::collections::HashSet;
use std::time::Duration;

use crate::classifier::RoleClassifier;
use crate::error::{NavError, NavResult};
use crate::model::{JobId, ListingReference, RoleSet, SearchCriterion};
use crate::navigator::{Clock, Locator, Navigator};

/// Where a listing entry keeps its external id.
#[derive(Debug, Clone)]
pub enum IdSource {
    /// An attribute of the entry (or of an element inside it). With a
    /// separator, only the text after the last separator is kept, e.g.
    /// `urn:li:jobPosting:123` -> `123`.
    Attribute {
        locator: Option<Locator>,
        name: String,
        separator: Option<char>,
    },
    /// The part of the posting URL after `marker`, without query string.
    UrlSegment { marker: String },
}

/// How one site lays out its results list.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    /// Every rendered entry, in page order.
    pub entries: Locator,
    /// Relative to an entry.
    pub title: Locator,
    /// Relative to an entry; its `href` is the posting URL.
    pub link: Locator,
    pub id: IdSource,
    /// Prefix for relative links.
    pub base_url: String,
    /// A banner to dismiss after the search page loads, if one shows up.
    pub dismiss: Option<Locator>,
}

/// How to reveal more entries once the rendered ones are scanned.
#[derive(Debug, Clone)]
pub enum Pagination {
    /// The same document grows as the user scrolls. An optional "show more"
    /// button is clicked first when rendered.
    InfiniteScroll { show_more: Option<Locator> },
    /// A "next page" control loads a fresh list.
    NextControl { control: Locator },
    /// Numbered pagination items; the next page is opened through a query
    /// parameter appended to the search URL.
    PageNumbers {
        items: Locator,
        number_attribute: String,
        page_param: String,
    },
}

impl Pagination {
    /// Whether advancing shows a fresh list instead of extending the current one.
    fn replaces_page(&self) -> bool {
        !matches!(self, Pagination::InfiniteScroll { .. })
    }
}

/// Titles and links of a page's entries, in order.
type PageSignature = Vec<(String, Option<String>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    Grew,
    NewPage,
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub scanned: usize,
    pub matched: usize,
    pub exceptions: usize,
}

/// References collected by a crawl. External ids are unique.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    references: Vec<ListingReference>,
    seen: HashSet<JobId>,
    pub stats: CrawlStats,
}

impl CrawlOutcome {
    /// Appends unless the id was already collected. Returns whether it was new.
    pub fn push(&mut self, reference: ListingReference) -> bool {
        if !self.seen.insert(reference.external_id.clone()) {
            return false;
        }
        self.references.push(reference);
        true
    }

    pub fn references(&self) -> &[ListingReference] {
        &self.references
    }

    pub fn into_references(self) -> Vec<ListingReference> {
        self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

pub const DEFAULT_STALL_LIMIT: usize = 3;
const DISMISS_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ListingCrawler<'a> {
    layout: &'a ListingLayout,
    pagination: &'a Pagination,
    classifier: &'a RoleClassifier,
    settle: Duration,
    stall_limit: usize,
}

impl<'a> ListingCrawler<'a> {
    pub fn new(
        layout: &'a ListingLayout,
        pagination: &'a Pagination,
        classifier: &'a RoleClassifier,
    ) -> Self {
        Self {
            layout,
            pagination,
            classifier,
            settle: Duration::from_secs(2),
            stall_limit: DEFAULT_STALL_LIMIT,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Consecutive advances without new entries before giving up.
    pub fn with_stall_limit(mut self, limit: usize) -> Self {
        self.stall_limit = limit.max(1);
        self
    }

    /// Crawls every criterion in turn. A criterion whose search page cannot be
    /// loaded is logged and skipped.
    pub fn crawl_all<N, C, F>(
        &self,
        nav: &N,
        clock: &C,
        criteria: &[SearchCriterion],
        max_per_criterion: usize,
        search_url: F,
    ) -> CrawlOutcome
    where
        N: Navigator,
        C: Clock,
        F: Fn(&SearchCriterion) -> String,
    {
        let mut outcome = CrawlOutcome::default();
        for criterion in criteria {
            let url = search_url(criterion);
            let before = outcome.len();
            match self.crawl_criterion(nav, clock, &url, max_per_criterion, &mut outcome) {
                Ok(()) => tracing::info!(
                    keywords = %criterion.keywords,
                    new_references = outcome.len() - before,
                    total = outcome.len(),
                    "Criterion crawled"
                ),
                Err(e) => {
                    outcome.stats.exceptions += 1;
                    tracing::warn!(url = %url, error = %e, "Criterion abandoned");
                }
            }
        }
        outcome
    }

    /// Scans one search until `max` entries were looked at or no more
    /// content can be revealed.
    pub fn crawl_criterion<N: Navigator, C: Clock>(
        &self,
        nav: &N,
        clock: &C,
        search_url: &str,
        max: usize,
        outcome: &mut CrawlOutcome,
    ) -> NavResult<()> {
        if max == 0 {
            return Ok(());
        }
        nav.open(search_url)?;
        clock.settle(self.settle);
        self.dismiss_banner(nav);

        let mut cursor = 0;
        let mut scanned = 0;
        let mut page = 1u32;
        let mut stalls = 0;
        let mut pages_seen: HashSet<PageSignature> = HashSet::new();

        'scan: loop {
            let entries = nav.find_elements(&self.layout.entries)?;
            if cursor == 0 && self.pagination.replaces_page() {
                let signature = self.page_signature(nav, &entries);
                if !pages_seen.insert(signature) {
                    tracing::debug!(url = %search_url, page, "Page already scanned");
                    cursor = entries.len();
                }
            }
            let fresh = entries.len().saturating_sub(cursor);

            for entry in entries.iter().skip(cursor) {
                cursor += 1;
                scanned += 1;
                outcome.stats.scanned += 1;
                self.scan_entry(nav, entry, outcome);
                if scanned >= max {
                    break 'scan;
                }
            }

            if fresh == 0 {
                stalls += 1;
                if stalls >= self.stall_limit {
                    tracing::debug!(url = %search_url, stalls, "No new entries, stopping");
                    break;
                }
            } else {
                stalls = 0;
            }

            match self.advance(nav, clock, search_url, &mut page)? {
                Advance::Grew => {}
                Advance::NewPage => cursor = 0,
                Advance::Exhausted => break,
            }
        }

        tracing::debug!(url = %search_url, scanned, pages = page, "Search exhausted");
        Ok(())
    }

    fn page_signature<'n, N: Navigator>(
        &self,
        nav: &'n N,
        entries: &[N::Element<'n>],
    ) -> PageSignature {
        entries
            .iter()
            .map(|entry| {
                let title = nav
                    .find_within(entry, &self.layout.title)
                    .and_then(|title| nav.element_text(&title))
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default();
                let href = nav
                    .find_within(entry, &self.layout.link)
                    .and_then(|link| nav.element_attribute(&link, "href"))
                    .ok()
                    .flatten();
                (title, href)
            })
            .collect()
    }

    fn dismiss_banner<N: Navigator>(&self, nav: &N) {
        let Some(banner) = &self.layout.dismiss else {
            return;
        };
        let dismissed = nav
            .wait_for(banner, DISMISS_TIMEOUT)
            .and_then(|shown| match shown {
                true => nav.find_element(banner).and_then(|button| nav.click(&button)).map(|_| true),
                false => Ok(false),
            });
        match dismissed {
            Ok(true) => tracing::debug!(%banner, "Banner dismissed"),
            Ok(false) => {}
            Err(e) => tracing::debug!(%banner, error = %e, "Banner could not be dismissed"),
        }
    }

    fn scan_entry<'n, N: Navigator>(
        &self,
        nav: &'n N,
        entry: &N::Element<'n>,
        outcome: &mut CrawlOutcome,
    ) {
        match self.read_entry(nav, entry) {
            Ok(Some(reference)) => {
                if outcome.push(reference) {
                    outcome.stats.matched += 1;
                }
            }
            Ok(None) => {}
            Err(e) if e.is_not_found() => {
                outcome.stats.exceptions += 1;
                tracing::debug!(error = %e, "Listing entry is missing a field");
            }
            Err(e) => {
                outcome.stats.exceptions += 1;
                tracing::warn!(error = %e, "Failed to read listing entry");
            }
        }
    }

    /// `None` when the title matches no role.
    fn read_entry<'n, N: Navigator>(
        &self,
        nav: &'n N,
        entry: &N::Element<'n>,
    ) -> NavResult<Option<ListingReference>> {
        let title = nav.element_text(&nav.find_within(entry, &self.layout.title)?)?;
        let Some(roles) = RoleSet::new(self.classifier.classify(&title)) else {
            return Ok(None);
        };

        let link = nav.find_within(entry, &self.layout.link)?;
        let href = nav
            .element_attribute(&link, "href")?
            .filter(|href| !href.trim().is_empty())
            .ok_or_else(|| NavError::not_found(format!("{} [href]", self.layout.link)))?;
        let url = absolute_url(&self.layout.base_url, href.trim());
        let external_id = self.read_id(nav, entry, &url)?;

        Ok(Some(ListingReference {
            external_id,
            url,
            matched_roles: roles,
        }))
    }

    fn read_id<'n, N: Navigator>(
        &self,
        nav: &'n N,
        entry: &N::Element<'n>,
        url: &str,
    ) -> NavResult<JobId> {
        let raw = match &self.layout.id {
            IdSource::Attribute {
                locator,
                name,
                separator,
            } => {
                let value = match locator {
                    Some(locator) => {
                        let holder = nav.find_within(entry, locator)?;
                        nav.element_attribute(&holder, name)?
                    }
                    None => nav.element_attribute(entry, name)?,
                };
                let value = value.ok_or_else(|| NavError::not_found(format!("[{name}]")))?;
                match separator {
                    Some(sep) => value.rsplit(*sep).next().unwrap_or_default().to_string(),
                    None => value,
                }
            }
            IdSource::UrlSegment { marker } => url
                .split_once(marker.as_str())
                .map(|(_, rest)| rest)
                .unwrap_or_default()
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Err(NavError::not_found("external id"));
        }
        Ok(JobId::new(raw))
    }

    fn advance<N: Navigator, C: Clock>(
        &self,
        nav: &N,
        clock: &C,
        search_url: &str,
        page: &mut u32,
    ) -> NavResult<Advance> {
        match self.pagination {
            Pagination::InfiniteScroll { show_more } => {
                let before = nav.page_height()?;
                if let Some(locator) = show_more {
                    if let Some(button) = nav.find_elements(locator)?.first() {
                        if let Err(e) = nav.click(button) {
                            tracing::debug!(error = %e, "Show more button not clickable");
                        }
                    }
                }
                nav.scroll_to_bottom()?;
                clock.settle(self.settle);
                let after = nav.page_height()?;
                if after == before {
                    return Ok(Advance::Exhausted);
                }
                tracing::debug!(before, after, "Loaded more entries");
                Ok(Advance::Grew)
            }
            Pagination::NextControl { control } => match nav.find_element(control) {
                Ok(next) => {
                    nav.click(&next)?;
                    clock.settle(self.settle);
                    *page += 1;
                    Ok(Advance::NewPage)
                }
                Err(e) if e.is_not_found() => Ok(Advance::Exhausted),
                Err(e) => Err(e),
            },
            Pagination::PageNumbers {
                items,
                number_attribute,
                page_param,
            } => {
                let current = *page;
                let has_next = nav.find_elements(items)?.iter().any(|item| {
                    nav.element_attribute(item, number_attribute)
                        .ok()
                        .flatten()
                        .and_then(|n| n.trim().parse::<u32>().ok())
                        .is_some_and(|n| n > current)
                });
                if !has_next {
                    return Ok(Advance::Exhausted);
                }
                *page += 1;
                nav.open(&format!("{search_url}&{page_param}={page}"))?;
                clock.settle(self.settle);
                Ok(Advance::NewPage)
            }
        }
    }
}

fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}
