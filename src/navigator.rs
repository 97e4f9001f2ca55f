//! The browser capability the scrapers drive, plus the clock used to let
//! asynchronously rendered pages settle.

use rand::Rng;
use std::fmt;
use std::time::Duration;

use crate::error::NavResult;

/// How to find an element on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Synchronous page navigation and DOM queries.
///
/// Lookups return [`NavError::NotFound`](crate::error::NavError::NotFound)
/// when the locator matches nothing. Every call blocks until the browser has
/// answered.
pub trait Navigator {
    type Element<'a>
    where
        Self: 'a;

    fn open(&self, url: &str) -> NavResult<()>;

    fn find_element(&self, locator: &Locator) -> NavResult<Self::Element<'_>>;

    /// All matches, possibly none.
    fn find_elements(&self, locator: &Locator) -> NavResult<Vec<Self::Element<'_>>>;

    /// Lookup relative to `parent`. The child borrows from the parent.
    fn find_within<'p>(
        &'p self,
        parent: &'p Self::Element<'_>,
        locator: &Locator,
    ) -> NavResult<Self::Element<'p>>;

    fn element_text(&self, element: &Self::Element<'_>) -> NavResult<String>;

    /// `Ok(None)` when the element exists but has no such attribute.
    fn element_attribute(&self, element: &Self::Element<'_>, name: &str)
        -> NavResult<Option<String>>;

    fn click(&self, element: &Self::Element<'_>) -> NavResult<()>;

    fn type_into(&self, element: &Self::Element<'_>, text: &str) -> NavResult<()>;

    fn scroll_to_bottom(&self) -> NavResult<()>;

    fn page_height(&self) -> NavResult<u64>;

    /// Polls until `locator` matches or `timeout` elapses. `false` on timeout.
    fn wait_for(&self, locator: &Locator, timeout: Duration) -> NavResult<bool>;
}

/// Blocks while a page finishes rendering.
pub trait Clock {
    fn settle(&self, interval: Duration);
}

/// Sleeps the current thread for the interval plus a little random jitter.
#[derive(Debug, Clone)]
pub struct ThreadClock {
    jitter_ms: u64,
}

impl ThreadClock {
    pub fn new(jitter_ms: u64) -> Self {
        Self { jitter_ms }
    }
}

impl Default for ThreadClock {
    fn default() -> Self {
        Self::new(280)
    }
}

impl Clock for ThreadClock {
    fn settle(&self, interval: Duration) {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        std::thread::sleep(interval + Duration::from_millis(jitter));
    }
}
