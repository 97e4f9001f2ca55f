//! [`Navigator`] backed by a Chrome tab.

use headless_chrome::browser::tab::{NoElementFound, Tab};
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, Element, LaunchOptionsBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{NavError, NavResult};
use crate::navigator::{Locator, Navigator};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ChromeNavigator {
    // Dropping the browser kills the process, so it lives as long as the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeNavigator {
    /// Starts a dedicated browser with a single tab.
    pub fn launch(headless: bool) -> NavResult<Self> {
        let options = LaunchOptionsBuilder::default()
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .ignore_certificate_errors(true)
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| NavError::Driver(anyhow::anyhow!(e)))?;

        let browser = Browser::new(options).map_err(NavError::Driver)?;
        let tab = browser.new_tab().map_err(NavError::Driver)?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);
        tracing::debug!(headless, "Browser launched");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn evaluate(&self, script: &str) -> NavResult<Option<serde_json::Value>> {
        let result = self.tab.evaluate(script, false).map_err(NavError::Driver)?;
        Ok(result.value)
    }
}

fn navigation_error(url: &str, err: anyhow::Error) -> NavError {
    if err.downcast_ref::<Timeout>().is_some() {
        NavError::Timeout {
            what: format!("navigation to {url}"),
            seconds: NAVIGATION_TIMEOUT.as_secs(),
        }
    } else {
        NavError::Driver(err)
    }
}

/// A wait that ran out of time is a negative answer; anything else is a
/// broken browser.
fn wait_outcome(locator: &Locator, err: anyhow::Error) -> NavResult<bool> {
    if err.downcast_ref::<Timeout>().is_some() || err.downcast_ref::<NoElementFound>().is_some() {
        tracing::debug!(%locator, "Wait ended without a match");
        Ok(false)
    } else {
        Err(NavError::Driver(err))
    }
}

fn lookup_error(locator: &Locator, err: anyhow::Error) -> NavError {
    if err.downcast_ref::<NoElementFound>().is_some() {
        NavError::not_found(locator)
    } else {
        NavError::Driver(err)
    }
}

impl Navigator for ChromeNavigator {
    type Element<'a> = Element<'a>;

    fn open(&self, url: &str) -> NavResult<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| navigation_error(url, e))?;
        Ok(())
    }

    fn find_element(&self, locator: &Locator) -> NavResult<Element<'_>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_element(selector),
            Locator::XPath(expr) => self.tab.find_element_by_xpath(expr),
        };
        found.map_err(|e| lookup_error(locator, e))
    }

    fn find_elements(&self, locator: &Locator) -> NavResult<Vec<Element<'_>>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_elements(selector),
            Locator::XPath(expr) => self.tab.find_elements_by_xpath(expr),
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(Vec::new()),
            Err(e) => Err(NavError::Driver(e)),
        }
    }

    fn find_within<'p>(
        &'p self,
        parent: &'p Element<'_>,
        locator: &Locator,
    ) -> NavResult<Element<'p>> {
        let found = match locator {
            Locator::Css(selector) => parent.find_element(selector),
            Locator::XPath(expr) => parent.find_element_by_xpath(expr),
        };
        found.map_err(|e| lookup_error(locator, e))
    }

    fn element_text(&self, element: &Element<'_>) -> NavResult<String> {
        element
            .get_inner_text()
            .map(|text| text.trim().to_string())
            .map_err(NavError::Driver)
    }

    fn element_attribute(&self, element: &Element<'_>, name: &str) -> NavResult<Option<String>> {
        element.get_attribute_value(name).map_err(NavError::Driver)
    }

    fn click(&self, element: &Element<'_>) -> NavResult<()> {
        element.click().map_err(NavError::Driver)?;
        Ok(())
    }

    fn type_into(&self, element: &Element<'_>, text: &str) -> NavResult<()> {
        element.type_into(text).map_err(NavError::Driver)?;
        Ok(())
    }

    fn scroll_to_bottom(&self) -> NavResult<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight);")?;
        Ok(())
    }

    fn page_height(&self) -> NavResult<u64> {
        self.evaluate("document.body.scrollHeight")?
            .and_then(|v| v.as_f64())
            .map(|h| h as u64)
            .ok_or_else(|| NavError::Driver(anyhow::anyhow!("page height is not a number")))
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> NavResult<bool> {
        let waited = match locator {
            Locator::Css(selector) => self.tab.wait_for_element_with_custom_timeout(selector, timeout),
            Locator::XPath(expr) => self.tab.wait_for_xpath_with_custom_timeout(expr, timeout),
        };
        match waited {
            Ok(_) => Ok(true),
            Err(e) => wait_outcome(locator, e),
        }
    }
}
