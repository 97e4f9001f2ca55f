//! In-memory stand-ins for the browser and the clock.
//!
//! [`FakeNavigator`] serves scripted pages keyed by URL. A page may have
//! several growth stages: scrolling to the bottom (or clicking an element
//! marked [`FakeClick::Grow`]) moves to the next stage, which is how infinite
//! scroll is simulated. Clones share state, so a test can keep a handle for
//! assertions after moving one into a scraper.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{NavError, NavResult};
use crate::navigator::{Clock, Locator, Navigator};

/// What clicking an element does.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeClick {
    Navigate(String),
    Grow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeElement {
    text: String,
    attributes: HashMap<String, String>,
    children: HashMap<Locator, FakeElement>,
    on_click: Option<FakeClick>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, locator: Locator, child: FakeElement) -> Self {
        self.children.insert(locator, child);
        self
    }

    pub fn on_click(mut self, action: FakeClick) -> Self {
        self.on_click = Some(action);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<Locator, Vec<FakeElement>>,
    height: u64,
}

impl FakePage {
    pub fn new(height: u64) -> Self {
        Self {
            elements: HashMap::new(),
            height,
        }
    }

    pub fn with(mut self, locator: Locator, element: FakeElement) -> Self {
        self.elements.entry(locator).or_default().push(element);
        self
    }

    pub fn with_all<I>(mut self, locator: Locator, elements: I) -> Self
    where
        I: IntoIterator<Item = FakeElement>,
    {
        self.elements.entry(locator).or_default().extend(elements);
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: HashMap<String, Vec<FakePage>>,
    current: Option<(String, usize)>,
    timeouts: HashSet<String>,
    opened: Vec<String>,
    typed: Vec<String>,
    scrolls: usize,
}

impl FakeState {
    fn page(&self) -> NavResult<&FakePage> {
        let (url, stage) = self
            .current
            .as_ref()
            .ok_or_else(|| NavError::Driver(anyhow::anyhow!("no page is open")))?;
        self.pages
            .get(url)
            .and_then(|stages| stages.get(*stage))
            .ok_or_else(|| NavError::Driver(anyhow::anyhow!("no page scripted for {url}")))
    }

    fn grow(&mut self) {
        if let Some((url, stage)) = self.current.as_mut() {
            let stages = self.pages.get(url.as_str()).map_or(0, Vec::len);
            if *stage + 1 < stages {
                *stage += 1;
            }
        }
    }

    fn open(&mut self, url: &str) -> NavResult<()> {
        self.opened.push(url.to_string());
        if self.timeouts.contains(url) {
            return Err(NavError::Timeout {
                what: format!("navigation to {url}"),
                seconds: 30,
            });
        }
        if !self.pages.contains_key(url) {
            return Err(NavError::Driver(anyhow::anyhow!("connection refused: {url}")));
        }
        self.current = Some((url.to_string(), 0));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeNavigator {
    state: Arc<Mutex<FakeState>>,
}

impl FakeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page that never grows.
    pub fn with_page(self, url: impl Into<String>, page: FakePage) -> Self {
        self.with_stages(url, vec![page])
    }

    /// A page that advances to the next stage on every scroll.
    pub fn with_stages(self, url: impl Into<String>, stages: Vec<FakePage>) -> Self {
        self.lock().pages.insert(url.into(), stages);
        self
    }

    /// A URL whose navigation never completes.
    pub fn with_timeout(self, url: impl Into<String>) -> Self {
        self.lock().timeouts.insert(url.into());
        self
    }

    /// Every URL opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.lock().typed.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.lock().scrolls
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test poisons the lock; the data is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for FakeNavigator {
    type Element<'a> = FakeElement;

    fn open(&self, url: &str) -> NavResult<()> {
        self.lock().open(url)
    }

    fn find_element(&self, locator: &Locator) -> NavResult<FakeElement> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| NavError::not_found(locator))
    }

    fn find_elements(&self, locator: &Locator) -> NavResult<Vec<FakeElement>> {
        let state = self.lock();
        Ok(state.page()?.elements.get(locator).cloned().unwrap_or_default())
    }

    fn find_within<'p>(
        &'p self,
        parent: &'p FakeElement,
        locator: &Locator,
    ) -> NavResult<FakeElement> {
        parent
            .children
            .get(locator)
            .cloned()
            .ok_or_else(|| NavError::not_found(locator))
    }

    fn element_text(&self, element: &FakeElement) -> NavResult<String> {
        Ok(element.text.clone())
    }

    fn element_attribute(&self, element: &FakeElement, name: &str) -> NavResult<Option<String>> {
        Ok(element.attributes.get(name).cloned())
    }

    fn click(&self, element: &FakeElement) -> NavResult<()> {
        let mut state = self.lock();
        match &element.on_click {
            Some(FakeClick::Navigate(url)) => state.open(url),
            Some(FakeClick::Grow) => {
                state.grow();
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn type_into(&self, _element: &FakeElement, text: &str) -> NavResult<()> {
        self.lock().typed.push(text.to_string());
        Ok(())
    }

    fn scroll_to_bottom(&self) -> NavResult<()> {
        let mut state = self.lock();
        state.scrolls += 1;
        state.grow();
        Ok(())
    }

    fn page_height(&self) -> NavResult<u64> {
        Ok(self.lock().page()?.height)
    }

    fn wait_for(&self, locator: &Locator, _timeout: Duration) -> NavResult<bool> {
        Ok(!self.find_elements(locator)?.is_empty())
    }
}

/// Records every settle interval instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Clock for RecordingClock {
    fn settle(&self, interval: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(interval);
    }
}
