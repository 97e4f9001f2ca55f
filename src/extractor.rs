//! Reads posting detail pages into [`JobRecord`]s, one record at a time.

use std::time::Duration;

use crate::error::{NavError, NavResult};
use crate::model::{JobField, JobRecord, ListingReference};
use crate::navigator::{Clock, Locator, Navigator};

/// What to do when a field's locator matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The record is abandoned.
    Required,
    /// The field is left out.
    Optional,
    /// The given value is stored instead.
    Default(String),
}

/// One locator on a detail page and the field(s) its text fills.
///
/// With a delimiter the text is split and the segments go to `fields` by
/// position. Missing segments leave the later fields unset.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub locator: Locator,
    pub fields: Vec<JobField>,
    pub delimiter: Option<String>,
    pub presence: Presence,
    pub strip_suffix: Vec<(JobField, String)>,
}

impl FieldRule {
    pub fn single(field: JobField, locator: Locator) -> Self {
        Self {
            locator,
            fields: vec![field],
            delimiter: None,
            presence: Presence::Required,
            strip_suffix: Vec::new(),
        }
    }

    pub fn split<I>(locator: Locator, delimiter: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = JobField>,
    {
        Self {
            locator,
            fields: fields.into_iter().collect(),
            delimiter: Some(delimiter.into()),
            presence: Presence::Required,
            strip_suffix: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn or_default(mut self, value: impl Into<String>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    pub fn strip_suffix(mut self, field: JobField, suffix: impl Into<String>) -> Self {
        self.strip_suffix.push((field, suffix.into()));
        self
    }

    fn apply(&self, record: &mut JobRecord, text: &str) {
        let segments: Vec<&str> = match &self.delimiter {
            Some(delimiter) => text.split(delimiter.as_str()).map(str::trim).collect(),
            None => vec![text.trim()],
        };

        for (field, segment) in self.fields.iter().zip(segments) {
            let value = self
                .strip_suffix
                .iter()
                .find(|(f, _)| f == field)
                .map_or(segment, |(_, suffix)| {
                    segment.strip_suffix(suffix.as_str()).unwrap_or(segment)
                })
                .trim();
            if !value.is_empty() {
                record.set(*field, value);
            }
        }
    }
}

/// The fixed set of locators for one site's detail pages.
#[derive(Debug, Clone)]
pub struct DetailLayout {
    pub title: Locator,
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub records: Vec<JobRecord>,
    pub failed: usize,
}

pub struct DetailExtractor<'a> {
    layout: &'a DetailLayout,
    source: &'a str,
    settle: Duration,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(layout: &'a DetailLayout, source: &'a str) -> Self {
        Self {
            layout,
            source,
            settle: Duration::from_secs(2),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Visits every reference in order. A page that cannot be read is logged
    /// and skipped; it never stops the batch.
    pub fn extract_all<N: Navigator, C: Clock>(
        &self,
        nav: &N,
        clock: &C,
        references: Vec<ListingReference>,
    ) -> ExtractOutcome {
        let total = references.len();
        let mut outcome = ExtractOutcome::default();

        for (index, reference) in references.into_iter().enumerate() {
            let url = reference.url.clone();
            match self.extract_one(nav, clock, reference) {
                Ok(record) => {
                    tracing::debug!(url = %url, id = %record.id, progress = %format!("{}/{}", index + 1, total), "Posting extracted");
                    outcome.records.push(record);
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(url = %url, error = %e, "Skipping posting");
                }
            }
        }

        tracing::info!(
            source = self.source,
            extracted = outcome.records.len(),
            failed = outcome.failed,
            "Detail pages processed"
        );
        outcome
    }

    pub fn extract_one<N: Navigator, C: Clock>(
        &self,
        nav: &N,
        clock: &C,
        reference: ListingReference,
    ) -> NavResult<JobRecord> {
        nav.open(&reference.url)?;
        clock.settle(self.settle);

        let title = read_text(nav, &self.layout.title)?.trim().to_string();
        if title.is_empty() {
            return Err(NavError::not_found(&self.layout.title));
        }
        let mut record = JobRecord::new(reference, self.source, title);

        for rule in &self.layout.fields {
            match read_text(nav, &rule.locator) {
                Ok(text) => rule.apply(&mut record, &text),
                Err(e) if e.is_not_found() => match &rule.presence {
                    Presence::Required => return Err(e),
                    Presence::Optional => {
                        tracing::trace!(locator = %rule.locator, "Optional field absent");
                    }
                    Presence::Default(value) => rule.apply(&mut record, value),
                },
                Err(e) => return Err(e),
            }
        }

        Ok(record)
    }
}

fn read_text<N: Navigator>(nav: &N, locator: &Locator) -> NavResult<String> {
    let element = nav.find_element(locator)?;
    nav.element_text(&element)
}
