use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Site-scoped identifier of a posting. Kept opaque: some sites use numeric
/// ids, others slugs taken from the URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A non-empty set of role tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Returns `None` for an empty set: a posting without a role is discarded.
    pub fn new(roles: BTreeSet<String>) -> Option<Self> {
        (!roles.is_empty()).then_some(Self(roles))
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let roles = BTreeSet::<String>::deserialize(deserializer)?;
        RoleSet::new(roles).ok_or_else(|| serde::de::Error::custom("roles must not be empty"))
    }
}

/// One search to run against a site: a keyword query and an optional location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriterion {
    pub keywords: String,
    pub location: Option<String>,
}

impl SearchCriterion {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Lightweight pointer to a posting, produced while scanning a results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReference {
    pub external_id: JobId,
    pub url: String,
    pub matched_roles: RoleSet,
}

/// Best-effort fields of a posting. Their presence depends on site markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    Company,
    Location,
    Type,
    Level,
    Industry,
    Workplace,
    CompanySize,
    Published,
    Description,
}

impl JobField {
    pub const ALL: [JobField; 9] = [
        JobField::Company,
        JobField::Location,
        JobField::Type,
        JobField::Level,
        JobField::Industry,
        JobField::Workplace,
        JobField::CompanySize,
        JobField::Published,
        JobField::Description,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobField::Company => "company",
            JobField::Location => "location",
            JobField::Type => "type",
            JobField::Level => "level",
            JobField::Industry => "industry",
            JobField::Workplace => "workplace",
            JobField::CompanySize => "company_size",
            JobField::Published => "published",
            JobField::Description => "description",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully extracted posting, the unit persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub source: String,
    pub url: String,
    pub title: String,
    pub roles: RoleSet,
    #[serde(flatten)]
    pub fields: BTreeMap<JobField, String>,
    pub retrieved_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(reference: ListingReference, source: impl Into<String>, title: String) -> Self {
        Self {
            id: reference.external_id,
            source: source.into(),
            url: reference.url,
            title,
            roles: reference.matched_roles,
            fields: BTreeMap::new(),
            retrieved_at: Utc::now(),
        }
    }

    pub fn with_field(mut self, field: JobField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: JobField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: JobField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}
