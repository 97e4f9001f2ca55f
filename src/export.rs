//! Writes stored postings to a JSON report, keeping only selected fields.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use futures::TryStreamExt;
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::model::JobField;
use crate::store::{JobFilter, JobStore};

pub const DEFAULT_REPORT_PATH: &str = "reports/posts.json";

/// A key that can appear in an exported object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportField {
    Id,
    Source,
    Url,
    Title,
    Roles,
    RetrievedAt,
    Job(JobField),
}

impl ExportField {
    pub fn defaults() -> Vec<ExportField> {
        vec![
            ExportField::Roles,
            ExportField::Job(JobField::Location),
            ExportField::Job(JobField::Type),
            ExportField::Job(JobField::Industry),
            ExportField::Job(JobField::Workplace),
            ExportField::Job(JobField::Level),
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            ExportField::Id => "id",
            ExportField::Source => "source",
            ExportField::Url => "url",
            ExportField::Title => "title",
            ExportField::Roles => "roles",
            ExportField::RetrievedAt => "retrieved_at",
            ExportField::Job(field) => field.as_str(),
        }
    }
}

impl fmt::Display for ExportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExportField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim() {
            "id" => ExportField::Id,
            "source" => ExportField::Source,
            "url" => ExportField::Url,
            "title" => ExportField::Title,
            "roles" => ExportField::Roles,
            "retrieved_at" => ExportField::RetrievedAt,
            other => ExportField::Job(
                JobField::parse(other).ok_or_else(|| format!("unknown field `{other}`"))?,
            ),
        };
        Ok(field)
    }
}

/// Exports every record matching `filter` to `path` as a pretty-printed JSON
/// array and returns how many were written. Fields a record lacks are left
/// out of its object.
pub async fn export_report(
    store: &dyn JobStore,
    filter: &JobFilter,
    fields: &[ExportField],
    path: &Path,
) -> Result<usize, ExportError> {
    let mut rows = Vec::new();
    let mut records = store.find(filter);
    while let Some(record) = records.try_next().await? {
        let Value::Object(full) = serde_json::to_value(&record)? else {
            continue;
        };
        rows.push(project(full, fields));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&rows)?)?;

    tracing::info!(count = rows.len(), path = %path.display(), "Exported postings");
    Ok(rows.len())
}

fn project(mut full: Map<String, Value>, fields: &[ExportField]) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        if let Some(value) = full.remove(field.key()) {
            out.insert(field.key().to_string(), value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobId, JobRecord, ListingReference, RoleSet};
    use crate::store::MemoryStore;

    fn record(id: &str, role: &str, source: &str) -> JobRecord {
        let reference = ListingReference {
            external_id: JobId::new(id),
            url: format!("https://jobs.example/{id}"),
            matched_roles: RoleSet::new([role.to_string()].into()).unwrap(),
        };
        JobRecord::new(reference, source, format!("{role} {id}"))
            .with_field(JobField::Location, "Athens")
            .with_field(JobField::Level, "Mid-Senior level")
            .with_field(JobField::Description, "Long text")
    }

    #[test]
    fn parses_field_names() {
        assert_eq!("roles".parse::<ExportField>(), Ok(ExportField::Roles));
        assert_eq!(
            " company_size".parse::<ExportField>(),
            Ok(ExportField::Job(JobField::CompanySize))
        );
        assert!("salary".parse::<ExportField>().is_err());
    }

    #[tokio::test]
    async fn writes_projected_report_and_creates_directories() {
        let store = MemoryStore::new();
        store
            .insert_many(&[
                record("1", "Data Scientist", "linkedin"),
                record("2", "ML Engineer", "kariera"),
            ])
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("posts.json");

        let count = export_report(&store, &JobFilter::all(), &ExportField::defaults(), &path)
            .await
            .unwrap();

        assert_eq!(count, 2);
        let written: Vec<Map<String, Value>> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        let first = &written[0];
        assert_eq!(first["roles"], serde_json::json!(["Data Scientist"]));
        assert_eq!(first["location"], "Athens");
        assert_eq!(first["level"], "Mid-Senior level");
        assert!(!first.contains_key("description"));
        assert!(!first.contains_key("type"));
        assert!(!first.contains_key("id"));
    }

    #[tokio::test]
    async fn filter_limits_exported_records() {
        let store = MemoryStore::new();
        store
            .insert_many(&[
                record("1", "Data Scientist", "linkedin"),
                record("2", "ML Engineer", "kariera"),
            ])
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ml.json");

        let count = export_report(
            &store,
            &JobFilter::all().with_role("ML Engineer"),
            &[ExportField::Id, ExportField::Source],
            &path,
        )
        .await
        .unwrap();

        assert_eq!(count, 1);
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!([{ "id": "2", "source": "kariera" }]));
    }
}
