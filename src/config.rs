use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Ordered mapping from a role tag to the patterns that assign it.
///
/// Patterns are regular expressions matched case-insensitively anywhere in a
/// job title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolePatternTable(IndexMap<String, Vec<String>>);

impl RolePatternTable {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_role<I, S>(mut self, role: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(role.into())
            .or_default()
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(role, patterns)| (role.as_str(), patterns.as_slice()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_json(path)
    }
}

impl Default for RolePatternTable {
    /// Data and machine-learning roles.
    fn default() -> Self {
        Self::new()
            .with_role("Data Scientist", [r"data.?scien"])
            .with_role("Data Analyst", [r"data.?analyst"])
            .with_role(
                "ML Engineer",
                [
                    r"machine.?learning",
                    r"ml.?engineer",
                    r"deep.?learning",
                    r"artificial.?intelligence",
                    r"(?:^|\s)\(?ai\)?(?:\s|$)",
                ],
            )
            .with_role("MLOps", [r"ml.?ops"])
    }
}

/// Login for sites that only show posting details to signed-in users.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
struct CredentialsFile {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file: CredentialsFile = read_json(path)?;
        Ok(Self::new(file.username, file.password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
