use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use crate::config::RolePatternTable;
use crate::error::ConfigError;

/// Assigns role tags to job titles using a [`RolePatternTable`].
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    rules: Vec<(String, Vec<Regex>)>,
}

impl RoleClassifier {
    pub fn new(table: &RolePatternTable) -> Result<Self, ConfigError> {
        let rules = table
            .iter()
            .map(|(role, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|pattern| {
                        RegexBuilder::new(pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|source| ConfigError::Pattern {
                                role: role.to_string(),
                                pattern: pattern.clone(),
                                source,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((role.to_string(), compiled))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    /// Every role with at least one pattern found in `title`. Empty when
    /// nothing matches.
    pub fn classify(&self, title: &str) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(title)))
            .map(|(role, _)| role.clone())
            .collect()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(role, _)| role.as_str())
    }
}
