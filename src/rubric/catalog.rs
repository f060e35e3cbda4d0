use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::thresholds::RecommendationThresholds;
use super::RubricError;
use crate::models::Category;

/// Embedded default rubric.
const DEFAULT_RUBRIC_TOML: &str = include_str!("../../resources/rubric.toml");

/// Number of principles each category must carry.
pub const EXPECTED_CATEGORY_COUNTS: [(Category, usize); 3] = [
    (Category::Team, 10),
    (Category::Market, 4),
    (Category::Technology, 5),
];

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principle {
    pub id: String,
    pub category: Category,
    pub name: String,
    /// Description used as the retrieval probe.
    pub probe: String,
}

impl Principle {
    /// Text sent to the evidence index for this principle.
    pub fn probe_text(&self) -> String {
        format!("{}: {}", self.name, self.probe)
    }
}

/// The full rubric: version, ordered principles and threshold table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub version: String,
    pub thresholds: RecommendationThresholds,
    pub principles: Vec<Principle>,
}

impl Rubric {
    /// Load the rubric shipped with the crate.
    pub fn load_default() -> Result<Self, RubricError> {
        Self::from_toml_str(DEFAULT_RUBRIC_TOML)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, RubricError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rubric = Self::from_toml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            version = %rubric.version,
            principles = rubric.principles.len(),
            "Rubric loaded"
        );
        Ok(rubric)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, RubricError> {
        let rubric: Rubric = toml::from_str(raw)?;
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        if self.version.trim().is_empty() {
            return Err(RubricError::MissingVersion);
        }

        let mut seen = HashSet::new();
        for principle in &self.principles {
            if principle.id.trim().is_empty() {
                return Err(RubricError::EmptyField(principle.name.clone(), "id"));
            }
            if !seen.insert(principle.id.as_str()) {
                return Err(RubricError::DuplicatePrinciple(principle.id.clone()));
            }
            if principle.name.trim().is_empty() {
                return Err(RubricError::EmptyField(principle.id.clone(), "name"));
            }
            if principle.probe.trim().is_empty() {
                return Err(RubricError::EmptyField(principle.id.clone(), "probe"));
            }
        }

        for (category, expected) in EXPECTED_CATEGORY_COUNTS {
            let found = self.in_category(category).count();
            if found != expected {
                return Err(RubricError::CategoryCount {
                    category,
                    found,
                    expected,
                });
            }
        }

        self.thresholds.validate()
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Principle> {
        self.principles.iter().filter(move |p| p.category == category)
    }

    pub fn principle(&self, id: &str) -> Option<&Principle> {
        self.principles.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.principles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rubric_has_nineteen_principles() {
        let rubric = Rubric::load_default().unwrap();
        assert_eq!(rubric.len(), 19);
        assert_eq!(rubric.in_category(Category::Team).count(), 10);
        assert_eq!(rubric.in_category(Category::Market).count(), 4);
        assert_eq!(rubric.in_category(Category::Technology).count(), 5);
    }

    #[test]
    fn default_rubric_contains_market_size() {
        let rubric = Rubric::load_default().unwrap();
        let p = rubric.principle("market_size").unwrap();
        assert_eq!(p.name, "Market Size");
        assert_eq!(p.category, Category::Market);
        assert!(p.probe_text().starts_with("Market Size:"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut rubric = Rubric::load_default().unwrap();
        rubric.principles[1].id = rubric.principles[0].id.clone();
        assert!(matches!(
            rubric.validate(),
            Err(RubricError::DuplicatePrinciple(_))
        ));
    }

    #[test]
    fn wrong_category_count_rejected() {
        let mut rubric = Rubric::load_default().unwrap();
        let idx = rubric
            .principles
            .iter()
            .position(|p| p.category == Category::Market)
            .unwrap();
        rubric.principles[idx].category = Category::Team;
        assert!(matches!(
            rubric.validate(),
            Err(RubricError::CategoryCount { .. })
        ));
    }

    #[test]
    fn empty_probe_rejected() {
        let mut rubric = Rubric::load_default().unwrap();
        rubric.principles[3].probe = "   ".into();
        assert!(matches!(
            rubric.validate(),
            Err(RubricError::EmptyField(_, "probe"))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Rubric::from_toml_str("version = ").unwrap_err();
        assert!(matches!(err, RubricError::Parse(_)));
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.toml");
        std::fs::write(&path, DEFAULT_RUBRIC_TOML.replace("2026.1", "custom-7")).unwrap();

        let rubric = Rubric::load_from_path(&path).unwrap();
        assert_eq!(rubric.version, "custom-7");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Rubric::load_from_path(Path::new("/nonexistent/rubric.toml")).unwrap_err();
        assert!(matches!(err, RubricError::Io { .. }));
    }
}
