//! Rubric catalog — the 19 evaluation principles and the recommendation
//! threshold table.
//!
//! Loaded once at process start (embedded default or a TOML file), validated,
//! then shared read-only behind an `Arc` for the lifetime of every run.

pub mod catalog;
pub mod thresholds;

pub use catalog::*;
pub use thresholds::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Category;

#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Cannot read rubric file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Rubric TOML is invalid: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate principle id: {0}")]
    DuplicatePrinciple(String),

    #[error("Principle {0} has an empty {1}")]
    EmptyField(String, &'static str),

    #[error("Category {category} has {found} principles, expected {expected}")]
    CategoryCount {
        category: Category,
        found: usize,
        expected: usize,
    },

    #[error("Invalid thresholds: {0}")]
    Thresholds(String),

    #[error("Rubric version must not be empty")]
    MissingVersion,
}
