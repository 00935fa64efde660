//! Ordered category list.
//!
//! Line *i* of the labels file names output slot *i* of the model, so the
//! list is never sorted, deduplicated, or filtered in place.

use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Immutable, ordered list of category labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryList {
    labels: Arc<[String]>,
}

impl CategoryList {
    /// Build a list from labels in output-slot order.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a labels file body: one label per line.
    ///
    /// Trailing blank lines are dropped. Blank lines in the middle are kept
    /// as (empty) labels so later indices do not shift.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut labels: Vec<String> = text
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();

        while labels.last().is_some_and(|l| l.trim().is_empty()) {
            labels.pop();
        }

        Self::new(labels)
    }

    /// Label for an output slot.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the list has no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate labels in output-slot order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Labels ordered by their display name, for listing.
    #[must_use]
    pub fn sorted_by_display_name(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.iter().filter(|l| !l.is_empty()).collect();
        sorted.sort_by_cached_key(|l| display_name(l));
        sorted
    }
}

/// Load the category list from a UTF-8 labels file.
///
/// # Errors
/// Returns [`Error::LabelsRead`] if the file cannot be read or is not UTF-8.
pub fn load_categories(path: &Path) -> Result<CategoryList> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::LabelsRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(CategoryList::parse(&text))
}

/// Human-readable form of a label: underscores become spaces and every
/// word is capitalised (`"barn_owl"` -> `"Barn Owl"`).
#[must_use]
pub fn display_name(label: &str) -> String {
    label
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
