use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::category::UnknownCategory;
use crate::models::{Category, Entry};

pub const ALL_LABEL: &str = "All";

/// Category selector: every entry, or exactly one enumerated category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn admits(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryFilter::All => ALL_LABEL,
            CategoryFilter::Only(category) => category.label(),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case(ALL_LABEL) {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Timeline,
    Story,
}

/// Transient, per-view presentation state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ViewSelectors {
    pub category: CategoryFilter,
    pub query: String,
    pub mode: ViewMode,
}

/// Filter the mirror by category and case-insensitive search.
///
/// Pure and total: the result depends only on the arguments and keeps the
/// mirror's order.
pub fn derive(mirror: &[Entry], category: CategoryFilter, query: &str) -> Vec<Entry> {
    let needle = query.to_lowercase();
    mirror
        .iter()
        .filter(|entry| category.admits(entry.category) && matches_query(entry, &needle))
        .cloned()
        .collect()
}

fn matches_query(entry: &Entry, needle: &str) -> bool {
    needle.is_empty()
        || entry.text.to_lowercase().contains(needle)
        || entry.date.to_lowercase().contains(needle)
        || entry.category.label().to_lowercase().contains(needle)
}
