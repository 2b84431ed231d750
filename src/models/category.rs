use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of collections a memory can be filed under.
///
/// The display label is also the stored and serialized form, so
/// `"Life Lessons"` round-trips through the database and JSON unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Category {
    #[serde(rename = "General")]
    #[sqlx(rename = "General")]
    General,
    #[serde(rename = "Childhood")]
    #[sqlx(rename = "Childhood")]
    Childhood,
    #[serde(rename = "Romance")]
    #[sqlx(rename = "Romance")]
    Romance,
    #[serde(rename = "Career")]
    #[sqlx(rename = "Career")]
    Career,
    #[serde(rename = "Travel")]
    #[sqlx(rename = "Travel")]
    Travel,
    #[serde(rename = "Family")]
    #[sqlx(rename = "Family")]
    Family,
    #[serde(rename = "Life Lessons")]
    #[sqlx(rename = "Life Lessons")]
    LifeLessons,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::General,
        Category::Childhood,
        Category::Romance,
        Category::Career,
        Category::Travel,
        Category::Family,
        Category::LifeLessons,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Childhood => "Childhood",
            Category::Romance => "Romance",
            Category::Career => "Career",
            Category::Travel => "Travel",
            Category::Family => "Family",
            Category::LifeLessons => "Life Lessons",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Exact label match. Category selection is an enumerated value, not
    /// free text, so no case folding happens here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
