//! Scholarship domain types shared by the scraper, store, and pipeline crates.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Image path served when a source provides no image for a listing.
pub const DEFAULT_SCHOLARSHIP_IMAGE: &str = "/images/scholarship-placeholder.png";

/// A listing as scraped from one source, before any normalization.
///
/// Text fields are kept exactly as extracted; empty strings and `None` are
/// both legal and are resolved by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    /// Identifier of the adapter that produced this listing.
    pub source_id: String,
    pub title_text: String,
    pub description_text: String,
    pub eligibility_text: String,
    pub deadline_text: Option<String>,
    pub level_text: Option<String>,
    pub apply_link_text: String,
    pub image_url_text: Option<String>,
}

/// Canonical degree-level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeLevel {
    Undergraduate,
    Masters,
    #[serde(rename = "phd")]
    PhD,
    All,
}

impl DegreeLevel {
    /// The value stored in the `degree_level` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DegreeLevel::Undergraduate => "undergraduate",
            DegreeLevel::Masters => "masters",
            DegreeLevel::PhD => "phd",
            DegreeLevel::All => "all",
        }
    }
}

impl std::fmt::Display for DegreeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown degree level \"{0}\"")]
pub struct ParseDegreeLevelError(pub String);

impl FromStr for DegreeLevel {
    type Err = ParseDegreeLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undergraduate" => Ok(DegreeLevel::Undergraduate),
            "masters" => Ok(DegreeLevel::Masters),
            "phd" => Ok(DegreeLevel::PhD),
            "all" => Ok(DegreeLevel::All),
            other => Err(ParseDegreeLevelError(other.to_string())),
        }
    }
}

/// A scholarship in canonical form, ready to be merged into the store.
///
/// `name` is the natural key. Store timestamps and the `is_active` flag are
/// owned by the store and are not part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedScholarship {
    pub name: String,
    pub description: String,
    pub eligibility: String,
    pub application_deadline: NaiveDate,
    pub degree_level: DegreeLevel,
    pub apply_link: String,
    pub image: String,
    /// Adapter that produced the listing, kept for provenance.
    pub source_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_level_round_trips_through_column_value() {
        for level in [
            DegreeLevel::Undergraduate,
            DegreeLevel::Masters,
            DegreeLevel::PhD,
            DegreeLevel::All,
        ] {
            assert_eq!(level.as_str().parse::<DegreeLevel>(), Ok(level));
        }
    }

    #[test]
    fn degree_level_rejects_unknown_value() {
        let err = "postdoc".parse::<DegreeLevel>().unwrap_err();
        assert_eq!(err, ParseDegreeLevelError("postdoc".to_string()));
    }

    #[test]
    fn degree_level_serializes_lowercase() {
        let json = serde_json::to_string(&DegreeLevel::PhD).unwrap();
        assert_eq!(json, "\"phd\"");
    }
}
