//! Normalization from [`RawListing`] to [`NormalizedScholarship`].
//!
//! Degree classification and deadline parsing are delegated to
//! [`crate::classify`] and [`crate::deadline`]; this module handles the
//! field mapping and the empty-name rejection.

use scholdb_core::{NormalizedScholarship, RawListing, DEFAULT_SCHOLARSHIP_IMAGE};
use thiserror::Error;

use crate::classify::classify_degree_level;
use crate::deadline::DeadlineParser;

/// A listing the normalizer refused to turn into a scholarship.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationRejection {
    #[error("listing from '{source_id}' has no title")]
    EmptyName { source_id: String },
}

/// Normalizes a raw listing into a canonical scholarship.
///
/// Pure: the only input besides the listing is the parser carrying the run
/// date used for the deadline fallback.
///
/// # Errors
///
/// Returns [`NormalizationRejection::EmptyName`] if the title is empty after
/// trimming.
pub fn normalize_listing(
    listing: RawListing,
    deadlines: &DeadlineParser,
) -> Result<NormalizedScholarship, NormalizationRejection> {
    let name = listing.title_text.trim().to_string();
    if name.is_empty() {
        return Err(NormalizationRejection::EmptyName {
            source_id: listing.source_id,
        });
    }

    let application_deadline = deadlines.parse(listing.deadline_text.as_deref());
    let degree_level = classify_degree_level(listing.level_text.as_deref());

    let image = listing
        .image_url_text
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SCHOLARSHIP_IMAGE.to_string());

    Ok(NormalizedScholarship {
        name,
        description: listing.description_text.trim().to_string(),
        eligibility: listing.eligibility_text.trim().to_string(),
        application_deadline,
        degree_level,
        // Passed through untouched; consumers handle malformed links.
        apply_link: listing.apply_link_text,
        image,
        source_id: listing.source_id,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
