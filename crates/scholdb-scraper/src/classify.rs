//! Degree-level classification from free-text level descriptions.

use scholdb_core::DegreeLevel;

/// Ordered keyword table. The first level with any substring hit wins, so
/// `undergraduate` is matched before the `graduate` keyword under `Masters`.
const LEVEL_KEYWORDS: &[(DegreeLevel, &[&str])] = &[
    (
        DegreeLevel::Undergraduate,
        &["bachelor", "undergraduate", "bs", "ba"],
    ),
    (DegreeLevel::Masters, &["master", "ms", "ma", "graduate"]),
    (DegreeLevel::PhD, &["phd", "doctorate", "doctoral"]),
];

/// Maps a free-text level description to a [`DegreeLevel`].
///
/// Matching is case-insensitive substring search against [`LEVEL_KEYWORDS`]
/// in table order. Absent, empty, or unmatched input yields
/// [`DegreeLevel::All`]; this function never fails.
#[must_use]
pub fn classify_degree_level(level_text: Option<&str>) -> DegreeLevel {
    let needle = level_text.unwrap_or_default().trim().to_lowercase();
    if needle.is_empty() {
        return DegreeLevel::All;
    }

    LEVEL_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| needle.contains(k)))
        .map_or(DegreeLevel::All, |(level, _)| *level)
}
