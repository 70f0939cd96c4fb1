use super::name::ReleaseKind;
use super::types::Fingerprint;
use crate::searcher::{SearchCategory, SearchQuery};

/// Build the search query for a fingerprint: parsed title plus year, with
/// category and season/episode hints.
///
/// Returns `None` when the release name yields no searchable title.
pub fn build_query(fingerprint: &Fingerprint) -> Option<SearchQuery> {
    let parsed = &fingerprint.parsed;
    let title = parsed.title.as_deref()?.trim();
    if title.is_empty() {
        return None;
    }

    let text = match parsed.year {
        Some(year) => format!("{} {}", title, year),
        None => title.to_string(),
    };

    let category = match parsed.kind {
        ReleaseKind::Episode | ReleaseKind::Season => Some(SearchCategory::Tv),
        ReleaseKind::Movie => Some(SearchCategory::Movies),
        ReleaseKind::Unknown => None,
    };

    Some(SearchQuery {
        text,
        category,
        season: parsed.season,
        episode: parsed.episode,
        trackers: None,
    })
}
