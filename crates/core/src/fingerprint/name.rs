//! Release name parsing.
//!
//! Extracts the searchable title plus year / season / episode hints from a
//! release name. The title is everything before the first marker token
//! (year, `SxxEyy`, `Sxx`, `1x02` or a quality tag).

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::{detect_resolution, is_noise_token, raw_tokens};

static EPISODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^s(\d{1,2})e(\d{1,3})(?:e\d{1,3})*$").unwrap());
static SEASON: Lazy<Regex> = Lazy::new(|| Regex::new(r"^s(\d{1,2})$").unwrap());
static CROSS_EPISODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})x(\d{2,3})$").unwrap());
static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}$").unwrap());

/// What kind of content a release name describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    Movie,
    Episode,
    Season,
    Unknown,
}

/// Structured view of a release name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedName {
    /// Searchable title, original casing, space separated.
    pub title: Option<String>,
    pub year: Option<u32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Resolution marker (`"1080p"`), `4k`/`uhd` map to `"2160p"`.
    pub resolution: Option<String>,
    /// Trailing release group tag.
    pub group: Option<String>,
    pub kind: ReleaseKind,
}

enum Marker {
    Episode(u32, u32),
    Season(u32),
    Year(u32),
    Noise,
}

fn classify(token: &str, index: usize) -> Option<Marker> {
    let lower = token.to_lowercase();
    if let Some(caps) = EPISODE.captures(&lower) {
        return Some(Marker::Episode(caps[1].parse().ok()?, caps[2].parse().ok()?));
    }
    if let Some(caps) = CROSS_EPISODE.captures(&lower) {
        return Some(Marker::Episode(caps[1].parse().ok()?, caps[2].parse().ok()?));
    }
    if let Some(caps) = SEASON.captures(&lower) {
        return Some(Marker::Season(caps[1].parse().ok()?));
    }
    // A leading year is part of the title ("2012.2009.720p").
    if index > 0 && YEAR_TOKEN.is_match(&lower) {
        return Some(Marker::Year(lower.parse().ok()?));
    }
    if is_noise_token(&lower) {
        return Some(Marker::Noise);
    }
    None
}

/// Parse a release name into title and hints.
pub fn parse_release_name(name: &str) -> ParsedName {
    let (tokens, group) = raw_tokens(name);
    let tokens: Vec<String> = tokens
        .into_iter()
        .filter(|t| t.chars().any(|c| c.is_alphanumeric()))
        .collect();

    let mut title_end = tokens.len();
    let mut year = None;
    let mut season = None;
    let mut episode = None;

    for (index, token) in tokens.iter().enumerate() {
        let Some(marker) = classify(token, index) else {
            continue;
        };
        title_end = title_end.min(index);
        match marker {
            Marker::Episode(s, e) if season.is_none() => {
                season = Some(s);
                episode = Some(e);
            }
            Marker::Season(s) if season.is_none() => season = Some(s),
            Marker::Year(y) if year.is_none() => year = Some(y),
            _ => {}
        }
    }

    let title = if title_end > 0 {
        Some(tokens[..title_end].join(" "))
    } else {
        None
    };

    let kind = if episode.is_some() {
        ReleaseKind::Episode
    } else if season.is_some() {
        ReleaseKind::Season
    } else if year.is_some() {
        ReleaseKind::Movie
    } else {
        ReleaseKind::Unknown
    };

    ParsedName {
        title,
        year,
        season,
        episode,
        resolution: detect_resolution(name),
        group,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episode() {
        let parsed = parse_release_name("Show.Name.S01E01.1080p-GROUP");
        assert_eq!(parsed.title.as_deref(), Some("Show Name"));
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(1));
        assert_eq!(parsed.resolution.as_deref(), Some("1080p"));
        assert_eq!(parsed.group.as_deref(), Some("GROUP"));
        assert_eq!(parsed.kind, ReleaseKind::Episode);
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn test_parse_movie() {
        let parsed = parse_release_name("The.Matrix.1999.1080p.BluRay.x264-GRP");
        assert_eq!(parsed.title.as_deref(), Some("The Matrix"));
        assert_eq!(parsed.year, Some(1999));
        assert_eq!(parsed.kind, ReleaseKind::Movie);
    }

    #[test]
    fn test_parse_leading_year_is_title() {
        let parsed = parse_release_name("2012.2009.720p.BluRay");
        assert_eq!(parsed.title.as_deref(), Some("2012"));
        assert_eq!(parsed.year, Some(2009));
    }

    #[test]
    fn test_parse_season_pack() {
        let parsed = parse_release_name("Show Name S02 1080p WEB-DL");
        assert_eq!(parsed.title.as_deref(), Some("Show Name"));
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, None);
        assert_eq!(parsed.kind, ReleaseKind::Season);
    }

    #[test]
    fn test_parse_cross_episode_format() {
        let parsed = parse_release_name("Show.Name.3x07.HDTV");
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, Some(7));
        assert_eq!(parsed.kind, ReleaseKind::Episode);
    }

    #[test]
    fn test_parse_bracketed_album() {
        let parsed = parse_release_name("Artist - Some Album (2005) [FLAC]");
        assert_eq!(parsed.title.as_deref(), Some("Artist Some Album"));
        assert_eq!(parsed.year, Some(2005));
        assert_eq!(parsed.kind, ReleaseKind::Movie);
    }

    #[test]
    fn test_parse_unknown_without_markers() {
        let parsed = parse_release_name("Some Random Folder");
        assert_eq!(parsed.title.as_deref(), Some("Some Random Folder"));
        assert_eq!(parsed.kind, ReleaseKind::Unknown);
    }

    #[test]
    fn test_parse_no_title() {
        let parsed = parse_release_name("1080p.x264");
        assert!(parsed.title.is_none());
    }
}
