//! Release name normalization.
//!
//! Turns scene/P2P style names into comparable token sequences:
//! `Show.Name.S01E01.1080p.WEB-DL.DDP5.1.H.264-GROUP` and
//! `[Tag] Show Name S01E01 [1080p]` both reduce to `show name s01e01`.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::collections::HashSet;

/// File extensions stripped from release names.
const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "avi", "wmv", "mov", "ts", "m2ts", "mpg", "mpeg", "webm", "flac", "mp3",
    "m4a", "m4b", "aac", "ogg", "opus", "wav", "ape", "iso", "img", "epub", "mobi", "azw3", "pdf",
    "cbz", "cbr", "zip", "rar", "7z", "nfo", "srt", "sub", "idx", "ass",
];

/// Tokens that carry no identity information.
const NOISE_TOKENS: &[&str] = &[
    // Resolution
    "480p", "480i", "576p", "576i", "720p", "1080p", "1080i", "2160p", "4320p", "4k", "8k", "uhd",
    "fhd",
    // Source
    "bluray", "bdrip", "brrip", "bdremux", "remux", "webdl", "webrip", "web", "hdtv", "pdtv",
    "sdtv", "dvdrip", "dvdr", "dvd", "hdrip", "dvdscr", "amzn", "nf", "dsnp", "hmax", "atvp",
    "hulu", "pcok", "itunes",
    // Video codec
    "x264", "x265", "h264", "h265", "hevc", "avc", "xvid", "divx", "av1", "vc1", "mpeg2", "10bit",
    "8bit", "hdr", "hdr10", "hdr10plus", "dv", "dovi", "sdr",
    // Audio
    "aac", "ac3", "eac3", "dts", "dtshd", "truehd", "atmos", "flac", "mp3", "opus", "ddp", "dd",
    "lpcm", "pcm",
    // Flags
    "proper", "repack", "rerip", "internal", "limited", "extended", "unrated", "remastered",
    "hybrid", "multi", "dubbed", "subbed",
];

static NOISE_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| NOISE_TOKENS.iter().copied().collect());

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\{[^}]*\}").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*((?:19|20)\d{2})\s*$").unwrap());
static TRAILING_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)\s*$").unwrap());
static CODEC_DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([hx])\.?(26[45])\b").unwrap());
static AUDIO_CHANNELS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ddp|dd\+|dd|eac3|ac3|aac|dtshd|dts|truehd|opus|flac|atmos)[ .]?[257][ .][01]\b")
        .unwrap()
});
static DTS_HD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdts[ .-]?hd(?:[ .-]?ma)?\b").unwrap());
static WEB_DL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bweb[ ._-]?(dl|rip)\b").unwrap());
static BLU_RAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bblu[ ._-]?ray\b").unwrap());
static RESOLUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}[pi]$").unwrap());
static AUDIO_WITH_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ddp|dd|eac3|ac3|aac|dts|truehd|opus)[257]$").unwrap());

/// Strip a known media extension (`.mkv`, `.flac`, ...) from a name.
pub fn strip_extension(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if !stem.is_empty() && MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return stem;
        }
    }
    name
}

/// Remove `[...]` and `{...}` groups, and `(...)` groups unless they hold a year.
pub fn strip_bracketed(name: &str) -> String {
    let without_brackets = BRACKETED.replace_all(name, " ");
    PARENTHESIZED
        .replace_all(&without_brackets, |caps: &Captures| match YEAR.captures(&caps[1]) {
            Some(year) => format!(" {} ", &year[1]),
            None => " ".to_string(),
        })
        .into_owned()
}

/// Split a trailing `-GROUP` release group tag off a name.
///
/// Only applies when the part before the hyphen looks like a dotted or
/// spaced release name, so `X-Men` keeps its hyphen.
pub fn split_group(name: &str) -> (&str, Option<&str>) {
    let trimmed = name.trim_end();
    if let Some(caps) = TRAILING_GROUP.captures(trimmed) {
        if let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) {
            let head = &trimmed[..whole.start()];
            if head.contains(['.', ' ', '_']) {
                return (head, Some(group.as_str()));
            }
        }
    }
    (trimmed, None)
}

/// Collapse multi-part tags so they survive separator splitting as one token.
fn collapse_tags(name: &str) -> String {
    let s = CODEC_DOTTED.replace_all(name, "${1}${2}");
    let s = DTS_HD.replace_all(&s, "dtshd");
    let s = AUDIO_CHANNELS.replace_all(&s, "${1}");
    let s = WEB_DL.replace_all(&s, "web${1}");
    BLU_RAY.replace_all(&s, "bluray").into_owned()
}

/// Split a cleaned name into raw tokens, keeping original casing.
///
/// Extension, bracketed groups and the trailing group tag are removed first.
pub fn raw_tokens(name: &str) -> (Vec<String>, Option<String>) {
    let stem = strip_extension(name.trim());
    let unbracketed = strip_bracketed(stem);
    let (head, group) = split_group(&unbracketed);
    let collapsed = collapse_tags(head);

    let tokens = collapsed
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();

    (tokens, group.map(|g| g.to_string()))
}

/// Whether a lowercase token is a quality/encoding marker.
pub fn is_noise_token(token: &str) -> bool {
    NOISE_SET.contains(token) || RESOLUTION.is_match(token) || AUDIO_WITH_CHANNEL.is_match(token)
}

/// Normalized, noise-free lowercase tokens of a release name.
pub fn tokenize(name: &str) -> Vec<String> {
    let (tokens, _) = raw_tokens(name);
    tokens
        .into_iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().any(|c| c.is_alphanumeric()))
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|t| !is_noise_token(t))
        .collect()
}

/// Canonical title form: noise-free tokens joined by single spaces.
pub fn normalize_title(name: &str) -> String {
    tokenize(name).join(" ")
}

/// Canonical file name: lowercase, separators collapsed, extension kept.
pub fn normalize_file_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolution marker of a name, if any (`"1080p"`, `"2160p"`, ...).
pub fn detect_resolution(name: &str) -> Option<String> {
    let (tokens, _) = raw_tokens(name);
    tokens.iter().find_map(|t| {
        let lower = t.to_lowercase();
        if RESOLUTION.is_match(&lower) {
            Some(lower)
        } else if lower == "4k" || lower == "uhd" {
            Some("2160p".to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scene_name() {
        assert_eq!(
            normalize_title("Show.Name.S01E01.1080p.WEB-DL.DDP5.1.H.264-GROUP"),
            "show name s01e01"
        );
    }

    #[test]
    fn test_normalize_spaced_name_matches_dotted() {
        assert_eq!(
            normalize_title("Show Name S01E01 1080p GROUP"),
            "show name s01e01 group"
        );
        assert_eq!(
            normalize_title("Show.Name.S01E01.1080p-GROUP"),
            "show name s01e01"
        );
    }

    #[test]
    fn test_normalize_strips_brackets_keeps_year() {
        assert_eq!(
            normalize_title("[SubGroup] Movie Title (2019) [1080p] {x265}.mkv"),
            "movie title 2019"
        );
        assert_eq!(normalize_title("Movie Title (Director's Cut) 2019"), "movie title 2019");
    }

    #[test]
    fn test_normalize_strips_extension() {
        assert_eq!(normalize_title("Movie.2010.720p.BluRay.x264.mkv"), "movie 2010");
        assert_eq!(strip_extension("Show.Name.S01E01"), "Show.Name.S01E01");
        assert_eq!(strip_extension("track.FLAC"), "track");
    }

    #[test]
    fn test_split_group_requires_release_shape() {
        assert_eq!(split_group("Movie.2010.1080p-GRP"), ("Movie.2010.1080p", Some("GRP")));
        assert_eq!(split_group("X-Men"), ("X-Men", None));
        assert_eq!(split_group("No Group Here"), ("No Group Here", None));
    }

    #[test]
    fn test_tokenize_collapses_multi_part_tags() {
        assert_eq!(
            tokenize("Film.2001.Blu-Ray.H.265.DD5.1-GRP"),
            vec!["film", "2001"]
        );
        assert_eq!(
            tokenize("Film.2001.1080p.BluRay.DTS-HD.MA.5.1.x264"),
            vec!["film", "2001"]
        );
    }

    #[test]
    fn test_is_noise_token() {
        assert!(is_noise_token("1080p"));
        assert!(is_noise_token("576i"));
        assert!(is_noise_token("x264"));
        assert!(is_noise_token("ddp5"));
        assert!(!is_noise_token("show"));
        assert!(!is_noise_token("s01e01"));
        assert!(!is_noise_token("2019"));
    }

    #[test]
    fn test_normalize_is_case_and_separator_insensitive() {
        let a = normalize_title("Some_Movie__2015");
        let b = normalize_title("some movie 2015");
        let c = normalize_title("SOME.MOVIE.2015");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name("Some_File  Name.MKV"), "some file name.mkv");
    }

    #[test]
    fn test_detect_resolution() {
        assert_eq!(detect_resolution("Show.S01E01.720p.HDTV"), Some("720p".to_string()));
        assert_eq!(detect_resolution("Movie 4K HDR"), Some("2160p".to_string()));
        assert_eq!(detect_resolution("Album FLAC"), None);
    }
}
