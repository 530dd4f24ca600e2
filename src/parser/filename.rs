use crate::models::parsed_filename::{MediaTypeHint, ParsedFilename};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Parses a bare filename (no directory component) into a `ParsedFilename`.
///
/// Tries series-shaped patterns first (anything carrying `SxxEyy`), then
/// movie-shaped patterns (title plus a four-digit year), then falls back to
/// a title-only guess tagged `Unknown`.
#[must_use]
pub fn parse_filename(filename: &str) -> ParsedFilename {
    let stem = strip_extension(filename);

    parse_series_multi_episode(stem)
        .or_else(|| parse_series_sxxexx(stem))
        .or_else(|| parse_movie_year(stem))
        .unwrap_or_else(|| parse_unknown(stem))
}

fn strip_extension(filename: &str) -> &str {
    filename.rsplit_once('.').map_or(filename, |(name, _)| name)
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("invalid regex pattern defined in code"))
}

/// `Series.Title.S01E01-E03.Rest` or `Series.Title.S01E01E02.Rest`: an
/// explicit episode range, emitted as `episode`/`episode_end`.
fn parse_series_multi_episode(stem: &str) -> Option<ParsedFilename> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<title>.+?)[.\s_-]+S(?P<season>\d{1,2})E(?P<ep1>\d{1,3})(?:-?E(?P<ep2>\d{1,3}))(?P<rest>.*)$",
    );
    let caps = re.captures(stem)?;
    let title_raw = caps.name("title")?.as_str();
    let season = caps.name("season").and_then(|m| m.as_str().parse().ok());
    let episode: Option<i32> = caps.name("ep1").and_then(|m| m.as_str().parse().ok());
    let episode_end: Option<i32> = caps.name("ep2").and_then(|m| m.as_str().parse().ok());
    let rest = caps.name("rest").map_or("", |m| m.as_str());
    let year = extract_year(title_raw).or_else(|| extract_year(rest));

    Some(ParsedFilename {
        title: clean_title(title_raw),
        year,
        season,
        episode,
        episode_end,
        type_hint: MediaTypeHint::Series,
        resolution: extract_resolution(rest).or_else(|| extract_resolution(stem)),
        source: extract_source(rest).or_else(|| extract_source(stem)),
        video_codec: extract_video_codec(rest).or_else(|| extract_video_codec(stem)),
        is_multi_part: false,
    })
}

/// `Series.Title.S01E01.Episode.Title.Rest`, `Series Title - S01E01 - Episode Title`,
/// and plex-style `Series Title (Year) - S01E01 - Episode Title [tags]`.
fn parse_series_sxxexx(stem: &str) -> Option<ParsedFilename> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<title>.+?)[.\s_-]+S(?P<season>\d{1,2})E(?P<episode>\d{1,3})(?P<rest>.*)$",
    );
    let caps = re.captures(stem)?;
    let title_raw = caps.name("title")?.as_str();
    let season = caps.name("season").and_then(|m| m.as_str().parse().ok());
    let episode = caps.name("episode").and_then(|m| m.as_str().parse().ok());
    let rest = caps.name("rest").map_or("", |m| m.as_str());
    let year = extract_year(title_raw).or_else(|| extract_year(rest));

    Some(ParsedFilename {
        title: clean_title(&strip_trailing_year(title_raw)),
        year,
        season,
        episode,
        episode_end: None,
        type_hint: MediaTypeHint::Series,
        resolution: extract_resolution(rest).or_else(|| extract_resolution(stem)),
        source: extract_source(rest).or_else(|| extract_source(stem)),
        video_codec: extract_video_codec(rest).or_else(|| extract_video_codec(stem)),
        is_multi_part: false,
    })
}

/// `Title.Year.Resolution.Source.Codec-GROUP` or `Title (Year) [tags]`: the
/// classic scene-release movie naming convention. Also recognizes stacked
/// parts (`CD1`, `Part 1`, `pt.A`) and flags them without merging.
fn parse_movie_year(stem: &str) -> Option<ParsedFilename> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?P<title>.+?)[.\s_(]+(?P<year>19\d{2}|20\d{2})\)?(?P<rest>.*)$",
    );
    let caps = re.captures(stem)?;
    let title_raw = caps.name("title")?.as_str();
    let year = caps.name("year").and_then(|m| m.as_str().parse().ok());
    let rest = caps.name("rest").map_or("", |m| m.as_str());

    Some(ParsedFilename {
        title: clean_title(title_raw),
        year,
        season: None,
        episode: None,
        episode_end: None,
        type_hint: MediaTypeHint::Movie,
        resolution: extract_resolution(rest).or_else(|| extract_resolution(stem)),
        source: extract_source(rest).or_else(|| extract_source(stem)),
        video_codec: extract_video_codec(rest).or_else(|| extract_video_codec(stem)),
        is_multi_part: detect_stacked_part(stem).is_some(),
    })
}

/// No year and no season/episode marker found: return a title-only guess.
/// `Unknown` never triggers the scanner's `corrected_location` flag.
fn parse_unknown(stem: &str) -> ParsedFilename {
    ParsedFilename {
        title: clean_title(stem),
        year: None,
        season: None,
        episode: None,
        episode_end: None,
        type_hint: MediaTypeHint::Unknown,
        resolution: extract_resolution(stem),
        source: extract_source(stem),
        video_codec: extract_video_codec(stem),
        is_multi_part: detect_stacked_part(stem).is_some(),
    }
}

fn detect_stacked_part(stem: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(?:CD\s?\d|Part\s?\d|pt\.?\s?[A-D])\b");
    re.find(stem).map(|m| m.as_str().to_string())
}

fn extract_year(s: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\b(19\d{2}|20\d{2})\b");
    re.find(s).and_then(|m| m.as_str().parse().ok())
}

fn strip_trailing_year(title: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\s*\(?(19\d{2}|20\d{2})\)?\s*$");
    re.replace(title, "").trim().to_string()
}

fn extract_resolution(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)(2160p|4K|1080p|720p|480p|576p)");
    re.find(s).map(|m| {
        let res = m.as_str();
        if res.eq_ignore_ascii_case("4K") || res.eq_ignore_ascii_case("2160p") {
            "4K".to_string()
        } else {
            res.to_lowercase()
        }
    })
}

fn extract_source(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)(BD|Blu-?Ray|REMUX|WEB-?(?:Rip|DL)?|HDTV|DVDRip|BDRip|WEBRip|AMZN|NF|HMAX)",
    );
    re.find(s).map(|m| {
        let src = m.as_str();
        if src.eq_ignore_ascii_case("BluRay") || src.eq_ignore_ascii_case("Blu-Ray") {
            "BD".to_string()
        } else if src.eq_ignore_ascii_case("WEBRip") || src.eq_ignore_ascii_case("WEB-Rip") {
            "WEBRIP".to_string()
        } else if src.eq_ignore_ascii_case("WEBDL")
            || src.eq_ignore_ascii_case("WEB-DL")
            || src.eq_ignore_ascii_case("WEB")
        {
            "WEB".to_string()
        } else {
            src.to_uppercase()
        }
    })
}

/// Normalizes a filename-embedded codec token (`x264`/`h264`/`AVC`/`HEVC`/…)
/// to the same label used by `parser::media`'s codec normalization.
fn extract_video_codec(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)(x265|x264|HEVC|AVC|H\.?264|H\.?265|AV1)");
    re.find(s).map(|m| crate::parser::media::normalize_video_codec(m.as_str()))
}

#[must_use]
pub fn clean_title(title: &str) -> String {
    let title = title.trim().trim_end_matches(['-', '_', '.']).trim();
    let mut result = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for c in title.chars() {
        let is_sep = c.is_whitespace() || c == '_' || c == '.';
        if is_sep {
            if !last_was_sep {
                result.push(' ');
                last_was_sep = true;
            }
        } else {
            result.push(c);
            last_was_sep = false;
        }
    }
    if result.ends_with(' ') {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_scene_release() {
        let r = parse_filename("The.Matrix.1999.1080p.x264.mkv");
        assert_eq!(r.title, "The Matrix");
        assert_eq!(r.year, Some(1999));
        assert_eq!(r.type_hint, MediaTypeHint::Movie);
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.video_codec.as_deref(), Some("x264"));
    }

    #[test]
    fn movie_parenthesized_year() {
        let r = parse_filename("Dune (2021).mkv");
        assert_eq!(r.title, "Dune");
        assert_eq!(r.year, Some(2021));
        assert_eq!(r.type_hint, MediaTypeHint::Movie);
    }

    #[test]
    fn series_dot_separated() {
        let r = parse_filename("Lost.S01E01.1080p.WEB.x265.mkv");
        assert_eq!(r.title, "Lost");
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episode, Some(1));
        assert_eq!(r.type_hint, MediaTypeHint::Series);
        assert_eq!(r.video_codec.as_deref(), Some("x265"));
    }

    #[test]
    fn series_plex_format() {
        let r = parse_filename(
            "The Apothecary Diaries (2023) - S01E01 - Maomao [Bluray-1080p][x265].mkv",
        );
        assert_eq!(r.title, "The Apothecary Diaries");
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episode, Some(1));
        assert_eq!(r.resolution.as_deref(), Some("1080p"));
        assert_eq!(r.source.as_deref(), Some("BD"));
    }

    #[test]
    fn series_multi_episode_range() {
        let r = parse_filename("Chernobyl.S01E01-E02.1080p.mkv");
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episode, Some(1));
        assert_eq!(r.episode_end, Some(2));
        assert_eq!(r.type_hint, MediaTypeHint::Series);
    }

    #[test]
    fn unknown_when_no_markers() {
        let r = parse_filename("random_home_video.mkv");
        assert_eq!(r.type_hint, MediaTypeHint::Unknown);
        assert_eq!(r.year, None);
    }

    #[test]
    fn stacked_movie_part_flagged() {
        let r = parse_filename("Gone.With.The.Wind.1939.CD1.1080p.mkv");
        assert!(r.is_multi_part);
        assert_eq!(r.type_hint, MediaTypeHint::Movie);
    }

    #[test]
    fn clean_title_collapses_separators() {
        assert_eq!(clean_title("The___Matrix.."), "The Matrix");
    }

    #[test]
    fn extract_source_normalizes_bluray() {
        assert_eq!(extract_source("BluRay"), Some("BD".to_string()));
        assert_eq!(extract_source("WEB-DL"), Some("WEB".to_string()));
    }
}
