use serde::{Deserialize, Serialize};

/// Directory/parser-level guess at what kind of title a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaTypeHint {
    Movie,
    Series,
    Unknown,
}

impl MediaTypeHint {
    #[must_use]
    pub const fn contradicts(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Movie, Self::Series) | (Self::Series, Self::Movie)
        )
    }
}

/// Immutable value produced by `parser::filename::parse_filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFilename {
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    /// Set for `SxxEyy-Ezz`/`SxxEyyEzz` multi-episode files.
    pub episode_end: Option<i32>,
    pub type_hint: MediaTypeHint,
    pub resolution: Option<String>,
    pub source: Option<String>,
    pub video_codec: Option<String>,
    /// `CD1`/`Part 2`/`pt.A`-style stacked movie part marker was present.
    pub is_multi_part: bool,
}
