//! Composite candidate scoring (§4.3). Weighted across title similarity,
//! year proximity, and a duration-or-episode-envelope bucket, with a
//! series-specific demotion rule and an auto-validation trigger.

use crate::matcher::normalize::token_set_ratio;
use crate::models::{CandidateSnapshot, MediaTypeHint, ParsedFilename};

const TITLE_WEIGHT: f64 = 0.60;
const YEAR_WEIGHT: f64 = 0.25;
const DURATION_WEIGHT: f64 = 0.15;

const YEAR_MISSING_SCORE: f64 = 60.0;
const YEAR_MAX_DELTA: f64 = 3.0;

const DURATION_FULL_POINTS_PCT: f64 = 0.15;
const DURATION_ZERO_POINTS_PCT: f64 = 0.30;

const EPISODE_ENVELOPE_DEMOTION: f64 = 20.0;

pub const AUTO_VALIDATE_THRESHOLD: f64 = 85.0;
pub const AUTO_VALIDATE_MARGIN: f64 = 10.0;

/// Composite 0-100 score of `candidate` against a parsed filename, plus an
/// optional locally-probed duration (seconds) used for the duration bucket.
#[must_use]
pub fn score_candidate(
    parsed: &ParsedFilename,
    candidate: &CandidateSnapshot,
    local_duration_seconds: Option<f64>,
) -> f64 {
    let title_score = title_similarity(parsed, candidate);
    let year_score = year_proximity(parsed.year, candidate.year);
    let tail_score = match parsed.type_hint {
        MediaTypeHint::Series => episode_envelope_score(parsed, candidate),
        _ => duration_proximity(local_duration_seconds, candidate.duration_seconds),
    };

    let mut total = title_score.mul_add(
        TITLE_WEIGHT,
        year_score.mul_add(YEAR_WEIGHT, tail_score * DURATION_WEIGHT),
    );

    if matches!(parsed.type_hint, MediaTypeHint::Series) {
        if let (Some(episode), Some(max_episode)) = (parsed.episode, candidate.max_episode_count) {
            if episode > max_episode {
                total -= EPISODE_ENVELOPE_DEMOTION;
            }
        }
    }

    total.clamp(0.0, 100.0)
}

fn title_similarity(parsed: &ParsedFilename, candidate: &CandidateSnapshot) -> f64 {
    let against_title = token_set_ratio(&parsed.title, &candidate.title);
    let against_original = candidate
        .original_title
        .as_deref()
        .map_or(0.0, |ot| token_set_ratio(&parsed.title, ot));
    against_title.max(against_original)
}

fn year_proximity(parsed_year: Option<i32>, candidate_year: Option<i32>) -> f64 {
    match (parsed_year, candidate_year) {
        (Some(p), Some(c)) => {
            let delta = (p - c).abs() as f64;
            if delta >= YEAR_MAX_DELTA {
                0.0
            } else {
                100.0 * (1.0 - delta / YEAR_MAX_DELTA)
            }
        }
        _ => YEAR_MISSING_SCORE,
    }
}

fn duration_proximity(local_seconds: Option<f64>, candidate_seconds: Option<f64>) -> f64 {
    match (local_seconds, candidate_seconds) {
        (Some(local), Some(cand)) if cand > 0.0 => {
            let pct_diff = (local - cand).abs() / cand;
            if pct_diff <= DURATION_FULL_POINTS_PCT {
                100.0
            } else if pct_diff >= DURATION_ZERO_POINTS_PCT {
                0.0
            } else {
                let span = DURATION_ZERO_POINTS_PCT - DURATION_FULL_POINTS_PCT;
                100.0 * (1.0 - (pct_diff - DURATION_FULL_POINTS_PCT) / span)
            }
        }
        _ => YEAR_MISSING_SCORE,
    }
}

/// Does the candidate's declared episode-count envelope include the parsed
/// episode number? Full points if so, otherwise the missing-data score —
/// series candidates are never filtered by exact episode-count equality
/// (§4.3), only demoted after scoring via `EPISODE_ENVELOPE_DEMOTION`.
fn episode_envelope_score(parsed: &ParsedFilename, candidate: &CandidateSnapshot) -> f64 {
    match (parsed.episode, candidate.max_episode_count) {
        (Some(episode), Some(max_episode)) => {
            if episode <= max_episode {
                100.0
            } else {
                60.0
            }
        }
        _ => YEAR_MISSING_SCORE,
    }
}

/// Sorts `candidates` by descending score, applies the tie-breaking order
/// (explicit year match, then higher vote count, then external id
/// lexicographic order as a final stable proxy), and truncates to `top_n`.
#[must_use]
pub fn rank_candidates(
    parsed: &ParsedFilename,
    mut candidates: Vec<(CandidateSnapshot, f64)>,
    top_n: usize,
) -> Vec<(CandidateSnapshot, f64)> {
    candidates.sort_by(|(ca, sa), (cb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let ya = ca.year == parsed.year;
                let yb = cb.year == parsed.year;
                yb.cmp(&ya)
            })
            .then_with(|| cb.vote_count.cmp(&ca.vote_count))
            .then_with(|| ca.external_id.cmp(&cb.external_id))
    });
    candidates.truncate(top_n);
    candidates
}

/// A PendingValidation is auto-validated iff either there's exactly one
/// candidate at or above the threshold, or the top candidate clears the
/// threshold by at least `AUTO_VALIDATE_MARGIN` over the runner-up (§4.3).
#[must_use]
pub fn should_auto_validate(ranked_scores: &[f64]) -> bool {
    match ranked_scores {
        [] => false,
        [only] => *only >= AUTO_VALIDATE_THRESHOLD,
        [top, runner_up, ..] => {
            *top >= AUTO_VALIDATE_THRESHOLD && (top - runner_up) >= AUTO_VALIDATE_MARGIN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogSource;

    fn candidate(title: &str, year: Option<i32>) -> CandidateSnapshot {
        CandidateSnapshot {
            source: CatalogSource::Tmdb,
            external_id: "1".to_string(),
            title: title.to_string(),
            original_title: None,
            year,
            score: 0.0,
            poster_url: None,
            overview: None,
            cast_summary: None,
            duration_seconds: Some(7200.0),
            max_episode_count: None,
            vote_count: 0,
        }
    }

    fn parsed_movie(title: &str, year: Option<i32>) -> ParsedFilename {
        ParsedFilename {
            title: title.to_string(),
            year,
            season: None,
            episode: None,
            episode_end: None,
            type_hint: MediaTypeHint::Movie,
            resolution: None,
            source: None,
            video_codec: None,
            is_multi_part: false,
        }
    }

    #[test]
    fn exact_title_and_year_scores_near_100() {
        let parsed = parsed_movie("Inception", Some(2010));
        let cand = candidate("Inception", Some(2010));
        let score = score_candidate(&parsed, &cand, Some(7200.0));
        assert!(score > 95.0, "expected near 100, got {score}");
    }

    #[test]
    fn year_mismatch_beyond_3_years_scores_zero_on_year_bucket() {
        assert_eq!(year_proximity(Some(2010), Some(2020)), 0.0);
    }

    #[test]
    fn episode_beyond_envelope_demotes_score() {
        let mut parsed = parsed_movie("Some Show", None);
        parsed.type_hint = MediaTypeHint::Series;
        parsed.episode = Some(30);
        let mut cand = candidate("Some Show", None);
        cand.max_episode_count = Some(12);
        let score = score_candidate(&parsed, &cand, None);
        let mut cand_ok = candidate("Some Show", None);
        cand_ok.max_episode_count = Some(40);
        let score_ok = score_candidate(&parsed, &cand_ok, None);
        assert!(score < score_ok - 15.0);
    }

    #[test]
    fn rank_candidates_breaks_ties_by_vote_count_before_external_id() {
        let parsed = parsed_movie("Inception", Some(2010));
        let mut low_votes = candidate("Inception", Some(2010));
        low_votes.external_id = "2".to_string();
        low_votes.vote_count = 10;
        let mut high_votes = candidate("Inception", Some(2010));
        high_votes.external_id = "1".to_string();
        high_votes.vote_count = 500;

        let ranked = rank_candidates(&parsed, vec![(low_votes, 80.0), (high_votes, 80.0)], 2);
        assert_eq!(ranked[0].0.vote_count, 500);
    }

    #[test]
    fn should_auto_validate_single_high_score() {
        assert!(should_auto_validate(&[90.0]));
        assert!(!should_auto_validate(&[80.0]));
    }

    #[test]
    fn should_auto_validate_requires_margin_with_multiple_candidates() {
        assert!(should_auto_validate(&[90.0, 70.0]));
        assert!(!should_auto_validate(&[90.0, 85.0]));
    }
}
