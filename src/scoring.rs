//! Agreement scoring between the raw answers
//!
//! Two strategies exist and exactly one is used per run:
//!
//! | Strategy | Input | Values |
//! |----------|-------|--------|
//! | [`ScoringStrategy::Exact`] | raw answers | 0, 66, 100 for three answers (no 33, see below) |
//! | [`ScoringStrategy::Percentage`] | merged answer | 0..=100, or unavailable |
//!
//! Exact scores are the share of answers equal to at least one other
//! answer, not the share of equal pairs. Equality is transitive, so three
//! answers have 0, 1 or 3 equal pairs and never 2. A pair-count map
//! (0, 33, 66, 100) would give 33 when two of three answers agree; this
//! gives 66, and the values for three answers are only 0, 66 and 100.
//! The pair count is still reported in [`ScoreBasis::ExactMatch`].
//!
//! The exact strategy is deterministic but coarse: free-text answers are
//! rarely identical, so it mostly reports 0. The percentage strategy only
//! works if the synthesizer obeys the `Similarity Level: N%` line format.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;

use crate::answer::{MergedAnswer, RawAnswer};

static SIMILARITY_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)similarity\s+level\s*:\s*(\d{1,9})\s*%").expect("valid regex")
});

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    /// Compare the raw answers for case-insensitive exact equality
    #[default]
    Exact,
    /// Read the `Similarity Level: N%` line the synthesizer was asked to emit
    Percentage,
}

/// How an [`AgreementScore`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreBasis {
    /// `pairs` equal pairs, `agreeing` answers equal to at least one other
    ExactMatch { pairs: u8, agreeing: u8 },
    Reported,
    /// No usable percentage; the value is 0 but carries no meaning
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgreementScore {
    pub value: u8,
    pub basis: ScoreBasis,
}

impl AgreementScore {
    pub fn unavailable() -> Self {
        Self {
            value: 0,
            basis: ScoreBasis::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        self.basis != ScoreBasis::Unavailable
    }
}

/// Score with the configured strategy.
pub fn score(
    strategy: ScoringStrategy,
    answers: &[RawAnswer],
    merged: &MergedAnswer,
) -> AgreementScore {
    match strategy {
        ScoringStrategy::Exact => exact_match_score(answers),
        ScoringStrategy::Percentage => {
            let reported = merged.text().and_then(parse_similarity_level);
            match reported {
                Some(value) => AgreementScore {
                    value,
                    basis: ScoreBasis::Reported,
                },
                None => {
                    warn!("No valid similarity level in merged answer");
                    AgreementScore::unavailable()
                }
            }
        }
    }
}

fn normalized(answers: &[RawAnswer]) -> Vec<Option<String>> {
    answers
        .iter()
        .map(|a| a.text().map(|t| t.trim().to_lowercase()))
        .collect()
}

/// Count equal pairs among the answers after trimming and lowercasing.
///
/// A failed answer never equals anything, including another failure.
pub fn count_matches(answers: &[RawAnswer]) -> usize {
    let normalized = normalized(answers);

    let mut matches = 0;
    for (i, left) in normalized.iter().enumerate() {
        for right in &normalized[i + 1..] {
            if let (Some(l), Some(r)) = (left, right) {
                if l == r {
                    matches += 1;
                }
            }
        }
    }
    matches
}

/// Number of answers equal to at least one other answer.
pub fn count_agreeing(answers: &[RawAnswer]) -> usize {
    let normalized = normalized(answers);

    (0..normalized.len())
        .filter(|&i| match &normalized[i] {
            Some(text) => normalized
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.as_ref() == Some(text)),
            None => false,
        })
        .count()
}

/// Share of answers backed by at least one identical answer.
///
/// With three answers: none equal -> 0, two equal -> 66, all equal -> 100.
pub fn exact_match_score(answers: &[RawAnswer]) -> AgreementScore {
    let pairs = count_matches(answers);
    let agreeing = count_agreeing(answers);
    let value = if answers.is_empty() {
        0
    } else {
        agreeing * 100 / answers.len()
    };

    AgreementScore {
        value: value as u8,
        basis: ScoreBasis::ExactMatch {
            pairs: pairs as u8,
            agreeing: agreeing as u8,
        },
    }
}

/// Extract `N` from the first `Similarity Level: N%` in `text`.
///
/// Values above 100 are rejected, not clamped.
pub fn parse_similarity_level(text: &str) -> Option<u8> {
    let captures = SIMILARITY_LEVEL.captures(text)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    if value > 100 {
        warn!(value, "Similarity level out of range");
        return None;
    }
    Some(value as u8)
}

/// Split `width` cells into (agreeing, disagreeing) segments for `value`%.
pub fn bar_segments(value: u8, width: u16) -> (u16, u16) {
    let value = u32::from(value.min(100));
    let green = (u32::from(width) * value / 100) as u16;
    (green, width - green)
}
