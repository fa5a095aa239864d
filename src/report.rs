//! Compare results and their plain-text rendering

use chrono::{DateTime, Utc};
use crossterm::style::Stylize;
use serde::Serialize;

use crate::answer::{MergedAnswer, RawAnswer};
use crate::scoring::{bar_segments, AgreementScore, ScoringStrategy};

/// Width of the agreement bar in plain output
const PLAIN_BAR_WIDTH: u16 = 40;

/// Everything produced for one question
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub asked_at: DateTime<Utc>,
    pub question: String,
    pub answers: Vec<RawAnswer>,
    pub merged: MergedAnswer,
    pub score: AgreementScore,
    pub strategy: ScoringStrategy,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Score label, e.g. `Similarity: 66%` or `Similarity: unknown`
    pub fn score_label(&self) -> String {
        if self.score.is_available() {
            format!("Similarity: {}%", self.score.value)
        } else {
            "Similarity: unknown".to_string()
        }
    }
}

/// Render the four answer blocks and the agreement bar.
pub fn render_plain(report: &Report, color: bool, show_bar: bool) -> String {
    let mut out = String::new();

    for answer in &report.answers {
        out.push_str(&heading(&format!("{} Response", answer.source), color));
        out.push_str(&answer.display_text());
        out.push_str("\n\n");
    }

    out.push_str(&heading("Final Best Answer", color));
    out.push_str(&report.merged.display_text());
    out.push_str("\n\n");

    if show_bar {
        out.push_str(&plain_bar(report.score.value, color));
        out.push('\n');
    }
    out.push_str(&report.score_label());
    out.push('\n');

    out
}

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}\n", format!("== {} ==", title).bold().cyan())
    } else {
        format!("== {} ==\n", title)
    }
}

fn plain_bar(value: u8, color: bool) -> String {
    let (agree, disagree) = bar_segments(value, PLAIN_BAR_WIDTH);
    if color {
        format!(
            "{}{}",
            "█".repeat(agree as usize).green(),
            "█".repeat(disagree as usize).red()
        )
    } else {
        format!(
            "[{}{}]",
            "#".repeat(agree as usize),
            "-".repeat(disagree as usize)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::llm::Source;
    use crate::scoring::ScoreBasis;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn report(score: AgreementScore) -> Report {
        Report {
            asked_at: Utc::now(),
            question: "What is the capital of France?".to_string(),
            answers: vec![
                RawAnswer::new(Source::Gemini, Ok("Paris".into()), Duration::ZERO),
                RawAnswer::new(
                    Source::Cypher,
                    Err(ProviderError::RateLimited("slow down".into())),
                    Duration::ZERO,
                ),
                RawAnswer::new(Source::DeepSeek, Ok("Paris".into()), Duration::ZERO),
            ],
            merged: MergedAnswer {
                synthesizer: Source::Gemini,
                outcome: Ok("**Paris**".to_string()),
            },
            score,
            strategy: ScoringStrategy::Exact,
        }
    }

    #[test]
    fn test_render_plain_without_color() {
        let score = AgreementScore {
            value: 66,
            basis: ScoreBasis::ExactMatch {
                pairs: 1,
                agreeing: 2,
            },
        };
        let text = render_plain(&report(score), false, true);

        assert!(text.starts_with("== Gemini Response ==\nParis\n\n"));
        assert!(text.contains("== Cypher Response ==\n[Cypher Error] rate limited: slow down\n"));
        assert!(text.contains("== Final Best Answer ==\n**Paris**\n"));
        assert!(text.contains(&format!("[{}{}]", "#".repeat(26), "-".repeat(14))));
        assert!(text.ends_with("Similarity: 66%\n"));
    }

    #[test]
    fn test_unavailable_score_label() {
        let text = render_plain(&report(AgreementScore::unavailable()), false, false);

        assert!(!text.contains('#'));
        assert!(text.ends_with("Similarity: unknown\n"));
    }

    #[test]
    fn test_json_report() {
        let score = AgreementScore {
            value: 42,
            basis: ScoreBasis::Reported,
        };
        let json: serde_json::Value =
            serde_json::from_str(&report(score).to_json().unwrap()).unwrap();

        assert_eq!(json["question"], "What is the capital of France?");
        assert_eq!(json["answers"].as_array().unwrap().len(), 3);
        assert_eq!(json["answers"][1]["error"], "rate limited: slow down");
        assert_eq!(json["merged"]["text"], "**Paris**");
        assert_eq!(json["score"]["value"], 42);
        assert_eq!(json["score"]["basis"]["kind"], "reported");
        assert_eq!(json["strategy"], "exact");
    }
}
