//! Answer panel - asks every provider and merges the replies

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::answer::{MergedAnswer, Question, RawAnswer};
use crate::config::Config;
use crate::error::ProviderError;
use crate::llm::provider::{create_provider, DisabledProvider, LlmProvider, Source};
use crate::report::Report;
use crate::scoring::{self, ScoringStrategy};

/// The three providers plus the one that writes the merged answer
pub struct Panel {
    providers: Vec<Arc<dyn LlmProvider>>,
    synthesizer: Source,
    strategy: ScoringStrategy,
    timeout: Duration,
}

impl Panel {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::new();

        let providers = Source::ALL
            .into_iter()
            .map(|source| -> Arc<dyn LlmProvider> {
                match config.provider(source) {
                    Some(provider_config) => {
                        let api_key = config.resolve_api_key(source);
                        if api_key.is_none() && provider_config.enabled {
                            debug!(%source, "No API key resolved");
                        }
                        Arc::from(create_provider(
                            source,
                            client.clone(),
                            provider_config.clone(),
                            api_key,
                        ))
                    }
                    None => {
                        warn!(%source, "Provider missing from config, treating as disabled");
                        Arc::new(DisabledProvider::new(source))
                    }
                }
            })
            .collect();

        Self::with_providers(
            providers,
            config.panel.synthesizer,
            config.panel.strategy,
            config.panel.request_timeout(),
        )
    }

    /// Build a panel from ready-made providers, one per source.
    pub fn with_providers(
        providers: Vec<Arc<dyn LlmProvider>>,
        synthesizer: Source,
        strategy: ScoringStrategy,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            synthesizer,
            strategy,
            timeout,
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.strategy
    }

    /// Ask, merge and score one question.
    pub async fn run(&self, question: &Question) -> Report {
        let asked_at = Utc::now();

        let answers = self.gather(question).await;
        let merged = self.synthesize(question, &answers).await;
        let score = scoring::score(self.strategy, &answers, &merged);
        info!(score = score.value, basis = ?score.basis, "Agreement scored");

        Report {
            asked_at,
            question: question.as_str().to_string(),
            answers,
            merged,
            score,
            strategy: self.strategy,
        }
    }

    /// Query all providers concurrently, one answer per source in
    /// [`Source::ALL`] order.
    pub async fn gather(&self, question: &Question) -> Vec<RawAnswer> {
        info!(providers = self.providers.len(), "Asking panel");

        let mut join_set = JoinSet::new();
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let prompt = question.as_str().to_string();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let source = provider.source();
                let started = Instant::now();
                let outcome = ask_with_timeout(provider.as_ref(), &prompt, timeout).await;
                RawAnswer::new(source, outcome, started.elapsed())
            });
        }

        let mut answers = Vec::with_capacity(self.providers.len());
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(answer) => {
                    match &answer.outcome {
                        Ok(_) => info!(source = %answer.source, elapsed = ?answer.elapsed, "Answer received"),
                        Err(e) => warn!(source = %answer.source, error = %e, "Provider failed"),
                    }
                    answers.push(answer);
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        // A panicked task leaves no answer behind; keep every source present.
        for provider in &self.providers {
            let source = provider.source();
            if !answers.iter().any(|a| a.source == source) {
                answers.push(RawAnswer::new(
                    source,
                    Err(ProviderError::Aborted("provider task did not complete".to_string())),
                    Duration::ZERO,
                ));
            }
        }

        answers.sort_by_key(|a| source_rank(a.source));
        answers
    }

    /// Ask the synthesizer to merge the answers.
    pub async fn synthesize(&self, question: &Question, answers: &[RawAnswer]) -> MergedAnswer {
        let prompt = synthesis_prompt(question, answers, self.strategy);

        let outcome = match self
            .providers
            .iter()
            .find(|p| p.source() == self.synthesizer)
        {
            Some(provider) => {
                info!(synthesizer = %self.synthesizer, "Synthesizing final answer");
                ask_with_timeout(provider.as_ref(), &prompt, self.timeout).await
            }
            None => Err(ProviderError::Disabled),
        };

        if let Err(e) = &outcome {
            warn!(synthesizer = %self.synthesizer, error = %e, "Synthesis failed");
        }

        MergedAnswer {
            synthesizer: self.synthesizer,
            outcome,
        }
    }
}

async fn ask_with_timeout(
    provider: &dyn LlmProvider,
    prompt: &str,
    timeout: Duration,
) -> Result<String, ProviderError> {
    match tokio::time::timeout(timeout, provider.ask(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    }
}

fn source_rank(source: Source) -> usize {
    Source::ALL
        .iter()
        .position(|s| *s == source)
        .unwrap_or(Source::ALL.len())
}

/// Build the prompt that asks one model to merge the three answers.
///
/// Failed answers are embedded in their `[<Source> Error]` form so the
/// synthesizer can see which source had nothing to contribute.
pub fn synthesis_prompt(
    question: &Question,
    answers: &[RawAnswer],
    strategy: ScoringStrategy,
) -> String {
    let answer_blocks = answers
        .iter()
        .map(|a| format!("{}'s Answer:\n{}\n", a.source, a.display_text()))
        .collect::<Vec<_>>()
        .join("\n");

    let closing = match strategy {
        ScoringStrategy::Exact => "Only output the final answer without similarity score.",
        ScoringStrategy::Percentage => {
            "After the final answer, add one last line in exactly this format:\n\
            Similarity Level: <N>%\n\
            where <N> is an integer from 0 to 100 estimating how much the answers agree."
        }
    };

    format!(
        "You are an intelligent AI that compares answers from three different AI models \
        to the same question.\n\n\
        Question: {}\n\n\
        {}\n\
        Instructions:\n\
        - Find the statements or meanings that are semantically similar in at least two answers.\n\
        - Based on those overlapping ideas, generate a final reliable answer.\n\
        - Highlight the common parts using **markdown bold** (`**like this**`).\n\
        {}",
        question.as_str(),
        answer_blocks,
        closing
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreBasis;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that replays a fixed reply and records its prompts
    struct Scripted {
        source: Source,
        reply: Result<String, ProviderError>,
        synthesis_reply: Option<String>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(source: Source, reply: &str) -> Self {
            Self {
                source,
                reply: Ok(reply.to_string()),
                synthesis_reply: None,
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(source: Source, error: ProviderError) -> Self {
            Self {
                reply: Err(error),
                ..Self::ok(source, "")
            }
        }

        fn synthesizing(mut self, merged: &str) -> Self {
            self.synthesis_reply = Some(merged.to_string());
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for Scripted {
        async fn ask(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.synthesis_reply {
                Some(merged) if prompt.contains("Instructions:") => Ok(merged.clone()),
                _ => self.reply.clone(),
            }
        }

        fn source(&self) -> Source {
            self.source
        }
    }

    fn panel(providers: Vec<Arc<Scripted>>, strategy: ScoringStrategy) -> Panel {
        Panel::with_providers(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn LlmProvider>)
                .collect(),
            Source::Gemini,
            strategy,
            Duration::from_secs(5),
        )
    }

    fn question() -> Question {
        Question::new("What is the capital of France?").unwrap()
    }

    #[tokio::test]
    async fn test_unanimous_answers() {
        let gemini = Arc::new(
            Scripted::ok(Source::Gemini, "Paris").synthesizing("The capital is **Paris**."),
        );
        let cypher = Arc::new(Scripted::ok(Source::Cypher, "Paris"));
        let deepseek = Arc::new(Scripted::ok(Source::DeepSeek, "Paris"));

        let report = panel(
            vec![gemini.clone(), cypher.clone(), deepseek.clone()],
            ScoringStrategy::Exact,
        )
        .run(&question())
        .await;

        assert_eq!(report.score.value, 100);
        assert!(report.merged.text().unwrap().contains("Paris"));
        assert_eq!(report.question, "What is the capital of France?");

        // Three answers plus one synthesis call on the synthesizer
        assert_eq!(gemini.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cypher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(deepseek.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_answers_keep_source_order() {
        let slow_gemini = Arc::new(
            Scripted::ok(Source::Gemini, "Paris").slow(Duration::from_millis(50)),
        );
        let providers = vec![
            Arc::new(Scripted::ok(Source::DeepSeek, "Paris")),
            slow_gemini,
            Arc::new(Scripted::ok(Source::Cypher, "Paris")),
        ];

        let answers = panel(providers, ScoringStrategy::Exact)
            .gather(&question())
            .await;

        let order: Vec<Source> = answers.iter().map(|a| a.source).collect();
        assert_eq!(order, Source::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_one_failure_still_synthesizes() {
        let gemini = Arc::new(Scripted::ok(Source::Gemini, "Paris").synthesizing("**Paris**"));
        let cypher = Arc::new(Scripted::failing(
            Source::Cypher,
            ProviderError::Network("connection reset".to_string()),
        ));
        let deepseek = Arc::new(Scripted::ok(Source::DeepSeek, "Paris"));

        let report = panel(
            vec![gemini.clone(), cypher, deepseek],
            ScoringStrategy::Exact,
        )
        .run(&question())
        .await;

        assert!(report.answers[1].display_text().starts_with("[Cypher Error]"));
        assert_eq!(report.merged.text(), Some("**Paris**"));
        assert_eq!(
            report.score.basis,
            ScoreBasis::ExactMatch {
                pairs: 1,
                agreeing: 2
            }
        );

        let prompts = gemini.prompts.lock().unwrap();
        let synthesis = prompts.last().unwrap();
        assert!(synthesis.contains("Gemini's Answer:\nParis"));
        assert!(synthesis.contains("Cypher's Answer:\n[Cypher Error] network error: connection reset"));
        assert!(synthesis.contains("DeepSeek's Answer:\nParis"));
    }

    #[tokio::test]
    async fn test_synthesizer_failure_becomes_merged_error() {
        let gemini = Arc::new(Scripted::failing(Source::Gemini, ProviderError::MissingApiKey));
        let providers = vec![
            gemini,
            Arc::new(Scripted::ok(Source::Cypher, "Paris")),
            Arc::new(Scripted::ok(Source::DeepSeek, "Paris")),
        ];

        let report = panel(providers, ScoringStrategy::Exact)
            .run(&question())
            .await;

        assert_eq!(report.merged.outcome, Err(ProviderError::MissingApiKey));
        assert!(report.merged.display_text().starts_with("[Final Answer Error]"));
        assert_eq!(report.score.value, 66);
    }

    #[tokio::test]
    async fn test_timeout_yields_timeout_error() {
        let providers: Vec<Arc<dyn LlmProvider>> = vec![
            Arc::new(Scripted::ok(Source::Gemini, "Paris")),
            Arc::new(Scripted::ok(Source::Cypher, "Paris").slow(Duration::from_secs(30))),
            Arc::new(Scripted::ok(Source::DeepSeek, "Paris")),
        ];
        let panel = Panel::with_providers(
            providers,
            Source::Gemini,
            ScoringStrategy::Exact,
            Duration::from_millis(100),
        );

        let answers = panel.gather(&question()).await;
        assert_eq!(
            answers[1].outcome,
            Err(ProviderError::Timeout(Duration::from_millis(100)))
        );
        assert_eq!(
            answers[1].display_text(),
            "[Cypher Error] request timed out after 100ms"
        );
        assert!(answers[0].is_ok());
        assert!(answers[2].is_ok());
    }

    #[tokio::test]
    async fn test_percentage_strategy_reads_merged_answer() {
        let gemini = Arc::new(
            Scripted::ok(Source::Gemini, "Paris")
                .synthesizing("**Paris** is the capital.\nSimilarity Level: 90%"),
        );
        let providers = vec![
            gemini.clone(),
            Arc::new(Scripted::ok(Source::Cypher, "It is Paris")),
            Arc::new(Scripted::ok(Source::DeepSeek, "Paris, France")),
        ];

        let report = panel(providers, ScoringStrategy::Percentage)
            .run(&question())
            .await;

        assert_eq!(report.score.value, 90);
        assert_eq!(report.score.basis, ScoreBasis::Reported);
        assert!(gemini
            .prompts
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .contains("Similarity Level: <N>%"));
    }

    #[tokio::test]
    async fn test_missing_synthesizer_is_disabled() {
        let providers: Vec<Arc<dyn LlmProvider>> = vec![
            Arc::new(Scripted::ok(Source::Cypher, "Paris")),
            Arc::new(Scripted::ok(Source::DeepSeek, "Paris")),
        ];
        let panel = Panel::with_providers(
            providers,
            Source::Gemini,
            ScoringStrategy::Exact,
            Duration::from_secs(1),
        );

        let merged = panel.synthesize(&question(), &[]).await;
        assert_eq!(merged.outcome, Err(ProviderError::Disabled));
    }

    #[test]
    fn test_synthesis_prompt_exact_strategy() {
        let answers = vec![
            RawAnswer::new(Source::Gemini, Ok("Paris".into()), Duration::ZERO),
            RawAnswer::new(Source::Cypher, Ok("paris".into()), Duration::ZERO),
            RawAnswer::new(Source::DeepSeek, Err(ProviderError::EmptyResponse), Duration::ZERO),
        ];

        let prompt = synthesis_prompt(&question(), &answers, ScoringStrategy::Exact);

        assert!(prompt.contains("Question: What is the capital of France?"));
        assert!(prompt.contains("DeepSeek's Answer:\n[DeepSeek Error] empty response"));
        assert!(prompt.contains("semantically similar in at least two answers"));
        assert!(prompt.contains("**markdown bold**"));
        assert!(prompt.ends_with("Only output the final answer without similarity score."));
        assert!(!prompt.contains("Similarity Level"));
    }

    #[test]
    fn test_panel_from_default_config() {
        let panel = Panel::new(&Config::default());

        let sources: Vec<Source> = panel.providers.iter().map(|p| p.source()).collect();
        assert_eq!(sources, Source::ALL.to_vec());
        assert_eq!(panel.strategy(), ScoringStrategy::Exact);
        assert_eq!(panel.timeout, Duration::from_secs(60));
    }
}
