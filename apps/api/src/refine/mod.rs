//! Refine chain: folds the generator over segments in order.
//!
//! The first segment is summarized with the initial template; every later
//! segment is folded into the running answer with the refine template. Each
//! prompt embeds the answer accumulated so far, so the result depends on
//! segment order and steps cannot run concurrently.

pub mod prompts;
pub mod template;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{ConfigurationError, GenerationError, GenerationFailure};
use crate::llm_client::Generator;
use crate::models::segment::Segment;
use template::{PromptTemplate, TemplateId};

/// Longest pause between two attempts of the same segment.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RefineOptions {
    /// Upper bound for a single generate call.
    pub step_timeout: Duration,
    /// Attempts per segment, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry, up to
    /// one minute.
    pub retry_backoff: Duration,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(120),
            max_attempts: 2,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Final answer plus one answer per processed segment, in segment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefineOutcome {
    pub final_answer: String,
    pub steps: Vec<String>,
}

/// Running state of one refine run. Never shared between runs.
#[derive(Default)]
struct RefineState {
    current_answer: String,
    steps: Vec<String>,
}

impl RefineState {
    fn record(&mut self, answer: String) {
        self.steps.push(answer.clone());
        self.current_answer = answer;
    }

    fn finish(self) -> RefineOutcome {
        RefineOutcome {
            final_answer: self.current_answer,
            steps: self.steps,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefineAccumulator {
    initial: PromptTemplate,
    refine: PromptTemplate,
    options: RefineOptions,
}

impl RefineAccumulator {
    /// Parses both templates up front so a bad template fails at startup.
    pub fn new(
        initial_template: &str,
        refine_template: &str,
        options: RefineOptions,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            initial: PromptTemplate::parse(TemplateId::Initial, initial_template)?,
            refine: PromptTemplate::parse(TemplateId::Refine, refine_template)?,
            options,
        })
    }

    pub fn with_default_templates(options: RefineOptions) -> Result<Self, ConfigurationError> {
        Self::new(prompts::INITIAL_TEMPLATE, prompts::REFINE_TEMPLATE, options)
    }

    /// Runs the chain once over `segments`. No segments means no calls and an
    /// empty outcome. A failing segment stops the run; it is never skipped.
    pub async fn run(
        &self,
        segments: &[Segment],
        generator: &dyn Generator,
    ) -> Result<RefineOutcome, GenerationError> {
        let mut state = RefineState::default();

        if segments.is_empty() {
            debug!("No segments to refine");
            return Ok(state.finish());
        }

        info!("Refine run starting over {} segments", segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let prompt = self.prompt_for(index, &state, segment).map_err(|e| GenerationError {
                segment_index: index,
                attempts: 0,
                partial_steps: state.steps.clone(),
                cause: e.into(),
            })?;

            match self.generate_step(index, &prompt, generator).await {
                Ok(answer) => {
                    debug!(
                        "Refine step {index} (start={}, overlap={}): prompt_chars={}, answer_chars={}",
                        segment.start,
                        segment.overlap,
                        prompt.chars().count(),
                        answer.chars().count()
                    );
                    state.record(answer);
                }
                Err((cause, attempts)) => {
                    return Err(GenerationError {
                        segment_index: index,
                        attempts,
                        partial_steps: state.steps,
                        cause,
                    });
                }
            }
        }

        info!("Refine run finished after {} steps", state.steps.len());
        Ok(state.finish())
    }

    fn prompt_for(
        &self,
        index: usize,
        state: &RefineState,
        segment: &Segment,
    ) -> Result<String, ConfigurationError> {
        if index == 0 {
            self.initial.render(&[("text", segment.text.as_str())])
        } else {
            self.refine.render(&[
                ("existing_answer", state.current_answer.as_str()),
                ("text", segment.text.as_str()),
            ])
        }
    }

    /// One bounded generate call per attempt, retrying only retryable failures.
    async fn generate_step(
        &self,
        index: usize,
        prompt: &str,
        generator: &dyn Generator,
    ) -> Result<String, (GenerationFailure, u32)> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure =
                match tokio::time::timeout(self.options.step_timeout, generator.generate(prompt))
                    .await
                {
                    Ok(Ok(answer)) => return Ok(answer),
                    Ok(Err(e)) => GenerationFailure::Llm(e),
                    Err(_) => GenerationFailure::Timeout(self.options.step_timeout),
                };

            if attempt >= max_attempts || !failure.is_retryable() {
                return Err((failure, attempt));
            }

            let delay = backoff_delay(self.options.retry_backoff, attempt);
            warn!(
                "Segment {index} attempt {attempt}/{max_attempts} failed ({failure}), retrying after {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// `base * 2^(retry - 1)`, capped at `MAX_RETRY_DELAY`.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(retry.saturating_sub(1)))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}
