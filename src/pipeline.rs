//! Report generation pipeline.
//!
//! Orchestrates prompt rendering, model invocation, parsing with a bounded
//! retry, normalization, and fallback substitution. One invocation is one
//! independent unit of work: no shared mutable state, attempts strictly
//! sequential (the second attempt's prompt depends on the first having
//! failed). Persistence is the caller's concern and never happens here.

use std::sync::Arc;
use tracing::{info, warn};

use crate::llm_client::ModelInvoker;
use crate::parse;
use crate::prompt::{build_report_prompt, JSON_ONLY_SUFFIX};
use crate::report::{FallbackReason, MedicalReport, Stamp};

/// How the returned report was produced; drives the HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Model output parsed and normalized.
    Generated,
    /// No credential configured; deterministic fallback. Not an error.
    MissingCredentials,
    /// Invocation failed or retries exhausted; error-mode fallback.
    Failed,
}

/// Where the bounded retry loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    FirstAttempt,
    SecondAttempt,
    Exhausted,
}

/// Which rendering of the prompt an attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Full instruction with field enumeration and shape example.
    Standard,
    /// Same instruction with an explicit JSON-only directive appended.
    JsonOnly,
}

impl RetryState {
    /// The prompt variant for this attempt, or `None` once exhausted.
    pub fn prompt_variant(self) -> Option<PromptVariant> {
        match self {
            RetryState::FirstAttempt => Some(PromptVariant::Standard),
            RetryState::SecondAttempt => Some(PromptVariant::JsonOnly),
            RetryState::Exhausted => None,
        }
    }

    /// Pure transition taken after a failed attempt.
    pub fn advance(self) -> RetryState {
        match self {
            RetryState::FirstAttempt => RetryState::SecondAttempt,
            RetryState::SecondAttempt | RetryState::Exhausted => RetryState::Exhausted,
        }
    }
}

impl PromptVariant {
    fn render(self, conversation: &[String], doctor: &str, user: &str) -> String {
        let base = build_report_prompt(conversation, doctor, user);
        match self {
            PromptVariant::Standard => base,
            PromptVariant::JsonOnly => format!("{}{}", base, JSON_ONLY_SUFFIX),
        }
    }
}

/// The report generation pipeline, wired once per process.
pub struct ReportPipeline {
    invoker: Option<Arc<dyn ModelInvoker>>,
    stamp: Arc<dyn Stamp>,
}

impl ReportPipeline {
    /// `invoker` is `None` when no LLM credential is configured; the
    /// pipeline then serves the missing-credentials fallback unconditionally.
    pub fn new(invoker: Option<Arc<dyn ModelInvoker>>, stamp: Arc<dyn Stamp>) -> Self {
        Self { invoker, stamp }
    }

    /// Generate a report for one finished conversation.
    ///
    /// Always returns a complete report; the status says whether it came
    /// from the model, the missing-credentials fallback, or the error
    /// fallback.
    pub async fn generate(
        &self,
        conversation: &[String],
        doctor: &str,
        user: &str,
    ) -> (MedicalReport, GenerationStatus) {
        let Some(invoker) = &self.invoker else {
            warn!("no LLM credential configured, returning fallback report");
            let report = MedicalReport::fallback(
                doctor,
                user,
                FallbackReason::MissingCredentials,
                self.stamp.as_ref(),
            );
            return (report, GenerationStatus::MissingCredentials);
        };

        let mut state = RetryState::FirstAttempt;
        let mut last_parse_error = String::new();

        while let Some(variant) = state.prompt_variant() {
            let prompt = variant.render(conversation, doctor, user);

            let raw = match invoker.complete(&prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    // Invocation failures are not retried; only malformed
                    // output consumes an attempt.
                    warn!("model invocation failed: {}", e);
                    let report = MedicalReport::fallback(
                        doctor,
                        user,
                        FallbackReason::GenerationError,
                        self.stamp.as_ref(),
                    );
                    return (report, GenerationStatus::Failed);
                }
            };

            match parse::parse_report(&raw) {
                Ok(parsed) => {
                    let report =
                        MedicalReport::from_parsed(parsed, doctor, user, self.stamp.as_ref());
                    info!(
                        "generated report for session {} ({:?})",
                        report.session_id, variant
                    );
                    return (report, GenerationStatus::Generated);
                }
                Err(e) => {
                    warn!("attempt with {:?} prompt produced unusable output: {}", variant, e);
                    last_parse_error = e.to_string();
                    state = state.advance();
                }
            }
        }

        warn!("all attempts exhausted, last error: {}", last_parse_error);
        let report = MedicalReport::fallback(
            doctor,
            user,
            FallbackReason::GenerationError,
            self.stamp.as_ref(),
        );
        (report, GenerationStatus::Failed)
    }
}
