//! Narrative augmentation for the "AI Notes" section.
//!
//! The free-text generator is an injected capability constructed once at startup. The adapter
//! has exactly three terminal outcomes and never returns an error to its caller:
//!
//! 1. capability unavailable: templated note tagged `[AI model unavailable]`
//! 2. generation succeeded with usable output: trimmed, truncated, prefixed model text
//! 3. generation failed, timed out or produced degenerate output: templated note tagged
//!    `[AI generation failed; using fallback]`
//!
//! There are no retries. The generator runs on a worker thread bounded by a timeout so a slow
//! model cannot hold a request indefinitely.

use crate::inference::Diagnosis;
use crate::patient::{GeneralHealth, RiskCategory};
use crate::text::{collapse_newlines, truncate_chars, SectionText};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Generated text shorter than this (after prompt stripping and trimming) is degenerate.
pub const MIN_USABLE_CHARS: usize = 20;

/// Maximum number of model characters kept in the note.
pub const MAX_NOTE_CHARS: usize = 200;

const NOTE_PREFIX: &str = "AI Notes: ";
const UNAVAILABLE_TAG: &str = "[AI model unavailable]";
const FAILED_TAG: &str = "[AI generation failed; using fallback]";

/// Fixed sampling parameters for every narrative call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated length, in tokens.
    pub max_length: u32,
    /// Lower bound on generated length, in tokens.
    pub min_length: u32,
    pub num_return_sequences: u32,
    pub truncation: bool,
    pub temperature: f32,
    pub do_sample: bool,
}

impl GenerationParams {
    pub const NARRATIVE: GenerationParams = GenerationParams {
        max_length: 300,
        min_length: 50,
        num_return_sequences: 1,
        truncation: true,
        temperature: 0.8,
        do_sample: true,
    };
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("cannot reach model server at {0}")]
    Connection(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("model server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("failed to parse model response: {0}")]
    ResponseParsing(String),
    #[error("model {0} is not installed")]
    ModelMissing(String),
    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("generation worker failed: {0}")]
    Worker(String),
    #[error("output is empty or too short ({0} characters)")]
    Degenerate(usize),
}

/// A free-text generation capability.
pub trait NarrativeGenerator: Send + Sync {
    /// Generates a continuation of `prompt`. The output may echo the prompt.
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError>;
}

/// Whether a narrative generator was successfully set up at startup.
#[derive(Clone, Default)]
pub enum NarrativeCapability {
    Available(Arc<dyn NarrativeGenerator>),
    #[default]
    Unavailable,
}

impl NarrativeCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, NarrativeCapability::Available(_))
    }
}

impl std::fmt::Debug for NarrativeCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NarrativeCapability::Available(_) => f.write_str("Available"),
            NarrativeCapability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// How the note was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentationOutcome {
    Generated,
    ModelUnavailable,
    GenerationFailed,
}

/// The "AI Notes" section body plus the outcome that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiNote {
    pub text: SectionText,
    pub outcome: AugmentationOutcome,
}

/// Diagnosis-specific advice used by both fallback notes.
pub fn advice_clause(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Manage BP with low-salt diet",
        Diagnosis::Diabetes => "Control glucose with diet",
        Diagnosis::ChronicHeartDisease => "Monitor heart health",
        Diagnosis::AcuteRespiratoryInfection => "Complete antibiotics",
    }
}

/// Builds the bounded prompt sent to the generator.
pub fn build_prompt(
    diagnosis: Diagnosis,
    general_health: GeneralHealth,
    risk: RiskCategory,
    stay_duration: Option<u32>,
) -> String {
    let stay = stay_duration
        .map(|d| d.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    format!(
        "Generate a concise medical note for a patient with {diagnosis}. Describe the disease \
         briefly, mention key patient data (Health: {general_health}, Risk: {risk}, Stay: \
         {stay} days), and suggest one treatment or lifestyle change. Keep it under 150 words."
    )
}

fn fallback_note(diagnosis: Diagnosis, tag: &str) -> SectionText {
    SectionText::or_default(
        format!(
            "{NOTE_PREFIX}{diagnosis} requires ongoing monitoring. {}. {tag}",
            advice_clause(diagnosis)
        ),
        "AI Notes: unavailable",
    )
}

/// Strips the echoed prompt and validates what remains.
fn usable_note(prompt: &str, raw: &str) -> Result<SectionText, GenerationError> {
    let stripped = raw.replace(prompt, "");
    let stripped = stripped.trim();
    let len = stripped.chars().count();
    if len < MIN_USABLE_CHARS {
        return Err(GenerationError::Degenerate(len));
    }

    let kept = truncate_chars(stripped, MAX_NOTE_CHARS).trim();
    SectionText::new(collapse_newlines(&format!("{NOTE_PREFIX}{kept}")))
        .map_err(|_| GenerationError::Degenerate(0))
}

/// Wraps the narrative capability with prompt construction, validation and fallback.
#[derive(Clone, Debug)]
pub struct NarrativeAdapter {
    capability: NarrativeCapability,
    timeout: Duration,
}

impl NarrativeAdapter {
    pub fn new(capability: NarrativeCapability, timeout: Duration) -> Self {
        Self {
            capability,
            timeout,
        }
    }

    /// An adapter that always takes the unavailable path.
    pub fn unavailable() -> Self {
        Self::new(NarrativeCapability::Unavailable, Duration::from_secs(1))
    }

    pub fn capability(&self) -> &NarrativeCapability {
        &self.capability
    }

    /// Produces the "AI Notes" text. Never fails.
    pub fn augment(
        &self,
        diagnosis: Diagnosis,
        general_health: GeneralHealth,
        risk: RiskCategory,
        stay_duration: Option<u32>,
    ) -> AiNote {
        let NarrativeCapability::Available(generator) = &self.capability else {
            tracing::warn!("narrative model unavailable, using fallback notes");
            return AiNote {
                text: fallback_note(diagnosis, UNAVAILABLE_TAG),
                outcome: AugmentationOutcome::ModelUnavailable,
            };
        };

        let prompt = build_prompt(diagnosis, general_health, risk, stay_duration);
        tracing::debug!(%prompt, "generating narrative notes");

        let result = generate_with_timeout(Arc::clone(generator), prompt.clone(), self.timeout)
            .and_then(|raw| {
                tracing::debug!(raw = %raw, "raw narrative output");
                usable_note(&prompt, &raw)
            });

        match result {
            Ok(text) => {
                tracing::info!("narrative notes generated");
                AiNote {
                    text,
                    outcome: AugmentationOutcome::Generated,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "narrative generation failed, using fallback");
                AiNote {
                    text: fallback_note(diagnosis, FAILED_TAG),
                    outcome: AugmentationOutcome::GenerationFailed,
                }
            }
        }
    }
}

/// Runs one generation call on a worker thread and waits at most `timeout`.
///
/// On expiry the worker is detached; its eventual result is discarded.
fn generate_with_timeout(
    generator: Arc<dyn NarrativeGenerator>,
    prompt: String,
    timeout: Duration,
) -> Result<String, GenerationError> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("narrative-generation".into())
        .spawn(move || {
            let _ = tx.send(generator.generate(&prompt, &GenerationParams::NARRATIVE));
        })
        .map_err(|e| GenerationError::Worker(e.to_string()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(GenerationError::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(GenerationError::Worker(
            "worker exited without a result".into(),
        )),
    }
}
