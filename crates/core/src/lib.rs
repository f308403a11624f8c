//! # Discharge Core
//!
//! Core business logic for discharge summary generation.
//!
//! This crate contains the pure pipeline from a stored patient record to a rendered document:
//! - Clinical inference rules (diagnosis, default complaint, age bracket)
//! - Section synthesis from condition-keyed templates
//! - Narrative augmentation with deterministic fallback
//! - Layout and PDF rendering
//! - Record lookup, provenance and artifact storage
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest`,
//! `api-shared` and `discharge-cli`.

pub mod artifacts;
pub mod augmentation;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod layout;
pub mod ollama;
pub mod patient;
pub mod pdf;
pub mod provenance;
pub mod service;
pub mod store;
pub mod synthesis;
pub mod text;

pub use artifacts::{ArtifactId, ArtifactStore};
pub use augmentation::{
    AugmentationOutcome, GenerationError, GenerationParams, NarrativeAdapter,
    NarrativeCapability, NarrativeGenerator,
};
pub use config::{CoreConfig, OllamaSettings};
pub use error::{DischargeError, DischargeResult, ErrorCategory};
pub use inference::{infer, Diagnosis, InferredCondition};
pub use patient::{GeneralHealth, NewPatient, PatientRecord, RiskCategory};
pub use service::{DischargeService, GenerationOutcome, GenerationRequest, PatientPreview};
pub use store::{InMemoryRecordStore, LookupPolicy, PatientPage, RecordStore};
pub use synthesis::DischargeSummary;
pub use text::SectionText;
