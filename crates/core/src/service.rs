//! Discharge service orchestration.
//!
//! One [`DischargeService`] is built at startup and shared by every request. A generation
//! request runs the whole pipeline synchronously:
//!
//! 1. validate the patient identifier and discharge date
//! 2. look the record up under the configured [`LookupPolicy`]
//! 3. read the store's identifier set (fresh for this request)
//! 4. synthesise the summary, including the narrative notes
//! 5. render the PDF and store it under a new artifact handle
//!
//! ## Pure Data Operations
//!
//! This module contains no transport concerns. HTTP and CLI surfaces call into it and map
//! [`DischargeError::category`] onto their own status codes or exit messages.

use crate::artifacts::{ArtifactId, ArtifactStore};
use crate::augmentation::{NarrativeAdapter, NarrativeCapability};
use crate::config::CoreConfig;
use crate::constants::{DATE_FORMAT, PATIENTS_PER_PAGE, UNKNOWN};
use crate::inference::infer;
use crate::patient::{NewPatient, PatientRecord};
use crate::pdf::DocumentRenderer;
use crate::provenance::is_fallback;
use crate::store::{lookup, LookupPolicy, PatientPage, RecordStore};
use crate::synthesis::{synthesize, DischargeSummary};
use crate::{DischargeError, DischargeResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Inputs for one summary generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Must parse as a positive integer.
    pub patient_id: String,
    pub detail_level: Option<String>,
    pub doctor_notes: Option<String>,
    /// `YYYY-MM-DD`; today when absent or blank.
    pub discharge_date: Option<String>,
}

/// The summary together with the handle of its rendered document.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub summary: DischargeSummary,
    pub document: ArtifactId,
}

/// Quick look at a patient before generating a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientPreview {
    pub name: String,
    pub sex: String,
    pub age: String,
    pub state: String,
    pub disease: String,
    pub chief_complaint: String,
    pub stay_duration: Option<u32>,
    pub chronic: bool,
    pub is_fallback: bool,
    pub doctor_name: String,
    pub allergies: String,
    pub admission_date: String,
    pub discharge_date: String,
    pub test_reports: String,
}

/// Parses an externally supplied patient identifier.
///
/// # Errors
///
/// Returns `DischargeError::InvalidPatientId` unless `raw` is a positive integer.
pub fn parse_patient_id(raw: &str) -> DischargeResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(DischargeError::InvalidPatientId(raw.to_string())),
    }
}

/// Validates the requested discharge date, defaulting to `today`.
///
/// # Errors
///
/// Returns `DischargeError::InvalidDischargeDate` if a non-blank value is not `YYYY-MM-DD`.
pub fn resolve_discharge_date(raw: Option<&str>, today: NaiveDate) -> DischargeResult<String> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(today.format(DATE_FORMAT).to_string());
    };

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|source| DischargeError::InvalidDischargeDate {
            value: value.to_string(),
            source,
        })
}

/// Orchestrates lookup, synthesis, rendering and artifact storage.
pub struct DischargeService {
    store: Arc<dyn RecordStore>,
    policy: LookupPolicy,
    narrative: NarrativeAdapter,
    renderer: DocumentRenderer,
    artifacts: ArtifactStore,
}

impl std::fmt::Debug for DischargeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DischargeService")
            .field("policy", &self.policy)
            .field("narrative", &self.narrative)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

impl DischargeService {
    /// Creates the service.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Startup configuration (policy, artifact capacity and directory, logo, timeout)
    /// * `store` - Record store shared with any other surface
    /// * `capability` - Narrative capability probed once at startup
    pub fn new(
        cfg: &CoreConfig,
        store: Arc<dyn RecordStore>,
        capability: NarrativeCapability,
    ) -> Self {
        Self {
            store,
            policy: cfg.lookup_policy(),
            narrative: NarrativeAdapter::new(capability, cfg.generation_timeout()),
            renderer: DocumentRenderer::new(cfg.logo_path().map(|p| p.to_path_buf())),
            artifacts: ArtifactStore::new(
                cfg.artifact_capacity(),
                cfg.artifact_dir().map(|p| p.to_path_buf()),
            )
            .with_disk_capacity(cfg.artifact_disk_capacity()),
        }
    }

    pub fn lookup_policy(&self) -> LookupPolicy {
        self.policy
    }

    pub fn narrative_available(&self) -> bool {
        self.narrative.capability().is_available()
    }

    /// Runs the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// Input errors for a bad identifier or date, `PatientNotFound` on a strict miss,
    /// synthesis errors, and render errors from drawing or storing the document.
    pub fn generate(&self, request: &GenerationRequest) -> DischargeResult<GenerationOutcome> {
        let today = chrono::Local::now().date_naive();
        self.generate_on(request, today)
    }

    /// As [`DischargeService::generate`], with an explicit "today" for the date default.
    pub fn generate_on(
        &self,
        request: &GenerationRequest,
        today: NaiveDate,
    ) -> DischargeResult<GenerationOutcome> {
        let patient_id = parse_patient_id(&request.patient_id)?;
        let discharge_date = resolve_discharge_date(request.discharge_date.as_deref(), today)?;
        tracing::info!(patient_id, %discharge_date, "generating discharge summary");

        let record = lookup(self.store.as_ref(), patient_id, self.policy)?;
        let known_ids = self.store.known_ids();

        let summary = synthesize(
            &record,
            request.detail_level.as_deref(),
            request.doctor_notes.as_deref(),
            &discharge_date,
            &self.narrative,
            &known_ids,
        )
        .inspect_err(|e| tracing::error!(patient_id, error = %e, "summary synthesis failed"))?;

        let bytes = self
            .renderer
            .render(&record, &summary)
            .inspect_err(|e| tracing::error!(patient_id, error = %e, "document rendering failed"))?;
        let document = self
            .artifacts
            .put(bytes)
            .inspect_err(|e| tracing::error!(patient_id, error = %e, "document storage failed"))?;

        tracing::info!(patient_id, %document, is_fallback = summary.is_fallback, "discharge summary ready");
        Ok(GenerationOutcome { summary, document })
    }

    /// Builds the pre-generation preview for a patient.
    pub fn preview(&self, raw_patient_id: &str) -> DischargeResult<PatientPreview> {
        let patient_id = parse_patient_id(raw_patient_id)?;
        let record = lookup(self.store.as_ref(), patient_id, self.policy)?;
        let known_ids = self.store.known_ids();
        Ok(preview_of(&record, is_fallback(record.patient_id, &known_ids)))
    }

    /// Returns the rendered document for `handle`.
    pub fn download(&self, handle: &str) -> DischargeResult<Arc<Vec<u8>>> {
        self.artifacts.get(handle).inspect_err(|_| {
            tracing::warn!(handle, "document not found");
        })
    }

    /// Lists page `page` (1-based) of patients, newest first.
    pub fn list_patients(&self, page: usize) -> DischargeResult<PatientPage> {
        self.store.list_page(page, PATIENTS_PER_PAGE)
    }

    /// Adds a patient under the next free identifier.
    pub fn add_patient(&self, patient: NewPatient) -> DischargeResult<PatientRecord> {
        self.store.add(patient)
    }
}

fn preview_of(record: &PatientRecord, is_fallback: bool) -> PatientPreview {
    let inferred = infer(
        record.general_health(),
        record.has_chronic_condition,
        record.risk_category(),
    );
    PatientPreview {
        name: record.name().to_string(),
        sex: record.sex().to_string(),
        age: inferred.age_bracket.to_string(),
        state: record.state().to_string(),
        disease: inferred.diagnosis.to_string(),
        chief_complaint: record
            .chief_complaint()
            .unwrap_or(inferred.default_complaint)
            .to_string(),
        stay_duration: record.hospital_stay_duration,
        chronic: record.has_chronic_condition,
        is_fallback,
        doctor_name: record.doctor_name().to_string(),
        allergies: record.allergies().to_string(),
        admission_date: record.admission_date().unwrap_or(UNKNOWN).to_string(),
        discharge_date: record.discharge_date().unwrap_or(UNKNOWN).to_string(),
        test_reports: record.test_reports().unwrap_or_default().to_string(),
    }
}
