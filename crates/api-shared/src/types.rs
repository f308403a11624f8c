//! Wire types shared by the REST server and the CLI.
//!
//! Every type derives `serde` and `utoipa::ToSchema` so it can be documented in OpenAPI.
//! Conversions from the core domain types live beside each DTO.

use discharge_core::{
    DischargeError, DischargeSummary, ErrorCategory, NewPatient, PatientPage, PatientPreview,
    PatientRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    /// Whether narrative notes come from a model or the templated fallback.
    pub narrative_model: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    /// One of `input`, `not_found`, `synthesis`, `render`, `internal`.
    pub category: String,
}

fn category_name(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Input => "input",
        ErrorCategory::NotFound => "not_found",
        ErrorCategory::Synthesis => "synthesis",
        ErrorCategory::Render => "render",
        ErrorCategory::Internal => "internal",
    }
}

impl From<&DischargeError> for ErrorRes {
    fn from(err: &DischargeError) -> Self {
        Self {
            error: err.to_string(),
            category: category_name(err.category()).to_string(),
        }
    }
}

/// A stored patient as listed by `GET /patients`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub patient_id: u32,
    pub name: String,
    pub sex: String,
    pub state: String,
    pub general_health: String,
    pub has_chronic_condition: bool,
    pub hospital_stay_duration: Option<u32>,
    pub risk_category: String,
    pub doctor_name: String,
    pub allergies: String,
    pub chief_complaint: Option<String>,
    pub admission_date: Option<String>,
    pub discharge_date: Option<String>,
    pub test_reports: Option<String>,
}

impl From<&PatientRecord> for PatientRes {
    fn from(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.patient_id,
            name: record.name().to_string(),
            sex: record.sex().to_string(),
            state: record.state().to_string(),
            general_health: record.general_health().to_string(),
            has_chronic_condition: record.has_chronic_condition,
            hospital_stay_duration: record.hospital_stay_duration,
            risk_category: record.risk_category().to_string(),
            doctor_name: record.doctor_name().to_string(),
            allergies: record.allergies().to_string(),
            chief_complaint: record.chief_complaint().map(str::to_string),
            admission_date: record.admission_date().map(str::to_string),
            discharge_date: record.discharge_date().map(str::to_string),
            test_reports: record.test_reports().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
    pub has_more: bool,
    pub next_page: usize,
}

impl From<&PatientPage> for ListPatientsRes {
    fn from(page: &PatientPage) -> Self {
        Self {
            patients: page.patients.iter().map(PatientRes::from).collect(),
            has_more: page.has_more,
            next_page: page.next_page,
        }
    }
}

/// Body of `POST /patients`. Omitted fields take the record defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Excellent, Very good, Good, Fair or Poor; anything else is Unknown.
    #[serde(default)]
    pub general_health: Option<String>,
    #[serde(default)]
    pub chronic_condition: bool,
    /// Days; defaults to 1.
    #[serde(default)]
    pub stay_duration: Option<u32>,
    /// Normal, Overweight or Obese; anything else is Unknown.
    #[serde(default)]
    pub risk_category: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub chief_complaint: Option<String>,
    #[serde(default)]
    pub admission_date: Option<String>,
    #[serde(default)]
    pub discharge_date: Option<String>,
}

impl From<CreatePatientReq> for NewPatient {
    fn from(req: CreatePatientReq) -> Self {
        NewPatient {
            name: req.name,
            sex: req.sex,
            state: req.state,
            general_health: req.general_health,
            has_chronic_condition: req.chronic_condition,
            hospital_stay_duration: req.stay_duration,
            risk_category: req.risk_category,
            doctor_name: req.doctor_name,
            allergies: req.allergies,
            chief_complaint: req.chief_complaint,
            admission_date: req.admission_date,
            discharge_date: req.discharge_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientRes {
    pub message: String,
    pub patient: PatientRes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreviewRes {
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

impl From<PatientPreview> for PreviewRes {
    fn from(p: PatientPreview) -> Self {
        Self {
            name: p.name,
            sex: p.sex,
            age: p.age,
            state: p.state,
            disease: p.disease,
            chief_complaint: p.chief_complaint,
            stay_duration: p.stay_duration,
            chronic: p.chronic,
            is_fallback: p.is_fallback,
            doctor_name: p.doctor_name,
            allergies: p.allergies,
            admission_date: p.admission_date,
            discharge_date: p.discharge_date,
            test_reports: p.test_reports,
        }
    }
}

/// Body of `POST /generate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerateReq {
    /// Positive integer, sent as a string.
    pub patient_id: String,
    #[serde(default)]
    pub detail_level: Option<String>,
    #[serde(default)]
    pub doctor_notes: Option<String>,
    /// `YYYY-MM-DD`; today when omitted.
    #[serde(default)]
    pub discharge_date: Option<String>,
}

impl From<GenerateReq> for discharge_core::GenerationRequest {
    fn from(req: GenerateReq) -> Self {
        Self {
            patient_id: req.patient_id,
            detail_level: req.detail_level,
            doctor_notes: req.doctor_notes,
            discharge_date: req.discharge_date,
        }
    }
}

/// Every section of a generated summary, keyed as in the summary object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SummaryRes {
    pub hpi: String,
    pub past_history: String,
    pub social_history: String,
    pub physical_exam: String,
    pub lab_data: String,
    pub hospital_course: String,
    pub medications: String,
    pub diet: String,
    pub activity: String,
    pub follow_up: String,
    pub discharge_instructions: String,
    pub discharge_date: String,
    pub admission_date: String,
    pub condition: String,
    pub allergies: String,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub doctor_name: String,
    pub age: String,
    pub is_fallback: bool,
    pub ai_notes: String,
}

impl From<&DischargeSummary> for SummaryRes {
    fn from(s: &DischargeSummary) -> Self {
        Self {
            hpi: s.hpi.to_string(),
            past_history: s.past_history.to_string(),
            social_history: s.social_history.to_string(),
            physical_exam: s.physical_exam.to_string(),
            lab_data: s.lab_data.to_string(),
            hospital_course: s.hospital_course.to_string(),
            medications: s.medications.to_string(),
            diet: s.diet.to_string(),
            activity: s.activity.to_string(),
            follow_up: s.follow_up.to_string(),
            discharge_instructions: s.discharge_instructions.to_string(),
            discharge_date: s.discharge_date.clone(),
            admission_date: s.admission_date.clone(),
            condition: s.condition.to_string(),
            allergies: s.allergies.to_string(),
            chief_complaint: s.chief_complaint.to_string(),
            diagnosis: s.diagnosis.to_string(),
            doctor_name: s.doctor_name.to_string(),
            age: s.age.to_string(),
            is_fallback: s.is_fallback,
            ai_notes: s.ai_notes.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerateRes {
    pub summary: SummaryRes,
    /// Handle for `GET /download/{handle}`.
    pub document: String,
    /// File name offered on download.
    pub pdf_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_category() {
        let body = ErrorRes::from(&DischargeError::PatientNotFound(4));
        assert_eq!(body.category, "not_found");
        assert_eq!(body.error, "no patient found with ID 4");
    }

    #[test]
    fn create_request_parses_categories() {
        let req: CreatePatientReq = serde_json::from_str(
            r#"{"name": "Meera", "general_health": "Very good", "risk_category": "Obese", "chronic_condition": true}"#,
        )
        .unwrap();
        let record = NewPatient::from(req).into_record(1);
        assert_eq!(record.general_health(), discharge_core::GeneralHealth::VeryGood);
        assert_eq!(record.risk_category(), discharge_core::RiskCategory::Obese);
        assert!(record.has_chronic_condition);
    }

    #[test]
    fn generate_request_fields_are_optional() {
        let req: GenerateReq = serde_json::from_str(r#"{"patient_id": "7"}"#).unwrap();
        assert_eq!(req.patient_id, "7");
        assert!(req.discharge_date.is_none());
    }

    #[test]
    fn listing_uses_record_defaults() {
        let res = PatientRes::from(&PatientRecord::new(3));
        assert_eq!(res.name, "Unknown");
        assert_eq!(res.doctor_name, "Dr. Anita Sharma");
        assert_eq!(res.general_health, "Unknown");
    }
}
