//! Discharge summary synthesis.
//!
//! Every narrative section is a fixed template selected by the inferred diagnosis (and, for a
//! few sections, the chronic flag or risk category). The tables below match exhaustively on
//! [`Diagnosis`], so adding a diagnosis is a compile error until every section handles it.

use crate::augmentation::NarrativeAdapter;
use crate::constants::DATE_FORMAT;
use crate::inference::{infer, Diagnosis};
use crate::patient::{GeneralHealth, PatientRecord, RiskCategory};
use crate::provenance::is_fallback;
use crate::text::SectionText;
use crate::{DischargeError, DischargeResult};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lab text used if a diagnosis-specific entry is ever blank.
pub const GENERIC_LABS: &str = "Normal labs.";

/// Medication text used if a diagnosis-specific entry is ever blank.
pub const GENERIC_MEDICATIONS: &str = "Standard medications prescribed";

/// The assembled summary for one generation request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeSummary {
    pub hpi: SectionText,
    pub past_history: SectionText,
    pub social_history: SectionText,
    pub physical_exam: SectionText,
    pub lab_data: SectionText,
    pub hospital_course: SectionText,
    pub medications: SectionText,
    pub diet: SectionText,
    pub activity: SectionText,
    pub follow_up: SectionText,
    pub discharge_instructions: SectionText,
    pub discharge_date: String,
    pub admission_date: String,
    pub condition: SectionText,
    pub allergies: SectionText,
    pub chief_complaint: SectionText,
    pub diagnosis: SectionText,
    pub doctor_name: SectionText,
    pub age: SectionText,
    pub is_fallback: bool,
    pub ai_notes: SectionText,
}

/// Condition at discharge, from general health alone.
pub fn discharge_condition(general_health: GeneralHealth) -> &'static str {
    match general_health {
        GeneralHealth::Excellent | GeneralHealth::VeryGood | GeneralHealth::Good => "Stable",
        GeneralHealth::Fair => "Improved",
        GeneralHealth::Poor | GeneralHealth::Unknown => "Unchanged",
    }
}

fn physical_exam_finding(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "BP 140/90",
        Diagnosis::Diabetes => "Blood glucose 180 mg/dL",
        Diagnosis::ChronicHeartDisease | Diagnosis::AcuteRespiratoryInfection => "HR 80 bpm",
    }
}

fn lab_finding(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Normal labs",
        Diagnosis::Diabetes => "HbA1c 7.0%",
        Diagnosis::ChronicHeartDisease => "Normal lipids",
        Diagnosis::AcuteRespiratoryInfection => "CRP elevated",
    }
}

fn hospital_course(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Monitored BP and adjusted medications",
        Diagnosis::Diabetes => "Managed glucose levels",
        Diagnosis::ChronicHeartDisease => "Cardiac monitoring",
        Diagnosis::AcuteRespiratoryInfection => "Antibiotic therapy",
    }
}

fn medications(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Lisinopril 10mg daily for 30 days",
        Diagnosis::Diabetes => "Metformin 500mg twice daily for 60 days",
        Diagnosis::ChronicHeartDisease => "Aspirin 81mg daily, Atorvastatin 20mg daily for 90 days",
        Diagnosis::AcuteRespiratoryInfection => "Amoxicillin 500mg three times daily for 7 days",
    }
}

fn diet(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Low-salt diet",
        Diagnosis::Diabetes => "Low-sugar diet",
        Diagnosis::ChronicHeartDisease => "Heart-healthy diet",
        Diagnosis::AcuteRespiratoryInfection => "Balanced diet",
    }
}

fn follow_up_check(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "blood pressure check",
        Diagnosis::Diabetes => "blood sugar test",
        Diagnosis::ChronicHeartDisease => "cardiac evaluation",
        Diagnosis::AcuteRespiratoryInfection => "respiratory check",
    }
}

fn discharge_instruction(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::Hypertension => "Monitor BP daily",
        Diagnosis::Diabetes => "Check glucose regularly",
        Diagnosis::ChronicHeartDisease => "Report chest pain immediately",
        Diagnosis::AcuteRespiratoryInfection => "Complete antibiotic course",
    }
}

/// The record's admission date, or `discharge_date` minus the stay length.
fn admission_date(record: &PatientRecord, discharge_date: &str) -> DischargeResult<String> {
    if let Some(recorded) = record.admission_date() {
        return Ok(recorded.to_string());
    }

    let discharged = NaiveDate::parse_from_str(discharge_date.trim(), DATE_FORMAT).map_err(|e| {
        DischargeError::Synthesis {
            context: format!("cannot derive admission date from discharge date {discharge_date:?}"),
            source: Box::new(e),
        }
    })?;

    let stay = record.stay_days();
    let admitted = discharged
        .checked_sub_days(Days::new(u64::from(stay)))
        .ok_or_else(|| DischargeError::Synthesis {
            context: "admission date out of range".into(),
            source: format!("{discharged} minus {stay} days").into(),
        })?;

    Ok(admitted.format(DATE_FORMAT).to_string())
}

/// Builds the complete discharge summary for `record`.
///
/// `detail_level` and `doctor_notes` are accepted for interface compatibility but do not
/// change any section. `known_ids` is the store's identifier set read for this call; it
/// decides the provenance flag.
///
/// # Errors
///
/// Returns `DischargeError::Synthesis` only when the record has no admission date and
/// `discharge_date` is not a `YYYY-MM-DD` date.
pub fn synthesize(
    record: &PatientRecord,
    detail_level: Option<&str>,
    doctor_notes: Option<&str>,
    discharge_date: &str,
    narrative: &NarrativeAdapter,
    known_ids: &BTreeSet<u32>,
) -> DischargeResult<DischargeSummary> {
    tracing::debug!(
        patient_id = record.patient_id,
        detail_level = detail_level.unwrap_or_default(),
        has_doctor_notes = doctor_notes.is_some_and(|n| !n.trim().is_empty()),
        "synthesising summary"
    );

    let chronic = record.has_chronic_condition;
    let risk = record.risk_category();
    let general_health = record.general_health();
    let inferred = infer(general_health, chronic, risk);
    let diagnosis = inferred.diagnosis;
    let obese = risk == RiskCategory::Obese;

    let admission_date = admission_date(record, discharge_date)?;
    let chief_complaint = record
        .chief_complaint()
        .unwrap_or(inferred.default_complaint);

    let text = |s: String| SectionText::or_default(s, crate::constants::UNKNOWN);

    let ai_note = narrative.augment(
        diagnosis,
        general_health,
        risk,
        record.hospital_stay_duration,
    );

    let summary = DischargeSummary {
        hpi: text(format!(
            "Presented with {chief_complaint} for {}.",
            if chronic { "1 week" } else { "3 days" }
        )),
        past_history: text(format!(
            "History of {}.",
            if obese { "obesity" } else { "no major conditions" }
        )),
        social_history: text(format!(
            "{} lifestyle.",
            if obese {
                "Non-smoker, sedentary"
            } else {
                "Non-smoker, active"
            }
        )),
        physical_exam: text(format!("{} on admission.", physical_exam_finding(diagnosis))),
        lab_data: SectionText::or_default(format!("{}.", lab_finding(diagnosis)), GENERIC_LABS),
        hospital_course: text(format!("{}.", hospital_course(diagnosis))),
        medications: SectionText::or_default(medications(diagnosis), GENERIC_MEDICATIONS),
        diet: text(format!("{}.", diet(diagnosis))),
        activity: text(format!(
            "{}.",
            if chronic {
                "Light walking 30 min daily"
            } else {
                "Resume normal activity in 1 week"
            }
        )),
        follow_up: text(format!(
            "Follow up in {} with {}.",
            if chronic { "1 month" } else { "2 weeks" },
            follow_up_check(diagnosis)
        )),
        discharge_instructions: text(format!("{}.", discharge_instruction(diagnosis))),
        discharge_date: discharge_date.trim().to_string(),
        admission_date,
        condition: text(discharge_condition(general_health).to_string()),
        allergies: text(record.allergies().to_string()),
        chief_complaint: text(chief_complaint.to_string()),
        diagnosis: text(format!(
            "{diagnosis}. Secondary: {}.",
            if obese {
                "Obesity-related complications"
            } else {
                "None"
            }
        )),
        doctor_name: text(record.doctor_name().to_string()),
        age: text(inferred.age_bracket.to_string()),
        is_fallback: is_fallback(record.patient_id, known_ids),
        ai_notes: ai_note.text,
    };

    tracing::info!(
        patient_id = record.patient_id,
        diagnosis = %diagnosis,
        is_fallback = summary.is_fallback,
        "summary synthesised"
    );
    Ok(summary)
}
