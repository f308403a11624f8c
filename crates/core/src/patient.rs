//! Patient records as read from the record store.
//!
//! The record is fixed-shape: every optional attribute is an explicit `Option`, and the
//! documented defaults are applied by the accessor methods at read time. Dataset files may use
//! either snake_case keys or the PascalCase column names of the legacy spreadsheet export
//! (`PatientID`, `GeneralHealth`, ...).

use crate::constants::{DEFAULT_DOCTOR_NAME, DEFAULT_STAY_DAYS, NO_ALLERGIES, UNKNOWN};
use serde::{Deserialize, Deserializer, Serialize};

/// Self-reported general health category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneralHealth {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
    #[default]
    Unknown,
}

impl GeneralHealth {
    /// Total parse: any unrecognised label is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Excellent" => Self::Excellent,
            "Very good" => Self::VeryGood,
            "Good" => Self::Good,
            "Fair" => Self::Fair,
            "Poor" => Self::Poor,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very good",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Unknown => UNKNOWN,
        }
    }

    pub const ALL: [GeneralHealth; 6] = [
        Self::Excellent,
        Self::VeryGood,
        Self::Good,
        Self::Fair,
        Self::Poor,
        Self::Unknown,
    ];
}

/// Weight-based risk category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RiskCategory {
    Normal,
    Overweight,
    Obese,
    #[default]
    Unknown,
}

impl RiskCategory {
    /// Total parse: any unrecognised label is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Normal" => Self::Normal,
            "Overweight" => Self::Overweight,
            "Obese" => Self::Obese,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
            Self::Unknown => UNKNOWN,
        }
    }
}

impl std::fmt::Display for GeneralHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A patient record owned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(alias = "PatientID")]
    pub patient_id: u32,
    #[serde(default, alias = "Name")]
    pub name: Option<String>,
    #[serde(default, alias = "Sex")]
    pub sex: Option<String>,
    #[serde(default, alias = "State")]
    pub state: Option<String>,
    /// Source label as stored; see [`PatientRecord::general_health`].
    #[serde(default, alias = "GeneralHealth")]
    pub general_health: Option<String>,
    #[serde(
        default,
        alias = "HasChronicCondition",
        deserialize_with = "deserialize_flag"
    )]
    pub has_chronic_condition: bool,
    #[serde(default, alias = "HospitalStayDuration")]
    pub hospital_stay_duration: Option<u32>,
    /// Source label as stored; see [`PatientRecord::risk_category`].
    #[serde(default, alias = "RiskCategory")]
    pub risk_category: Option<String>,
    #[serde(default, alias = "DoctorName")]
    pub doctor_name: Option<String>,
    #[serde(default, alias = "Allergies")]
    pub allergies: Option<String>,
    #[serde(default, alias = "ChiefComplaint")]
    pub chief_complaint: Option<String>,
    #[serde(default, alias = "AdmissionDate")]
    pub admission_date: Option<String>,
    #[serde(default, alias = "DischargeDate")]
    pub discharge_date: Option<String>,
    #[serde(default, alias = "TestReports")]
    pub test_reports: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PatientRecord {
    /// A record carrying only an identifier; every other attribute takes its default.
    pub fn new(patient_id: u32) -> Self {
        Self {
            patient_id,
            name: None,
            sex: None,
            state: None,
            general_health: None,
            has_chronic_condition: false,
            hospital_stay_duration: None,
            risk_category: None,
            doctor_name: None,
            allergies: None,
            chief_complaint: None,
            admission_date: None,
            discharge_date: None,
            test_reports: None,
        }
    }

    /// Parsed health category; a missing or unrecognised label is `Unknown`.
    ///
    /// The stored label is never rewritten, so unrecognised values survive a dataset write-back.
    pub fn general_health(&self) -> GeneralHealth {
        present(&self.general_health)
            .map(GeneralHealth::parse)
            .unwrap_or_default()
    }

    pub fn risk_category(&self) -> RiskCategory {
        present(&self.risk_category)
            .map(RiskCategory::parse)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        present(&self.name).unwrap_or(UNKNOWN)
    }

    pub fn sex(&self) -> &str {
        present(&self.sex).unwrap_or(UNKNOWN)
    }

    pub fn state(&self) -> &str {
        present(&self.state).unwrap_or(UNKNOWN)
    }

    pub fn doctor_name(&self) -> &str {
        present(&self.doctor_name).unwrap_or(DEFAULT_DOCTOR_NAME)
    }

    pub fn allergies(&self) -> &str {
        present(&self.allergies).unwrap_or(NO_ALLERGIES)
    }

    /// The record's own chief complaint, if it has a non-blank one.
    pub fn chief_complaint(&self) -> Option<&str> {
        present(&self.chief_complaint)
    }

    /// The recorded admission date, if it has a non-blank one.
    pub fn admission_date(&self) -> Option<&str> {
        present(&self.admission_date)
    }

    pub fn discharge_date(&self) -> Option<&str> {
        present(&self.discharge_date)
    }

    pub fn test_reports(&self) -> Option<&str> {
        present(&self.test_reports)
    }

    /// Stay length used for date arithmetic; a missing or zero stay counts as one day.
    pub fn stay_days(&self) -> u32 {
        match self.hospital_stay_duration {
            Some(days) if days > 0 => days,
            _ => DEFAULT_STAY_DAYS,
        }
    }
}

/// Attributes for a record that does not have an identifier yet.
///
/// The store assigns the identifier when the record is added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub general_health: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub has_chronic_condition: bool,
    #[serde(default)]
    pub hospital_stay_duration: Option<u32>,
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

impl NewPatient {
    pub fn into_record(self, patient_id: u32) -> PatientRecord {
        PatientRecord {
            patient_id,
            name: self.name,
            sex: self.sex,
            state: self.state,
            general_health: self.general_health,
            has_chronic_condition: self.has_chronic_condition,
            hospital_stay_duration: Some(self.hospital_stay_duration.unwrap_or(DEFAULT_STAY_DAYS)),
            risk_category: self.risk_category,
            doctor_name: self.doctor_name,
            allergies: self.allergies,
            chief_complaint: self.chief_complaint,
            admission_date: self.admission_date,
            discharge_date: self.discharge_date,
            test_reports: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accepts `true/false`, `1/0` and `"Yes"/"No"`; missing or null is `false`.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<FlagRepr>::deserialize(deserializer)? {
        None => false,
        Some(FlagRepr::Bool(b)) => b,
        Some(FlagRepr::Int(i)) => i != 0,
        Some(FlagRepr::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "true" | "1"
        ),
    })
}
