//! Clinical inference rules.
//!
//! Maps three categorical attributes to a presumed diagnosis, its default chief complaint and an
//! age bracket. The tables are illustrative placeholders; every input combination yields a
//! result and there is no "unknown diagnosis" outcome.

use crate::patient::{GeneralHealth, RiskCategory};
use serde::Serialize;

/// The presumed condition driving every condition-keyed section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Diagnosis {
    #[serde(rename = "Hypertension")]
    Hypertension,
    #[serde(rename = "Diabetes")]
    Diabetes,
    #[serde(rename = "Chronic Heart Disease")]
    ChronicHeartDisease,
    #[serde(rename = "Acute Respiratory Infection")]
    AcuteRespiratoryInfection,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 4] = [
        Self::Hypertension,
        Self::Diabetes,
        Self::ChronicHeartDisease,
        Self::AcuteRespiratoryInfection,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hypertension => "Hypertension",
            Self::Diabetes => "Diabetes",
            Self::ChronicHeartDisease => "Chronic Heart Disease",
            Self::AcuteRespiratoryInfection => "Acute Respiratory Infection",
        }
    }

    /// Complaint used when the record carries none of its own.
    pub fn default_complaint(&self) -> &'static str {
        match self {
            Self::Hypertension => "High blood pressure",
            Self::Diabetes => "High blood sugar",
            Self::ChronicHeartDisease => "Chest pain",
            Self::AcuteRespiratoryInfection => "Shortness of breath",
        }
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Age bracket label chosen from the risk category alone.
pub fn age_bracket(risk: RiskCategory) -> &'static str {
    match risk {
        RiskCategory::Obese => "Adult (40-60)",
        RiskCategory::Overweight => "Adult (30-50)",
        RiskCategory::Normal => "Young Adult (20-40)",
        RiskCategory::Unknown => "Adult (30-60)",
    }
}

/// Result of [`infer`]. Derived on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredCondition {
    pub diagnosis: Diagnosis,
    pub default_complaint: &'static str,
    pub age_bracket: &'static str,
}

/// Applies the rule table.
///
/// Without a chronic condition the diagnosis is always an acute respiratory infection. With
/// one, `Fair` health means hypertension, `Poor` means diabetes and anything else means
/// chronic heart disease.
pub fn infer(
    general_health: GeneralHealth,
    has_chronic: bool,
    risk: RiskCategory,
) -> InferredCondition {
    let diagnosis = match (has_chronic, general_health) {
        (false, _) => Diagnosis::AcuteRespiratoryInfection,
        (true, GeneralHealth::Fair) => Diagnosis::Hypertension,
        (true, GeneralHealth::Poor) => Diagnosis::Diabetes,
        (true, _) => Diagnosis::ChronicHeartDisease,
    };

    InferredCondition {
        diagnosis,
        default_complaint: diagnosis.default_complaint(),
        age_bracket: age_bracket(risk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_health_and_chronic_combination_maps_literally() {
        let expected = [
            (false, "Excellent", "Acute Respiratory Infection"),
            (false, "Very good", "Acute Respiratory Infection"),
            (false, "Good", "Acute Respiratory Infection"),
            (false, "Fair", "Acute Respiratory Infection"),
            (false, "Poor", "Acute Respiratory Infection"),
            (false, "Unknown", "Acute Respiratory Infection"),
            (true, "Excellent", "Chronic Heart Disease"),
            (true, "Very good", "Chronic Heart Disease"),
            (true, "Good", "Chronic Heart Disease"),
            (true, "Fair", "Hypertension"),
            (true, "Poor", "Diabetes"),
            (true, "Unknown", "Chronic Heart Disease"),
        ];

        for (chronic, health, diagnosis) in expected {
            let inferred = infer(GeneralHealth::parse(health), chronic, RiskCategory::Normal);
            assert_eq!(
                inferred.diagnosis.name(),
                diagnosis,
                "chronic={chronic} health={health}"
            );
        }
    }

    #[test]
    fn default_complaints_follow_diagnosis() {
        let poor = infer(GeneralHealth::Poor, true, RiskCategory::Unknown);
        assert_eq!(poor.diagnosis, Diagnosis::Diabetes);
        assert_eq!(poor.default_complaint, "High blood sugar");

        let fair = infer(GeneralHealth::Fair, true, RiskCategory::Unknown);
        assert_eq!(fair.default_complaint, "High blood pressure");

        let acute = infer(GeneralHealth::Poor, false, RiskCategory::Unknown);
        assert_eq!(acute.default_complaint, "Shortness of breath");

        let heart = infer(GeneralHealth::Excellent, true, RiskCategory::Unknown);
        assert_eq!(heart.default_complaint, "Chest pain");
    }

    #[test]
    fn age_bracket_depends_only_on_risk() {
        let cases = [
            ("Obese", "Adult (40-60)"),
            ("Overweight", "Adult (30-50)"),
            ("Normal", "Young Adult (20-40)"),
            ("X", "Adult (30-60)"),
        ];
        for (risk, bracket) in cases {
            for health in GeneralHealth::ALL {
                for chronic in [true, false] {
                    let inferred = infer(health, chronic, RiskCategory::parse(risk));
                    assert_eq!(inferred.age_bracket, bracket, "risk={risk}");
                }
            }
        }
    }

    #[test]
    fn diagnosis_serialises_with_display_name() {
        let json = serde_json::to_string(&Diagnosis::ChronicHeartDisease).unwrap();
        assert_eq!(json, "\"Chronic Heart Disease\"");
    }
}
