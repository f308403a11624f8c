//! Page-independent document layout.
//!
//! The layout is the ordered list of blocks a rendered discharge summary contains, before any
//! positioning. Keeping it separate from the PDF drawing code means ordering and content can
//! be checked without parsing PDF output.

use crate::constants::{SERVICE_NAME, SIGNATURE_ROLE, SIMILAR_DATA_DISCLOSURE};
use crate::patient::PatientRecord;
use crate::synthesis::DischargeSummary;

/// One block of the document, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutBlock {
    /// A bold label on a shaded band followed by one or more body paragraphs.
    Section { label: String, body: Vec<String> },
    /// A standalone unshaded line, used for the substituted-record disclosure.
    Notice(String),
    /// The signing doctor followed by their role.
    Signature { label: String, role: String },
}

impl LayoutBlock {
    fn section(label: &str, body: impl Into<String>) -> Self {
        LayoutBlock::Section {
            label: label.to_string(),
            body: vec![body.into()],
        }
    }

    /// The label line of the block, if it has one.
    pub fn label(&self) -> Option<&str> {
        match self {
            LayoutBlock::Section { label, .. } | LayoutBlock::Signature { label, .. } => Some(label),
            LayoutBlock::Notice(_) => None,
        }
    }
}

/// Ordered layout of a discharge summary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    title: String,
    blocks: Vec<LayoutBlock>,
}

impl DocumentLayout {
    /// Lays out `summary` for `record`. Every section appears, in a fixed order.
    pub fn build(record: &PatientRecord, summary: &DischargeSummary) -> Self {
        let mut blocks = Vec::with_capacity(20);

        blocks.push(LayoutBlock::Section {
            label: "Identifying Data:".into(),
            body: vec![
                format!("Patient: {}", record.name()),
                format!("Medical Record Number: {}", record.patient_id),
                format!("Age: {}", summary.age),
                format!("Sex: {}", record.sex()),
                format!("Admission Date: {}", summary.admission_date),
                format!("Discharge Date: {}", summary.discharge_date),
            ],
        });

        if summary.is_fallback {
            blocks.push(LayoutBlock::Notice(SIMILAR_DATA_DISCLOSURE.to_string()));
        }

        blocks.push(LayoutBlock::section("Service:", SERVICE_NAME));

        let sections = [
            ("Chief Complaint:", &summary.chief_complaint),
            ("History of Present Illness:", &summary.hpi),
            ("Past Medical/Surgical History:", &summary.past_history),
            ("Social History:", &summary.social_history),
            ("Allergies:", &summary.allergies),
            ("Physical Exam on Admission:", &summary.physical_exam),
            ("Laboratory Data:", &summary.lab_data),
            ("Hospital Course:", &summary.hospital_course),
            ("Condition at Discharge:", &summary.condition),
            ("Discharge Diagnoses:", &summary.diagnosis),
            ("Discharge Medications:", &summary.medications),
            ("Diet:", &summary.diet),
            ("Activity:", &summary.activity),
            ("Follow-Up:", &summary.follow_up),
            ("Discharge Instructions:", &summary.discharge_instructions),
            ("AI-Generated Notes:", &summary.ai_notes),
        ];
        blocks.extend(
            sections
                .into_iter()
                .map(|(label, text)| LayoutBlock::section(label, text.as_str())),
        );

        blocks.push(LayoutBlock::Signature {
            label: format!("Signature: {}", summary.doctor_name),
            role: SIGNATURE_ROLE.to_string(),
        });

        Self {
            title: format!("Discharge Summary - {}", record.name()),
            blocks,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[LayoutBlock] {
        &self.blocks
    }

    /// Labels in document order.
    pub fn labels(&self) -> Vec<&str> {
        self.blocks.iter().filter_map(LayoutBlock::label).collect()
    }

    /// Returns true if any block carries exactly `line`.
    pub fn contains_line(&self, line: &str) -> bool {
        self.blocks.iter().any(|block| match block {
            LayoutBlock::Section { label, body } => label == line || body.iter().any(|b| b == line),
            LayoutBlock::Notice(text) => text == line,
            LayoutBlock::Signature { label, role } => label == line || role == line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmentation::NarrativeAdapter;
    use crate::synthesis::synthesize;
    use std::collections::BTreeSet;

    fn layout_for(known: &[u32]) -> DocumentLayout {
        let mut record = PatientRecord::new(1);
        record.name = Some("Ravi Kumar".into());
        record.sex = Some("Male".into());
        record.general_health = Some("Good".into());
        record.risk_category = Some("Normal".into());

        let ids: BTreeSet<u32> = known.iter().copied().collect();
        let summary = synthesize(
            &record,
            None,
            None,
            "2025-04-13",
            &NarrativeAdapter::unavailable(),
            &ids,
        )
        .unwrap();
        DocumentLayout::build(&record, &summary)
    }

    #[test]
    fn sections_follow_fixed_order() {
        let layout = layout_for(&[1]);
        assert_eq!(
            layout.labels(),
            vec![
                "Identifying Data:",
                "Service:",
                "Chief Complaint:",
                "History of Present Illness:",
                "Past Medical/Surgical History:",
                "Social History:",
                "Allergies:",
                "Physical Exam on Admission:",
                "Laboratory Data:",
                "Hospital Course:",
                "Condition at Discharge:",
                "Discharge Diagnoses:",
                "Discharge Medications:",
                "Diet:",
                "Activity:",
                "Follow-Up:",
                "Discharge Instructions:",
                "AI-Generated Notes:",
                "Signature: Dr. Anita Sharma",
            ]
        );
    }

    #[test]
    fn identifying_data_lines() {
        let layout = layout_for(&[1]);
        for line in [
            "Patient: Ravi Kumar",
            "Medical Record Number: 1",
            "Age: Young Adult (20-40)",
            "Sex: Male",
            "Admission Date: 2025-04-12",
            "Discharge Date: 2025-04-13",
            "General Medicine",
            "Consultant Physician, ICareForYou",
        ] {
            assert!(layout.contains_line(line), "missing {line}");
        }
    }

    #[test]
    fn disclosure_only_for_substituted_records() {
        let exact = layout_for(&[1]);
        assert!(!exact.contains_line(SIMILAR_DATA_DISCLOSURE));

        let substituted = layout_for(&[2, 3]);
        assert!(substituted.contains_line(SIMILAR_DATA_DISCLOSURE));
        assert_eq!(
            substituted.blocks()[1],
            LayoutBlock::Notice(SIMILAR_DATA_DISCLOSURE.to_string())
        );
        assert_eq!(substituted.blocks()[2].label(), Some("Service:"));
    }
}
