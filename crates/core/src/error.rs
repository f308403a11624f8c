/// Coarse error classes surfaced to callers.
///
/// Every [`DischargeError`] maps to exactly one category. Outer surfaces (REST, CLI) use the
/// category to pick a status code or exit message without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or missing request input.
    Input,
    /// A well-formed identifier with no matching record or artifact.
    NotFound,
    /// Failure while deriving summary sections.
    Synthesis,
    /// The rendered document could not be produced or written.
    Render,
    /// Startup, dataset or serialisation failures.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum DischargeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid patient identifier: {0:?}")]
    InvalidPatientId(String),
    #[error("invalid discharge date {value:?}: expected YYYY-MM-DD")]
    InvalidDischargeDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("no patient found with ID {0}")]
    PatientNotFound(u32),
    #[error("document {0} not found")]
    ArtifactNotFound(String),

    #[error("failed to generate summary: {context}")]
    Synthesis {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build PDF: {0}")]
    Pdf(String),
    #[error("failed to write document {path}: {source}", path = path.display())]
    ArtifactWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read dataset: {0}")]
    DatasetRead(std::io::Error),
    #[error("failed to parse JSON dataset: {0}")]
    DatasetJson(serde_json::Error),
    #[error("failed to parse YAML dataset: {0}")]
    DatasetYaml(serde_yaml::Error),
    #[error("unsupported dataset format: {0}")]
    DatasetFormat(String),
    #[error("failed to write dataset: {0}")]
    DatasetWrite(std::io::Error),
}

impl DischargeError {
    /// Classifies the error for callers that only need the coarse outcome.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DischargeError::InvalidInput(_)
            | DischargeError::InvalidPatientId(_)
            | DischargeError::InvalidDischargeDate { .. } => ErrorCategory::Input,
            DischargeError::PatientNotFound(_) | DischargeError::ArtifactNotFound(_) => {
                ErrorCategory::NotFound
            }
            DischargeError::Synthesis { .. } => ErrorCategory::Synthesis,
            DischargeError::Pdf(_) | DischargeError::ArtifactWrite { .. } => {
                ErrorCategory::Render
            }
            DischargeError::DatasetRead(_)
            | DischargeError::DatasetJson(_)
            | DischargeError::DatasetYaml(_)
            | DischargeError::DatasetFormat(_)
            | DischargeError::DatasetWrite(_) => ErrorCategory::Internal,
        }
    }
}

pub type DischargeResult<T> = std::result::Result<T, DischargeError>;
