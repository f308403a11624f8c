//! Constants used throughout the discharge core crate.
//!
//! Branding, record defaults and artifact naming live here so the synthesizer, renderer and
//! outer surfaces agree on the exact strings.

/// Organisation name shown in the document header and footer band.
pub const ORGANISATION_NAME: &str = "ICareForYou";

/// Address and contact line shown under the organisation name.
pub const ORGANISATION_TAGLINE: &str = "Hyderabad, Telangana, India | Mobile: +91 9123696969";

/// Service line printed for every summary.
pub const SERVICE_NAME: &str = "General Medicine";

/// Role printed under the signing doctor.
pub const SIGNATURE_ROLE: &str = "Consultant Physician, ICareForYou";

/// Disclosure inserted after the identifying data when the record was substituted.
pub const SIMILAR_DATA_DISCLOSURE: &str = "Note: Generated based on similar patient data";

/// Default for missing identity and categorical fields.
pub const UNKNOWN: &str = "Unknown";

/// Default for a missing allergies field.
pub const NO_ALLERGIES: &str = "None";

/// Default signing doctor when the record names none.
pub const DEFAULT_DOCTOR_NAME: &str = "Dr. Anita Sharma";

/// Hospital stay used to back-compute a missing admission date.
pub const DEFAULT_STAY_DAYS: u32 = 1;

/// Calendar date format for admission and discharge dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// File name offered to clients downloading a rendered summary.
pub const DOCUMENT_DOWNLOAD_NAME: &str = "discharge_summary.pdf";

/// Extension used when artifacts are copied to disk.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Number of patients returned per listing page.
pub const PATIENTS_PER_PAGE: usize = 100;

/// Default number of rendered documents kept in memory.
pub const DEFAULT_ARTIFACT_CAPACITY: usize = 64;

/// Default number of rendered documents kept in the artifact directory.
pub const DEFAULT_ARTIFACT_DISK_CAPACITY: usize = 512;

/// Default bound on a single narrative generation call, in seconds.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 5;

/// Default local model requested from the Ollama server.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:1b";
