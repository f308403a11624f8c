//! Patient record storage.
//!
//! The core reads records through the [`RecordStore`] trait. The bundled implementation keeps
//! every record in memory, keyed by identifier, and can be seeded from (and written back to) a
//! JSON or YAML dataset file.
//!
//! ## Dataset format
//!
//! A dataset is a top-level array of records:
//!
//! ```text
//! [
//!   {"PatientID": 1, "Name": "Ravi Kumar", "GeneralHealth": "Good", ...},
//!   {"patient_id": 2, "general_health": "Fair", ...}
//! ]
//! ```
//!
//! Files ending in `.yaml` or `.yml` are parsed as YAML; `.json` as JSON.

use crate::patient::{NewPatient, PatientRecord};
use crate::{DischargeError, DischargeResult};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

// ============================================================================
// LOOKUP POLICY
// ============================================================================

/// What to do when a requested identifier has no record.
///
/// Chosen once at startup; a process never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupPolicy {
    /// Report the miss as not found.
    #[default]
    Strict,
    /// Serve a copy of the record with the lowest identifier, re-keyed to the requested one.
    Substitute,
}

impl FromStr for LookupPolicy {
    type Err = DischargeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(LookupPolicy::Strict),
            "substitute" => Ok(LookupPolicy::Substitute),
            other => Err(DischargeError::InvalidInput(format!(
                "unknown lookup policy {other:?}: expected \"strict\" or \"substitute\""
            ))),
        }
    }
}

/// One page of records, newest identifier first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientPage {
    pub patients: Vec<PatientRecord>,
    pub page: usize,
    pub has_more: bool,
    pub next_page: usize,
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// Read and append access to patient records.
pub trait RecordStore: Send + Sync {
    /// Exact lookup by identifier.
    fn find(&self, patient_id: u32) -> Option<PatientRecord>;

    /// Every identifier the store currently holds.
    fn known_ids(&self) -> BTreeSet<u32>;

    /// Returns page `page` (1-based) of `per_page` records, highest identifier first.
    fn list_page(&self, page: usize, per_page: usize) -> DischargeResult<PatientPage>;

    /// Adds a record under the next identifier (current maximum plus one).
    fn add(&self, patient: NewPatient) -> DischargeResult<PatientRecord>;
}

/// Resolves `patient_id` against `store` under `policy`.
///
/// # Errors
///
/// Returns `DischargeError::PatientNotFound` on a miss under [`LookupPolicy::Strict`], or
/// under [`LookupPolicy::Substitute`] when the store is empty.
pub fn lookup(
    store: &dyn RecordStore,
    patient_id: u32,
    policy: LookupPolicy,
) -> DischargeResult<PatientRecord> {
    if let Some(record) = store.find(patient_id) {
        tracing::debug!(patient_id, "record found");
        return Ok(record);
    }

    match policy {
        LookupPolicy::Strict => {
            tracing::debug!(patient_id, "record not found");
            Err(DischargeError::PatientNotFound(patient_id))
        }
        LookupPolicy::Substitute => {
            let substitute_id = store
                .known_ids()
                .into_iter()
                .next()
                .ok_or(DischargeError::PatientNotFound(patient_id))?;
            let mut record = store
                .find(substitute_id)
                .ok_or(DischargeError::PatientNotFound(patient_id))?;
            tracing::warn!(patient_id, substitute_id, "record not found, substituting similar record");
            record.patient_id = patient_id;
            Ok(record)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatasetFormat {
    Json,
    Yaml,
}

impl DatasetFormat {
    fn from_path(path: &Path) -> DischargeResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(DatasetFormat::Json),
            Some("yaml") | Some("yml") => Ok(DatasetFormat::Yaml),
            _ => Err(DischargeError::DatasetFormat(path.display().to_string())),
        }
    }
}

/// In-memory record store, optionally backed by a dataset file.
///
/// When backed, every successful [`RecordStore::add`] rewrites the file.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<u32, PatientRecord>>,
    backing: Option<(PathBuf, DatasetFormat)>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `records`, later identifiers replacing earlier duplicates.
    pub fn from_records(records: impl IntoIterator<Item = PatientRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.patient_id, r)).collect();
        Self {
            records: RwLock::new(map),
            backing: None,
        }
    }

    /// Loads a JSON or YAML dataset and keeps the file as the write-back target.
    ///
    /// # Errors
    ///
    /// Returns a dataset error if the file cannot be read, has an unsupported extension, or
    /// does not parse as an array of records.
    pub fn load_dataset(path: &Path) -> DischargeResult<Self> {
        let format = DatasetFormat::from_path(path)?;
        let raw = std::fs::read_to_string(path).map_err(DischargeError::DatasetRead)?;

        let records: Vec<PatientRecord> = match format {
            DatasetFormat::Json => serde_json::from_str(&raw).map_err(DischargeError::DatasetJson)?,
            DatasetFormat::Yaml => serde_yaml::from_str(&raw).map_err(DischargeError::DatasetYaml)?,
        };
        tracing::info!(count = records.len(), path = %path.display(), "dataset loaded");

        let mut store = Self::from_records(records);
        store.backing = Some((path.to_path_buf(), format));
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<u32, PatientRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<u32, PatientRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, records: &BTreeMap<u32, PatientRecord>) -> DischargeResult<()> {
        let Some((path, format)) = &self.backing else {
            return Ok(());
        };

        let all: Vec<&PatientRecord> = records.values().collect();
        let contents = match format {
            DatasetFormat::Json => {
                serde_json::to_string_pretty(&all).map_err(DischargeError::DatasetJson)?
            }
            DatasetFormat::Yaml => serde_yaml::to_string(&all).map_err(DischargeError::DatasetYaml)?,
        };
        // Staged beside the dataset, then renamed over it.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(DischargeError::DatasetWrite)?;
        staged
            .write_all(contents.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(DischargeError::DatasetWrite)?;
        staged
            .persist(path)
            .map(|_| ())
            .map_err(|e| DischargeError::DatasetWrite(e.error))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find(&self, patient_id: u32) -> Option<PatientRecord> {
        self.read().get(&patient_id).cloned()
    }

    fn known_ids(&self) -> BTreeSet<u32> {
        self.read().keys().copied().collect()
    }

    fn list_page(&self, page: usize, per_page: usize) -> DischargeResult<PatientPage> {
        if page == 0 {
            return Err(DischargeError::InvalidInput("page numbers start at 1".into()));
        }
        if per_page == 0 {
            return Err(DischargeError::InvalidInput("page size must be at least 1".into()));
        }

        let next_page = page
            .checked_add(1)
            .ok_or_else(|| DischargeError::InvalidInput(format!("page {page} is out of range")))?;

        let records = self.read();
        let offset = (page - 1).saturating_mul(per_page);
        let patients: Vec<PatientRecord> = records
            .values()
            .rev()
            .skip(offset)
            .take(per_page)
            .cloned()
            .collect();
        let has_more = offset.saturating_add(patients.len()) < records.len();

        Ok(PatientPage {
            patients,
            page,
            has_more,
            next_page,
        })
    }

    fn add(&self, patient: NewPatient) -> DischargeResult<PatientRecord> {
        let mut records = self.write();
        let next_id = records
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| DischargeError::InvalidInput("patient identifiers exhausted".into()))?;

        let record = patient.into_record(next_id);
        records.insert(next_id, record.clone());

        if let Err(e) = self.persist(&records) {
            records.remove(&next_id);
            return Err(e);
        }

        tracing::info!(patient_id = next_id, "patient added");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::GeneralHealth;

    fn store_with(ids: &[u32]) -> InMemoryRecordStore {
        InMemoryRecordStore::from_records(ids.iter().map(|&id| {
            let mut record = PatientRecord::new(id);
            record.name = Some(format!("Patient {id}"));
            record
        }))
    }

    #[test]
    fn strict_lookup_reports_not_found() {
        let store = store_with(&[1, 2]);
        assert_eq!(lookup(&store, 2, LookupPolicy::Strict).unwrap().patient_id, 2);
        assert!(matches!(
            lookup(&store, 9, LookupPolicy::Strict),
            Err(DischargeError::PatientNotFound(9))
        ));
    }

    #[test]
    fn substitute_lookup_rekeys_lowest_record() {
        let store = store_with(&[4, 7]);
        let record = lookup(&store, 99, LookupPolicy::Substitute).unwrap();
        assert_eq!(record.patient_id, 99);
        assert_eq!(record.name(), "Patient 4");
        assert!(!store.known_ids().contains(&99));
    }

    #[test]
    fn substitute_on_empty_store_is_not_found() {
        let store = InMemoryRecordStore::new();
        assert!(lookup(&store, 1, LookupPolicy::Substitute).is_err());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Strict".parse::<LookupPolicy>().unwrap(), LookupPolicy::Strict);
        assert_eq!(" SUBSTITUTE ".parse::<LookupPolicy>().unwrap(), LookupPolicy::Substitute);
        assert!("maybe".parse::<LookupPolicy>().is_err());
    }

    #[test]
    fn pages_are_newest_first() {
        let ids: Vec<u32> = (1..=250).collect();
        let store = store_with(&ids);

        let first = store.list_page(1, 100).unwrap();
        assert_eq!(first.patients.len(), 100);
        assert_eq!(first.patients[0].patient_id, 250);
        assert!(first.has_more);
        assert_eq!(first.next_page, 2);

        let last = store.list_page(3, 100).unwrap();
        assert_eq!(last.patients.len(), 50);
        assert_eq!(last.patients.last().unwrap().patient_id, 1);
        assert!(!last.has_more);

        assert!(store.list_page(4, 100).unwrap().patients.is_empty());
        assert!(store.list_page(0, 100).is_err());
    }

    #[test]
    fn last_representable_page_is_rejected() {
        let store = store_with(&[1]);
        assert!(matches!(
            store.list_page(usize::MAX, 100),
            Err(DischargeError::InvalidInput(_))
        ));
        assert!(store.list_page(usize::MAX - 1, 100).unwrap().patients.is_empty());
    }

    #[test]
    fn add_assigns_max_plus_one() {
        let store = store_with(&[3, 10]);
        let added = store.add(NewPatient::default()).unwrap();
        assert_eq!(added.patient_id, 11);
        assert!(store.known_ids().contains(&11));

        let empty = InMemoryRecordStore::new();
        assert_eq!(empty.add(NewPatient::default()).unwrap().patient_id, 1);
    }

    #[test]
    fn json_dataset_loads_and_persists_additions() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("patients.json");
        std::fs::write(
            &path,
            r#"[{"PatientID": 1, "Name": "Ravi", "GeneralHealth": "Good"},
                {"patient_id": 2, "general_health": "Fair", "has_chronic_condition": true}]"#,
        )
        .unwrap();

        let store = InMemoryRecordStore::load_dataset(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.find(1).unwrap().general_health(), GeneralHealth::Good);

        store
            .add(NewPatient {
                name: Some("Meera".into()),
                ..NewPatient::default()
            })
            .unwrap();

        let reloaded = InMemoryRecordStore::load_dataset(&path).unwrap();
        assert_eq!(reloaded.find(3).unwrap().name(), "Meera");
    }

    #[test]
    fn write_back_keeps_other_records_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("patients.json");
        std::fs::write(
            &path,
            r#"[{"PatientID": 1, "GeneralHealth": "Very Good", "RiskCategory": "obese"}]"#,
        )
        .unwrap();

        let store = InMemoryRecordStore::load_dataset(&path).unwrap();
        store.add(NewPatient::default()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Very Good"));
        assert!(raw.contains("obese"));

        let reloaded = InMemoryRecordStore::load_dataset(&path).unwrap();
        let first = reloaded.find(1).unwrap();
        assert_eq!(first.general_health.as_deref(), Some("Very Good"));
        assert_eq!(first.risk_category.as_deref(), Some("obese"));
        assert_eq!(reloaded.len(), 2);

        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn yaml_dataset_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("patients.yml");
        std::fs::write(&path, "- PatientID: 5\n  RiskCategory: Obese\n").unwrap();

        let store = InMemoryRecordStore::load_dataset(&path).unwrap();
        assert_eq!(store.known_ids().into_iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("patients.csv");
        std::fs::write(&path, "PatientID\n1\n").unwrap();
        assert!(matches!(
            InMemoryRecordStore::load_dataset(&path),
            Err(DischargeError::DatasetFormat(_))
        ));
    }
}
