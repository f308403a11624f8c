//! Exact-match versus substituted-record provenance.

use std::collections::BTreeSet;

/// True when `patient_id` is not among the identifiers the store currently holds, i.e. the
/// summary was built from a substituted "similar" record.
pub fn is_fallback(patient_id: u32, known_ids: &BTreeSet<u32>) -> bool {
    !known_ids.contains(&patient_id)
}
