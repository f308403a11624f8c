//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads environment variables; the binaries
//! read them once, run them through the `*_from_env_value` parsers here and build a
//! [`CoreConfig`].

use crate::constants::{
    DEFAULT_ARTIFACT_CAPACITY, DEFAULT_ARTIFACT_DISK_CAPACITY, DEFAULT_GENERATION_TIMEOUT_SECS,
    DEFAULT_OLLAMA_MODEL,
};
use crate::store::LookupPolicy;
use crate::{DischargeError, DischargeResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where to reach the optional narrative model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    dataset_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    artifact_capacity: usize,
    artifact_disk_capacity: usize,
    logo_path: Option<PathBuf>,
    lookup_policy: LookupPolicy,
    generation_timeout: Duration,
    ollama: Option<OllamaSettings>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            artifact_dir: None,
            artifact_capacity: DEFAULT_ARTIFACT_CAPACITY,
            artifact_disk_capacity: DEFAULT_ARTIFACT_DISK_CAPACITY,
            logo_path: None,
            lookup_policy: LookupPolicy::Strict,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            ollama: None,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::InvalidInput` if the artifact capacity or generation timeout is
    /// zero.
    pub fn new(
        dataset_path: Option<PathBuf>,
        artifact_dir: Option<PathBuf>,
        artifact_capacity: usize,
        logo_path: Option<PathBuf>,
        lookup_policy: LookupPolicy,
        generation_timeout: Duration,
        ollama: Option<OllamaSettings>,
    ) -> DischargeResult<Self> {
        if artifact_capacity == 0 {
            return Err(DischargeError::InvalidInput(
                "artifact capacity must be at least 1".into(),
            ));
        }
        if generation_timeout.is_zero() {
            return Err(DischargeError::InvalidInput(
                "generation timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            dataset_path,
            artifact_dir,
            artifact_capacity,
            artifact_disk_capacity: DEFAULT_ARTIFACT_DISK_CAPACITY.max(artifact_capacity),
            logo_path,
            lookup_policy,
            generation_timeout,
            ollama,
        })
    }

    pub fn dataset_path(&self) -> Option<&Path> {
        self.dataset_path.as_deref()
    }

    pub fn artifact_dir(&self) -> Option<&Path> {
        self.artifact_dir.as_deref()
    }

    pub fn artifact_capacity(&self) -> usize {
        self.artifact_capacity
    }

    /// Bound on documents kept in the artifact directory; never below the memory capacity.
    pub fn artifact_disk_capacity(&self) -> usize {
        self.artifact_disk_capacity
    }

    /// Replaces the artifact directory bound.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::InvalidInput` if `disk_capacity` is below the in-memory
    /// artifact capacity.
    pub fn with_artifact_disk_capacity(mut self, disk_capacity: usize) -> DischargeResult<Self> {
        if disk_capacity < self.artifact_capacity {
            return Err(DischargeError::InvalidInput(format!(
                "artifact disk capacity {disk_capacity} is below the in-memory capacity {}",
                self.artifact_capacity
            )));
        }
        self.artifact_disk_capacity = disk_capacity;
        Ok(self)
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }

    pub fn lookup_policy(&self) -> LookupPolicy {
        self.lookup_policy
    }

    pub fn generation_timeout(&self) -> Duration {
        self.generation_timeout
    }

    pub fn ollama(&self) -> Option<&OllamaSettings> {
        self.ollama.as_ref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the record-miss policy from an optional string value.
///
/// `None` or blank selects [`LookupPolicy::Strict`].
pub fn lookup_policy_from_env_value(value: Option<String>) -> DischargeResult<LookupPolicy> {
    non_blank(value)
        .map(|v| v.parse::<LookupPolicy>())
        .transpose()
        .map(|p| p.unwrap_or(LookupPolicy::Strict))
}

/// Parse the in-memory artifact capacity from an optional string value.
pub fn artifact_capacity_from_env_value(value: Option<String>) -> DischargeResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_ARTIFACT_CAPACITY),
        Some(v) => v.parse::<usize>().map_err(|e| {
            DischargeError::InvalidInput(format!("invalid artifact capacity {v:?}: {e}"))
        }),
    }
}

/// Parse the artifact directory bound from an optional string value.
///
/// `None` or blank keeps the configured default.
pub fn artifact_disk_capacity_from_env_value(
    value: Option<String>,
) -> DischargeResult<Option<usize>> {
    non_blank(value)
        .map(|v| {
            v.parse::<usize>().map_err(|e| {
                DischargeError::InvalidInput(format!("invalid artifact disk capacity {v:?}: {e}"))
            })
        })
        .transpose()
}

/// Parse the narrative generation timeout (whole seconds) from an optional string value.
pub fn generation_timeout_from_env_value(value: Option<String>) -> DischargeResult<Duration> {
    match non_blank(value) {
        None => Ok(Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS)),
        Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|e| {
            DischargeError::InvalidInput(format!("invalid generation timeout {v:?}: {e}"))
        }),
    }
}

/// Build Ollama settings from optional URL and model values.
///
/// No URL means no model: the narrative capability is then reported as unavailable.
pub fn ollama_from_env_values(
    url: Option<String>,
    model: Option<String>,
) -> Option<OllamaSettings> {
    non_blank(url).map(|base_url| OllamaSettings {
        base_url: base_url.trim_end_matches('/').to_string(),
        model: non_blank(model).unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
    })
}

/// Resolve the optional on-disk artifact directory, creating it if needed.
///
/// # Errors
///
/// Returns `DischargeError::InvalidInput` if the path exists but is not a directory, or if it
/// cannot be created.
pub fn resolve_artifact_dir(value: Option<String>) -> DischargeResult<Option<PathBuf>> {
    let Some(dir) = non_blank(value).map(PathBuf::from) else {
        return Ok(None);
    };

    if dir.exists() && !dir.is_dir() {
        return Err(DischargeError::InvalidInput(format!(
            "artifact path {} is not a directory",
            dir.display()
        )));
    }

    std::fs::create_dir_all(&dir).map_err(|e| {
        DischargeError::InvalidInput(format!(
            "cannot create artifact directory {}: {e}",
            dir.display()
        ))
    })?;

    Ok(Some(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_policy_defaults_to_strict() {
        assert_eq!(lookup_policy_from_env_value(None).unwrap(), LookupPolicy::Strict);
        assert_eq!(
            lookup_policy_from_env_value(Some("  ".into())).unwrap(),
            LookupPolicy::Strict
        );
        assert_eq!(
            lookup_policy_from_env_value(Some("substitute".into())).unwrap(),
            LookupPolicy::Substitute
        );
        assert!(lookup_policy_from_env_value(Some("guess".into())).is_err());
    }

    #[test]
    fn numeric_settings_parse_or_default() {
        assert_eq!(artifact_capacity_from_env_value(None).unwrap(), 64);
        assert_eq!(artifact_capacity_from_env_value(Some("8".into())).unwrap(), 8);
        assert!(artifact_capacity_from_env_value(Some("many".into())).is_err());

        assert_eq!(
            generation_timeout_from_env_value(Some("2".into())).unwrap(),
            Duration::from_secs(2)
        );
        assert_eq!(
            generation_timeout_from_env_value(None).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn ollama_requires_a_url() {
        assert_eq!(ollama_from_env_values(None, Some("m".into())), None);

        let settings =
            ollama_from_env_values(Some("http://localhost:11434/".into()), None).unwrap();
        assert_eq!(settings.base_url, "http://localhost:11434");
        assert_eq!(settings.model, DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = CoreConfig::new(
            None,
            None,
            0,
            None,
            LookupPolicy::Strict,
            Duration::from_secs(1),
            None,
        );
        assert!(matches!(result, Err(DischargeError::InvalidInput(_))));
    }

    #[test]
    fn disk_capacity_is_validated_against_memory() {
        assert_eq!(artifact_disk_capacity_from_env_value(None).unwrap(), None);
        assert_eq!(
            artifact_disk_capacity_from_env_value(Some("100".into())).unwrap(),
            Some(100)
        );
        assert!(artifact_disk_capacity_from_env_value(Some("-1".into())).is_err());

        let cfg = CoreConfig::new(
            None,
            None,
            16,
            None,
            LookupPolicy::Strict,
            Duration::from_secs(1),
            None,
        )
        .unwrap();
        assert!(matches!(
            cfg.clone().with_artifact_disk_capacity(4),
            Err(DischargeError::InvalidInput(_))
        ));
        assert_eq!(
            cfg.with_artifact_disk_capacity(32)
                .unwrap()
                .artifact_disk_capacity(),
            32
        );
    }

    #[test]
    fn artifact_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out").join("docs");
        let resolved = resolve_artifact_dir(Some(target.display().to_string()))
            .unwrap()
            .unwrap();
        assert!(resolved.is_dir());

        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(resolve_artifact_dir(Some(file.display().to_string())).is_err());
    }
}
