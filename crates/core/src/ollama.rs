//! Ollama-backed narrative generator.
//!
//! Talks to a local Ollama server over its HTTP API (`/api/generate`, `/api/tags`). Calls are
//! blocking; the augmentation adapter runs them on a worker thread.

use crate::augmentation::{GenerationError, GenerationParams, NarrativeCapability, NarrativeGenerator};
use crate::config::OllamaSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Generator backed by a single Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

/// Sampling options understood by `/api/generate`.
///
/// Ollama has no minimum-length, candidate-count or input-truncation options, so
/// `min_length`, `num_return_sequences` and `truncation` are not sent; a single completion is
/// always returned and short output is rejected by the adapter instead. Greedy decoding
/// (`do_sample = false`) is expressed as temperature zero.
#[derive(Debug, Serialize, PartialEq)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

impl From<&GenerationParams> for GenerateOptions {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: if params.do_sample { params.temperature } else { 0.0 },
            num_predict: params.max_length,
        }
    }
}

/// Whether `wanted` names one of the `installed` models.
///
/// Names match exactly; an untagged name also matches its `:latest` tag.
fn model_installed(installed: &[String], wanted: &str) -> bool {
    installed.iter().any(|name| {
        name == wanted
            || (!wanted.contains(':')
                && name
                    .strip_suffix(":latest")
                    .is_some_and(|base| base == wanted))
    })
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaGenerator {
    pub fn new(settings: &OllamaSettings, timeout: Duration) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // Built per call so the client never outlives the thread that uses it.
    fn client(&self) -> Result<reqwest::blocking::Client, GenerationError> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| GenerationError::HttpClient(e.to_string()))
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_connect() {
            GenerationError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            GenerationError::TimedOut(self.timeout)
        } else {
            GenerationError::HttpClient(e.to_string())
        }
    }

    /// Lists the names of installed models.
    pub fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client()?
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Checks that the server is reachable and the configured model is installed.
    pub fn check_available(&self) -> Result<(), GenerationError> {
        let models = self.list_models()?;
        if model_installed(&models, &self.model) {
            Ok(())
        } else {
            Err(GenerationError::ModelMissing(self.model.clone()))
        }
    }
}

impl NarrativeGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions::from(params),
        };

        let response = self
            .client()?
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;
        Ok(parsed.response)
    }
}

/// Sets up the narrative capability once at startup.
///
/// Without settings, or when the server or model cannot be reached, the capability is
/// `Unavailable` and every summary takes the templated fallback. Blocking; call it off any
/// async executor.
pub fn probe_capability(settings: Option<&OllamaSettings>, timeout: Duration) -> NarrativeCapability {
    let Some(settings) = settings else {
        tracing::info!("no narrative model configured");
        return NarrativeCapability::Unavailable;
    };

    let generator = OllamaGenerator::new(settings, timeout);
    match generator.check_available() {
        Ok(()) => {
            tracing::info!(model = %generator.model(), url = %settings.base_url, "narrative model available");
            NarrativeCapability::Available(Arc::new(generator))
        }
        Err(e) => {
            tracing::warn!(error = %e, model = %settings.model, "narrative model unavailable");
            NarrativeCapability::Unavailable
        }
    }
}
