use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use discharge_core::config::{
    artifact_capacity_from_env_value, artifact_disk_capacity_from_env_value,
    generation_timeout_from_env_value, lookup_policy_from_env_value, ollama_from_env_values,
    resolve_artifact_dir,
};
use discharge_core::ollama::probe_capability;
use discharge_core::{CoreConfig, DischargeService, InMemoryRecordStore, RecordStore};

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reads the environment once and builds the core configuration.
fn config_from_env() -> anyhow::Result<CoreConfig> {
    let cfg = CoreConfig::new(
        env_value("DISCHARGE_DATASET").map(PathBuf::from),
        resolve_artifact_dir(env_value("DISCHARGE_ARTIFACT_DIR"))?,
        artifact_capacity_from_env_value(env_value("DISCHARGE_ARTIFACT_CAPACITY"))?,
        env_value("DISCHARGE_LOGO_PATH").map(PathBuf::from),
        lookup_policy_from_env_value(env_value("DISCHARGE_LOOKUP_POLICY"))?,
        generation_timeout_from_env_value(env_value("DISCHARGE_GENERATION_TIMEOUT_SECS"))?,
        ollama_from_env_values(env_value("OLLAMA_URL"), env_value("OLLAMA_MODEL")),
    )?;
    match artifact_disk_capacity_from_env_value(env_value("DISCHARGE_ARTIFACT_DISK_CAPACITY"))? {
        Some(disk_capacity) => Ok(cfg.with_artifact_disk_capacity(disk_capacity)?),
        None => Ok(cfg),
    }
}

/// Main entry point for the discharge summary server
///
/// Loads the patient dataset, probes the narrative model once and serves the REST API.
///
/// # Environment Variables
/// - `DISCHARGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DISCHARGE_DATASET`: JSON or YAML patient dataset (default: empty store)
/// - `DISCHARGE_ARTIFACT_DIR`: Directory that also keeps rendered PDFs on disk
/// - `DISCHARGE_ARTIFACT_CAPACITY`: Rendered documents kept in memory (default: 64)
/// - `DISCHARGE_ARTIFACT_DISK_CAPACITY`: Rendered documents kept in the artifact directory (default: 512)
/// - `DISCHARGE_LOGO_PATH`: PNG logo drawn in the document header
/// - `DISCHARGE_LOOKUP_POLICY`: `strict` (default) or `substitute`
/// - `DISCHARGE_GENERATION_TIMEOUT_SECS`: Narrative model deadline (default: 5)
/// - `OLLAMA_URL` / `OLLAMA_MODEL`: Narrative model endpoint; unset means templated notes only
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("discharge_run=info".parse()?)
                .add_directive("discharge_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("DISCHARGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = config_from_env()?;

    let store: Arc<dyn RecordStore> = match cfg.dataset_path() {
        Some(path) => Arc::new(InMemoryRecordStore::load_dataset(path)?),
        None => {
            tracing::warn!("DISCHARGE_DATASET not set, starting with an empty patient store");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    let probe_settings = cfg.ollama().cloned();
    let timeout = cfg.generation_timeout();
    let capability =
        tokio::task::spawn_blocking(move || probe_capability(probe_settings.as_ref(), timeout))
            .await?;
    tracing::info!(
        narrative_model = capability.is_available(),
        policy = ?cfg.lookup_policy(),
        "narrative capability resolved"
    );

    let service = Arc::new(DischargeService::new(&cfg, store, capability));
    let app = api_rest::app(AppState::new(service));

    tracing::info!("++ Starting discharge REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
