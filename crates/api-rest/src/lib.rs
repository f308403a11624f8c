//! # API REST
//!
//! REST API implementation for discharge summary generation.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for wire types and `discharge-core` for all domain logic. The generation
//! pipeline is synchronous and runs on the blocking thread pool.

#![warn(rust_2018_idioms)]

use api_shared::{
    CreatePatientReq, CreatePatientRes, ErrorRes, GenerateReq, GenerateRes, HealthRes,
    HealthService, ListPatientsRes, PatientRes, PreviewRes, SummaryRes,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use discharge_core::constants::DOCUMENT_DOWNLOAD_NAME;
use discharge_core::{DischargeError, DischargeService, ErrorCategory};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server.
#[derive(Clone)]
pub struct AppState {
    service: Arc<DischargeService>,
}

impl AppState {
    pub fn new(service: Arc<DischargeService>) -> Self {
        Self { service }
    }
}

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Core(DischargeError),
    /// The blocking task running the pipeline panicked or was cancelled.
    Worker(String),
}

impl From<DischargeError> for ApiError {
    fn from(err: DischargeError) -> Self {
        ApiError::Core(err)
    }
}

fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Input => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Synthesis | ErrorCategory::Render | ErrorCategory::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Core(err) => {
                let status = status_for(err.category());
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                } else {
                    tracing::debug!(error = %err, "request rejected");
                }
                (status, ErrorRes::from(err))
            }
            ApiError::Worker(detail) => {
                tracing::error!(%detail, "pipeline task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorRes {
                        error: "Failed to generate summary".into(),
                        category: "internal".into(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Runs a synchronous service call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&DischargeService) -> Result<T, DischargeError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        preview_patient,
        generate,
        download,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PatientRes,
        ListPatientsRes,
        CreatePatientReq,
        CreatePatientRes,
        PreviewRes,
        GenerateReq,
        GenerateRes,
        SummaryRes,
    ))
)]
pub struct ApiDoc;

/// Builds the router with every endpoint, Swagger UI and permissive CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id/preview", get(preview_patient))
        .route("/generate", post(generate))
        .route("/download/:handle", get(download))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint
///
/// Also reports whether narrative notes come from a model.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(
        state.service.narrative_available(),
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ListQuery {
    /// 1-based page number (default 1).
    page: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of patients, newest first", body = ListPatientsRes),
        (status = 400, description = "Invalid page", body = ErrorRes)
    )
)]
/// List stored patients, 100 per page
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListPatientsRes>> {
    let page = query.page.unwrap_or(1);
    let listed = blocking(&state, move |service| service.list_patients(page)).await?;
    tracing::info!(page, count = listed.patients.len(), has_more = listed.has_more, "patients listed");
    Ok(Json(ListPatientsRes::from(&listed)))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient created", body = CreatePatientRes),
        (status = 500, description = "Dataset could not be written", body = ErrorRes)
    )
)]
/// Add a patient under the next free identifier
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<CreatePatientReq>,
) -> ApiResult<(StatusCode, Json<CreatePatientRes>)> {
    let record = blocking(&state, move |service| service.add_patient(req.into())).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePatientRes {
            message: format!("Patient added with ID {}", record.patient_id),
            patient: PatientRes::from(&record),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/preview",
    params(("id" = String, Path, description = "Patient identifier (positive integer)")),
    responses(
        (status = 200, description = "Patient preview", body = PreviewRes),
        (status = 400, description = "Invalid identifier", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// Preview a patient before generating a summary
#[axum::debug_handler]
async fn preview_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PreviewRes>> {
    let preview = blocking(&state, move |service| service.preview(&id)).await?;
    Ok(Json(preview.into()))
}

#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateReq,
    responses(
        (status = 200, description = "Summary generated and rendered", body = GenerateRes),
        (status = 400, description = "Invalid identifier or date", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Synthesis or rendering failed", body = ErrorRes)
    )
)]
/// Generate a discharge summary and its PDF
///
/// The response carries the summary sections and a document handle for `/download/{handle}`.
#[axum::debug_handler]
async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateReq>,
) -> ApiResult<Json<GenerateRes>> {
    tracing::info!(patient_id = %req.patient_id, "received generate request");
    let request: discharge_core::GenerationRequest = req.into();
    let outcome = blocking(&state, move |service| service.generate(&request)).await?;
    Ok(Json(GenerateRes {
        summary: SummaryRes::from(&outcome.summary),
        document: outcome.document.to_string(),
        pdf_file: DOCUMENT_DOWNLOAD_NAME.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/download/{handle}",
    params(("handle" = String, Path, description = "Document handle from /generate")),
    responses(
        (status = 200, description = "Rendered PDF (application/pdf, attachment)"),
        (status = 404, description = "Unknown, evicted or malformed handle", body = ErrorRes)
    )
)]
/// Download a rendered discharge summary
#[axum::debug_handler]
async fn download(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ApiResult<Response> {
    tracing::info!(%handle, "downloading document");
    let bytes = state.service.download(&handle)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOCUMENT_DOWNLOAD_NAME}\""),
            ),
        ],
        bytes.as_ref().clone(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use discharge_core::{
        CoreConfig, InMemoryRecordStore, LookupPolicy, NarrativeCapability, PatientRecord,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app(policy: LookupPolicy) -> Router {
        let mut record = PatientRecord::new(1);
        record.name = Some("Ravi Kumar".into());
        record.general_health = Some("Good".into());
        record.risk_category = Some("Normal".into());

        let store = Arc::new(InMemoryRecordStore::from_records([record]));
        let cfg = CoreConfig::new(None, None, 8, None, policy, Duration::from_secs(1), None)
            .unwrap();
        let service = DischargeService::new(&cfg, store, NarrativeCapability::Unavailable);
        app(AppState::new(Arc::new(service)))
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = test_app(LookupPolicy::Strict).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["narrative_model"], false);
    }

    #[tokio::test]
    async fn generate_then_download() {
        let app = test_app(LookupPolicy::Strict);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/generate",
                r#"{"patient_id": "1", "discharge_date": "2025-04-13"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["summary"]["condition"], "Stable");
        assert_eq!(body["summary"]["is_fallback"], false);
        assert_eq!(body["pdf_file"], "discharge_summary.pdf");

        let handle = body["document"].as_str().unwrap().to_string();
        let response = app.oneshot(get_request(&format!("/download/{handle}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn invalid_patient_id_is_bad_request() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(json_request("POST", "/generate", r#"{"patient_id": "abc"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["category"], "input");
    }

    #[tokio::test]
    async fn bad_discharge_date_is_bad_request() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(json_request(
                "POST",
                "/generate",
                r#"{"patient_id": "1", "discharge_date": "13-04-2025"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(json_request("POST", "/generate", r#"{"patient_id": "42"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["category"], "not_found");
        assert_eq!(body["error"], "no patient found with ID 42");
    }

    #[tokio::test]
    async fn substitute_policy_marks_fallback() {
        let response = test_app(LookupPolicy::Substitute)
            .oneshot(json_request(
                "POST",
                "/generate",
                r#"{"patient_id": "42", "discharge_date": "2025-04-13"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["summary"]["is_fallback"], true);
    }

    #[tokio::test]
    async fn malformed_handle_is_not_found() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(get_request("/download/discharge_summary.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preview_and_listing() {
        let app = test_app(LookupPolicy::Strict);

        let response = app.clone().oneshot(get_request("/patients/1/preview")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["disease"], "Acute Respiratory Infection");
        assert_eq!(body["name"], "Ravi Kumar");

        let response = app.clone().oneshot(get_request("/patients/x/preview")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/patients", r#"{"name": "Meera"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["patient"]["patient_id"], 2);

        let response = app.oneshot(get_request("/patients?page=1")).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["patients"][0]["name"], "Meera");
        assert_eq!(body["has_more"], false);
        assert_eq!(body["next_page"], 2);
    }

    #[tokio::test]
    async fn page_zero_is_bad_request() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(get_request("/patients?page=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn page_past_the_last_number_is_bad_request() {
        let response = test_app(LookupPolicy::Strict)
            .oneshot(get_request(&format!("/patients?page={}", usize::MAX)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["category"], "input");
    }
}
