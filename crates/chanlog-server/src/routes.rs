use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chanlog_core::error::AppError;
use chanlog_core::export;
use chanlog_core::job::ExportRequest;
use chanlog_core::models::ExportFormat;

use crate::dto::{
    CreateExportRequest, CreateExportResponse, CredentialResponse, ExportStatusResponse,
    HealthResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/exports", post(create_export))
        .route("/v1/exports/status", get(export_status))
        .route("/v1/exports/files/{name}", get(download_export))
        .route("/v1/credential", get(credential));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/exports",
    request_body = CreateExportRequest,
    responses(
        (status = 202, description = "Export accepted", body = CreateExportResponse),
        (status = 400, description = "Bad request", body = crate::dto::ErrorResponse),
        (status = 409, description = "An export is already running", body = crate::dto::ErrorResponse),
    ),
    tag = "exports"
)]
pub async fn create_export(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match body.format.as_deref().map(str::trim) {
        None | Some("") => ExportFormat::default(),
        Some(raw) => raw.parse().map_err(AppError::ValidationError)?,
    };

    let request = ExportRequest::new(
        body.urls,
        body.date_from.as_deref(),
        body.date_to.as_deref(),
        format,
    )?;
    let task_id = state.jobs.submit(request)?;

    let response = CreateExportResponse {
        task_id,
        status: "accepted".to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/exports/status",
    responses(
        (status = 200, description = "Current export status", body = ExportStatusResponse),
    ),
    tag = "exports"
)]
pub async fn export_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(ExportStatusResponse::from(state.jobs.status()))
}

#[utoipa::path(
    get,
    path = "/v1/exports/files/{name}",
    params(
        ("name" = String, Path, description = "Export file name")
    ),
    responses(
        (status = 200, description = "Export file contents"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "exports"
)]
pub async fn download_export(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = export::resolve_download(&state.jobs.config().export_dir, &name)?;
    let bytes = tokio::fs::read(&path).await.map_err(AppError::from)?;

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/credential",
    responses(
        (status = 200, description = "Whether a bot token is configured", body = CredentialResponse),
    ),
    tag = "system"
)]
pub async fn credential(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(CredentialResponse {
        configured: state.jobs.has_credential(),
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        export_running: state.jobs.is_running(),
    })
}
