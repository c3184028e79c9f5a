use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "chanlog API",
        version = "0.1.0",
        description = "Export chat channels and forum threads to CSV, text or HTML."
    ),
    paths(
        crate::routes::create_export,
        crate::routes::export_status,
        crate::routes::download_export,
        crate::routes::credential,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateExportRequest,
        crate::dto::CreateExportResponse,
        crate::dto::ExportStatusResponse,
        crate::dto::ExportSummaryResponse,
        crate::dto::ThreadSummaryResponse,
        crate::dto::CredentialResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "exports", description = "Export job submission, status and downloads"),
        (name = "system", description = "Health and credential status"),
    )
)]
pub struct ApiDoc;
