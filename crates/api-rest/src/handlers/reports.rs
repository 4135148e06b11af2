use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use uuid::Uuid;

use labo_core::report::ReportService;
use labo_types::Role;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/analyses/{id}/pdf",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "The analysis report as application/pdf"),
        (status = 404, description = "Unknown request"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Generate the PDF report for a request (doctor or admin).
///
/// The core supplies a fully-joined snapshot (voided results excluded);
/// the renderer only formats it.
#[axum::debug_handler]
pub async fn request_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    require_role(&user, &[Role::Medecin, Role::Admin])?;

    let snapshot = ReportService::new(state.cfg.clone(), state.store.clone()).snapshot(id)?;
    let bytes = labo_report::render_request_report(&snapshot)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=rapport_{}.pdf", snapshot.request.id.simple()),
            ),
        ],
        bytes,
    )
        .into_response())
}
