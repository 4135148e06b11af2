use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;

use labo_core::catalog::{CatalogService, NewAnalysisType};
use labo_core::model::AnalysisType;
use labo_types::Role;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/analyses/types",
    request_body = NewAnalysisType,
    responses(
        (status = 201, description = "Analysis type created", body = AnalysisType),
        (status = 400, description = "Invalid fields or duplicate name"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Create a new analysis type (admin only).
///
/// # Errors
///
/// Returns `400 Bad Request` on blank fields, non-finite numerics, a
/// reversed reference range, or a duplicate name; `403 Forbidden` for
/// non-admin callers.
#[axum::debug_handler]
pub async fn create_analysis_type(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewAnalysisType>,
) -> Result<(StatusCode, Json<AnalysisType>), ApiError> {
    require_role(&user, &[Role::Admin])?;

    let ty = CatalogService::new(state.store.clone()).create_analysis_type(req)?;
    Ok((StatusCode::CREATED, Json(ty)))
}

#[utoipa::path(
    get,
    path = "/analyses/types",
    responses(
        (status = 200, description = "All analysis types", body = [AnalysisType]),
        (status = 401, description = "Missing or invalid token")
    )
)]
/// List every analysis type. No pagination; the catalog is small.
#[axum::debug_handler]
pub async fn list_analysis_types(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Vec<AnalysisType>>, ApiError> {
    let types = CatalogService::new(state.store.clone()).list_analysis_types()?;
    Ok(Json(types))
}
