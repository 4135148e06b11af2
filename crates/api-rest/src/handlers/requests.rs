use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use labo_core::model::{AnalysisRequest, RequestDetail};
use labo_core::requests::{NewAnalysisRequest, RequestFilter, RequestPatch, RequestService};
use labo_types::{RequestStatus, Role};

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

use super::MessageRes;

/// Query parameters of the request listing.
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

/// Body of the status override.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct StatusUpdateBody {
    pub status: RequestStatus,
}

#[utoipa::path(
    post,
    path = "/analyses",
    request_body = NewAnalysisRequest,
    responses(
        (status = 201, description = "Request created with one empty result per type id", body = AnalysisRequest),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Unknown patient"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Create an analysis request (secretary or admin).
///
/// Returns the bare request; fetch `/analyses/{id}` for the joined detail.
#[axum::debug_handler]
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewAnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisRequest>), ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    let request = RequestService::new(state.store.clone()).create_request(req)?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/analyses",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first, joined with patient and results", body = [RequestDetail])
    )
)]
/// List analysis requests, optionally filtered by status and patient.
#[axum::debug_handler]
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<RequestDetail>>, ApiError> {
    let requests = RequestService::new(state.store.clone()).list_requests(RequestFilter {
        status: query.status,
        patient_id: query.patient_id,
    })?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/analyses/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "The joined request detail", body = RequestDetail),
        (status = 404, description = "Unknown request")
    )
)]
/// Fetch one request with its patient and results joined.
#[axum::debug_handler]
pub async fn get_request(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>, ApiError> {
    let detail = RequestService::new(state.store.clone()).get_request(id)?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/analyses/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = RequestPatch,
    responses(
        (status = 200, description = "Updated request detail", body = RequestDetail),
        (status = 404, description = "Unknown request or patient"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Partially update a request (secretary or admin).
#[axum::debug_handler]
pub async fn update_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<RequestPatch>,
) -> Result<Json<RequestDetail>, ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    let detail = RequestService::new(state.store.clone()).update_request(id, patch)?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/analyses/{id}/status",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = StatusUpdateBody,
    responses(
        (status = 200, description = "Request with the overridden status", body = AnalysisRequest),
        (status = 404, description = "Unknown request"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Administrative status override (admin or technician).
///
/// Deliberately unguarded: any status, any direction, regardless of result
/// state. The automatic completion transition lives in the result engine;
/// this endpoint is the manual escape hatch.
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdateBody>,
) -> Result<Json<AnalysisRequest>, ApiError> {
    require_role(&user, &[Role::Admin, Role::Technician])?;

    let request = RequestService::new(state.store.clone()).update_status(id, body.status)?;
    Ok(Json(request))
}

#[utoipa::path(
    delete,
    path = "/analyses/{id}",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request and its results deleted", body = MessageRes),
        (status = 404, description = "Unknown request"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Delete a request and cascade-delete its results (secretary or admin).
#[axum::debug_handler]
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageRes>, ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    RequestService::new(state.store.clone()).delete_request(id)?;
    Ok(Json(MessageRes {
        message: "Analysis request deleted successfully".into(),
    }))
}
