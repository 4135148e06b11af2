use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use labo_core::model::{Patient, RequestDetail};
use labo_core::patients::{NewPatient, PatientPage, PatientPatch, PatientService};
use labo_core::requests::RequestService;
use labo_types::Role;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

use super::MessageRes;

/// Query parameters of the patient listing.
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListPatientsQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub search: Option<String>,
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = NewPatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid fields or duplicate CIN"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Register a new patient (secretary or admin).
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    let patient = PatientService::new(state.store.clone()).create_patient(req)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients",
    params(ListPatientsQuery),
    responses(
        (status = 200, description = "One page of patients", body = PatientPage)
    )
)]
/// List non-deleted patients with pagination and search.
///
/// `search` matches the full name or the CIN, case-insensitively.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<ListPatientsQuery>,
) -> Result<Json<PatientPage>, ApiError> {
    let page = PatientService::new(state.store.clone()).list_patients(
        query.page,
        query.limit,
        query.search.as_deref(),
    )?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = Patient),
        (status = 404, description = "Absent or soft-deleted")
    )
)]
/// Fetch one patient. Soft-deleted patients answer 404.
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let patient = PatientService::new(state.store.clone()).get_patient(id)?;
    Ok(Json(patient))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body = PatientPatch,
    responses(
        (status = 200, description = "Updated patient", body = Patient),
        (status = 400, description = "Invalid fields or duplicate CIN"),
        (status = 404, description = "Absent or soft-deleted")
    )
)]
/// Partially update a patient (secretary or admin). Only provided fields
/// change.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PatientPatch>,
) -> Result<Json<Patient>, ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    let patient = PatientService::new(state.store.clone()).update_patient(id, patch)?;
    Ok(Json(patient))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient soft-deleted", body = MessageRes),
        (status = 404, description = "Absent or already deleted")
    )
)]
/// Soft-delete a patient (secretary or admin). The record survives for
/// historical requests and reports.
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageRes>, ApiError> {
    require_role(&user, &[Role::Secretary, Role::Admin])?;

    PatientService::new(state.store.clone()).soft_delete_patient(id)?;
    Ok(Json(MessageRes {
        message: "Patient deleted successfully".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/history",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "All requests for the patient, newest first", body = [RequestDetail]),
        (status = 404, description = "Unknown patient")
    )
)]
/// Full request history for one patient, newest first.
///
/// Unlike the plain patient lookup this also works for soft-deleted
/// patients; history must survive deletion.
#[axum::debug_handler]
pub async fn patient_history(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RequestDetail>>, ApiError> {
    let history = RequestService::new(state.store.clone()).history_for_patient(id)?;
    Ok(Json(history))
}
