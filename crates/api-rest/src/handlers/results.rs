use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::Extension;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use labo_core::model::{AnalysisResult, ResultDetail};
use labo_core::results::{
    ResultFilter, ResultPage, ResultService, SubmitOutcome, SubmitResultEntry,
};
use labo_types::Role;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

/// Body of a measurement submission.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct SubmitResultsBody {
    pub results: Vec<SubmitResultEntry>,
}

/// Body of a void request.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct VoidBody {
    pub reason: String,
}

/// Query parameters of the result search.
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListResultsQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub analysis_type_id: Option<Uuid>,
    #[serde(default)]
    pub request_id: Option<Uuid>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub is_abnormal: Option<bool>,
    #[serde(default)]
    pub is_voided: Option<bool>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[utoipa::path(
    put,
    path = "/analyses/{id}/results",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = SubmitResultsBody,
    responses(
        (status = 200, description = "Measurements applied; unknown result ids reported in `skipped`", body = SubmitOutcome),
        (status = 400, description = "Non-finite value"),
        (status = 404, description = "Unknown request"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Enter measurements for a request (technician or admin).
///
/// Each value is judged against its type's reference range; the request's
/// completion is recomputed afterwards in the same atomic step. Entries
/// naming unknown result ids are skipped and listed in the response.
#[axum::debug_handler]
pub async fn submit_results(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitResultsBody>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    require_role(&user, &[Role::Technician, Role::Admin])?;

    let outcome = ResultService::new(state.store.clone()).submit_results(
        id,
        &body.results,
        user.user_id,
    )?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/analyses/{id}/results",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "All results of the request, voided included", body = [ResultDetail]),
        (status = 404, description = "Unknown request")
    )
)]
/// All results of one request, joined with their catalog entries.
#[axum::debug_handler]
pub async fn request_results(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ResultDetail>>, ApiError> {
    let results = ResultService::new(state.store.clone()).results_for_request(id)?;
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/analyses/results",
    params(ListResultsQuery),
    responses(
        (status = 200, description = "One page of matching results", body = ResultPage)
    )
)]
/// Search results across requests.
///
/// Voided results are hidden unless `isVoided=true` is passed explicitly;
/// `from`/`to` bound the measurement timestamp; `limit` is capped at 100.
#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<ListResultsQuery>,
) -> Result<Json<ResultPage>, ApiError> {
    let page = ResultService::new(state.store.clone()).list_results(
        ResultFilter {
            analysis_type_id: query.analysis_type_id,
            request_id: query.request_id,
            patient_id: query.patient_id,
            is_abnormal: query.is_abnormal,
            is_voided: query.is_voided,
            from: query.from,
            to: query.to,
        },
        query.page,
        query.limit,
    )?;
    Ok(Json(page))
}

#[utoipa::path(
    patch,
    path = "/analyses/results/{id}/void",
    params(("id" = Uuid, Path, description = "Result id")),
    request_body = VoidBody,
    responses(
        (status = 200, description = "The voided result, value preserved", body = AnalysisResult),
        (status = 400, description = "Blank reason"),
        (status = 404, description = "Unknown result"),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Void a result (technician or admin).
///
/// A soft-cancel: the measured value stays for audit, but the result stops
/// counting towards its request's completion.
#[axum::debug_handler]
pub async fn void_result(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<VoidBody>,
) -> Result<Json<AnalysisResult>, ApiError> {
    require_role(&user, &[Role::Technician, Role::Admin])?;

    let result =
        ResultService::new(state.store.clone()).void_result(id, &body.reason, user.user_id)?;
    Ok(Json(result))
}
