use axum::extract::State;
use axum::response::Json;
use axum::Extension;

use labo_core::dashboard::{DashboardService, DashboardStats};
use labo_types::Role;

use crate::auth::{require_role, AuthUser};
use crate::error::ApiError;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/dashboard/stats",
    responses(
        (status = 200, description = "Aggregate counters", body = DashboardStats),
        (status = 403, description = "Insufficient permissions")
    )
)]
/// Dashboard statistics (admin or doctor). Computed on read.
#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>, ApiError> {
    require_role(&user, &[Role::Admin, Role::Medecin])?;

    let stats = DashboardService::new(state.store.clone()).stats()?;
    Ok(Json(stats))
}
