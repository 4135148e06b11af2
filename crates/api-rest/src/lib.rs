//! # API REST
//!
//! REST API implementation for the labo service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - bearer-token authentication and per-route role gates
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error bodies)
//!
//! Business rules live in `labo-core`; this crate only shapes requests and
//! responses around it.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use labo_core::{CoreConfig, SharedStore};

use crate::auth::TokenRegistry;

/// Application state shared across REST API handlers.
///
/// Services are cheap view objects over the store, so handlers construct
/// them per request; the state carries only the injected dependencies.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: SharedStore,
    pub tokens: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, store: SharedStore, tokens: Arc<TokenRegistry>) -> Self {
        Self { cfg, store, tokens }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::catalog::create_analysis_type,
        handlers::catalog::list_analysis_types,
        handlers::patients::create_patient,
        handlers::patients::list_patients,
        handlers::patients::get_patient,
        handlers::patients::update_patient,
        handlers::patients::delete_patient,
        handlers::patients::patient_history,
        handlers::requests::create_request,
        handlers::requests::list_requests,
        handlers::requests::get_request,
        handlers::requests::update_request,
        handlers::requests::update_status,
        handlers::requests::delete_request,
        handlers::results::submit_results,
        handlers::results::request_results,
        handlers::results::list_results,
        handlers::results::void_result,
        handlers::reports::request_pdf,
        handlers::dashboard::stats,
    ),
    components(schemas(
        handlers::health::HealthRes,
        handlers::MessageRes,
        handlers::requests::StatusUpdateBody,
        handlers::results::SubmitResultsBody,
        handlers::results::VoidBody,
        labo_core::model::AnalysisType,
        labo_core::model::Patient,
        labo_core::model::AnalysisRequest,
        labo_core::model::AnalysisResult,
        labo_core::model::ResultDetail,
        labo_core::model::RequestDetail,
        labo_core::catalog::NewAnalysisType,
        labo_core::patients::NewPatient,
        labo_core::patients::PatientPatch,
        labo_core::patients::PatientPage,
        labo_core::requests::NewAnalysisRequest,
        labo_core::requests::RequestPatch,
        labo_core::results::SubmitResultEntry,
        labo_core::results::SubmitOutcome,
        labo_core::results::ResultPage,
        labo_core::dashboard::DashboardStats,
        labo_core::dashboard::OverviewCounts,
        labo_core::dashboard::StatusCounts,
        labo_core::dashboard::RecentCounts,
        labo_types::RequestStatus,
        labo_types::Role,
    ))
)]
struct ApiDoc;

/// Builds the full application router.
///
/// Everything except `/health` and the Swagger UI sits behind the bearer
/// middleware; role checks happen inside the handlers.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/analyses/types",
            post(handlers::catalog::create_analysis_type).get(handlers::catalog::list_analysis_types),
        )
        .route(
            "/analyses",
            post(handlers::requests::create_request).get(handlers::requests::list_requests),
        )
        .route("/analyses/results", get(handlers::results::list_results))
        .route(
            "/analyses/results/:id/void",
            patch(handlers::results::void_result),
        )
        .route(
            "/analyses/:id",
            get(handlers::requests::get_request)
                .put(handlers::requests::update_request)
                .delete(handlers::requests::delete_request),
        )
        .route(
            "/analyses/:id/results",
            put(handlers::results::submit_results).get(handlers::results::request_results),
        )
        .route("/analyses/:id/status", patch(handlers::requests::update_status))
        .route("/analyses/:id/pdf", get(handlers::reports::request_pdf))
        .route(
            "/patients",
            post(handlers::patients::create_patient).get(handlers::patients::list_patients),
        )
        .route(
            "/patients/:id",
            get(handlers::patients::get_patient)
                .put(handlers::patients::update_patient)
                .delete(handlers::patients::delete_patient),
        )
        .route(
            "/patients/:id/history",
            get(handlers::patients::patient_history),
        )
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
