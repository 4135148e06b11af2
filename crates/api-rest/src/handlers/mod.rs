//! REST request handlers, one module per resource.

pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod patients;
pub mod reports;
pub mod requests;
pub mod results;

/// Plain confirmation body used by delete endpoints.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct MessageRes {
    pub message: String,
}
