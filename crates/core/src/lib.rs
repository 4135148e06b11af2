//! # Labo Core
//!
//! Core business logic for the laboratory analysis management system:
//! the analysis-type catalog, the patient registry, analysis requests and
//! their results, and the result-evaluation / request-completion engine.
//!
//! All state lives in an injected [`store::SharedStore`]; services receive
//! it (plus an [`config::CoreConfig`]) at construction. Every multi-step
//! operation (update a result, then recompute the parent request's
//! completion) runs under a single write guard, so concurrent submissions
//! against the same request serialize instead of racing.
//!
//! **No API concerns**: authentication, HTTP servers, and response shaping
//! belong in `api-rest`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod patients;
pub mod report;
pub mod requests;
pub mod results;
pub mod store;

pub use config::CoreConfig;
pub use error::{LabError, LabResult};
pub use store::SharedStore;
