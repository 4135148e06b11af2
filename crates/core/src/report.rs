//! Report snapshot assembly.
//!
//! The PDF renderer is an external collaborator with no logic of its own;
//! the core's obligation is to hand it a fully-joined, read-consistent view
//! of one request. Voided results are annotations, not findings, so they
//! are excluded from the snapshot.

use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::{LabError, LabResult};
use crate::model::{AnalysisRequest, Patient, ResultDetail};
use crate::store::SharedStore;
use std::sync::Arc;

/// Everything the report renderer needs for one request.
#[derive(Debug, Clone)]
pub struct ReportSnapshot {
    pub lab_name: String,
    pub request: AnalysisRequest,
    pub patient: Patient,
    pub results: Vec<ResultDetail>,
}

/// Service assembling report snapshots.
#[derive(Clone, Debug)]
pub struct ReportService {
    cfg: Arc<CoreConfig>,
    store: SharedStore,
}

impl ReportService {
    pub fn new(cfg: Arc<CoreConfig>, store: SharedStore) -> Self {
        Self { cfg, store }
    }

    /// Builds the snapshot for one request under a single read guard.
    ///
    /// # Errors
    ///
    /// `LabError::RequestNotFound` if the request is absent;
    /// `LabError::AnalysisTypeMissing` if any non-voided result references
    /// a type the catalog no longer knows.
    pub fn snapshot(&self, request_id: Uuid) -> LabResult<ReportSnapshot> {
        let store = self.store.read()?;
        let request = store
            .request(request_id)
            .ok_or(LabError::RequestNotFound(request_id))?;
        let mut detail = store.request_detail(request)?;
        detail.results.retain(|r| r.result.is_active());

        Ok(ReportSnapshot {
            lab_name: self.cfg.lab_name().to_owned(),
            request: detail.request,
            patient: detail.patient,
            results: detail.results,
        })
    }
}
