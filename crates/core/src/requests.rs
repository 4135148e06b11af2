//! Analysis requests.
//!
//! A request is created with one empty result slot per requested analysis
//! type and starts in `PENDING`. Completion is recomputed by the result
//! engine (see [`crate::results`]); this module covers the request CRUD,
//! the joined detail reads, and the unguarded administrative status
//! override.

use chrono::Utc;
use labo_types::RequestStatus;
use uuid::Uuid;

use crate::error::{LabError, LabResult};
use crate::model::{AnalysisRequest, AnalysisResult, RequestDetail};
use crate::store::SharedStore;

/// Fields required to create a request.
///
/// `analysis_type_ids` is deliberately NOT checked against the catalog;
/// the original system never did, and a dangling id must keep surfacing at
/// join time rather than silently changing creation behavior.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysisRequest {
    pub patient_id: Uuid,
    pub doctor_name: String,
    pub analysis_type_ids: Vec<Uuid>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestPatch {
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

/// Listing filter; both fields optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub patient_id: Option<Uuid>,
}

/// Service for managing analysis requests.
#[derive(Clone, Debug)]
pub struct RequestService {
    store: SharedStore,
}

impl RequestService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates a request in `PENDING` with one empty result per type id.
    ///
    /// Returns the bare request; callers re-fetch for the joined detail.
    ///
    /// # Errors
    ///
    /// `LabError::PatientNotFound` if the patient does not exist (the
    /// relational store this stands in for enforces the same constraint);
    /// `LabError::InvalidInput` on a blank doctor name.
    pub fn create_request(&self, new: NewAnalysisRequest) -> LabResult<AnalysisRequest> {
        let doctor_name = new.doctor_name.trim();
        if doctor_name.is_empty() {
            return Err(LabError::InvalidInput("doctorName is required".into()));
        }

        let mut store = self.store.write()?;
        if store.patient(new.patient_id).is_none() {
            return Err(LabError::PatientNotFound(new.patient_id));
        }

        let now = Utc::now();
        let request = AnalysisRequest {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            doctor_name: doctor_name.to_owned(),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.insert_request(request.clone());

        for type_id in &new.analysis_type_ids {
            store.insert_result(AnalysisResult::empty(request.id, *type_id));
        }

        tracing::info!(
            id = %request.id,
            patient = %request.patient_id,
            slots = new.analysis_type_ids.len(),
            "analysis request created"
        );
        Ok(request)
    }

    /// Fetches one request with its patient and results joined.
    pub fn get_request(&self, id: Uuid) -> LabResult<RequestDetail> {
        let store = self.store.read()?;
        let request = store.request(id).ok_or(LabError::RequestNotFound(id))?;
        store.request_detail(request)
    }

    /// Lists requests, newest first, each joined with patient and results.
    pub fn list_requests(&self, filter: RequestFilter) -> LabResult<Vec<RequestDetail>> {
        let store = self.store.read()?;
        let mut requests: Vec<&AnalysisRequest> = store
            .requests()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.patient_id.is_none_or(|p| r.patient_id == p))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        requests
            .into_iter()
            .map(|r| store.request_detail(r))
            .collect()
    }

    /// All requests for one patient, newest first, fully joined.
    ///
    /// Works for soft-deleted patients too; history survives deletion.
    pub fn history_for_patient(&self, patient_id: Uuid) -> LabResult<Vec<RequestDetail>> {
        {
            let store = self.store.read()?;
            if store.patient(patient_id).is_none() {
                return Err(LabError::PatientNotFound(patient_id));
            }
        }
        self.list_requests(RequestFilter {
            patient_id: Some(patient_id),
            ..RequestFilter::default()
        })
    }

    /// Applies a partial update and returns the joined detail.
    pub fn update_request(&self, id: Uuid, patch: RequestPatch) -> LabResult<RequestDetail> {
        let mut store = self.store.write()?;
        if store.request(id).is_none() {
            return Err(LabError::RequestNotFound(id));
        }

        let doctor_name = match &patch.doctor_name {
            Some(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(LabError::InvalidInput("doctorName cannot be blank".into()));
                }
                Some(name.to_owned())
            }
            None => None,
        };
        if let Some(patient_id) = patch.patient_id {
            if store.patient(patient_id).is_none() {
                return Err(LabError::PatientNotFound(patient_id));
            }
        }

        let request = store.request_mut(id).ok_or(LabError::RequestNotFound(id))?;
        if let Some(doctor_name) = doctor_name {
            request.doctor_name = doctor_name;
        }
        if let Some(patient_id) = patch.patient_id {
            request.patient_id = patient_id;
        }
        request.updated_at = Utc::now();

        let request = request.clone();
        store.request_detail(&request)
    }

    /// Unconditional status overwrite: the administrative override.
    ///
    /// No transition check, in any direction; the automatic completion
    /// transition is the engine's business, this one is the operator's.
    pub fn update_status(&self, id: Uuid, status: RequestStatus) -> LabResult<AnalysisRequest> {
        let mut store = self.store.write()?;
        let request = store.request_mut(id).ok_or(LabError::RequestNotFound(id))?;

        request.status = status;
        request.updated_at = Utc::now();

        tracing::info!(%id, status = %status, "request status overridden");
        Ok(request.clone())
    }

    /// Deletes a request and every result it owns.
    pub fn delete_request(&self, id: Uuid) -> LabResult<()> {
        let mut store = self.store.write()?;
        if !store.remove_request_cascade(id) {
            return Err(LabError::RequestNotFound(id));
        }

        tracing::info!(%id, "analysis request deleted");
        Ok(())
    }
}
