//! In-process entity store.
//!
//! [`LabStore`] is plain data: one map per entity plus lookup and join
//! helpers, no business rules. Services share it through [`SharedStore`],
//! a cloneable handle around a single `RwLock`. Holding the write guard for
//! the whole of a multi-step operation (update a result, recompute the
//! parent's completion) is what makes those operations atomic; the storage
//! engine behind a real deployment would provide the same guarantee with a
//! transaction and row locking.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::error::{LabError, LabResult};
use crate::model::{
    AnalysisRequest, AnalysisResult, AnalysisType, Patient, RequestDetail, ResultDetail,
};

/// All persistent state, keyed by entity id.
#[derive(Debug, Default)]
pub struct LabStore {
    analysis_types: HashMap<Uuid, AnalysisType>,
    patients: HashMap<Uuid, Patient>,
    requests: HashMap<Uuid, AnalysisRequest>,
    results: HashMap<Uuid, AnalysisResult>,
}

impl LabStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Analysis types
    // ------------------------------------------------------------------

    pub fn insert_analysis_type(&mut self, ty: AnalysisType) {
        self.analysis_types.insert(ty.id, ty);
    }

    pub fn analysis_type(&self, id: Uuid) -> Option<&AnalysisType> {
        self.analysis_types.get(&id)
    }

    pub fn analysis_types(&self) -> impl Iterator<Item = &AnalysisType> {
        self.analysis_types.values()
    }

    /// Case-sensitive name lookup, mirroring the unique column it stands for.
    pub fn type_name_exists(&self, name: &str) -> bool {
        self.analysis_types.values().any(|t| t.name == name)
    }

    pub fn analysis_type_count(&self) -> usize {
        self.analysis_types.len()
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    pub fn insert_patient(&mut self, patient: Patient) {
        self.patients.insert(patient.id, patient);
    }

    pub fn patient(&self, id: Uuid) -> Option<&Patient> {
        self.patients.get(&id)
    }

    pub fn patient_mut(&mut self, id: Uuid) -> Option<&mut Patient> {
        self.patients.get_mut(&id)
    }

    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.values()
    }

    /// Whether `cin` is already held by a non-deleted patient other than
    /// `exclude`. Soft-deleted patients release their CIN.
    pub fn cin_taken(&self, cin: &str, exclude: Option<Uuid>) -> bool {
        self.patients
            .values()
            .filter(|p| !p.deleted)
            .filter(|p| Some(p.id) != exclude)
            .any(|p| p.cin == cin)
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    pub fn insert_request(&mut self, request: AnalysisRequest) {
        self.requests.insert(request.id, request);
    }

    pub fn request(&self, id: Uuid) -> Option<&AnalysisRequest> {
        self.requests.get(&id)
    }

    pub fn request_mut(&mut self, id: Uuid) -> Option<&mut AnalysisRequest> {
        self.requests.get_mut(&id)
    }

    pub fn requests(&self) -> impl Iterator<Item = &AnalysisRequest> {
        self.requests.values()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Removes the request and every result it owns. Returns `false` if the
    /// request does not exist (and removes nothing).
    pub fn remove_request_cascade(&mut self, id: Uuid) -> bool {
        if self.requests.remove(&id).is_none() {
            return false;
        }
        self.results.retain(|_, r| r.request_id != id);
        true
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    pub fn insert_result(&mut self, result: AnalysisResult) {
        self.results.insert(result.id, result);
    }

    pub fn result(&self, id: Uuid) -> Option<&AnalysisResult> {
        self.results.get(&id)
    }

    pub fn result_mut(&mut self, id: Uuid) -> Option<&mut AnalysisResult> {
        self.results.get_mut(&id)
    }

    pub fn results(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.values()
    }

    pub fn results_for_request(&self, request_id: Uuid) -> Vec<&AnalysisResult> {
        self.results
            .values()
            .filter(|r| r.request_id == request_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Joins
    // ------------------------------------------------------------------

    /// Joins a result with its catalog entry.
    ///
    /// # Errors
    ///
    /// [`LabError::AnalysisTypeMissing`] if the result references a type
    /// that is not in the catalog (requests are created without a
    /// referential check, so this is where the dangling id surfaces).
    pub fn result_detail(&self, result: &AnalysisResult) -> LabResult<ResultDetail> {
        let analysis_type = self
            .analysis_type(result.analysis_type_id)
            .cloned()
            .ok_or(LabError::AnalysisTypeMissing {
                type_id: result.analysis_type_id,
                result_id: result.id,
            })?;
        Ok(ResultDetail {
            result: result.clone(),
            analysis_type,
        })
    }

    /// Joins a request with its patient and all of its results.
    ///
    /// Soft-deleted patients still join; history must survive deletion.
    pub fn request_detail(&self, request: &AnalysisRequest) -> LabResult<RequestDetail> {
        let patient = self
            .patient(request.patient_id)
            .cloned()
            .ok_or(LabError::PatientNotFound(request.patient_id))?;

        let mut results = self
            .results_for_request(request.id)
            .into_iter()
            .map(|r| self.result_detail(r))
            .collect::<LabResult<Vec<_>>>()?;
        // Stable output order for clients: by catalog name, then id.
        results.sort_by(|a, b| {
            a.analysis_type
                .name
                .cmp(&b.analysis_type.name)
                .then(a.result.id.cmp(&b.result.id))
        });

        Ok(RequestDetail {
            request: request.clone(),
            patient,
            results,
        })
    }
}

/// Cloneable handle to the shared store.
///
/// Lock poisoning is surfaced as [`LabError::StorePoisoned`] rather than a
/// panic; a poisoned store means a writer panicked mid-operation and the
/// data can no longer be trusted.
#[derive(Clone, Debug, Default)]
pub struct SharedStore(Arc<RwLock<LabStore>>);

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> LabResult<RwLockReadGuard<'_, LabStore>> {
        self.0.read().map_err(|_| LabError::StorePoisoned)
    }

    pub fn write(&self) -> LabResult<RwLockWriteGuard<'_, LabStore>> {
        self.0.write().map_err(|_| LabError::StorePoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use labo_types::RequestStatus;

    fn sample_patient(cin: &str, deleted: bool) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            full_name: "Test Patient".into(),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: "F".into(),
            address: "12 Rue des Lilas".into(),
            phone: "0600000000".into(),
            email: None,
            cin: cin.into(),
            deleted,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_request(patient_id: Uuid) -> AnalysisRequest {
        AnalysisRequest {
            id: Uuid::new_v4(),
            patient_id,
            doctor_name: "Dr. Test".into(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cin_taken_ignores_soft_deleted_and_excluded_patients() {
        let mut store = LabStore::new();
        let active = sample_patient("AB123456", false);
        let active_id = active.id;
        store.insert_patient(active);
        store.insert_patient(sample_patient("CD789012", true));

        assert!(store.cin_taken("AB123456", None));
        assert!(!store.cin_taken("AB123456", Some(active_id)));
        assert!(!store.cin_taken("CD789012", None));
    }

    #[test]
    fn remove_request_cascade_deletes_owned_results_only() {
        let mut store = LabStore::new();
        let patient = sample_patient("AB123456", false);
        let patient_id = patient.id;
        store.insert_patient(patient);

        let kept = sample_request(patient_id);
        let doomed = sample_request(patient_id);
        let kept_id = kept.id;
        let doomed_id = doomed.id;
        store.insert_request(kept);
        store.insert_request(doomed);

        let ty_id = Uuid::new_v4();
        store.insert_result(AnalysisResult::empty(kept_id, ty_id));
        store.insert_result(AnalysisResult::empty(doomed_id, ty_id));
        store.insert_result(AnalysisResult::empty(doomed_id, ty_id));

        assert!(store.remove_request_cascade(doomed_id));
        assert!(store.request(doomed_id).is_none());
        assert!(store.results_for_request(doomed_id).is_empty());
        assert_eq!(store.results_for_request(kept_id).len(), 1);

        assert!(!store.remove_request_cascade(doomed_id));
    }

    #[test]
    fn result_detail_reports_dangling_type_reference() {
        let mut store = LabStore::new();
        let result = AnalysisResult::empty(Uuid::new_v4(), Uuid::new_v4());
        store.insert_result(result.clone());

        let err = store
            .result_detail(&result)
            .expect_err("dangling type id should fail the join");
        assert!(matches!(err, LabError::AnalysisTypeMissing { .. }));
    }
}
