//! Result entry, voiding, and the completion engine.
//!
//! This is the state machine the rest of the system orbits. The rule:
//! a request becomes `COMPLETE` exactly when every non-voided result has a
//! measured value; a request with zero non-voided results is vacuously
//! complete. The automatic transition is forward-only and fires from
//! `PENDING`; it never demotes `COMPLETE` or `VALIDATED`. Moving a request
//! backwards (or to `VALIDATED`) is the operator's explicit override in
//! [`crate::requests::RequestService::update_status`].
//!
//! Every submit/void runs under a single store write guard: the result
//! mutation and the parent's completion recompute are one atomic step, so
//! two concurrent submissions against the same request cannot race on the
//! completion check.

use chrono::{DateTime, Utc};
use labo_types::RequestStatus;
use uuid::Uuid;

use crate::constants::{DEFAULT_RESULT_PAGE_SIZE, MAX_RESULT_PAGE_SIZE};
use crate::error::{LabError, LabResult};
use crate::model::{AnalysisResult, AnalysisType, ResultDetail};
use crate::store::{LabStore, SharedStore};

/// One measurement in a submission batch.
///
/// `value: None` (or an absent field) clears the slot back to unmeasured.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultEntry {
    pub result_id: Uuid,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Outcome of a submission batch.
///
/// Unknown result ids are not an error: they are skipped and reported here,
/// so a partial batch neither fails nor disappears silently.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub updated: usize,
    pub skipped: Vec<Uuid>,
    pub status: RequestStatus,
}

/// Filter for the result listing. All fields optional; `is_voided` defaults
/// to `false`, hiding voided results unless explicitly requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFilter {
    pub analysis_type_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub is_abnormal: Option<bool>,
    pub is_voided: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// One page of the result listing.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub results: Vec<ResultDetail>,
}

/// Whether `value` falls outside the type's reference range.
///
/// Bounds are part of the normal range: a value exactly equal to
/// `reference_min` or `reference_max` is NOT abnormal.
pub fn evaluate_abnormality(value: f64, ty: &AnalysisType) -> bool {
    value < ty.reference_min || value > ty.reference_max
}

/// Promotes the request to `COMPLETE` if every non-voided result is
/// measured. Forward-only: fires from `PENDING` and never demotes.
fn recompute_completion(store: &mut LabStore, request_id: Uuid) -> Option<RequestStatus> {
    let complete = store
        .results_for_request(request_id)
        .iter()
        .filter(|r| r.is_active())
        .all(|r| r.value.is_some());

    let request = store.request_mut(request_id)?;
    if complete && request.status == RequestStatus::Pending {
        request.status = RequestStatus::Complete;
        request.updated_at = Utc::now();
    }
    Some(request.status)
}

/// Service for entering, voiding, and searching results.
#[derive(Clone, Debug)]
pub struct ResultService {
    store: SharedStore,
}

impl ResultService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Applies a batch of measurements to a request's results, then
    /// recomputes the request's completion.
    ///
    /// Per entry: a numeric value is judged against the type's reference
    /// range (`measured_by`/`measured_at` record the caller and the clock);
    /// a null value clears the slot, including its measurement attribution.
    /// Entries naming an unknown result id are skipped and reported in the
    /// outcome. Voided results are not shielded from updates: the void
    /// annotation stays and completion keeps ignoring them.
    ///
    /// # Errors
    ///
    /// `LabError::RequestNotFound` if the request is absent,
    /// `LabError::InvalidInput` if any provided value is not finite (checked
    /// before anything is mutated), `LabError::AnalysisTypeMissing` if a
    /// targeted result references a type the catalog no longer knows.
    pub fn submit_results(
        &self,
        request_id: Uuid,
        entries: &[SubmitResultEntry],
        measured_by: Uuid,
    ) -> LabResult<SubmitOutcome> {
        for entry in entries {
            if let Some(value) = entry.value {
                if !value.is_finite() {
                    return Err(LabError::InvalidInput(format!(
                        "value for result {} must be a finite number",
                        entry.result_id
                    )));
                }
            }
        }

        let mut store = self.store.write()?;
        if store.request(request_id).is_none() {
            return Err(LabError::RequestNotFound(request_id));
        }

        let mut updated = 0usize;
        let mut skipped = Vec::new();
        for entry in entries {
            let Some(existing) = store.result(entry.result_id) else {
                tracing::warn!(result = %entry.result_id, request = %request_id, "skipping unknown result id");
                skipped.push(entry.result_id);
                continue;
            };

            let abnormal = match entry.value {
                Some(value) => {
                    let ty = store.analysis_type(existing.analysis_type_id).ok_or(
                        LabError::AnalysisTypeMissing {
                            type_id: existing.analysis_type_id,
                            result_id: existing.id,
                        },
                    )?;
                    evaluate_abnormality(value, ty)
                }
                None => false,
            };

            let result = store
                .result_mut(entry.result_id)
                .ok_or(LabError::ResultNotFound(entry.result_id))?;
            result.value = entry.value;
            result.is_abnormal = abnormal;
            if entry.value.is_some() {
                result.measured_by = Some(measured_by);
                result.measured_at = Some(Utc::now());
            } else {
                // An unmeasured slot has no measurer.
                result.measured_by = None;
                result.measured_at = None;
            }
            updated += 1;
        }

        let status = recompute_completion(&mut store, request_id)
            .ok_or(LabError::RequestNotFound(request_id))?;

        Ok(SubmitOutcome {
            updated,
            skipped,
            status,
        })
    }

    /// Voids a result: a soft-cancel that keeps the measured value for
    /// audit but removes the row from completion accounting. The parent
    /// request's completion is recomputed in the same step.
    ///
    /// # Errors
    ///
    /// `LabError::ResultNotFound` if the result is absent,
    /// `LabError::InvalidInput` on a blank reason.
    pub fn void_result(
        &self,
        result_id: Uuid,
        reason: &str,
        voided_by: Uuid,
    ) -> LabResult<AnalysisResult> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LabError::InvalidInput("reason is required".into()));
        }

        let mut store = self.store.write()?;
        let result = store
            .result_mut(result_id)
            .ok_or(LabError::ResultNotFound(result_id))?;

        result.is_voided = true;
        result.void_reason = Some(reason.to_owned());
        result.voided_by = Some(voided_by);
        result.voided_at = Some(Utc::now());

        let request_id = result.request_id;
        let voided = result.clone();
        recompute_completion(&mut store, request_id);

        tracing::info!(result = %result_id, request = %request_id, "result voided");
        Ok(voided)
    }

    /// Results of one request, joined with their catalog entries.
    pub fn results_for_request(&self, request_id: Uuid) -> LabResult<Vec<ResultDetail>> {
        let store = self.store.read()?;
        let detail = store
            .request(request_id)
            .ok_or(LabError::RequestNotFound(request_id))
            .and_then(|r| store.request_detail(r))?;
        Ok(detail.results)
    }

    /// Searches results across requests.
    ///
    /// The `patient_id` filter first resolves the patient's request ids,
    /// then filters by membership. `from`/`to` bound `measured_at`
    /// (inclusive); unmeasured results never match a time window. Ordered
    /// newest-measured first, unmeasured last. `limit` is clamped to
    /// [1, 100], default 20.
    pub fn list_results(
        &self,
        filter: ResultFilter,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> LabResult<ResultPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_RESULT_PAGE_SIZE)
            .clamp(1, MAX_RESULT_PAGE_SIZE);
        let want_voided = filter.is_voided.unwrap_or(false);

        let store = self.store.read()?;

        let request_ids: Option<Vec<Uuid>> = filter.patient_id.map(|patient_id| {
            store
                .requests()
                .filter(|r| r.patient_id == patient_id)
                .map(|r| r.id)
                .collect()
        });

        let mut matches: Vec<&AnalysisResult> = store
            .results()
            .filter(|r| r.is_voided == want_voided)
            .filter(|r| filter.analysis_type_id.is_none_or(|t| r.analysis_type_id == t))
            .filter(|r| filter.request_id.is_none_or(|id| r.request_id == id))
            .filter(|r| {
                request_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&r.request_id))
            })
            .filter(|r| filter.is_abnormal.is_none_or(|a| r.is_abnormal == a))
            .filter(|r| match (filter.from, filter.to) {
                (None, None) => true,
                (from, to) => r.measured_at.is_some_and(|at| {
                    from.is_none_or(|f| at >= f) && to.is_none_or(|t| at <= t)
                }),
            })
            .collect();
        matches.sort_by(|a, b| match (b.measured_at, a.measured_at) {
            (Some(bm), Some(am)) => bm.cmp(&am).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => a.id.cmp(&b.id),
        });

        let total = matches.len();
        let results = matches
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .map(|r| store.result_detail(r))
            .collect::<LabResult<Vec<_>>>()?;

        Ok(ResultPage {
            page,
            limit,
            total,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogService, NewAnalysisType};
    use crate::patients::{NewPatient, PatientService};
    use crate::requests::{NewAnalysisRequest, RequestService};

    struct Fixture {
        store: SharedStore,
        requests: RequestService,
        results: ResultService,
        patient_id: Uuid,
        type_id: Uuid,
        tech_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = SharedStore::new();
        let patient = PatientService::new(store.clone())
            .create_patient(NewPatient {
                full_name: "Amina Berrada".into(),
                date_of_birth: chrono::NaiveDate::from_ymd_opt(1988, 5, 12).unwrap(),
                gender: "F".into(),
                address: "12 Rue des Lilas".into(),
                phone: "0600000000".into(),
                email: None,
                cin: "AB123456".into(),
            })
            .expect("patient");
        let ty = CatalogService::new(store.clone())
            .create_analysis_type(NewAnalysisType {
                name: "Glycémie".into(),
                unit: "g/L".into(),
                reference_min: 0.7,
                reference_max: 1.1,
                price: 50.0,
            })
            .expect("type");
        Fixture {
            requests: RequestService::new(store.clone()),
            results: ResultService::new(store.clone()),
            store,
            patient_id: patient.id,
            type_id: ty.id,
            tech_id: Uuid::new_v4(),
        }
    }

    impl Fixture {
        fn new_request(&self, slots: usize) -> (Uuid, Vec<Uuid>) {
            let request = self
                .requests
                .create_request(NewAnalysisRequest {
                    patient_id: self.patient_id,
                    doctor_name: "Dr. Alami".into(),
                    analysis_type_ids: vec![self.type_id; slots],
                })
                .expect("request");
            let result_ids = self
                .store
                .read()
                .expect("read")
                .results_for_request(request.id)
                .iter()
                .map(|r| r.id)
                .collect();
            (request.id, result_ids)
        }

        fn status(&self, request_id: Uuid) -> RequestStatus {
            self.requests.get_request(request_id).expect("detail").request.status
        }

        fn submit_one(&self, request_id: Uuid, result_id: Uuid, value: Option<f64>) -> SubmitOutcome {
            self.results
                .submit_results(
                    request_id,
                    &[SubmitResultEntry { result_id, value }],
                    self.tech_id,
                )
                .expect("submit")
        }
    }

    #[test]
    fn reference_scenario_runs_end_to_end() {
        // The canonical walkthrough: one Glycémie slot, measure, re-measure
        // out of range, then void with the value preserved.
        let fx = fixture();
        let (request_id, ids) = fx.new_request(1);

        let outcome = fx.submit_one(request_id, ids[0], Some(0.95));
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.status, RequestStatus::Complete);
        let detail = fx.requests.get_request(request_id).expect("detail");
        assert!(!detail.results[0].result.is_abnormal);
        assert_eq!(detail.results[0].result.measured_by, Some(fx.tech_id));
        assert!(detail.results[0].result.measured_at.is_some());

        fx.submit_one(request_id, ids[0], Some(1.35));
        let detail = fx.requests.get_request(request_id).expect("detail");
        assert!(detail.results[0].result.is_abnormal);

        let voided = fx
            .results
            .void_result(ids[0], "sample compromised", fx.tech_id)
            .expect("void");
        assert!(voided.is_voided);
        assert_eq!(voided.value, Some(1.35), "voiding preserves the value");
        assert_eq!(voided.void_reason.as_deref(), Some("sample compromised"));
        // Zero non-voided results left: vacuously complete.
        assert_eq!(fx.status(request_id), RequestStatus::Complete);
    }

    #[test]
    fn boundary_values_are_normal() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(4);

        for (result_id, value, expect_abnormal) in [
            (ids[0], 0.7, false),
            (ids[1], 1.1, false),
            (ids[2], 0.699, true),
            (ids[3], 1.101, true),
        ] {
            fx.submit_one(request_id, result_id, Some(value));
            let store = fx.store.read().expect("read");
            let result = store.result(result_id).expect("result");
            assert_eq!(
                result.is_abnormal, expect_abnormal,
                "value {value} abnormality mismatch"
            );
        }
    }

    #[test]
    fn completion_requires_every_active_result_measured() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(3);

        fx.submit_one(request_id, ids[0], Some(0.8));
        assert_eq!(fx.status(request_id), RequestStatus::Pending);

        fx.submit_one(request_id, ids[1], Some(0.9));
        assert_eq!(fx.status(request_id), RequestStatus::Pending);

        let outcome = fx.submit_one(request_id, ids[2], Some(1.0));
        assert_eq!(outcome.status, RequestStatus::Complete);
    }

    #[test]
    fn voiding_the_last_unfilled_result_completes_the_request() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);

        fx.submit_one(request_id, ids[0], Some(0.8));
        assert_eq!(fx.status(request_id), RequestStatus::Pending);

        fx.results
            .void_result(ids[1], "hemolyzed sample", fx.tech_id)
            .expect("void");
        assert_eq!(fx.status(request_id), RequestStatus::Complete);
    }

    #[test]
    fn voiding_inside_a_complete_request_keeps_it_complete() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);
        fx.submit_one(request_id, ids[0], Some(0.8));
        fx.submit_one(request_id, ids[1], Some(0.9));
        assert_eq!(fx.status(request_id), RequestStatus::Complete);

        fx.results
            .void_result(ids[0], "duplicate entry", fx.tech_id)
            .expect("void");
        assert_eq!(fx.status(request_id), RequestStatus::Complete);
    }

    #[test]
    fn clearing_a_value_does_not_revert_completion() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(1);
        fx.submit_one(request_id, ids[0], Some(0.8));
        assert_eq!(fx.status(request_id), RequestStatus::Complete);

        // Clearing reopens the slot but the status transition is
        // forward-only; only an explicit override can demote.
        let outcome = fx.submit_one(request_id, ids[0], None);
        assert_eq!(outcome.status, RequestStatus::Complete);

        let store = fx.store.read().expect("read");
        let result = store.result(ids[0]).expect("result");
        assert_eq!(result.value, None);
        assert!(!result.is_abnormal);
        assert_eq!(result.measured_by, None);
        assert_eq!(result.measured_at, None);
    }

    #[test]
    fn recompute_never_promotes_a_validated_request_backwards() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(1);
        fx.requests
            .update_status(request_id, RequestStatus::Validated)
            .expect("override");

        let outcome = fx.submit_one(request_id, ids[0], Some(0.8));
        assert_eq!(outcome.status, RequestStatus::Validated);
    }

    #[test]
    fn unknown_result_ids_are_skipped_and_reported() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(1);
        let phantom = Uuid::new_v4();

        let outcome = fx
            .results
            .submit_results(
                request_id,
                &[
                    SubmitResultEntry {
                        result_id: phantom,
                        value: Some(0.8),
                    },
                    SubmitResultEntry {
                        result_id: ids[0],
                        value: Some(0.9),
                    },
                ],
                fx.tech_id,
            )
            .expect("submit");

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.skipped, vec![phantom]);
        assert_eq!(outcome.status, RequestStatus::Complete);
    }

    #[test]
    fn submit_rejects_non_finite_values_before_mutating() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);

        let err = fx
            .results
            .submit_results(
                request_id,
                &[
                    SubmitResultEntry {
                        result_id: ids[0],
                        value: Some(0.8),
                    },
                    SubmitResultEntry {
                        result_id: ids[1],
                        value: Some(f64::NAN),
                    },
                ],
                fx.tech_id,
            )
            .expect_err("NaN should be rejected");
        assert!(matches!(err, LabError::InvalidInput(_)));

        // Whole batch rejected: the first entry must not have been applied.
        let store = fx.store.read().expect("read");
        assert_eq!(store.result(ids[0]).expect("result").value, None);
    }

    #[test]
    fn submit_against_unknown_request_is_not_found() {
        let fx = fixture();
        let err = fx
            .results
            .submit_results(Uuid::new_v4(), &[], fx.tech_id)
            .expect_err("unknown request");
        assert!(matches!(err, LabError::RequestNotFound(_)));
    }

    #[test]
    fn void_requires_a_reason_and_an_existing_result() {
        let fx = fixture();
        let (_, ids) = fx.new_request(1);

        assert!(matches!(
            fx.results.void_result(ids[0], "   ", fx.tech_id),
            Err(LabError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.results.void_result(Uuid::new_v4(), "reason", fx.tech_id),
            Err(LabError::ResultNotFound(_))
        ));
    }

    #[test]
    fn listing_hides_voided_results_by_default() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);
        fx.submit_one(request_id, ids[0], Some(0.8));
        fx.submit_one(request_id, ids[1], Some(0.9));
        fx.results
            .void_result(ids[0], "duplicate entry", fx.tech_id)
            .expect("void");

        let visible = fx
            .results
            .list_results(ResultFilter::default(), None, None)
            .expect("list");
        assert_eq!(visible.total, 1);
        assert_eq!(visible.results[0].result.id, ids[1]);

        let voided_only = fx
            .results
            .list_results(
                ResultFilter {
                    is_voided: Some(true),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(voided_only.total, 1);
        assert_eq!(voided_only.results[0].result.id, ids[0]);
    }

    #[test]
    fn listing_filters_by_patient_abnormality_and_time_window() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);
        let before = Utc::now();
        fx.submit_one(request_id, ids[0], Some(0.8));
        fx.submit_one(request_id, ids[1], Some(2.0));
        let after = Utc::now();

        let abnormal = fx
            .results
            .list_results(
                ResultFilter {
                    is_abnormal: Some(true),
                    patient_id: Some(fx.patient_id),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(abnormal.total, 1);
        assert_eq!(abnormal.results[0].result.id, ids[1]);

        let windowed = fx
            .results
            .list_results(
                ResultFilter {
                    from: Some(before),
                    to: Some(after),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(windowed.total, 2);

        let unknown_patient = fx
            .results
            .list_results(
                ResultFilter {
                    patient_id: Some(Uuid::new_v4()),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(unknown_patient.total, 0);
    }

    #[test]
    fn unmeasured_results_never_match_a_time_window() {
        let fx = fixture();
        let (_, _) = fx.new_request(1);

        let windowed = fx
            .results
            .list_results(
                ResultFilter {
                    from: Some(Utc::now() - chrono::Duration::days(1)),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(windowed.total, 0);
    }

    #[test]
    fn listing_clamps_limit_to_the_cap() {
        let fx = fixture();
        let page = fx
            .results
            .list_results(ResultFilter::default(), Some(1), Some(5_000))
            .expect("list");
        assert_eq!(page.limit, MAX_RESULT_PAGE_SIZE);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn deleting_a_request_empties_its_result_listing() {
        let fx = fixture();
        let (request_id, ids) = fx.new_request(2);
        fx.submit_one(request_id, ids[0], Some(0.8));

        fx.requests.delete_request(request_id).expect("delete");

        let page = fx
            .results
            .list_results(
                ResultFilter {
                    request_id: Some(request_id),
                    ..ResultFilter::default()
                },
                None,
                None,
            )
            .expect("list");
        assert_eq!(page.total, 0);
    }

    #[test]
    fn submit_surfaces_dangling_type_references() {
        let fx = fixture();
        let request = fx
            .requests
            .create_request(NewAnalysisRequest {
                patient_id: fx.patient_id,
                doctor_name: "Dr. Alami".into(),
                analysis_type_ids: vec![Uuid::new_v4()],
            })
            .expect("creation does not check type ids");
        let result_id = fx
            .store
            .read()
            .expect("read")
            .results_for_request(request.id)[0]
            .id;

        let err = fx
            .results
            .submit_results(
                request.id,
                &[SubmitResultEntry {
                    result_id,
                    value: Some(1.0),
                }],
                fx.tech_id,
            )
            .expect_err("evaluation against a missing type must fail loudly");
        assert!(matches!(err, LabError::AnalysisTypeMissing { .. }));
    }
}
