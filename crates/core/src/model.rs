//! Domain entities.
//!
//! Four entities make up the data model: the analysis-type catalog entry,
//! the patient, the analysis request, and the analysis result. Results are
//! exclusively owned by their parent request and are cascade-deleted with
//! it. Wire field names are camelCase, matching the JSON API the web client
//! consumes.

use chrono::{DateTime, NaiveDate, Utc};
use labo_types::RequestStatus;
use uuid::Uuid;

/// A catalog entry describing one kind of analysis.
///
/// Reference data: created by an administrator, read by the evaluation
/// engine to decide abnormality, never deleted in normal flow.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisType {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub reference_min: f64,
    pub reference_max: f64,
    pub price: f64,
}

/// A patient demographic record.
///
/// Patients are soft-deleted: `deleted = true` hides the record from
/// listings and lookups but historical requests keep referencing it, so
/// reporting survives.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub cin: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An analysis request: one patient, one prescribing doctor, N results.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_name: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single measurement slot within a request.
///
/// `value = None` means "not yet measured". Voiding annotates the row and
/// excludes it from completion accounting; the measured value is preserved
/// for audit, never cleared by the void itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub analysis_type_id: Uuid,
    pub value: Option<f64>,
    pub is_abnormal: bool,
    pub is_voided: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<Uuid>,
    pub voided_at: Option<DateTime<Utc>>,
    pub measured_by: Option<Uuid>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl AnalysisResult {
    /// A fresh, unmeasured slot for `analysis_type_id` under `request_id`.
    pub fn empty(request_id: Uuid, analysis_type_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            analysis_type_id,
            value: None,
            is_abnormal: false,
            is_voided: false,
            void_reason: None,
            voided_by: None,
            voided_at: None,
            measured_by: None,
            measured_at: None,
        }
    }

    /// Whether this result counts towards its request's completion.
    pub fn is_active(&self) -> bool {
        !self.is_voided
    }
}

/// A result joined with its catalog entry, as served to clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetail {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub analysis_type: AnalysisType,
}

/// A request joined with its patient and its results, as served to clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: AnalysisRequest,
    pub patient: Patient,
    pub results: Vec<ResultDetail>,
}
