use uuid::Uuid;

/// Errors produced by core services.
///
/// Variants are deliberately specific; the API layer groups them into the
/// client-facing taxonomy (validation / conflict / not-found / internal).
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a patient with CIN {0} already exists")]
    DuplicateCin(String),
    #[error("an analysis type named {0} already exists")]
    DuplicateTypeName(String),

    #[error("patient {0} not found")]
    PatientNotFound(Uuid),
    #[error("analysis request {0} not found")]
    RequestNotFound(Uuid),
    #[error("analysis result {0} not found")]
    ResultNotFound(Uuid),

    /// A result references an analysis type that is not in the catalog.
    ///
    /// Requests are created without a referential check on their type ids
    /// (documented looseness), so the dangling reference only surfaces here,
    /// at join time.
    #[error("analysis type {type_id} referenced by result {result_id} is missing")]
    AnalysisTypeMissing { type_id: Uuid, result_id: Uuid },

    #[error("store lock poisoned")]
    StorePoisoned,
}

pub type LabResult<T> = std::result::Result<T, LabError>;
