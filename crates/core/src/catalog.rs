//! Analysis-type catalog.
//!
//! Reference data consulted by the evaluation engine: each entry carries
//! the `[reference_min, reference_max]` interval against which measured
//! values are judged abnormal, plus the billing price.

use uuid::Uuid;

use crate::error::{LabError, LabResult};
use crate::model::AnalysisType;
use crate::store::SharedStore;

/// Fields required to create a catalog entry.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysisType {
    pub name: String,
    pub unit: String,
    pub reference_min: f64,
    pub reference_max: f64,
    pub price: f64,
}

/// Service for managing the analysis-type catalog.
#[derive(Clone, Debug)]
pub struct CatalogService {
    store: SharedStore,
}

impl CatalogService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates a new analysis type.
    ///
    /// # Errors
    ///
    /// Returns `LabError::InvalidInput` if the name or unit is blank, a
    /// numeric field is not finite, the price is negative, or
    /// `reference_min > reference_max`. Returns `LabError::DuplicateTypeName`
    /// if an entry with the same name already exists.
    pub fn create_analysis_type(&self, new: NewAnalysisType) -> LabResult<AnalysisType> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LabError::InvalidInput("name is required".into()));
        }
        let unit = new.unit.trim();
        if unit.is_empty() {
            return Err(LabError::InvalidInput("unit is required".into()));
        }
        for (field, value) in [
            ("reference_min", new.reference_min),
            ("reference_max", new.reference_max),
            ("price", new.price),
        ] {
            if !value.is_finite() {
                return Err(LabError::InvalidInput(format!("{field} must be a number")));
            }
        }
        if new.reference_min > new.reference_max {
            return Err(LabError::InvalidInput(
                "reference_min must not exceed reference_max".into(),
            ));
        }
        if new.price < 0.0 {
            return Err(LabError::InvalidInput("price must not be negative".into()));
        }

        let mut store = self.store.write()?;
        if store.type_name_exists(name) {
            return Err(LabError::DuplicateTypeName(name.to_owned()));
        }

        let ty = AnalysisType {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            unit: unit.to_owned(),
            reference_min: new.reference_min,
            reference_max: new.reference_max,
            price: new.price,
        };
        store.insert_analysis_type(ty.clone());

        tracing::info!(name = %ty.name, id = %ty.id, "analysis type created");
        Ok(ty)
    }

    /// Lists every catalog entry, sorted by name. No pagination.
    pub fn list_analysis_types(&self) -> LabResult<Vec<AnalysisType>> {
        let store = self.store.read()?;
        let mut types: Vec<AnalysisType> = store.analysis_types().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }
}
