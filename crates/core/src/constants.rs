//! Constants used throughout the labo core crate.

/// Default page size for patient listings.
pub const DEFAULT_PATIENT_PAGE_SIZE: usize = 10;

/// Default page size for result listings.
pub const DEFAULT_RESULT_PAGE_SIZE: usize = 20;

/// Hard cap on the result-listing page size.
pub const MAX_RESULT_PAGE_SIZE: usize = 100;

/// Window, in days, for the dashboard's "recent" counters.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Laboratory name used when no explicit name is configured.
pub const DEFAULT_LAB_NAME: &str = "Laboratoire d'Analyses Médicales";
