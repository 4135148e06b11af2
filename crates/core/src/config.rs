//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services as `Arc<CoreConfig>`. Request handling never reads process-wide
//! environment variables; doing so leads to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::{LabError, LabResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    lab_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(lab_name: impl Into<String>) -> LabResult<Self> {
        let lab_name = lab_name.into();
        if lab_name.trim().is_empty() {
            return Err(LabError::InvalidInput("lab_name cannot be empty".into()));
        }

        Ok(Self { lab_name })
    }

    /// Laboratory name printed on report headers.
    pub fn lab_name(&self) -> &str {
        &self.lab_name
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            lab_name: crate::constants::DEFAULT_LAB_NAME.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_lab_name() {
        let err = CoreConfig::new("  ").expect_err("blank lab name should be rejected");
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[test]
    fn default_uses_fallback_name() {
        assert_eq!(
            CoreConfig::default().lab_name(),
            crate::constants::DEFAULT_LAB_NAME
        );
    }
}
