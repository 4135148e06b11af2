//! Patient registry.
//!
//! Demographic records referenced by analysis requests. Deletion is always
//! soft: the row stays in the store so historical requests and reports keep
//! resolving, but the patient disappears from listings and lookups and its
//! CIN becomes available again.

use chrono::Utc;
use uuid::Uuid;

use crate::constants::DEFAULT_PATIENT_PAGE_SIZE;
use crate::error::{LabError, LabResult};
use crate::model::Patient;
use crate::store::SharedStore;

/// Fields required to register a patient.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub full_name: String,
    pub date_of_birth: chrono::NaiveDate,
    pub gender: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub cin: String,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cin: Option<String>,
}

/// One page of the patient listing.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total_patients: usize,
}

/// Service for managing patient records.
#[derive(Clone, Debug)]
pub struct PatientService {
    store: SharedStore,
}

impl PatientService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// Returns `LabError::InvalidInput` on blank required fields and
    /// `LabError::DuplicateCin` if the CIN is already held by a non-deleted
    /// patient.
    pub fn create_patient(&self, new: NewPatient) -> LabResult<Patient> {
        let full_name = required(&new.full_name, "fullName")?;
        let gender = required(&new.gender, "gender")?;
        let address = required(&new.address, "address")?;
        let phone = required(&new.phone, "phone")?;
        let cin = required(&new.cin, "cin")?;

        let mut store = self.store.write()?;
        if store.cin_taken(&cin, None) {
            return Err(LabError::DuplicateCin(cin));
        }

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            full_name,
            date_of_birth: new.date_of_birth,
            gender,
            address,
            phone,
            email: new.email,
            cin,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        store.insert_patient(patient.clone());

        tracing::info!(id = %patient.id, "patient created");
        Ok(patient)
    }

    /// Lists non-deleted patients, newest first.
    ///
    /// `search` does a case-insensitive substring match on the full name OR
    /// the CIN. `page` is 1-based; out-of-range pages return an empty slice
    /// with the real totals.
    pub fn list_patients(
        &self,
        page: Option<usize>,
        limit: Option<usize>,
        search: Option<&str>,
    ) -> LabResult<PatientPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PATIENT_PAGE_SIZE).max(1);
        let needle = search.unwrap_or("").trim().to_lowercase();

        let store = self.store.read()?;
        let mut matches: Vec<&Patient> = store
            .patients()
            .filter(|p| !p.deleted)
            .filter(|p| {
                needle.is_empty()
                    || p.full_name.to_lowercase().contains(&needle)
                    || p.cin.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matches.len();
        let patients = matches
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .cloned()
            .collect();

        Ok(PatientPage {
            patients,
            total_pages: total.div_ceil(limit),
            current_page: page,
            total_patients: total,
        })
    }

    /// Fetches a patient by id.
    ///
    /// # Errors
    ///
    /// `LabError::PatientNotFound` if the patient is absent or soft-deleted.
    pub fn get_patient(&self, id: Uuid) -> LabResult<Patient> {
        let store = self.store.read()?;
        store
            .patient(id)
            .filter(|p| !p.deleted)
            .cloned()
            .ok_or(LabError::PatientNotFound(id))
    }

    /// Applies a partial update; only provided fields change.
    ///
    /// A changed CIN is re-checked for uniqueness among the other
    /// non-deleted patients.
    pub fn update_patient(&self, id: Uuid, patch: PatientPatch) -> LabResult<Patient> {
        let mut store = self.store.write()?;

        let exists = store.patient(id).is_some_and(|p| !p.deleted);
        if !exists {
            return Err(LabError::PatientNotFound(id));
        }

        let cin = match &patch.cin {
            Some(cin) => {
                let cin = required(cin, "cin")?;
                if store.cin_taken(&cin, Some(id)) {
                    return Err(LabError::DuplicateCin(cin));
                }
                Some(cin)
            }
            None => None,
        };
        let full_name = patch.full_name.as_deref().map(|v| required(v, "fullName")).transpose()?;
        let gender = patch.gender.as_deref().map(|v| required(v, "gender")).transpose()?;
        let address = patch.address.as_deref().map(|v| required(v, "address")).transpose()?;
        let phone = patch.phone.as_deref().map(|v| required(v, "phone")).transpose()?;

        let patient = store
            .patient_mut(id)
            .ok_or(LabError::PatientNotFound(id))?;
        if let Some(full_name) = full_name {
            patient.full_name = full_name;
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            patient.date_of_birth = date_of_birth;
        }
        if let Some(gender) = gender {
            patient.gender = gender;
        }
        if let Some(address) = address {
            patient.address = address;
        }
        if let Some(phone) = phone {
            patient.phone = phone;
        }
        if patch.email.is_some() {
            patient.email = patch.email;
        }
        if let Some(cin) = cin {
            patient.cin = cin;
        }
        patient.updated_at = Utc::now();

        Ok(patient.clone())
    }

    /// Soft-deletes a patient.
    ///
    /// The row is never physically removed; history must survive for
    /// reporting.
    pub fn soft_delete_patient(&self, id: Uuid) -> LabResult<()> {
        let mut store = self.store.write()?;
        let patient = store
            .patient_mut(id)
            .filter(|p| !p.deleted)
            .ok_or(LabError::PatientNotFound(id))?;

        patient.deleted = true;
        patient.updated_at = Utc::now();

        tracing::info!(%id, "patient soft-deleted");
        Ok(())
    }
}

fn required(value: &str, field: &str) -> LabResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LabError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PatientService {
        PatientService::new(SharedStore::new())
    }

    fn new_patient(name: &str, cin: &str) -> NewPatient {
        NewPatient {
            full_name: name.into(),
            date_of_birth: chrono::NaiveDate::from_ymd_opt(1988, 5, 12).unwrap(),
            gender: "F".into(),
            address: "12 Rue des Lilas".into(),
            phone: "0600000000".into(),
            email: None,
            cin: cin.into(),
        }
    }

    #[test]
    fn create_rejects_duplicate_cin_among_active_patients() {
        let service = service();
        service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create should succeed");

        let err = service
            .create_patient(new_patient("Someone Else", "AB123456"))
            .expect_err("duplicate CIN should be rejected");
        assert!(matches!(err, LabError::DuplicateCin(cin) if cin == "AB123456"));
    }

    #[test]
    fn soft_deleted_patient_releases_cin_and_disappears() {
        let service = service();
        let patient = service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create should succeed");

        service
            .soft_delete_patient(patient.id)
            .expect("delete should succeed");

        // Hidden from lookup and listing.
        assert!(matches!(
            service.get_patient(patient.id),
            Err(LabError::PatientNotFound(_))
        ));
        let page = service.list_patients(None, None, None).expect("list");
        assert_eq!(page.total_patients, 0);

        // Deleting twice is a not-found.
        assert!(matches!(
            service.soft_delete_patient(patient.id),
            Err(LabError::PatientNotFound(_))
        ));

        // CIN is free again.
        service
            .create_patient(new_patient("New Holder", "AB123456"))
            .expect("CIN should be reusable after soft delete");
    }

    #[test]
    fn search_matches_name_or_cin_case_insensitively() {
        let service = service();
        service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create");
        service
            .create_patient(new_patient("Karim Tazi", "KT777777"))
            .expect("create");

        let by_name = service
            .list_patients(None, None, Some("berra"))
            .expect("list");
        assert_eq!(by_name.total_patients, 1);
        assert_eq!(by_name.patients[0].full_name, "Amina Berrada");

        let by_cin = service
            .list_patients(None, None, Some("kt77"))
            .expect("list");
        assert_eq!(by_cin.total_patients, 1);
        assert_eq!(by_cin.patients[0].cin, "KT777777");
    }

    #[test]
    fn pagination_reports_totals_and_clamps_page() {
        let service = service();
        for i in 0..25 {
            service
                .create_patient(new_patient(&format!("Patient {i}"), &format!("CIN{i:05}")))
                .expect("create");
        }

        let page = service.list_patients(Some(2), Some(10), None).expect("list");
        assert_eq!(page.patients.len(), 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_patients, 25);

        let beyond = service.list_patients(Some(9), Some(10), None).expect("list");
        assert!(beyond.patients.is_empty());
        assert_eq!(beyond.total_patients, 25);
    }

    #[test]
    fn update_changes_only_provided_fields() {
        let service = service();
        let patient = service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create");

        let updated = service
            .update_patient(
                patient.id,
                PatientPatch {
                    phone: Some("0611111111".into()),
                    email: Some("amina@example.com".into()),
                    ..PatientPatch::default()
                },
            )
            .expect("update should succeed");

        assert_eq!(updated.phone, "0611111111");
        assert_eq!(updated.email.as_deref(), Some("amina@example.com"));
        assert_eq!(updated.full_name, "Amina Berrada");
        assert_eq!(updated.cin, "AB123456");
        assert!(updated.updated_at >= patient.updated_at);
    }

    #[test]
    fn update_rejects_cin_collision_but_allows_keeping_own() {
        let service = service();
        let first = service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create");
        let second = service
            .create_patient(new_patient("Karim Tazi", "KT777777"))
            .expect("create");

        let err = service
            .update_patient(
                second.id,
                PatientPatch {
                    cin: Some("AB123456".into()),
                    ..PatientPatch::default()
                },
            )
            .expect_err("stealing a CIN should fail");
        assert!(matches!(err, LabError::DuplicateCin(_)));

        // Re-submitting your own CIN is not a conflict.
        service
            .update_patient(
                first.id,
                PatientPatch {
                    cin: Some("AB123456".into()),
                    ..PatientPatch::default()
                },
            )
            .expect("own CIN should be accepted");
    }

    #[test]
    fn update_missing_or_deleted_patient_is_not_found() {
        let service = service();
        assert!(matches!(
            service.update_patient(Uuid::new_v4(), PatientPatch::default()),
            Err(LabError::PatientNotFound(_))
        ));

        let patient = service
            .create_patient(new_patient("Amina Berrada", "AB123456"))
            .expect("create");
        service.soft_delete_patient(patient.id).expect("delete");
        assert!(matches!(
            service.update_patient(patient.id, PatientPatch::default()),
            Err(LabError::PatientNotFound(_))
        ));
    }
}
