//! Dashboard aggregation.
//!
//! Overview counters computed on read; nothing is cached or stored. The
//! numbers are advisory UI material, so they all come from one read guard
//! for a consistent snapshot.

use chrono::{Duration, Utc};
use labo_types::RequestStatus;

use crate::constants::RECENT_WINDOW_DAYS;
use crate::error::LabResult;
use crate::store::SharedStore;

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    pub total_patients: usize,
    pub total_analysis_types: usize,
    pub total_requests: usize,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub complete: usize,
    pub validated: usize,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentCounts {
    pub patients_last_30_days: usize,
    pub requests_last_30_days: usize,
}

/// Aggregate statistics for the dashboard.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: OverviewCounts,
    pub analyses: StatusCounts,
    pub recent: RecentCounts,
}

/// Service computing dashboard statistics.
#[derive(Clone, Debug)]
pub struct DashboardService {
    store: SharedStore,
}

impl DashboardService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Computes all counters in one pass. Soft-deleted patients are
    /// excluded everywhere.
    pub fn stats(&self) -> LabResult<DashboardStats> {
        let cutoff = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
        let store = self.store.read()?;

        let active_patients = || store.patients().filter(|p| !p.deleted);
        let count_status =
            |status: RequestStatus| store.requests().filter(|r| r.status == status).count();

        Ok(DashboardStats {
            overview: OverviewCounts {
                total_patients: active_patients().count(),
                total_analysis_types: store.analysis_type_count(),
                total_requests: store.request_count(),
            },
            analyses: StatusCounts {
                pending: count_status(RequestStatus::Pending),
                complete: count_status(RequestStatus::Complete),
                validated: count_status(RequestStatus::Validated),
            },
            recent: RecentCounts {
                patients_last_30_days: active_patients()
                    .filter(|p| p.created_at >= cutoff)
                    .count(),
                requests_last_30_days: store
                    .requests()
                    .filter(|r| r.created_at >= cutoff)
                    .count(),
            },
        })
    }
}
