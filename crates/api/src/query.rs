//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Default page size for listings.
pub const DEFAULT_LIMIT: i64 = 100;

/// Pagination parameters (`?skip=&limit=`).
///
/// Values are passed to PostgreSQL unclamped; a negative value is reported
/// back as the database error it causes.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// `?sections=current,future` on the project detail endpoint.
#[derive(Debug, Deserialize)]
pub struct SectionsParams {
    pub sections: Option<String>,
}

/// Filters and pagination for campaign listings.
#[derive(Debug, Deserialize)]
pub struct CampaignListParams {
    pub version: Option<String>,
    pub status: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Filters for repository reads.
#[derive(Debug, Deserialize)]
pub struct RepositoryParams {
    /// `epics`, `features` or `scenarios` (default).
    pub elements: Option<String>,
    pub epic: Option<String>,
    pub feature: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Filters and pagination for bug listings. `status` is a comma-separated
/// list (`open,fix ready`).
#[derive(Debug, Deserialize)]
pub struct BugListParams {
    pub status: Option<String>,
    pub criticality: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// `?new_status=` on the scenario status endpoint.
#[derive(Debug, Deserialize)]
pub struct NewStatusParams {
    pub new_status: String,
}
