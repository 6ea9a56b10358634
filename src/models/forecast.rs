use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{AppError, Result};
use crate::pagination::PaginationQuery;
use crate::tenancy::{TenantFilter, TenantWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ForecastStatus {
    Draft,
    Committed,
}

/// Representative tenant-owned record: demand forecast for one period.
/// Every read and write goes through the scoping enforcer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub id: String,
    pub org_id: String,
    pub name: String,
    /// Planning period, e.g. "2026-Q3".
    pub period: String,
    pub quantity: i64,
    pub status: ForecastStatus,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateForecast {
    pub name: String,
    pub period: String,
    pub quantity: i64,
    /// Ignored: the enforcer stamps the authorized organization.
    pub org_id: Option<String>,
}

impl CreateForecast {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        if self.period.trim().is_empty() {
            return Err(AppError::BadRequest("Period is required".into()));
        }
        if self.quantity < 0 {
            return Err(AppError::BadRequest("Quantity must be non-negative".into()));
        }
        Ok(())
    }
}

impl TenantWrite for CreateForecast {
    fn take_org_id(&mut self) -> Option<String> {
        self.org_id.take()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateForecast {
    pub name: Option<String>,
    pub period: Option<String>,
    pub quantity: Option<i64>,
    pub status: Option<ForecastStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastFilter {
    pub status: Option<ForecastStatus>,
    pub period: Option<String>,
    /// Ignored: the enforcer overrides any client-supplied organization.
    pub org_id: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationQuery,
}

impl TenantFilter for ForecastFilter {
    fn take_org_id(&mut self) -> Option<String> {
        self.org_id.take()
    }
}
