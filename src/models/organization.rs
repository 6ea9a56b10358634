use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrgStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Unique, URL-safe identifier.
    pub slug: String,
    pub status: OrgStatus,
    pub plan: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Organization {
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrgStatus::Active)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub plan: Option<String>,
}

impl CreateOrganization {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        let slug_ok = !self.slug.is_empty()
            && self
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(AppError::BadRequest(
                "Slug must be lowercase alphanumeric with dashes".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationPlan {
    pub plan: String,
    pub reason: Option<String>,
}
