use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Stored lowercase; lookups are case-insensitive.
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    /// Disabled users cannot authenticate and lose all sessions.
    pub active: bool,
    /// Mutated only by the organization switch workflow.
    pub active_org_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterUser {
    pub fn validate(&self) -> Result<()> {
        if !self.email.contains('@') || self.email.len() > 254 {
            return Err(AppError::BadRequest("Invalid email address".into()));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}
