use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlatformAdminRole {
    Admin,
    SuperAdmin,
}

/// Where a request's platform-admin authority came from. Bootstrap grants
/// come from the static operator allow-list and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GrantSource {
    Granted,
    Bootstrap,
}

/// Persisted cross-tenant override grant. Revocation is a timestamp, not a
/// row delete, so the audit trail keeps the full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAdmin {
    pub id: String,
    pub user_id: String,
    /// Email snapshot at grant time.
    pub email: String,
    pub role: PlatformAdminRole,
    pub granted_by: Option<String>,
    pub created_at: i64,
    pub revoked_at: Option<i64>,
    pub revoked_by: Option<String>,
}

impl PlatformAdmin {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// An effective grant resolved for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AdminGrant {
    /// Backed by a non-revoked `platform_admins` row.
    Granted { id: String, role: PlatformAdminRole },
    /// Synthetic grant from the operator allow-list; never persisted, and
    /// tagged distinctly in all audit output.
    Bootstrap { email: String },
}

impl AdminGrant {
    /// Bootstrap grants act as super admins; without that, an empty
    /// deployment could never mint its first persisted grant.
    pub fn role(&self) -> PlatformAdminRole {
        match self {
            AdminGrant::Granted { role, .. } => *role,
            AdminGrant::Bootstrap { .. } => PlatformAdminRole::SuperAdmin,
        }
    }

    pub fn source(&self) -> GrantSource {
        match self {
            AdminGrant::Granted { .. } => GrantSource::Granted,
            AdminGrant::Bootstrap { .. } => GrantSource::Bootstrap,
        }
    }

    pub fn is_bootstrap(&self) -> bool {
        matches!(self, AdminGrant::Bootstrap { .. })
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantPlatformAdmin {
    pub user_id: String,
    pub role: PlatformAdminRole,
}

#[derive(Debug, Deserialize)]
pub struct RevokePlatformAdmin {
    pub reason: Option<String>,
}
