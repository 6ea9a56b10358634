use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MembershipRole {
    Owner,
    Admin,
    Member,
}

impl MembershipRole {
    pub fn can_manage_members(&self) -> bool {
        matches!(self, MembershipRole::Owner | MembershipRole::Admin)
    }
}

/// What the member does inside the tenant, independent of who they can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FunctionalRole {
    Planner,
    Approver,
    Viewer,
}

impl FunctionalRole {
    pub fn can_write(&self) -> bool {
        matches!(self, FunctionalRole::Planner | FunctionalRole::Approver)
    }

    pub fn can_commit(&self) -> bool {
        matches!(self, FunctionalRole::Approver)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub org_id: String,
    pub user_id: String,
    pub role: MembershipRole,
    pub functional_role: FunctionalRole,
    pub created_at: i64,
}

/// Membership joined with organization details, for "my organizations" views.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipWithOrg {
    pub id: String,
    pub org_id: String,
    pub org_name: String,
    pub org_slug: String,
    pub org_status: super::OrgStatus,
    pub role: MembershipRole,
    pub functional_role: FunctionalRole,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMembership {
    pub user_id: String,
    pub role: MembershipRole,
    pub functional_role: FunctionalRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembership {
    pub role: Option<MembershipRole>,
    pub functional_role: Option<FunctionalRole>,
}
