use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::util::extract_request_info;

/// One opaque token per login, bound to exactly one user. Only the token's
/// hash is stored; the token itself is returned once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: i64,
    pub last_active_at: i64,
    pub expires_at: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Client metadata captured at session creation and on audited actions.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let (ip_address, user_agent) = extract_request_info(headers);
        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Pending one-time code; single use, lazy expiry.
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub id: String,
    pub user_id: String,
    pub code_hash: String,
    pub expires_at: i64,
    pub consumed_at: Option<i64>,
    pub created_at: i64,
}
