//! Authentication and authority: credentials, sessions, per-request
//! context, platform-admin operations, and the organization switch.

pub mod admin;
pub mod context;
pub mod session;
pub mod switch;
pub mod verify;

pub use admin::{effective_admin, require_admin, require_super_admin};
pub use context::{AuthContext, ContextProfile, build_context};
pub use switch::{SwitchResult, switch_organization};
