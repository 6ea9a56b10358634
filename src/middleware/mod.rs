mod admin_auth;
mod session_auth;

pub use admin_auth::platform_admin_auth;
pub use session_auth::session_auth;
