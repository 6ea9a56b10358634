mod audit;
mod forecast;
mod membership;
mod organization;
mod platform_admin;
mod session;
mod user;

pub use audit::*;
pub use forecast::*;
pub use membership::*;
pub use organization::*;
pub use platform_admin::*;
pub use session::*;
pub use user::*;
