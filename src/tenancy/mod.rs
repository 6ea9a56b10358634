//! Organization scoping enforcer.
//!
//! Every tenant-data read is built from a [`ScopeGuard`] and every write from
//! a [`ScopedWrite`]; both pin the organization id resolved at the start of
//! the request and discard anything the client supplied. The only unscoped
//! path is [`Unscoped`], constructible solely from a verified platform-admin
//! grant, so the default path can never silently become cross-tenant.

mod scope;

pub use scope::{ScopeGuard, Scoped, ScopedWrite, TenantFilter, TenantWrite, Unscoped};
