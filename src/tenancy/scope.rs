use crate::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::models::AdminGrant;

/// A filter over tenant-owned data that may carry a client-supplied
/// organization id. The enforcer removes it; it never reaches a query.
pub trait TenantFilter {
    fn take_org_id(&mut self) -> Option<String>;
}

/// A write payload for tenant-owned data; same contract as [`TenantFilter`].
pub trait TenantWrite {
    fn take_org_id(&mut self) -> Option<String>;
}

/// Holds the single organization id a request is authorized to touch.
///
/// Construction fails closed: a context without an active organization gets
/// an authorization error, never "all organizations".
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    org_id: String,
}

impl ScopeGuard {
    pub fn from_context(ctx: &AuthContext) -> Result<Self> {
        let org = ctx.active_org.as_ref().ok_or(AppError::Forbidden)?;
        // A suspended organization stays visible in the context so the user
        // can switch away, but its data is off limits.
        if !org.is_active() {
            return Err(AppError::OrgInactive);
        }
        Ok(Self {
            org_id: org.id.clone(),
        })
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Pin a read filter to the authorized organization. Any client-supplied
    /// organization id is discarded, not merged.
    pub fn scope<F: TenantFilter>(&self, mut filter: F) -> Scoped<F> {
        let _ = filter.take_org_id();
        Scoped {
            org_id: self.org_id.clone(),
            filter,
        }
    }

    /// Pin a write payload to the authorized organization, stripping any
    /// client-supplied organization id before persistence.
    pub fn scope_write<P: TenantWrite>(&self, mut payload: P) -> ScopedWrite<P> {
        let _ = payload.take_org_id();
        ScopedWrite {
            org_id: self.org_id.clone(),
            payload,
        }
    }
}

/// A filter with its organization pinned by the enforcer. Tenant-data list
/// queries only accept this wrapper.
#[derive(Debug, Clone)]
pub struct Scoped<F> {
    org_id: String,
    pub filter: F,
}

impl<F> Scoped<F> {
    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

/// A write payload with its organization pinned by the enforcer.
#[derive(Debug, Clone)]
pub struct ScopedWrite<P> {
    org_id: String,
    pub payload: P,
}

impl<P> ScopedWrite<P> {
    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

/// Explicit cross-tenant access for the admin console. The private field
/// keeps this constructible only through [`Unscoped::for_admin`].
#[derive(Debug, Clone, Copy)]
pub struct Unscoped {
    _verified: (),
}

impl Unscoped {
    /// The grant must already have been resolved by the platform admin
    /// authority; taking it by reference keeps the call site honest.
    pub fn for_admin(_grant: &AdminGrant) -> Self {
        Self { _verified: () }
    }
}
