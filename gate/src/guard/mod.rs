//! Kill switch, transport check, rate limiting and the audit trail

pub mod audit;
pub mod rate_limit;
pub mod transport;

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::authn::actor::RequestContext;
use crate::errors::AccessDenied;
use crate::guard::audit::AuditLog;
use crate::guard::rate_limit::RateLimiter;
use crate::guard::transport::is_local_host;

/// Guard configuration, injected at construction
#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub enabled: bool,
    /// Configured public URL of the site; its host counts for the local exemption
    pub site_url: Option<String>,
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            site_url: None,
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// Gatekeeper in front of every mutating operation
#[derive(Debug)]
pub struct AccessGuard {
    settings: GuardSettings,
    site_host: Option<String>,
    limiter: RateLimiter,
    audit: AuditLog,
}

impl AccessGuard {
    pub fn new(settings: GuardSettings, audit: AuditLog) -> Self {
        let site_host = settings
            .site_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string));
        let limiter = RateLimiter::new(settings.max_requests, settings.window);

        Self {
            settings,
            site_host,
            limiter,
            audit,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// The actor must hold the review capability
    pub fn require_privileged(&self, ctx: &RequestContext) -> Result<(), AccessDenied> {
        if ctx.actor.privileged {
            Ok(())
        } else {
            Err(AccessDenied::Forbidden(ctx.actor.id.clone()))
        }
    }

    /// Secure, or addressed to a local development host
    pub fn transport_ok(&self, ctx: &RequestContext) -> bool {
        if ctx.secure {
            return true;
        }
        match ctx.host.as_deref().or(self.site_host.as_deref()) {
            Some(host) => is_local_host(host),
            None => false,
        }
    }

    /// Full gate for submit, approve and rollback.
    ///
    /// Order: privilege, kill switch, transport, then the rate limit, so a
    /// refused request never consumes a slot in the window.
    pub fn authorize_mutation(&self, ctx: &RequestContext) -> Result<(), AccessDenied> {
        self.require_privileged(ctx)?;

        if !self.settings.enabled {
            return Err(AccessDenied::Disabled);
        }

        if !self.transport_ok(ctx) {
            return Err(AccessDenied::InsecureTransport);
        }

        self.limiter.check(&ctx.actor.id).inspect_err(|_| {
            warn!(actor_id = %ctx.actor.id, "Rate limit exceeded");
        })
    }
}
