//! Request context extraction

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};

use crate::authn::actor::RequestContext;
use crate::errors::AccessDenied;
use crate::server::error::ApiError;
use crate::server::state::ServerState;

/// An authenticated caller and the transport facts of its request
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// Encrypted if the proxy says so or the URI was absolute https
fn is_secure(parts: &Parts) -> bool {
    let forwarded = header_str(&parts.headers, "x-forwarded-proto")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false);
    forwarded || parts.uri.scheme_str() == Some("https")
}

fn source_ip(parts: &Parts) -> Option<String> {
    header_str(&parts.headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

impl FromRequestParts<Arc<ServerState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let actor = bearer_token(&parts.headers)
            .and_then(|token| state.tokens.authenticate(token))
            .ok_or(AccessDenied::Unauthenticated)?;

        let mut ctx = RequestContext::new(actor).secure(is_secure(parts));
        if let Some(host) = header_str(&parts.headers, header::HOST.as_str()) {
            ctx = ctx.host(host);
        }
        if let Some(ip) = source_ip(parts) {
            ctx = ctx.source_ip(ip);
        }
        Ok(Caller(ctx))
    }
}
