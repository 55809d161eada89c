//! Identity handed over by the authenticating reverse proxy.
//!
//! The portal never sees the identity provider itself. The proxy in front
//! of it signs users in and forwards the result as request headers, along
//! with a shared secret so requests that bypass the proxy cannot forge an
//! identity.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::warn;

use crate::{
    error::{PortalError, Result},
    users::Identity,
};

pub const SECRET_HEADER: &str = "x-portal-proxy-secret";
pub const IDENTITY_HEADER: &str = "x-portal-identity";
pub const NAME_HEADER: &str = "x-portal-name";
pub const EMAIL_HEADER: &str = "x-portal-email";
pub const PHOTO_HEADER: &str = "x-portal-photo";

#[derive(Clone)]
pub struct ProxyAuth {
    secret: Arc<str>,
}

impl std::fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAuth").finish_non_exhaustive()
    }
}

impl ProxyAuth {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The identity asserted by the proxy, or `Unauthenticated` when the
    /// secret is missing or wrong or no identity was forwarded.
    pub fn identity(&self, headers: &HeaderMap) -> Result<Identity> {
        if self.secret.is_empty() || header(headers, SECRET_HEADER) != Some(&*self.secret) {
            warn!("sign-in without a valid proxy secret");
            return Err(PortalError::Unauthenticated);
        }

        let identity_id = header(headers, IDENTITY_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(PortalError::Unauthenticated)?;

        Ok(Identity {
            identity_id: identity_id.to_string(),
            display_name: header(headers, NAME_HEADER).map(str::to_string),
            email: header(headers, EMAIL_HEADER).map(str::to_string),
            photo_url: header(headers, PHOTO_HEADER).map(str::to_string),
        })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .filter(|value| !value.is_empty())
}
