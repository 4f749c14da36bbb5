// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the collaborators a reporting
// session talks to: the camera, the reverse geocoder, and the account that
// authorises outbound messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rundgang_core::error::Result;
use rundgang_core::types::{Coordinates, LocationSnapshot};

/// Source of captured frames.
pub trait FrameSource: Send + Sync {
    /// Grab the next encoded frame. Returns Ok(None) when no frame is
    /// available (camera not ready, nothing left to read).
    fn next_frame(&self) -> Result<Option<Vec<u8>>>;
}

/// Reverse geocoding: coordinates to a postal address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `coords`. Fields the service does not know stay `None`.
    async fn reverse(&self, coords: Coordinates) -> Result<LocationSnapshot>;
}

/// Out-of-band bearer credential for the message API.
pub trait CredentialSource: Send + Sync {
    /// Current token, or Ok(None) when the user is not signed in.
    fn bearer_token(&self) -> Result<Option<BearerToken>>;
}

/// Opaque bearer token with an optional expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Blank tokens count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.value.trim().is_empty() || self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
