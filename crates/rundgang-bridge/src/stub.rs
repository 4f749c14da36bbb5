// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop/CI implementations of the bridge traits: frames come from files on
// disk and the credential from the environment.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rundgang_core::error::{Result, RundgangError};
use tracing::{debug, warn};

use crate::traits::{BearerToken, CredentialSource, FrameSource};

/// Environment variable holding the message API access token.
pub const ACCESS_TOKEN_VAR: &str = "RUNDGANG_ACCESS_TOKEN";
/// Optional RFC 3339 expiry for the token.
pub const ACCESS_TOKEN_EXPIRY_VAR: &str = "RUNDGANG_ACCESS_TOKEN_EXPIRES_AT";

/// Yields the contents of queued files, one per call.
pub struct FileFrameSource {
    pending: Mutex<VecDeque<PathBuf>>,
}

impl FileFrameSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: Mutex::new(paths.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl FrameSource for FileFrameSource {
    fn next_frame(&self) -> Result<Option<Vec<u8>>> {
        let next = self
            .pending
            .lock()
            .map_err(|_| RundgangError::Capture("frame queue poisoned".into()))?
            .pop_front();
        let Some(path) = next else {
            debug!("FileFrameSource exhausted");
            return Ok(None);
        };
        let bytes = std::fs::read(&path).map_err(|err| {
            RundgangError::Capture(format!("cannot read frame {}: {err}", path.display()))
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Frame read from disk");
        Ok(Some(bytes))
    }
}

/// Reads the token from the process environment on every call.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    token_var: String,
    expiry_var: String,
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self {
            token_var: ACCESS_TOKEN_VAR.into(),
            expiry_var: ACCESS_TOKEN_EXPIRY_VAR.into(),
        }
    }
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a differently named variable pair.
    pub fn with_vars(token_var: impl Into<String>, expiry_var: impl Into<String>) -> Self {
        Self {
            token_var: token_var.into(),
            expiry_var: expiry_var.into(),
        }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn bearer_token(&self) -> Result<Option<BearerToken>> {
        token_from_values(
            std::env::var(&self.token_var).ok(),
            std::env::var(&self.expiry_var).ok(),
        )
    }
}

/// Build a token from raw variable values. A malformed expiry is a
/// configuration error rather than a silently non-expiring token.
fn token_from_values(value: Option<String>, expiry: Option<String>) -> Result<Option<BearerToken>> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let token = BearerToken::new(value.trim());
    match expiry.filter(|e| !e.trim().is_empty()) {
        None => Ok(Some(token)),
        Some(raw) => {
            let at = DateTime::parse_from_rfc3339(raw.trim()).map_err(|err| {
                warn!(error = %err, "unparseable token expiry");
                RundgangError::Config(format!("{ACCESS_TOKEN_EXPIRY_VAR} is not RFC 3339: {err}"))
            })?;
            Ok(Some(token.with_expiry(at.with_timezone(&Utc))))
        }
    }
}

/// Fixed credential, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource(Option<BearerToken>);

impl StaticCredentialSource {
    pub fn new(token: Option<BearerToken>) -> Self {
        Self(token)
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentialSource {
    fn bearer_token(&self) -> Result<Option<BearerToken>> {
        Ok(self.0.clone())
    }
}
