// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry engine with exponential backoff + jitter for outbound dispatch.
//
// Classifies errors into Transient (auto-retry), UserAction (wait for user),
// and Permanent (give up). Only transient errors trigger automatic retries.
//
// A mail POST is not idempotent. Only failures where the remote provably did
// not accept the message are transient: the request never left, or the
// remote answered 429/503.

use std::future::Future;
use std::time::Duration;

use rundgang_core::error::{DispatchStage, Result, RundgangError};
use rundgang_core::types::ErrorClass;
use tracing::{debug, info, warn};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Default backoff with a different retry limit.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

/// Result of evaluating whether to retry.
#[derive(Debug)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry; the error is permanent or user action needed.
    GiveUp(ErrorClass),
    /// Maximum retries exhausted.
    Exhausted,
}

/// Classify a `RundgangError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &RundgangError) -> ErrorClass {
    match err {
        RundgangError::Dispatch { stage, .. } => classify_dispatch_stage(*stage),

        // User action needed
        RundgangError::Auth(_)
        | RundgangError::Capture(_)
        | RundgangError::EmptyExport
        | RundgangError::ExportInProgress
        | RundgangError::IndexOutOfRange { .. }
        | RundgangError::UnknownField(_)
        | RundgangError::InvalidFieldValue { .. }
        | RundgangError::InvalidFloor(_) => ErrorClass::UserAction,

        // Enrichment is absorbed upstream; a retry may still resolve it.
        RundgangError::Enrichment(_) => ErrorClass::Transient,

        // Permanent: bad data or configuration
        RundgangError::Decode(_)
        | RundgangError::Composition { .. }
        | RundgangError::Pdf(_)
        | RundgangError::Config(_)
        | RundgangError::Serialization(_) => ErrorClass::Permanent,

        // IO errors depend on the kind
        RundgangError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::Interrupted => ErrorClass::Transient,
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::UserAction
            }
            _ => ErrorClass::Transient,
        },
    }
}

/// Classify a dispatch failure by how far the request got.
fn classify_dispatch_stage(stage: DispatchStage) -> ErrorClass {
    match stage {
        DispatchStage::NotSent => ErrorClass::Transient,
        // The remote may already have delivered it; resending is the user's call.
        DispatchStage::InFlight => ErrorClass::UserAction,
        DispatchStage::Status(429 | 503) => ErrorClass::Transient,
        DispatchStage::Status(401 | 403) => ErrorClass::UserAction,
        DispatchStage::Status(_) | DispatchStage::Local => ErrorClass::Permanent,
    }
}

/// Decide whether to retry based on the error class and attempt count.
pub fn should_retry(err: &RundgangError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::UserAction => {
            info!("user action required, not auto-retrying");
            RetryDecision::GiveUp(ErrorClass::UserAction)
        }
        ErrorClass::Transient => {
            if attempt >= config.max_retries {
                warn!(attempt, max = config.max_retries, "retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                let delay = compute_delay(attempt, config);
                debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

/// Run `op` until it succeeds or [`should_retry`] says stop; the last error
/// is returned unchanged.
pub async fn retry_async<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match should_retry(&err, attempt, config) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt, error = %err, delay_ms = delay.as_millis(), "dispatch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            },
        }
    }
}

/// Compute exponential backoff delay with jitter.
///
/// delay = min(base * 2^attempt + jitter, max_delay)
fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    Duration::from_millis(total_ms.min(config.max_delay.as_millis() as u64))
}

/// Deterministic spread in [0, base) derived from the attempt number.
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = (attempt as u64).wrapping_mul(6364136223846793005);
    hash % base_ms.max(1)
}
