// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Rundgang.

use thiserror::Error;

/// How far a dispatch attempt got before it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    /// Local work failed; nothing touched the network.
    Local,
    /// The request never left: connection refused, DNS failure.
    NotSent,
    /// Sent, but no answer arrived. The remote may have acted on it.
    InFlight,
    /// The remote answered with this non-success HTTP status.
    Status(u16),
}

/// Top-level error type for all Rundgang operations.
#[derive(Debug, Error)]
pub enum RundgangError {
    // -- Capture --
    #[error("no frame available from the camera: {0}")]
    Capture(String),

    // -- Observation store --
    #[error("observation index {index} out of range (store holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown or immutable observation field: {0}")]
    UnknownField(String),

    #[error("invalid value {value:?} for field {field}")]
    InvalidFieldValue { field: String, value: String },

    #[error("floor number {0} outside 1..=50")]
    InvalidFloor(i64),

    // -- Image / report --
    #[error("bitmap could not be decoded: {0}")]
    Decode(String),

    #[error("report composition failed at observation {at_index}: {cause}")]
    Composition {
        at_index: usize,
        #[source]
        cause: Box<RundgangError>,
    },

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Enrichment (absorbed at the boundary, never surfaced to the user) --
    #[error("location lookup failed: {0}")]
    Enrichment(String),

    // -- Dispatch --
    #[error("authorization required: {0}")]
    Auth(String),

    #[error("dispatch failed: {detail}")]
    Dispatch { stage: DispatchStage, detail: String },

    #[error("nothing to export: the session has no observations")]
    EmptyExport,

    #[error("an export is already running for this session")]
    ExportInProgress,

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RundgangError {
    /// Wrap a decode error raised while laying out the observation at `index`.
    pub fn composition(at_index: usize, cause: RundgangError) -> Self {
        Self::Composition {
            at_index,
            cause: Box::new(cause),
        }
    }

    pub fn dispatch(stage: DispatchStage, detail: impl Into<String>) -> Self {
        Self::Dispatch {
            stage,
            detail: detail.into(),
        }
    }

    /// HTTP status carried by a dispatch failure, if the remote answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Dispatch {
                stage: DispatchStage::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RundgangError>;
