// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rundgang: Core types, session state, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod session;
pub mod store;
pub mod types;

pub use config::SessionConfig;
pub use error::{DispatchStage, RundgangError};
pub use session::{ExportTicket, SessionSnapshot, SessionState};
pub use store::{ObservationSnapshot, ObservationStore};
pub use types::*;
