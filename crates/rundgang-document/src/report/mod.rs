// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report module: page geometry, the laid-out document model, and the
// composer that turns a session snapshot into pages.

pub mod composer;
pub mod document;
pub mod layout;

pub use composer::{ReportAssets, ReportComposer};
pub use document::{Document, Element, ImageRole, Page, PageKind, TextRole};
pub use layout::{LayoutMetrics, Margins, PageGeometry};
