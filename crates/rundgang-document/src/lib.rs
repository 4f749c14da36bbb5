// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rundgang-document: Report production for Rundgang.
//
// Provides photo normalisation (decode, brightness, size bounding), the
// deterministic page layout of an inspection report, and PDF rendering of the
// laid-out document.

pub mod image;
pub mod pdf;
pub mod report;

// Re-export the primary structs so callers can use `rundgang_document::ReportComposer` etc.
pub use crate::image::processor::{ImageProcessor, ProcessedBitmap, adjust_brightness};
pub use crate::pdf::writer::PdfWriter;
pub use crate::report::composer::{ReportAssets, ReportComposer};
pub use crate::report::document::{Document, Element, ImageRole, Page, PageKind, TextRole};
