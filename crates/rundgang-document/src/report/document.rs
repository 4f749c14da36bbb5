// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Laid-out report: pages plus the drawing elements placed on each of them.

use rundgang_core::types::{LocationSnapshot, Observation};

use crate::image::processor::ProcessedBitmap;
use crate::report::layout::{Anchor, Color, PageGeometry, Rect};

/// Purpose of a text run; lets renderers and tests address runs semantically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    CoverTitle,
    CoverReporter,
    HeaderTitle,
    PanelLine,
    Description,
    Address,
    PageLabel,
}

/// Purpose of a placed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    CoverIllustration,
    Logo,
    Photo,
}

/// One drawing instruction on a page.
#[derive(Debug, Clone)]
pub enum Element {
    Text {
        role: TextRole,
        content: String,
        /// Anchor point x.
        x: f32,
        /// Baseline y.
        y: f32,
        size_pt: f32,
        anchor: Anchor,
        color: Color,
    },
    Image {
        role: ImageRole,
        bitmap: ProcessedBitmap,
        rect: Rect,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness_pt: f32,
        color: Color,
    },
    /// Filled rectangle with rounded corners.
    Panel {
        rect: Rect,
        corner_radius: f32,
        fill: Color,
    },
}

/// What a page represents.
#[derive(Debug, Clone)]
pub enum PageKind {
    Cover {
        facility_name: String,
        reporter_name: String,
    },
    Observation {
        observation: Observation,
        location: LocationSnapshot,
    },
}

/// A single report page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position in the document.
    pub index: usize,
    pub total: usize,
    pub kind: PageKind,
    pub elements: Vec<Element>,
}

impl Page {
    /// Text runs with the given role, in placement order.
    pub fn texts(&self, role: TextRole) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Text { role: r, content, .. } if *r == role => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Rectangle of the first image with the given role.
    pub fn image_rect(&self, role: ImageRole) -> Option<Rect> {
        self.elements.iter().find_map(|e| match e {
            Element::Image { role: r, rect, .. } if *r == role => Some(*rect),
            _ => None,
        })
    }

    /// Rectangle of the metadata panel, if the page has one.
    pub fn panel_rect(&self) -> Option<Rect> {
        self.elements.iter().find_map(|e| match e {
            Element::Panel { rect, .. } => Some(*rect),
            _ => None,
        })
    }

    pub fn is_cover(&self) -> bool {
        matches!(self.kind, PageKind::Cover { .. })
    }
}

/// The composed, paginated report.
#[derive(Debug, Clone)]
pub struct Document {
    pub geometry: PageGeometry,
    pub title: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Page by 1-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        index.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn observation_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| !p.is_cover())
    }
}
