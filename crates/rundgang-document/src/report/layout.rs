// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry primitives. All lengths are millimetres with the origin at the
// top-left corner of the page; the PDF writer flips to PDF space.

use rundgang_core::types::PaperSize;

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 0.3528;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.50;

/// Page canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn from_paper(paper: PaperSize) -> Self {
        let (w, h) = paper.dimensions_mm();
        Self {
            width: w as f32,
            height: h as f32,
        }
    }
}

/// Distance from each page edge to the printable area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 15.0,
            right: 15.0,
            bottom: 15.0,
            left: 15.0,
        }
    }
}

/// Named offsets and sizes the layout is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub margins: Margins,
    /// Edge length of the square header logo.
    pub logo_size: f32,
    /// Height of the header band, measured from the top margin to the rule.
    pub header_height: f32,
    /// Gap between the header rule and the top of the photo.
    pub header_gutter: f32,
    /// Share of the content width the photo may occupy.
    pub photo_width_ratio: f32,
    /// Gap between the photo and the description column.
    pub column_gap: f32,
    /// Space reserved above the bottom margin for the footer.
    pub footer_height: f32,
    /// Distance of the metadata panel from the photo's top and right edges.
    pub panel_inset: f32,
    pub panel_padding: f32,
    pub panel_corner_radius: f32,
    /// Preferred panel width; shrinks to fit narrow photos.
    pub panel_width: f32,
    pub cover_title_pt: f32,
    pub cover_reporter_pt: f32,
    pub header_title_pt: f32,
    pub panel_text_pt: f32,
    pub body_text_pt: f32,
    pub footer_text_pt: f32,
    /// Line advance as a multiple of the font size.
    pub line_spacing: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            logo_size: 14.0,
            header_height: 18.0,
            header_gutter: 14.0,
            photo_width_ratio: 0.64,
            column_gap: 6.0,
            footer_height: 10.0,
            panel_inset: 2.5,
            panel_padding: 2.5,
            panel_corner_radius: 2.0,
            panel_width: 68.0,
            cover_title_pt: 26.0,
            cover_reporter_pt: 14.0,
            header_title_pt: 15.0,
            panel_text_pt: 7.0,
            body_text_pt: 10.0,
            footer_text_pt: 8.0,
            line_spacing: 1.35,
        }
    }
}

impl LayoutMetrics {
    /// Vertical advance of one text line at `size_pt`, in millimetres.
    pub fn line_height(&self, size_pt: f32) -> f32 {
        size_pt * self.line_spacing * MM_PER_PT
    }
}

/// Axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 1e-3;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }
}

/// Which point of a text run its `x` coordinate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
}

/// RGB colour, components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const SLATE: Color = Color { r: 0.13, g: 0.15, b: 0.19 };
    pub const GREY: Color = Color { r: 0.45, g: 0.45, b: 0.45 };
    pub const GOLD: Color = Color { r: 0.77, g: 0.67, b: 0.42 };
}

/// Estimated rendered width of `text` at `size_pt`, in millimetres.
pub fn text_width(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * AVG_GLYPH_EM * size_pt * MM_PER_PT
}

/// Largest rectangle with the image's aspect ratio that fits in
/// `max_width` x `max_height`, placed at (`x`, `y`).
pub fn fit_image(px_width: u32, px_height: u32, x: f32, y: f32, max_width: f32, max_height: f32) -> Rect {
    let (pw, ph) = (px_width.max(1) as f32, px_height.max(1) as f32);
    let scale = (max_width / pw).min(max_height / ph);
    Rect {
        x,
        y,
        width: pw * scale,
        height: ph * scale,
    }
}
