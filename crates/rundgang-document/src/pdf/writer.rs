// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: serialise a laid-out `Document` using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. The layout uses millimetres from the top-left corner;
// everything is flipped to PDF points from the bottom-left here.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use printpdf::{
    BuiltinFont, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, RawImageData, RawImageFormat, Rgb,
    TextItem, WindingOrder, XObjectId, XObjectTransform,
};
use rundgang_core::error::{Result, RundgangError};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ProcessedBitmap;
use crate::report::document::{Document, Element, Page, TextRole};
use crate::report::layout::{Anchor, Color, PageGeometry, Rect, text_width};

/// Straight segments used to approximate each rounded panel corner.
const CORNER_SEGMENTS: usize = 6;

/// Renders [`Document`]s to PDF bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfWriter;

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Render every page of `document` into a single PDF.
    #[instrument(skip_all, fields(pages = document.total_pages()))]
    pub fn render(&self, document: &Document) -> Result<Vec<u8>> {
        if document.pages.is_empty() {
            return Err(RundgangError::Pdf("document has no pages".into()));
        }

        let mut doc = PdfDocument::new(&document.title);
        let mut embedded: HashMap<usize, XObjectId> = HashMap::new();
        let (page_w, page_h) = (Mm(document.geometry.width), Mm(document.geometry.height));

        let mut pages = Vec::with_capacity(document.pages.len());
        for page in &document.pages {
            let ops = page_ops(page, document.geometry, |bitmap| {
                embedded
                    .entry(bitmap.buffer_id())
                    .or_insert_with(|| doc.add_image(&raw_image(bitmap)))
                    .clone()
            });
            pages.push(PdfPage::new(page_w, page_h, ops));
        }
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }

        info!(
            bytes = output.len(),
            images = embedded.len(),
            "Report rendered to PDF"
        );
        Ok(output)
    }

    /// Render and write straight to a file.
    pub fn write_to_file(&self, document: &Document, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.render(document)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote report PDF to {}", path.as_ref().display());
        Ok(())
    }
}

/// Convert a processed bitmap to printpdf's raw RGB8 image.
fn raw_image(bitmap: &ProcessedBitmap) -> RawImage {
    let rgb = bitmap.as_dynamic().to_rgb8();
    RawImage {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
        pixels: RawImageData::U8(rgb.into_raw()),
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    }
}

/// Build the operation list for one page. `embed` returns the XObject for a
/// bitmap, embedding it on first use.
fn page_ops(
    page: &Page,
    geometry: PageGeometry,
    mut embed: impl FnMut(&ProcessedBitmap) -> XObjectId,
) -> Vec<Op> {
    let flip = |y_mm: f32| Mm(geometry.height - y_mm).into_pt();
    let mut ops = Vec::new();

    for element in &page.elements {
        match element {
            Element::Text {
                role,
                content,
                x,
                y,
                size_pt,
                anchor,
                color,
            } => {
                let left = match anchor {
                    Anchor::Left => *x,
                    Anchor::Center => *x - text_width(content, *size_pt) / 2.0,
                    Anchor::Right => *x - text_width(content, *size_pt),
                };
                let font = font_for(*role);
                ops.push(Op::StartTextSection);
                ops.push(Op::SetFillColor { col: pdf_color(*color) });
                ops.push(Op::SetTextCursor {
                    pos: Point {
                        x: Mm(left).into_pt(),
                        y: flip(*y),
                    },
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(*size_pt),
                    font,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(content.clone())],
                    font,
                });
                ops.push(Op::EndTextSection);
            }
            Element::Image { bitmap, rect, .. } => {
                let id = embed(bitmap);
                // At 72 dpi one pixel is one point, so the scale is target / px.
                let target_w = Mm(rect.width).into_pt().0;
                let target_h = Mm(rect.height).into_pt().0;
                ops.push(Op::UseXobject {
                    id,
                    transform: XObjectTransform {
                        translate_x: Some(Mm(rect.x).into_pt()),
                        translate_y: Some(flip(rect.bottom())),
                        scale_x: Some(target_w / bitmap.width().max(1) as f32),
                        scale_y: Some(target_h / bitmap.height().max(1) as f32),
                        dpi: Some(72.0),
                        rotate: None,
                    },
                });
            }
            Element::Rule {
                x1,
                y1,
                x2,
                y2,
                thickness_pt,
                color,
            } => {
                ops.push(Op::SetOutlineColor { col: pdf_color(*color) });
                ops.push(Op::SetOutlineThickness { pt: Pt(*thickness_pt) });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![
                            LinePoint {
                                p: Point { x: Mm(*x1).into_pt(), y: flip(*y1) },
                                bezier: false,
                            },
                            LinePoint {
                                p: Point { x: Mm(*x2).into_pt(), y: flip(*y2) },
                                bezier: false,
                            },
                        ],
                        is_closed: false,
                    },
                });
            }
            Element::Panel {
                rect,
                corner_radius,
                fill,
            } => {
                if rect.width <= 0.0 || rect.height <= 0.0 {
                    debug!(page = page.index, "Skipping empty panel");
                    continue;
                }
                let points = rounded_rect(rect, *corner_radius)
                    .into_iter()
                    .map(|(x, y)| LinePoint {
                        p: Point { x: Mm(x).into_pt(), y: flip(y) },
                        bezier: false,
                    })
                    .collect();
                ops.push(Op::SetFillColor { col: pdf_color(*fill) });
                ops.push(Op::DrawPolygon {
                    polygon: Polygon {
                        rings: vec![PolygonRing { points }],
                        mode: PaintMode::Fill,
                        winding_order: WindingOrder::NonZero,
                    },
                });
            }
        }
    }

    ops
}

fn font_for(role: TextRole) -> BuiltinFont {
    match role {
        TextRole::CoverTitle | TextRole::HeaderTitle => BuiltinFont::HelveticaBold,
        _ => BuiltinFont::Helvetica,
    }
}

fn pdf_color(color: Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
        icc_profile: None,
    })
}

/// Outline of a rounded rectangle in layout space, clockwise from the top
/// edge. The radius is clamped to half the shorter side.
fn rounded_rect(rect: &Rect, radius: f32) -> Vec<(f32, f32)> {
    let r = radius.clamp(0.0, rect.width.min(rect.height) / 2.0);
    if r == 0.0 {
        return vec![
            (rect.x, rect.y),
            (rect.right(), rect.y),
            (rect.right(), rect.bottom()),
            (rect.x, rect.bottom()),
        ];
    }

    // Corner centres paired with the angle each quarter arc starts at
    // (y grows downwards, so angles run clockwise on the page).
    let corners = [
        (rect.right() - r, rect.y + r, -FRAC_PI_2),
        (rect.right() - r, rect.bottom() - r, 0.0),
        (rect.x + r, rect.bottom() - r, FRAC_PI_2),
        (rect.x + r, rect.y + r, 2.0 * FRAC_PI_2),
    ];
    let mut points = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1));
    for (cx, cy, start) in corners {
        for step in 0..=CORNER_SEGMENTS {
            let angle = start + FRAC_PI_2 * step as f32 / CORNER_SEGMENTS as f32;
            points.push((cx + r * angle.cos(), cy + r * angle.sin()));
        }
    }
    points
}
