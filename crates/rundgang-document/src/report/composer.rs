// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report composer: turns a frozen list of observations into a paginated
// document: one cover page followed by one page per observation.
//
// Photo processing happens first (sequentially, or on the blocking pool with
// results reassembled in observation order); layout is a pure function of the
// processed photos, the location snapshot, and the page geometry.

use std::path::Path;

use rundgang_core::config::SessionConfig;
use rundgang_core::error::{Result, RundgangError};
use rundgang_core::session::SessionSnapshot;
use rundgang_core::types::{
    DecodePolicy, LocationSnapshot, Observation, PaperSize, or_not_available,
};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::{ImageProcessor, ProcessedBitmap};
use crate::report::document::{Document, Element, ImageRole, Page, PageKind, TextRole};
use crate::report::layout::{
    Anchor, Color, LayoutMetrics, MM_PER_PT, PageGeometry, Rect, fit_image,
};

/// Static artwork placed on report pages.
#[derive(Debug, Clone, Default)]
pub struct ReportAssets {
    /// Square logo in every observation page header.
    pub logo: Option<ProcessedBitmap>,
    /// Illustration in the middle band of the cover page.
    pub cover_illustration: Option<ProcessedBitmap>,
}

impl ReportAssets {
    /// Load artwork from disk. A missing or unreadable file is a configuration
    /// error, not a composition error.
    pub fn load(logo: Option<&Path>, cover_illustration: Option<&Path>) -> Result<Self> {
        Ok(Self {
            logo: logo.map(load_asset).transpose()?,
            cover_illustration: cover_illustration.map(load_asset).transpose()?,
        })
    }
}

fn load_asset(path: &Path) -> Result<ProcessedBitmap> {
    ImageProcessor::open(path)
        .map(ImageProcessor::into_processed)
        .map_err(|err| RundgangError::Config(format!("report asset {}: {err}", path.display())))
}

/// Builds [`Document`]s from observations.
#[derive(Debug, Clone)]
pub struct ReportComposer {
    geometry: PageGeometry,
    metrics: LayoutMetrics,
    brightness_factor: f32,
    max_embed_px: u32,
    decode_policy: DecodePolicy,
    assets: ReportAssets,
}

impl ReportComposer {
    /// Composer with default metrics, no artwork, and unchanged brightness.
    pub fn new(paper: PaperSize) -> Self {
        Self {
            geometry: PageGeometry::from_paper(paper),
            metrics: LayoutMetrics::default(),
            brightness_factor: 1.0,
            max_embed_px: 1600,
            decode_policy: DecodePolicy::Abort,
            assets: ReportAssets::default(),
        }
    }

    /// Composer configured from session settings, loading any artwork.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let assets = ReportAssets::load(
            config.logo_path.as_deref(),
            config.cover_image_path.as_deref(),
        )?;
        Ok(Self::new(config.paper_size)
            .with_brightness(config.brightness_factor)
            .with_max_embed_px(config.max_embed_px)
            .with_decode_policy(config.decode_policy)
            .with_assets(assets))
    }

    pub fn with_metrics(mut self, metrics: LayoutMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_brightness(mut self, factor: f32) -> Self {
        self.brightness_factor = factor;
        self
    }

    pub fn with_max_embed_px(mut self, max_px: u32) -> Self {
        self.max_embed_px = max_px;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_assets(mut self, assets: ReportAssets) -> Self {
        self.assets = assets;
        self
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    // -- Composition ----------------------------------------------------------

    /// Compose a report, processing photos one after another.
    #[instrument(skip_all, fields(observations = observations.len()))]
    pub fn compose(
        &self,
        observations: &[Observation],
        location: &LocationSnapshot,
        facility_name: &str,
        reporter_name: &str,
    ) -> Result<Document> {
        let (factor, max_px) = (self.brightness_factor, self.max_embed_px);
        let processed = observations
            .iter()
            .map(|o| prepare_photo(o.image_bitmap().as_bytes(), factor, max_px));
        let entries = self.settle(observations, processed)?;
        Ok(self.layout(&entries, location, facility_name, reporter_name))
    }

    /// Compose from a session snapshot.
    pub fn compose_snapshot(&self, snapshot: &SessionSnapshot) -> Result<Document> {
        self.compose(
            snapshot.observations.as_slice(),
            &snapshot.location,
            &snapshot.facility_name,
            &snapshot.reporter_name,
        )
    }

    /// Compose a report, processing all photos in parallel on the blocking
    /// pool. Produces the same document as [`compose`](Self::compose).
    #[instrument(skip_all, fields(observations = observations.len()))]
    pub async fn compose_concurrent(
        &self,
        observations: &[Observation],
        location: &LocationSnapshot,
        facility_name: &str,
        reporter_name: &str,
    ) -> Result<Document> {
        let (factor, max_px) = (self.brightness_factor, self.max_embed_px);
        let handles: Vec<_> = observations
            .iter()
            .map(|o| {
                let bitmap = o.image_bitmap().clone();
                tokio::task::spawn_blocking(move || prepare_photo(bitmap.as_bytes(), factor, max_px))
            })
            .collect();

        // Tasks finish in any order; awaiting the handles in spawn order puts
        // the results back into observation order.
        let mut processed = Vec::with_capacity(handles.len());
        for handle in handles {
            processed.push(handle.await.unwrap_or_else(|err| {
                Err(RundgangError::Decode(format!("photo processing task failed: {err}")))
            }));
        }

        let entries = self.settle(observations, processed)?;
        Ok(self.layout(&entries, location, facility_name, reporter_name))
    }

    /// Pair observations with their processed photos, applying the decode
    /// policy to failures.
    fn settle<I>(
        &self,
        observations: &[Observation],
        processed: I,
    ) -> Result<Vec<(Observation, ProcessedBitmap)>>
    where
        I: IntoIterator<Item = Result<ProcessedBitmap>>,
    {
        let mut entries = Vec::with_capacity(observations.len());
        for (index, (observation, result)) in observations.iter().zip(processed).enumerate() {
            match result {
                Ok(bitmap) => entries.push((observation.clone(), bitmap)),
                Err(err) => match self.decode_policy {
                    DecodePolicy::Abort => {
                        warn!(index, error = %err, "photo unreadable, discarding report");
                        return Err(RundgangError::composition(index, err));
                    }
                    DecodePolicy::OmitPage => {
                        warn!(index, error = %err, "photo unreadable, leaving it out of the report");
                    }
                },
            }
        }
        Ok(entries)
    }

    // -- Layout ---------------------------------------------------------------

    /// Lay out the cover and one page per processed observation.
    pub fn layout(
        &self,
        entries: &[(Observation, ProcessedBitmap)],
        location: &LocationSnapshot,
        facility_name: &str,
        reporter_name: &str,
    ) -> Document {
        let total = entries.len() + 1;
        let mut pages = Vec::with_capacity(total);
        pages.push(self.cover_page(total, facility_name, reporter_name));
        for (position, (observation, photo)) in entries.iter().enumerate() {
            pages.push(self.observation_page(
                position + 2,
                total,
                observation,
                photo,
                location,
                facility_name,
            ));
        }

        info!(pages = total, "report composed");
        Document {
            geometry: self.geometry,
            title: if facility_name.is_empty() {
                "Inspection report".to_string()
            } else {
                format!("{facility_name} inspection report")
            },
            pages,
        }
    }

    fn cover_page(&self, total: usize, facility_name: &str, reporter_name: &str) -> Page {
        let m = &self.metrics;
        let g = &self.geometry;
        let mut elements = Vec::new();

        let title_y = m.margins.top + m.cover_title_pt * MM_PER_PT;
        elements.push(Element::Text {
            role: TextRole::CoverTitle,
            content: facility_name.to_string(),
            x: m.margins.left,
            y: title_y,
            size_pt: m.cover_title_pt,
            anchor: Anchor::Left,
            color: Color::SLATE,
        });
        elements.push(Element::Rule {
            x1: m.margins.left,
            y1: title_y + 4.0,
            x2: g.width - m.margins.right,
            y2: title_y + 4.0,
            thickness_pt: 1.5,
            color: Color::GOLD,
        });

        if let Some(illustration) = &self.assets.cover_illustration {
            let band_top = g.height * 0.3;
            let band_height = g.height * 0.4;
            let content_width = g.width - m.margins.left - m.margins.right;
            let mut rect = fit_image(
                illustration.width(),
                illustration.height(),
                0.0,
                0.0,
                content_width,
                band_height,
            );
            rect.x = (g.width - rect.width) / 2.0;
            rect.y = band_top + (band_height - rect.height) / 2.0;
            elements.push(Element::Image {
                role: ImageRole::CoverIllustration,
                bitmap: illustration.clone(),
                rect,
            });
        }

        let footer_y = g.height - m.margins.bottom;
        elements.push(Element::Text {
            role: TextRole::CoverReporter,
            content: reporter_name.to_string(),
            x: g.width / 2.0,
            y: footer_y - m.footer_height,
            size_pt: m.cover_reporter_pt,
            anchor: Anchor::Center,
            color: Color::SLATE,
        });
        elements.push(self.page_label(1, total));

        Page {
            index: 1,
            total,
            kind: PageKind::Cover {
                facility_name: facility_name.to_string(),
                reporter_name: reporter_name.to_string(),
            },
            elements,
        }
    }

    fn observation_page(
        &self,
        index: usize,
        total: usize,
        observation: &Observation,
        photo: &ProcessedBitmap,
        location: &LocationSnapshot,
        facility_name: &str,
    ) -> Page {
        let m = &self.metrics;
        let g = &self.geometry;
        let mut elements = Vec::new();
        let content_right = g.width - m.margins.right;

        // Header band: logo, facility name, rule.
        if let Some(logo) = &self.assets.logo {
            let rect = fit_image(
                logo.width(),
                logo.height(),
                m.margins.left,
                m.margins.top,
                m.logo_size,
                m.logo_size,
            );
            elements.push(Element::Image {
                role: ImageRole::Logo,
                bitmap: logo.clone(),
                rect,
            });
        }
        let header_name = if observation.facility_name().is_empty() {
            facility_name
        } else {
            observation.facility_name()
        };
        elements.push(Element::Text {
            role: TextRole::HeaderTitle,
            content: header_name.to_string(),
            x: m.margins.left + m.logo_size + 4.0,
            y: m.margins.top + m.logo_size / 2.0 + m.header_title_pt * MM_PER_PT * 0.35,
            size_pt: m.header_title_pt,
            anchor: Anchor::Left,
            color: Color::SLATE,
        });
        let rule_y = m.margins.top + m.header_height;
        elements.push(Element::Rule {
            x1: m.margins.left,
            y1: rule_y,
            x2: content_right,
            y2: rule_y,
            thickness_pt: 0.8,
            color: Color::SLATE,
        });

        // Body: photo at the left margin below the header gutter.
        let body_top = rule_y + m.header_gutter;
        let content_width = content_right - m.margins.left;
        let footer_rule_y = g.height - m.margins.bottom - m.footer_height;
        let photo_rect = fit_image(
            photo.width(),
            photo.height(),
            m.margins.left,
            body_top,
            content_width * m.photo_width_ratio,
            (footer_rule_y - 4.0 - body_top).max(1.0),
        );
        elements.push(Element::Image {
            role: ImageRole::Photo,
            bitmap: photo.clone(),
            rect: photo_rect,
        });

        // Metadata panel overlaid on the photo's top-right corner.
        let lines = panel_lines(observation, location);
        let line_height = m.line_height(m.panel_text_pt);
        let wanted_height = 2.0 * m.panel_padding + lines.len() as f32 * line_height;
        let panel_width = m
            .panel_width
            .min(photo_rect.width - 2.0 * m.panel_inset)
            .max(0.0);
        let panel_height = wanted_height
            .min(photo_rect.height - 2.0 * m.panel_inset)
            .max(0.0);
        let panel = Rect {
            x: photo_rect.right() - m.panel_inset - panel_width,
            y: photo_rect.y + m.panel_inset,
            width: panel_width,
            height: panel_height,
        };
        elements.push(Element::Panel {
            rect: panel,
            corner_radius: m.panel_corner_radius,
            fill: Color::SLATE,
        });
        let text_size_mm = m.panel_text_pt * MM_PER_PT;
        for (k, line) in lines.into_iter().enumerate() {
            elements.push(Element::Text {
                role: TextRole::PanelLine,
                content: line,
                x: panel.x + m.panel_padding,
                y: panel.y + m.panel_padding + text_size_mm + k as f32 * line_height,
                size_pt: m.panel_text_pt,
                anchor: Anchor::Left,
                color: Color::WHITE,
            });
        }

        // Description column beside the photo.
        let column_x = photo_rect.right() + m.column_gap;
        let body_line = m.line_height(m.body_text_pt);
        let first_baseline = body_top + m.body_text_pt * MM_PER_PT;
        for (k, line) in description_lines(observation, location).into_iter().enumerate() {
            elements.push(Element::Text {
                role: TextRole::Description,
                content: line,
                x: column_x,
                y: first_baseline + k as f32 * body_line,
                size_pt: m.body_text_pt,
                anchor: Anchor::Left,
                color: Color::BLACK,
            });
        }

        // Footer: rule, address line, page label on one baseline.
        elements.push(Element::Rule {
            x1: m.margins.left,
            y1: footer_rule_y,
            x2: content_right,
            y2: footer_rule_y,
            thickness_pt: 0.5,
            color: Color::GREY,
        });
        elements.push(Element::Text {
            role: TextRole::Address,
            content: location.address_line(),
            x: m.margins.left,
            y: g.height - m.margins.bottom,
            size_pt: m.footer_text_pt,
            anchor: Anchor::Left,
            color: Color::GREY,
        });
        elements.push(self.page_label(index, total));

        debug!(index, photo_w = photo_rect.width, photo_h = photo_rect.height, "observation page laid out");
        Page {
            index,
            total,
            kind: PageKind::Observation {
                observation: observation.clone(),
                location: location.clone(),
            },
            elements,
        }
    }

    fn page_label(&self, index: usize, total: usize) -> Element {
        Element::Text {
            role: TextRole::PageLabel,
            content: format!("Page {index} of {total}"),
            x: self.geometry.width - self.metrics.margins.right,
            y: self.geometry.height - self.metrics.margins.bottom,
            size_pt: self.metrics.footer_text_pt,
            anchor: Anchor::Right,
            color: Color::GREY,
        }
    }
}

/// Decode, bound, and brightness-adjust one raw photo.
fn prepare_photo(bytes: &[u8], factor: f32, max_px: u32) -> Result<ProcessedBitmap> {
    Ok(ImageProcessor::from_bytes(bytes)?
        .bound_long_edge(max_px)
        .adjust_brightness(factor)
        .into_processed())
}

/// One line per metadata field, all taken from this observation.
fn panel_lines(observation: &Observation, location: &LocationSnapshot) -> Vec<String> {
    vec![
        format!("Latitude: {}", location.latitude_text()),
        format!("Longitude: {}", location.longitude_text()),
        format!("Timestamp: {}", location.timestamp_text()),
        format!("Floor: {}", observation.floor_number()),
        format!("Type: {}", observation.capture_type()),
        format!("Condition: {}", observation.condition()),
        format!(
            "Street: {}, Zip: {}, No: {}",
            or_not_available(&location.street),
            or_not_available(&location.zipcode),
            or_not_available(&location.house_number),
        ),
        format!(
            "City: {}, Country: {}",
            or_not_available(&location.city),
            or_not_available(&location.country),
        ),
    ]
}

fn description_lines(observation: &Observation, location: &LocationSnapshot) -> Vec<String> {
    vec![
        "Description".to_string(),
        format!("{} on floor {}", observation.capture_type(), observation.floor_number()),
        format!("Condition: {}", observation.condition()),
        format!("Landmark: {}", or_not_available(&location.landmark)),
        format!("Captured: {}", observation.captured_at().format("%Y-%m-%d %H:%M")),
    ]
}
