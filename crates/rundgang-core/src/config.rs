// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session configuration. Endpoints and addresses live here; the bearer
// credential never does.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RundgangError};
use crate::types::{DecodePolicy, PaperSize};

/// Settings handed to a session when it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Paper size of the rendered report.
    pub paper_size: PaperSize,
    /// Brightness factor applied to every photo before embedding (1.0 = as captured).
    pub brightness_factor: f32,
    /// Longest edge, in pixels, of a photo embedded in the report.
    pub max_embed_px: u32,
    /// Reaction to a photo that cannot be decoded during composition.
    pub decode_policy: DecodePolicy,
    /// Directory that receives archive and file exports.
    pub export_dir: PathBuf,
    /// Optional logo shown in every observation page header.
    pub logo_path: Option<PathBuf>,
    /// Optional illustration centred on the cover page.
    pub cover_image_path: Option<PathBuf>,
    pub message: MessageConfig,
    pub geocoding: GeocodingConfig,
    /// Timeout applied to every outbound HTTP request, in seconds.
    pub http_timeout_secs: u64,
    /// Automatic retries for transient message dispatch failures.
    pub max_dispatch_retries: u32,
}

/// Where and how the report is mailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Send endpoint of the mail API.
    pub endpoint: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    /// Plain-text body accompanying the attachment.
    pub body: String,
    /// File name of the PDF attachment.
    pub attachment_name: String,
}

/// Reverse-geocoding provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Lookup endpoint; enrichment is skipped when unset.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            brightness_factor: 1.0,
            max_embed_px: 1600,
            decode_policy: DecodePolicy::Abort,
            export_dir: PathBuf::from("."),
            logo_path: None,
            cover_image_path: None,
            message: MessageConfig::default(),
            geocoding: GeocodingConfig::default(),
            http_timeout_secs: 30,
            max_dispatch_retries: 3,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://gmail.googleapis.com/gmail/v1/users/me/messages/send".into(),
            to: Vec::new(),
            cc: Vec::new(),
            subject: "Inspection report".into(),
            body: "Here is the inspection report with the captured photos and details.".into(),
            attachment_name: "inspection-report.pdf".into(),
        }
    }
}

impl MessageConfig {
    /// Whether the message sink can be used at all.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.to.is_empty()
    }
}

impl SessionConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.brightness_factor.is_finite() || self.brightness_factor < 0.0 {
            return Err(RundgangError::Config(format!(
                "brightness_factor must be a finite, non-negative number (got {})",
                self.brightness_factor
            )));
        }
        if self.max_embed_px == 0 {
            return Err(RundgangError::Config("max_embed_px must be positive".into()));
        }
        let (w, h) = self.paper_size.dimensions_mm();
        if w < 100 || h < 100 {
            return Err(RundgangError::Config(format!(
                "paper size {w}x{h}mm is too small for the report layout"
            )));
        }
        Ok(())
    }

    /// Parse a JSON configuration document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
