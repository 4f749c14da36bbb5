// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Rundgang inspection sessions.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RundgangError};

/// Placeholder shown wherever a location field could not be resolved.
pub const NOT_AVAILABLE: &str = "Not available";

/// Lowest selectable floor.
pub const MIN_FLOOR: u8 = 1;
/// Highest selectable floor.
pub const MAX_FLOOR: u8 = 50;

/// What kind of area an observation shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureType {
    #[default]
    Classroom,
    Floor,
    Restroom,
    Stairs,
}

impl CaptureType {
    pub const ALL: [CaptureType; 4] = [Self::Classroom, Self::Floor, Self::Restroom, Self::Stairs];

    /// Stable English label, also used as the wire/keyword form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Classroom => "Classroom",
            Self::Floor => "Floor",
            Self::Restroom => "Restroom",
            Self::Stairs => "Stairs",
        }
    }
}

impl fmt::Display for CaptureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CaptureType {
    type Err = RundgangError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RundgangError::InvalidFieldValue {
                field: "capture_type".into(),
                value: s.into(),
            })
    }
}

/// Cleanliness verdict recorded for an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    Clean,
    Dirty,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "Clean",
            Self::Dirty => "Dirty",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = RundgangError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "dirty" => Ok(Self::Dirty),
            _ => Err(RundgangError::InvalidFieldValue {
                field: "condition".into(),
                value: s.into(),
            }),
        }
    }
}

/// Floor number, always within `MIN_FLOOR..=MAX_FLOOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct FloorNumber(u8);

impl FloorNumber {
    pub fn new(value: i64) -> Result<Self> {
        if (MIN_FLOOR as i64..=MAX_FLOOR as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RundgangError::InvalidFloor(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for FloorNumber {
    fn default() -> Self {
        Self(MIN_FLOOR)
    }
}

impl TryFrom<i64> for FloorNumber {
    type Error = RundgangError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FloorNumber> for u8 {
    fn from(floor: FloorNumber) -> Self {
        floor.0
    }
}

impl fmt::Display for FloorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FloorNumber {
    type Err = RundgangError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s.trim().parse().map_err(|_| RundgangError::InvalidFieldValue {
            field: "floor_number".into(),
            value: s.into(),
        })?;
        Self::new(value)
    }
}

/// Encoded image payload (JPEG, PNG, ...) exactly as captured.
///
/// The buffer is immutable; clones share it.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBitmap(Arc<[u8]>);

impl ImageBitmap {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ImageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageBitmap({} bytes)", self.0.len())
    }
}

/// The fields of an observation that may change after capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationField {
    CaptureType,
    Condition,
    FloorNumber,
}

impl FromStr for ObservationField {
    type Err = RundgangError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "capture_type" | "captureType" | "type" => Ok(Self::CaptureType),
            "condition" | "description" => Ok(Self::Condition),
            "floor_number" | "floorNumber" | "floor" => Ok(Self::FloorNumber),
            other => Err(RundgangError::UnknownField(other.to_string())),
        }
    }
}

/// A typed replacement for one mutable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    CaptureType(CaptureType),
    Condition(Condition),
    FloorNumber(FloorNumber),
}

impl FieldUpdate {
    /// Parse a textual value for the named field.
    pub fn parse(field: ObservationField, value: &str) -> Result<Self> {
        Ok(match field {
            ObservationField::CaptureType => Self::CaptureType(value.parse()?),
            ObservationField::Condition => Self::Condition(value.parse()?),
            ObservationField::FloorNumber => Self::FloorNumber(value.parse()?),
        })
    }
}

/// One captured photograph plus its structured metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    image_bitmap: ImageBitmap,
    capture_type: CaptureType,
    condition: Condition,
    floor_number: FloorNumber,
    reporter_name: String,
    facility_name: String,
    captured_at: NaiveDateTime,
}

impl Observation {
    pub fn new(
        image_bitmap: ImageBitmap,
        capture_type: CaptureType,
        condition: Condition,
        floor_number: FloorNumber,
        reporter_name: impl Into<String>,
        facility_name: impl Into<String>,
    ) -> Self {
        Self {
            image_bitmap,
            capture_type,
            condition,
            floor_number,
            reporter_name: reporter_name.into(),
            facility_name: facility_name.into(),
            captured_at: Local::now().naive_local(),
        }
    }

    /// Override the capture time (imports, tests).
    pub fn with_captured_at(mut self, captured_at: NaiveDateTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn image_bitmap(&self) -> &ImageBitmap {
        &self.image_bitmap
    }

    pub fn capture_type(&self) -> CaptureType {
        self.capture_type
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn floor_number(&self) -> FloorNumber {
        self.floor_number
    }

    pub fn reporter_name(&self) -> &str {
        &self.reporter_name
    }

    pub fn facility_name(&self) -> &str {
        &self.facility_name
    }

    pub fn captured_at(&self) -> NaiveDateTime {
        self.captured_at
    }

    /// Replace exactly one mutable field. Only the store calls this.
    pub(crate) fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::CaptureType(t) => self.capture_type = t,
            FieldUpdate::Condition(c) => self.condition = c,
            FieldUpdate::FloorNumber(n) => self.floor_number = n,
        }
    }
}

/// Raw position reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Session-wide resolved address. Any field may be missing, in which case it
/// renders as [`NOT_AVAILABLE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub zipcode: Option<String>,
    pub landmark: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
}

impl LocationSnapshot {
    /// Snapshot carrying only the raw coordinates and resolution time, used
    /// when the address lookup failed.
    pub fn coordinates_only(coords: Coordinates, timestamp: NaiveDateTime) -> Self {
        Self {
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn latitude_text(&self) -> String {
        self.latitude
            .map(|v| format!("{v:.6}"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn longitude_text(&self) -> String {
        self.longitude
            .map(|v| format!("{v:.6}"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn timestamp_text(&self) -> String {
        self.timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Single-line postal address built from whatever parts resolved.
    pub fn address_line(&self) -> String {
        let street = join_present(&[&self.street, &self.house_number], " ");
        let town = join_present(&[&self.zipcode, &self.city], " ");
        let country = self.country.clone().unwrap_or_default();

        let parts: Vec<String> = [street, town, country]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Render an optional field, substituting the sentinel when absent or blank.
pub fn or_not_available(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

fn join_present(parts: &[&Option<String>], sep: &str) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Standard paper sizes for the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// What composition does when an observation's bitmap cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodePolicy {
    /// Discard the whole document.
    #[default]
    Abort,
    /// Leave the observation out of the report and renumber the rest.
    OmitPage,
}

/// Outbound channel for a finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkKind {
    Message,
    Archive,
    File,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Archive => "archive",
            Self::File => "file",
        })
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network blip or server hiccup; safe to retry automatically.
    Transient,
    /// User must act first (sign in again, capture a photo).
    UserAction,
    /// Retrying will not help: undecodable image, bad configuration.
    Permanent,
}
