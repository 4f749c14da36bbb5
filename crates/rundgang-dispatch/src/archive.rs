// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photo archive: the raw, unprocessed captures zipped together with a
// `manifest.json` describing each entry.

use std::io::{Cursor, Write};

use rundgang_core::error::{DispatchStage, Result, RundgangError};
use rundgang_core::types::{CaptureType, Condition, Observation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const MANIFEST_NAME: &str = "manifest.json";

/// One photo in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub capture_type: CaptureType,
    pub condition: Condition,
    pub floor_number: u8,
    pub reporter_name: String,
    pub facility_name: String,
    pub captured_at: String,
    pub bytes: usize,
}

/// Archive contents listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub reporter_name: String,
    pub facility_name: String,
    pub entries: Vec<ManifestEntry>,
}

/// Extension guessed from the payload's magic bytes.
fn extension_for(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [0x89, b'P', b'N', b'G', ..] => "png",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        _ => "bin",
    }
}

fn zip_err(err: zip::result::ZipError) -> RundgangError {
    RundgangError::dispatch(DispatchStage::Local, format!("archive write failed: {err}"))
}

/// Zip the raw photos of `observations` in store order.
#[instrument(skip(observations), fields(count = observations.len()))]
pub fn build_archive(
    observations: &[Observation],
    reporter_name: &str,
    facility_name: &str,
) -> Result<Vec<u8>> {
    if observations.is_empty() {
        return Err(RundgangError::EmptyExport);
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    // Photos are already compressed; only the manifest is deflated.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(observations.len());
    for (i, observation) in observations.iter().enumerate() {
        let bytes = observation.image_bitmap().as_bytes();
        let file = format!("observation_{:03}.{}", i + 1, extension_for(bytes));
        writer.start_file(file.as_str(), stored).map_err(zip_err)?;
        writer.write_all(bytes)?;
        entries.push(ManifestEntry {
            file,
            capture_type: observation.capture_type(),
            condition: observation.condition(),
            floor_number: observation.floor_number().get(),
            reporter_name: observation.reporter_name().to_string(),
            facility_name: observation.facility_name().to_string(),
            captured_at: observation.captured_at().format("%Y-%m-%dT%H:%M:%S").to_string(),
            bytes: bytes.len(),
        });
    }

    let manifest = Manifest {
        reporter_name: reporter_name.to_string(),
        facility_name: facility_name.to_string(),
        entries,
    };
    writer.start_file(MANIFEST_NAME, deflated).map_err(zip_err)?;
    writer.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    let bytes = writer.finish().map_err(zip_err)?.into_inner();
    debug!(archive_bytes = bytes.len(), "Archive built");
    Ok(bytes)
}
