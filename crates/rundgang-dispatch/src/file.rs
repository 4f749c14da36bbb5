// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local file sink.

use std::path::{Path, PathBuf};

use rundgang_core::error::Result;
use tracing::info;

/// Write `bytes` as `file_name` inside `dir`, creating the directory if
/// needed. An existing file is never overwritten: `_2`, `_3`, ... is appended
/// to the stem instead.
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = free_path(dir, file_name);
    std::fs::write(&path, bytes)?;
    info!("Wrote export to {}", path.display());
    Ok(path)
}

fn free_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    (2u32..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
