// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rundgang_core::session::CaptureDraft;
use rundgang_core::types::{CaptureType, Condition, FloorNumber, SinkKind};

#[derive(Parser, Debug)]
#[command(name = "rundgang", version, about = "Facility inspection reports from captured photos")]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (default: config.json in the data directory)")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print the dispatch receipt as JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture photos, compose the report and ship it.
    Report(ReportArgs),
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub facility: String,
    #[arg(long)]
    pub reporter: String,
    #[arg(
        long = "photo",
        value_parser = parse_photo_spec,
        help = "PATH[:TYPE[:CONDITION[:FLOOR]]], repeatable"
    )]
    pub photos: Vec<PhotoSpec>,
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    #[arg(long, value_enum, default_value_t = SinkArg::File)]
    pub sink: SinkArg,
    #[arg(long, help = "Export directory (overrides the config)")]
    pub out: Option<PathBuf>,
    #[arg(long, help = "Brightness factor (overrides the config)")]
    pub brightness: Option<f32>,
    #[arg(long, default_value_t = false, help = "Process photos one at a time")]
    pub sequential: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    File,
    Archive,
    Message,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::File => SinkKind::File,
            SinkArg::Archive => SinkKind::Archive,
            SinkArg::Message => SinkKind::Message,
        }
    }
}

/// One `--photo` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoSpec {
    pub path: PathBuf,
    pub draft: CaptureDraft,
}

fn parse_photo_spec(raw: &str) -> Result<PhotoSpec, String> {
    let mut parts = raw.split(':');
    let path = parts.next().filter(|p| !p.is_empty()).ok_or("missing photo path")?;
    let mut draft = CaptureDraft::default();
    if let Some(kind) = parts.next().filter(|p| !p.is_empty()) {
        draft.capture_type = kind.parse::<CaptureType>().map_err(|e| e.to_string())?;
    }
    if let Some(condition) = parts.next().filter(|p| !p.is_empty()) {
        draft.condition = condition.parse::<Condition>().map_err(|e| e.to_string())?;
    }
    if let Some(floor) = parts.next().filter(|p| !p.is_empty()) {
        draft.floor_number = floor.parse::<FloorNumber>().map_err(|e| e.to_string())?;
    }
    if parts.next().is_some() {
        return Err(format!("too many ':' fields in {raw:?}"));
    }
    Ok(PhotoSpec {
        path: PathBuf::from(path),
        draft,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_spec_defaults_and_overrides() {
        let bare = parse_photo_spec("a.jpg").unwrap();
        assert_eq!(bare.path, PathBuf::from("a.jpg"));
        assert_eq!(bare.draft, CaptureDraft::default());

        let full = parse_photo_spec("b.jpg:restroom:dirty:12").unwrap();
        assert_eq!(full.draft.capture_type, CaptureType::Restroom);
        assert_eq!(full.draft.condition, Condition::Dirty);
        assert_eq!(full.draft.floor_number.get(), 12);

        let skip = parse_photo_spec("c.jpg::dirty").unwrap();
        assert_eq!(skip.draft.capture_type, CaptureType::default());
        assert_eq!(skip.draft.condition, Condition::Dirty);
    }

    #[test]
    fn photo_spec_rejects_bad_values() {
        assert!(parse_photo_spec("a.jpg:attic").is_err());
        assert!(parse_photo_spec("a.jpg:floor:clean:51").is_err());
        assert!(parse_photo_spec(":floor").is_err());
        assert!(parse_photo_spec("a.jpg:floor:clean:3:extra").is_err());
    }

    #[test]
    fn report_command_parses() {
        let cli = Cli::try_parse_from([
            "rundgang",
            "report",
            "--facility",
            "Tower A",
            "--reporter",
            "Jane",
            "--photo",
            "a.jpg:floor:dirty:3",
            "--photo",
            "b.jpg:restroom",
            "--lat",
            "-33.86",
            "--lon",
            "151.2",
            "--sink",
            "archive",
        ])
        .unwrap();

        let Commands::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.photos.len(), 2);
        assert_eq!(args.lat, Some(-33.86));
        assert_eq!(SinkKind::from(args.sink), SinkKind::Archive);
    }

    #[test]
    fn latitude_requires_longitude() {
        let result = Cli::try_parse_from([
            "rundgang", "report", "--facility", "F", "--reporter", "R", "--lat", "1.0",
        ]);
        assert!(result.is_err());
    }
}
