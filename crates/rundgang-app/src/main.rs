// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rundgang: Facility inspection reports
//
// Entry point. Initialises logging, loads the configuration, and runs one
// capture-compose-dispatch pass from the command line.

mod cli;
mod services;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rundgang_bridge::{EnvCredentialSource, FileFrameSource};
use rundgang_core::error::{DispatchStage, Result, RundgangError};
use rundgang_core::human_errors::humanize_error;
use rundgang_core::types::{Coordinates, SinkKind};

use cli::{Cli, Commands, ConfigCommands, ReportArgs};
use services::data_dir;
use services::report_service::ReportService;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "rundgang failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => data_dir::default_config_path()?,
    };

    match cli.command {
        Commands::Config { command: ConfigCommands::Show } => {
            let config = data_dir::load_config(&config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Config { command: ConfigCommands::Init { force } } => {
            if config_path.exists() && !force {
                return Err(RundgangError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                )));
            }
            data_dir::persist_config(&config_path, &Default::default())?;
            println!("{}", config_path.display());
            Ok(())
        }
        Commands::Report(args) => report(&config_path, args, cli.json).await,
    }
}

async fn report(config_path: &std::path::Path, args: ReportArgs, json: bool) -> Result<()> {
    let mut config = data_dir::load_config(config_path)?;
    if let Some(out) = args.out {
        config.export_dir = out;
    }
    if let Some(brightness) = args.brightness {
        config.brightness_factor = brightness;
    }

    let mut service =
        ReportService::new(config, Arc::new(EnvCredentialSource::new()))?.sequential(args.sequential);
    service.begin(&args.facility, &args.reporter);

    let drafts: Vec<_> = args.photos.iter().map(|photo| photo.draft).collect();
    let frames = FileFrameSource::new(args.photos.into_iter().map(|photo| photo.path));
    let captured = service.capture_all(&frames, &drafts)?;
    tracing::info!(captured, "photos captured");

    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        service.locate(Coordinates { latitude, longitude }).await;
    }

    let sink = SinkKind::from(args.sink);
    let Some(receipt) = service.export(sink).await? else {
        return Err(RundgangError::dispatch(
            DispatchStage::Local,
            "export was superseded by a session reset",
        ));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        match &receipt.path {
            Some(path) => println!("{sink}: {} ({} bytes, sha256 {})", path.display(), receipt.bytes, receipt.sha256),
            None => println!("{sink}: sent ({} bytes, sha256 {})", receipt.bytes, receipt.sha256),
        }
    }
    Ok(())
}
