#![forbid(unsafe_code)]

mod cli;
mod config;
mod constants;
mod deps;
mod error;
mod font;
mod ipc;
mod render;
mod session;
mod types;
mod viewer;
mod x11_utils;

use anyhow::{anyhow, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command};
use config::{PreviewConfig, Settings};
use error::PreviewError;
use render::MagickRasterizer;
use viewer::SxivViewer;

fn init_logging() -> Result<()> {
    // Quiet by default: the finder owns the terminal
    let log_level = match std::env::var(constants::env::LOG_LEVEL)
        .unwrap_or_else(|_| "warn".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn parse_cli() -> Result<Option<Cli>> {
    match Cli::try_parse() {
        Ok(cli) => Ok(Some(cli)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                e.print()?;
                Ok(None)
            }
            ErrorKind::UnknownArgument => {
                let arg = match e.get(ContextKind::InvalidArg) {
                    Some(ContextValue::String(arg)) => arg.clone(),
                    _ => e.to_string(),
                };
                Err(PreviewError::UnknownOption(arg).into())
            }
            _ => {
                e.print()?;
                Err(anyhow!("invalid command line"))
            }
        },
    }
}

fn load_config(cli: &Cli) -> Result<PreviewConfig> {
    let path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let file = Settings::load(&path)?;
    let config = PreviewConfig::from_settings(cli.settings().over(file))?;
    debug!(config = ?config, "Resolved configuration");
    Ok(config)
}

fn run() -> Result<()> {
    let Some(cli) = parse_cli()? else {
        return Ok(());
    };

    if let Some(Command::Preview { socket, selection }) = cli.command {
        return session::send_preview(&socket, selection);
    }

    let config = load_config(&cli)?;

    if !cli.fonts.is_empty() {
        deps::require(deps::DIRECT)?;
        let interrupted = session::install_interrupt_flag()?;
        info!(count = cli.fonts.len(), "Previewing font files");
        return session::preview_files(
            &MagickRasterizer::default(),
            &SxivViewer::default(),
            &config,
            &cli.fonts,
            &interrupted,
        );
    }

    deps::require(deps::INTERACTIVE)?;
    if let Some(choice) = session::run_interactive(config)? {
        println!("{}", choice.label);
    }
    Ok(())
}

/// `fontpreview: error: <message>` plus indented details on stderr
fn report(err: &anyhow::Error) {
    eprintln!("fontpreview: error: {err}");
    if let Some(preview) = err.chain().find_map(|cause| cause.downcast_ref::<PreviewError>()) {
        for line in preview.detail_lines() {
            eprintln!("    {line}");
        }
    }
    for cause in err.chain().skip(1) {
        eprintln!("    caused by: {cause}");
    }
}

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("fontpreview: warning: logging disabled: {e}");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
