//! `ym-jukebox`: interactive terminal player for multi-track chiptune files.
//!
//! Plays SNDH (Atari ST) and AY (ZX Spectrum) files through the ym2149
//! replayers. Keys: `q`/ESC quit, space pause, arrows change track.

#[cfg(not(unix))]
compile_error!("ym-jukebox needs a Unix terminal (termios)");

mod args;
mod audio;
mod engine;
mod logging;
mod streaming;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::debug;
use ym2149_jukebox::terminal::StdinTerminal;
use ym2149_jukebox::{Engine, PlayerError, SessionOutcome, run_session};

use args::CliArgs;
use audio::StreamConfig;
use engine::ChipEngine;

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    logging::init(args.verbose);

    let Some(input) = args.input.as_deref() else {
        let _ = CliArgs::command().print_help();
        return ExitCode::FAILURE;
    };

    match run(&args, input) {
        Ok(outcome) => {
            debug!(?outcome, "exiting");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs, input: &Path) -> Result<SessionOutcome> {
    let config = StreamConfig::default();
    let mut engine = if args.info {
        ChipEngine::without_audio(config)
    } else {
        ChipEngine::new(config)
    };

    engine.init().context("cannot open audio output")?;
    engine.load(input)?;
    debug!(format = ?engine.format(), tracks = engine.track_count(), "ready");

    let Some(options) = args.session_options() else {
        return Err(PlayerError::InvalidTrack {
            requested: 0,
            available: engine.track_count(),
        }
        .into());
    };

    let outcome = run_session(
        engine,
        StdinTerminal::new(),
        io::stdout(),
        &options,
        &args.player_config(),
    )?;
    Ok(outcome)
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<PlayerError>() {
        Some(invalid @ PlayerError::InvalidTrack { .. }) => eprintln!("{invalid}"),
        _ => eprintln!("Player error: {err:#}"),
    }
}
