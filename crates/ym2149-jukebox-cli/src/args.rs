//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use ym2149_jukebox::{
    DEFAULT_POLL_INTERVAL_MS, EscapePolicy, LoneEscape, PlayerConfig, SessionOptions,
};

/// Parsed command line.
#[derive(Parser, Debug)]
#[command(name = "ym-jukebox", version)]
#[command(about = "Terminal jukebox for multi-track SNDH and AY chiptunes")]
#[command(
    after_help = "Keys: q or ESC quit, space pause/resume, right/left arrow next/previous track"
)]
pub struct CliArgs {
    /// Music file to play (.sndh or .ay)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Only show info for the starting track, then exit
    #[arg(short, long)]
    pub info: bool,

    /// Start playing from a specific track (1-based)
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub track: usize,

    /// Stop after playing the current track
    #[arg(short, long)]
    pub single: bool,

    /// Control loop poll interval in milliseconds
    #[arg(
        long,
        value_name = "MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_ms: u64,

    /// Empty polls an arrow-key sequence may wait for its remaining bytes
    #[arg(long, value_name = "POLLS", default_value_t = 0)]
    pub esc_timeout: u32,

    /// Ignore a lone ESC instead of quitting
    #[arg(long)]
    pub esc_ignore: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl CliArgs {
    /// Loop configuration from the timing and escape flags.
    pub fn player_config(&self) -> PlayerConfig {
        let lone_escape = if self.esc_ignore {
            LoneEscape::Ignore
        } else {
            LoneEscape::Quit
        };
        PlayerConfig {
            escape: EscapePolicy::immediate()
                .with_timeout(self.esc_timeout)
                .with_lone_escape(lone_escape),
            ..PlayerConfig::with_poll_ms(self.poll_ms)
        }
    }

    /// Session options, or `None` when `--track 0` was given.
    pub fn session_options(&self) -> Option<SessionOptions> {
        Some(SessionOptions {
            start_track: self.track.checked_sub(1)?,
            single_track: self.single,
            info_only: self.info,
        })
    }
}
