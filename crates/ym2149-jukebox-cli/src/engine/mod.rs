//! [`Engine`] implementation over the ym2149 replayer crates.

pub mod deck;
pub mod replayer;
pub mod tune;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use ym2149_jukebox::{Engine, EngineError, TrackInfo};

use crate::audio::StreamConfig;
use crate::streaming::StreamingContext;
use deck::Deck;
use tune::{Tune, TuneFormat};

/// Plays SNDH and AY files to the default audio device.
pub struct ChipEngine {
    config: StreamConfig,
    audio_enabled: bool,
    deck: Arc<Mutex<Deck>>,
    output: Option<StreamingContext>,
    tune: Option<Tune>,
    path: PathBuf,
    info: TrackInfo,
}

impl ChipEngine {
    /// Engine that opens an audio device on [`Engine::init`].
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            audio_enabled: true,
            deck: Arc::new(Mutex::new(Deck::new())),
            output: None,
            tune: None,
            path: PathBuf::new(),
            info: TrackInfo::default(),
        }
    }

    /// Engine that never touches the audio subsystem (metadata only).
    pub fn without_audio(config: StreamConfig) -> Self {
        Self {
            audio_enabled: false,
            ..Self::new(config)
        }
    }

    /// Format of the loaded file.
    pub fn format(&self) -> Option<TuneFormat> {
        self.tune.as_ref().map(Tune::format)
    }
}

impl Engine for ChipEngine {
    fn init(&mut self) -> Result<(), EngineError> {
        if !self.audio_enabled || self.output.is_some() {
            return Ok(());
        }
        let output = StreamingContext::start(Arc::clone(&self.deck), self.config)
            .map_err(|err| EngineError::Init(err.to_string()))?;
        self.output = Some(output);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let tune = Tune::open(path)?;
        info!(
            path = %path.display(),
            format = ?tune.format(),
            tracks = tune.track_count(),
            "file loaded"
        );
        self.tune = Some(tune);
        self.path = path.to_path_buf();
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.tune.as_ref().map_or(0, Tune::track_count)
    }

    fn start_track(&mut self, index: usize, dry_run: bool) -> Result<(), EngineError> {
        let tune = self.tune.as_ref().ok_or(EngineError::NotLoaded)?;
        let info = tune.track_info(index, self.config.sample_rate)?;

        if !dry_run {
            let replayer = tune.open_replayer(index, self.config.sample_rate)?;
            let limit = self.config.samples_for_ms(info.length_ms);
            self.deck.lock().load(replayer, limit);
            if let Some(output) = &self.output {
                output.restart();
            }
            debug!(index, limit, "replayer loaded");
        }

        self.info = info;
        Ok(())
    }

    fn track_info(&self) -> TrackInfo {
        self.info.clone()
    }

    fn pause(&mut self, paused: bool) {
        let mut deck = self.deck.lock();
        deck.set_paused(paused);
        debug!(paused, elapsed = deck.elapsed_samples(), "pause");
        drop(deck);
        if let Some(output) = &self.output {
            output.set_paused(paused);
        }
    }

    fn track_ended(&mut self) -> bool {
        let deck = self.deck.lock();
        match &self.output {
            // Let the queued tail play out before the next track clears it.
            Some(output) => deck.tail_queued() && output.is_drained(),
            None => deck.track_ended(),
        }
    }

    fn filename(&self) -> &Path {
        &self.path
    }
}
