//! The track currently loaded for output, shared with the producer thread.
//!
//! The deck also keeps the play clock: only samples rendered while playing
//! count toward the track length, so time spent paused never ends a track.
//! A track is over for the listener only once its last batch reached the
//! output queue ([`Deck::mark_queued`]).

use super::replayer::Replayer;

/// Holder of the active replayer and its elapsed-sample clock.
#[derive(Default)]
pub struct Deck {
    replayer: Option<Box<dyn Replayer>>,
    paused: bool,
    rendered: u64,
    limit: u64,
    ended: bool,
    tail_queued: bool,
    generation: u64,
}

impl Deck {
    /// Empty deck rendering nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current track and start it. `limit` is the track length in
    /// samples.
    pub fn load(&mut self, mut replayer: Box<dyn Replayer>, limit: u64) {
        replayer.play();
        self.replayer = Some(replayer);
        self.paused = false;
        self.rendered = 0;
        self.limit = limit;
        self.ended = false;
        self.tail_queued = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Pause or resume the current track.
    pub fn set_paused(&mut self, paused: bool) {
        if let Some(replayer) = self.replayer.as_mut() {
            if paused {
                replayer.pause();
            } else {
                replayer.play();
            }
        }
        self.paused = paused;
    }

    /// Render the next batch into `buffer`.
    ///
    /// Returns `false` without touching `buffer` when there is nothing to play:
    /// no track, paused, or the track already ended.
    pub fn render(&mut self, buffer: &mut [f32]) -> bool {
        if self.paused || self.ended {
            return false;
        }
        let Some(replayer) = self.replayer.as_mut() else {
            return false;
        };

        replayer.generate_samples_into(buffer);
        self.rendered += buffer.len() as u64;
        if self.rendered >= self.limit || replayer.is_stopped() {
            self.ended = true;
        }
        true
    }

    /// Whether the current track rendered its last batch.
    pub fn track_ended(&self) -> bool {
        self.ended
    }

    /// Whether the last batch of the current track was handed to the output.
    pub fn tail_queued(&self) -> bool {
        self.ended && self.tail_queued
    }

    /// Identifies the loaded track; changes on every [`Deck::load`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record that everything rendered for track `generation` is queued.
    /// Ignored when another track was loaded in the meantime.
    pub fn mark_queued(&mut self, generation: u64) {
        if generation == self.generation && self.ended {
            self.tail_queued = true;
        }
    }

    /// Samples rendered for the current track while playing.
    pub fn elapsed_samples(&self) -> u64 {
        self.rendered
    }
}
