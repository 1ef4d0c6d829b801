//! Uniform view over the format replayers driven by the producer thread.

use tracing::warn;
use ym2149_ay_replayer::AyPlayer;
use ym2149_common::{ChiptunePlayerBase, PlaybackState};
use ym2149_sndh_replayer::SndhPlayer;

/// A replayer with one subsong initialised, rendering mono samples.
pub trait Replayer: Send {
    /// Start or resume.
    fn play(&mut self);

    /// Pause, keeping the position.
    fn pause(&mut self);

    /// Whether the replayer stopped on its own.
    fn is_stopped(&self) -> bool;

    /// Render `buffer.len()` samples.
    fn generate_samples_into(&mut self, buffer: &mut [f32]);
}

impl Replayer for SndhPlayer {
    fn play(&mut self) {
        ChiptunePlayerBase::play(self);
    }

    fn pause(&mut self) {
        ChiptunePlayerBase::pause(self);
    }

    fn is_stopped(&self) -> bool {
        ChiptunePlayerBase::state(self) == PlaybackState::Stopped
    }

    fn generate_samples_into(&mut self, buffer: &mut [f32]) {
        ChiptunePlayerBase::generate_samples_into(self, buffer);
    }
}

impl Replayer for AyPlayer {
    fn play(&mut self) {
        if let Err(err) = AyPlayer::play(self) {
            warn!(%err, "AY replayer failed to start");
        }
    }

    fn pause(&mut self) {
        AyPlayer::pause(self);
    }

    fn is_stopped(&self) -> bool {
        self.playback_state() == PlaybackState::Stopped
    }

    fn generate_samples_into(&mut self, buffer: &mut [f32]) {
        AyPlayer::generate_samples_into(self, buffer);
    }
}
