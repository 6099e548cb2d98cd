//! Dual-player panning controller
//!
//! Splits one looping stereo source into a left-only and a right-only player
//! and re-gains both every tick from a single pan position.

use std::time::Duration;

use super::law::{linear_gains, PanOscillator};
use crate::audio::context::AudioContext;
use crate::audio::decode::EncodedAudio;
use crate::audio::isolate::{Channel, ChannelIsolation};
use crate::audio::looping::InfiniteLoop;
use crate::audio::player::Player;
use crate::error::Result;

/// Stream type fed to each player
pub type IsolatedStream = ChannelIsolation<InfiniteLoop>;

/// A stream whose gain can be changed while it plays
pub trait PlaybackHandle {
    fn set_volume(&self, volume: f64);
    fn position(&self) -> Duration;
}

/// Creates players for isolated streams
pub trait PlaybackBackend {
    type Player: PlaybackHandle;

    /// Rate the streams must be decoded at
    fn sample_rate(&self) -> u32;

    /// Create a paused player
    fn new_player(&self, stream: IsolatedStream, label: &str) -> Result<Self::Player>;

    /// Start all `players` on the same output block
    fn start_together(&self, players: &[&Self::Player]);
}

impl PlaybackHandle for Player {
    fn set_volume(&self, volume: f64) {
        Player::set_volume(self, volume)
    }

    fn position(&self) -> Duration {
        Player::position(self)
    }
}

impl PlaybackBackend for AudioContext {
    type Player = Player;

    fn sample_rate(&self) -> u32 {
        AudioContext::sample_rate(self)
    }

    fn new_player(&self, stream: IsolatedStream, label: &str) -> Result<Player> {
        AudioContext::new_player(self, stream, label)
    }

    fn start_together(&self, players: &[&Player]) {
        AudioContext::start_together(self, players)
    }
}

/// Playback lifecycle: set up once, on the first tick
enum Playback<P> {
    Uninitialized,
    Ready {
        left: P,
        right: P,
        loop_duration: Duration,
    },
}

pub struct PanningController<B: PlaybackBackend> {
    backend: B,
    source: EncodedAudio,
    oscillator: PanOscillator,
    pan: f64,
    x_position: f64,
    gains: (f64, f64),
    playback: Playback<B::Player>,
}

impl<B: PlaybackBackend> PanningController<B> {
    pub fn new(backend: B, source: EncodedAudio, oscillator: PanOscillator) -> Self {
        let pan = oscillator.pan();
        let x_position = oscillator.x_position();
        Self {
            backend,
            source,
            oscillator,
            pan,
            x_position,
            gains: linear_gains(pan),
            playback: Playback::Uninitialized,
        }
    }

    /// Advance one tick: move the pan position, make sure both players exist
    /// and apply the new gains.
    pub fn update(&mut self) -> Result<()> {
        self.oscillator.advance();
        self.x_position = self.oscillator.x_position();
        self.pan = self.oscillator.pan();

        // Players start at the gain of the tick that created them
        self.init_playback_if_needed()?;

        let (left_gain, right_gain) = linear_gains(self.pan);
        if let Playback::Ready { left, right, .. } = &self.playback {
            left.set_volume(left_gain);
            right.set_volume(right_gain);
        }
        self.gains = (left_gain, right_gain);

        Ok(())
    }

    fn init_playback_if_needed(&mut self) -> Result<()> {
        if let Playback::Ready { .. } = self.playback {
            return Ok(());
        }

        let audio = self.source.decode(self.backend.sample_rate())?;
        let pcm = audio.pcm();

        let (left_gain, right_gain) = linear_gains(self.pan);

        let left_stream = ChannelIsolation::new(InfiniteLoop::new(pcm.clone()), Channel::Left);
        let left = self.backend.new_player(left_stream, "left")?;
        left.set_volume(left_gain);

        let right_stream = ChannelIsolation::new(InfiniteLoop::new(pcm), Channel::Right);
        let right = self.backend.new_player(right_stream, "right")?;
        right.set_volume(right_gain);

        // Starting them apart would leave one stream a device buffer ahead
        self.backend.start_together(&[&left, &right]);

        log::info!(
            "PanningController: playback ready, loop length {:.2}s, pan {:.2}",
            audio.duration().as_secs_f64(),
            self.pan
        );

        self.playback = Playback::Ready {
            left,
            right,
            loop_duration: audio.duration(),
        };
        Ok(())
    }

    /// Playback position within the loop
    pub fn position(&self) -> Duration {
        match &self.playback {
            Playback::Uninitialized => Duration::ZERO,
            Playback::Ready {
                left,
                loop_duration,
                ..
            } => wrap_position(left.position(), *loop_duration),
        }
    }

    /// Current pan position, -1.0 (left) to 1.0 (right)
    pub fn pan(&self) -> f64 {
        self.pan
    }

    /// Horizontal coordinate of the sound, 0.0 to screen width
    pub fn x_position(&self) -> f64 {
        self.x_position
    }

    /// Gains applied on the last tick, (left, right)
    pub fn gains(&self) -> (f64, f64) {
        self.gains
    }

    pub fn ticks(&self) -> u64 {
        self.oscillator.ticks()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.playback, Playback::Ready { .. })
    }
}

fn wrap_position(position: Duration, loop_duration: Duration) -> Duration {
    let loop_nanos = loop_duration.as_nanos();
    if loop_nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((position.as_nanos() % loop_nanos) as u64)
}
