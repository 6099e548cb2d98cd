//! Audio context: one cpal output stream mixing any number of players

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::RwLock;
use std::io::Read;
use std::sync::Arc;

use super::device::{get_output_device, get_supported_config, AudioConfig};
use super::player::{Player, PlayerShared};
use crate::error::Result;

/// Largest block rendered in one pass, in frames
const MAX_BLOCK_FRAMES: usize = 4096;

/// Shared state between the context and the audio thread
struct ContextShared {
    /// Read by the output callback for a whole render pass
    players: RwLock<Vec<Arc<PlayerShared>>>,
}

impl ContextShared {
    /// Start `players` so that no render pass sees only some of them playing
    fn start_together(&self, players: &[&Player]) {
        let _mixing = self.players.write();
        for player in players {
            player.play();
        }
    }
}

/// Owns the output stream; players created here are mixed into it
pub struct AudioContext {
    _stream: cpal::Stream,
    shared: Arc<ContextShared>,
    sample_rate: u32,
}

impl AudioContext {
    /// Open the output device and start the stream
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let device = get_output_device(config.device.as_deref())?;
        let stream_config = get_supported_config(&device, config)?;

        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;

        log::info!(
            "AudioContext: starting output on '{}' at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels
        );

        let shared = Arc::new(ContextShared {
            players: RwLock::new(Vec::new()),
        });
        let shared_clone = Arc::clone(&shared);

        // Pre-allocate buffers (avoid allocation in audio callback)
        let mut mixer = Mixer::new(MAX_BLOCK_FRAMES);

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let players = shared_clone.players.read();
                mixer.render(data, channels, &players);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None, // No timeout
        )?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            shared,
            sample_rate,
        })
    }

    /// Create a paused player for `stream` and add it to the mix
    ///
    /// The stream must produce interleaved stereo f32 at the context's rate.
    pub fn new_player<S>(&self, stream: S, label: &str) -> Result<Player>
    where
        S: Read + Send + 'static,
    {
        let player = Player::spawn(stream, self.sample_rate, label)?;

        let mut players = self.shared.players.write();
        players.retain(|p| !p.is_stopped());
        players.push(player.shared());

        Ok(player)
    }

    /// Start several players on the same output block
    pub fn start_together(&self, players: &[&Player]) {
        self.shared.start_together(players);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Mixes players into device buffers using preallocated scratch space
struct Mixer {
    mix: Vec<f32>,
    scratch: Vec<f32>,
    block_frames: usize,
}

impl Mixer {
    fn new(block_frames: usize) -> Self {
        Self {
            mix: vec![0.0; block_frames * 2],
            scratch: vec![0.0; block_frames * 2],
            block_frames,
        }
    }

    /// Fill `data` (interleaved, `channels` wide) with the sum of all players.
    ///
    /// Mono devices get the average of left and right, devices with more than
    /// two channels get silence on the extra ones. Output is limited to
    /// -1.0..=1.0.
    fn render(&mut self, data: &mut [f32], channels: usize, players: &[Arc<PlayerShared>]) {
        if channels == 0 {
            return;
        }

        for block in data.chunks_mut(self.block_frames * channels) {
            let frames = block.len() / channels;
            let mix = &mut self.mix[..frames * 2];
            mix.fill(0.0);

            for player in players {
                player.mix_into(mix, &mut self.scratch[..frames * 2]);
            }

            for (out, stereo) in block.chunks_mut(channels).zip(mix.chunks_exact(2)) {
                // SAFETY LIMITER: clamp and drop NaN/infinity
                let left = if stereo[0].is_finite() { stereo[0].clamp(-1.0, 1.0) } else { 0.0 };
                let right = if stereo[1].is_finite() { stereo[1].clamp(-1.0, 1.0) } else { 0.0 };

                if channels == 1 {
                    out[0] = (left + right) * 0.5;
                } else {
                    out[0] = left;
                    out[1] = right;
                    out[2..].fill(0.0);
                }
            }
        }
    }
}
