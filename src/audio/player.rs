//! Independently playable, volume-controlled stream players
//!
//! Each player owns a refill thread that pulls bytes from its stream,
//! converts them to f32 samples and pushes them into a lock-free ring buffer.
//! The output callback pops from the ring, scales by the player's volume and
//! sums into the mix.

use parking_lot::{Mutex, RwLock};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::isolate::{FRAME_SIZE, SAMPLE_SIZE};
use super::{f32_to_u32, u32_to_f32};
use crate::error::Result;

/// Ring buffer capacity in stereo frames
const RING_FRAMES: usize = 8192;

/// Frames requested from the stream per read
const REFILL_CHUNK_FRAMES: usize = 1024;

/// How long the refill thread waits when the ring is full
const REFILL_INTERVAL: Duration = Duration::from_millis(5);

/// State shared between a player handle, its refill thread and the output callback
pub(crate) struct PlayerShared {
    label: String,
    /// Ring buffer consumer (read side), only touched by the output callback
    consumer: Mutex<HeapCons<f32>>,
    /// Linear gain 0.0 - 1.0 stored as f32 bits
    volume: AtomicU32,
    is_playing: AtomicBool,
    /// Signal to stop the refill thread
    should_stop: AtomicBool,
    /// Set once the stream reported end of data
    finished: AtomicBool,
    /// Frames handed to the output since creation
    played_frames: AtomicU64,
    /// Stream error that stopped the refill thread
    error: RwLock<Option<String>>,
}

impl PlayerShared {
    pub(crate) fn is_stopped(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Pop up to `mix.len()` interleaved stereo samples and add them, scaled
    /// by the current volume, into `mix`. `scratch` must be at least as long
    /// as `mix`. Returns the number of frames consumed.
    pub(crate) fn mix_into(&self, mix: &mut [f32], scratch: &mut [f32]) -> usize {
        if !self.is_playing.load(Ordering::SeqCst) || self.is_stopped() {
            return 0;
        }

        let wanted = mix.len() - mix.len() % 2;
        let popped = self.consumer.lock().pop_slice(&mut scratch[..wanted]);
        let popped = popped - popped % 2;

        let volume = u32_to_f32(self.volume.load(Ordering::Relaxed));
        for (out, sample) in mix[..popped].iter_mut().zip(&scratch[..popped]) {
            *out += sample * volume;
        }

        let frames = popped / 2;
        self.played_frames.fetch_add(frames as u64, Ordering::Relaxed);
        frames
    }
}

/// Handle to a playing stream
pub struct Player {
    shared: Arc<PlayerShared>,
    sample_rate: u32,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl Player {
    /// Start a refill thread for `stream` and return a paused player
    ///
    /// `stream` must produce interleaved stereo f32 samples in native byte
    /// order at `sample_rate`.
    pub fn spawn<S>(stream: S, sample_rate: u32, label: &str) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        let (producer, consumer) = HeapRb::<f32>::new(RING_FRAMES * 2).split();

        let shared = Arc::new(PlayerShared {
            label: label.to_string(),
            consumer: Mutex::new(consumer),
            volume: AtomicU32::new(f32_to_u32(1.0)),
            is_playing: AtomicBool::new(false),
            should_stop: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            played_frames: AtomicU64::new(0),
            error: RwLock::new(None),
        });

        let shared_clone = Arc::clone(&shared);
        let thread_handle = thread::Builder::new()
            .name(format!("player-{}", label))
            .spawn(move || {
                refill_thread(stream, producer, shared_clone);
            })?;

        log::info!("Player: created '{}' at {} Hz", label, sample_rate);

        Ok(Self {
            shared,
            sample_rate,
            thread_handle: Some(thread_handle),
        })
    }

    pub(crate) fn shared(&self) -> Arc<PlayerShared> {
        Arc::clone(&self.shared)
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn play(&self) {
        log::info!("Player: play() called on '{}'", self.shared.label);
        self.shared.is_playing.store(true, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing.load(Ordering::SeqCst)
    }

    /// Set the linear output gain, clamped to 0.0 - 1.0
    pub fn set_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0) as f32;
        self.shared.volume.store(f32_to_u32(volume), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f64 {
        u32_to_f32(self.shared.volume.load(Ordering::Relaxed)) as f64
    }

    /// Amount of audio handed to the output so far
    pub fn position(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.shared.played_frames.load(Ordering::Relaxed);
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Samples waiting in the ring buffer
    pub fn buffered_samples(&self) -> usize {
        self.shared.consumer.lock().occupied_len()
    }

    /// Whether the stream has run out of data
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }

    /// Error that stopped the stream, if any
    pub fn error(&self) -> Option<String> {
        self.shared.error.read().clone()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shared.is_playing.store(false, Ordering::SeqCst);
        self.shared.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Refill thread: keep the ring buffer topped up from the stream
///
/// Bytes are reassembled into whole frames before being pushed, so a read
/// that ends mid-frame never shifts the left/right interleaving.
fn refill_thread<S: Read>(mut stream: S, mut producer: HeapProd<f32>, shared: Arc<PlayerShared>) {
    let mut bytes = vec![0u8; REFILL_CHUNK_FRAMES * FRAME_SIZE];
    let mut pending: Vec<u8> = Vec::with_capacity(bytes.len() + FRAME_SIZE);
    let mut samples: Vec<f32> = Vec::with_capacity(REFILL_CHUNK_FRAMES * 2);

    while !shared.should_stop.load(Ordering::SeqCst) {
        if producer.vacant_len() < REFILL_CHUNK_FRAMES * 2 {
            thread::sleep(REFILL_INTERVAL);
            continue;
        }

        let n = match stream.read(&mut bytes) {
            Ok(0) => {
                log::info!("Player: stream '{}' ended", shared.label);
                shared.finished.store(true, Ordering::SeqCst);
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::error!("Player: stream '{}' read failed: {}", shared.label, e);
                *shared.error.write() = Some(e.to_string());
                break;
            }
        };

        pending.extend_from_slice(&bytes[..n]);
        let whole = pending.len() - pending.len() % FRAME_SIZE;

        samples.clear();
        samples.extend(
            pending[..whole]
                .chunks_exact(SAMPLE_SIZE)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
        );
        pending.drain(..whole);

        producer.push_slice(&samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::looping::InfiniteLoop;
    use std::io::Cursor;
    use std::time::Instant;

    fn stereo_bytes(frames: &[(f32, f32)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (l, r) in frames {
            out.extend_from_slice(&l.to_ne_bytes());
            out.extend_from_slice(&r.to_ne_bytes());
        }
        out
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for refill thread");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_player_starts_paused_at_full_volume() {
        let player = Player::spawn(Cursor::new(Vec::new()), 48000, "test").unwrap();
        assert!(!player.is_playing());
        assert_eq!(player.volume(), 1.0);
        assert_eq!(player.position(), Duration::ZERO);
        assert_eq!(player.label(), "test");
    }

    #[test]
    fn test_volume_clamp() {
        let player = Player::spawn(Cursor::new(Vec::new()), 48000, "test").unwrap();
        player.set_volume(1.5);
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-0.5);
        assert_eq!(player.volume(), 0.0);
        player.set_volume(0.25);
        assert_eq!(player.volume(), 0.25);
    }

    #[test]
    fn test_mix_applies_volume_and_advances_position() {
        let bytes = stereo_bytes(&[(1.0, -1.0), (0.5, 0.25)]);
        let player = Player::spawn(Cursor::new(bytes), 2, "test").unwrap();
        wait_until(|| player.is_finished());

        let shared = player.shared();
        let mut mix = [0.0f32; 4];
        let mut scratch = [0.0f32; 4];

        // Paused players contribute nothing
        assert_eq!(shared.mix_into(&mut mix, &mut scratch), 0);
        assert_eq!(mix, [0.0; 4]);

        player.play();
        player.set_volume(0.5);
        assert_eq!(shared.mix_into(&mut mix, &mut scratch), 2);
        assert_eq!(mix, [0.5, -0.5, 0.25, 0.125]);
        assert_eq!(player.position(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_frames_are_reassembled() {
        struct Dribble {
            data: Vec<u8>,
            pos: usize,
        }
        impl Read for Dribble {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = 3.min(self.data.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        let data = stereo_bytes(&[(0.1, 0.2), (0.3, 0.4), (0.5, 0.6)]);
        let player = Player::spawn(Dribble { data, pos: 0 }, 48000, "dribble").unwrap();
        wait_until(|| player.is_finished());
        assert_eq!(player.buffered_samples(), 6);

        player.play();
        let mut mix = [0.0f32; 6];
        let mut scratch = [0.0f32; 6];
        player.shared().mix_into(&mut mix, &mut scratch);
        assert_eq!(mix, [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_read_error_is_recorded() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "device unplugged"))
            }
        }

        let player = Player::spawn(Broken, 48000, "broken").unwrap();
        wait_until(|| player.error().is_some());
        assert_eq!(player.error().as_deref(), Some("device unplugged"));
        assert!(!player.is_finished());
    }

    #[test]
    fn test_drop_stops_refill_thread() {
        let endless = InfiniteLoop::new(Arc::from(stereo_bytes(&[(0.1, 0.1)]).as_slice()));
        let player = Player::spawn(endless, 48000, "endless").unwrap();
        let shared = player.shared();
        wait_until(|| player.buffered_samples() > 0);
        drop(player);
        assert!(shared.is_stopped());
    }
}
