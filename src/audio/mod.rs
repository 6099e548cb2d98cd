//! Audio plumbing for the panning demo
//!
//! Provides:
//! - Compressed audio decoding via Symphonia, resampled with rubato
//! - Endless looping over decoded PCM
//! - Channel isolation for interleaved stereo f32 streams
//! - Players fed by refill threads, mixed into one cpal output stream

pub mod context;
pub mod decode;
pub mod device;
pub mod isolate;
pub mod looping;
pub mod player;
pub mod resample;

#[cfg(test)]
pub(crate) mod testing;

/// Helper to store f32 in AtomicU32
#[inline]
pub(crate) fn f32_to_u32(f: f32) -> u32 {
    f.to_bits()
}

/// Helper to load f32 from AtomicU32
#[inline]
pub(crate) fn u32_to_f32(u: u32) -> f32 {
    f32::from_bits(u)
}
