//! Compressed audio decoding via Symphonia
//!
//! Produces the interleaved stereo f32 PCM (native byte order) that the
//! looping readers and channel isolation filters operate on.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::isolate::FRAME_SIZE;
use super::resample::resample_stereo;
use crate::error::{Error, Result};

/// Compressed audio file contents plus a format hint
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    bytes: Arc<[u8]>,
    extension: Option<String>,
}

impl EncodedAudio {
    pub fn from_bytes(bytes: Arc<[u8]>, extension: Option<&str>) -> Self {
        Self {
            bytes,
            extension: extension.map(str::to_string),
        }
    }

    /// Read a whole audio file into memory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading audio from: {:?}", path);

        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        Ok(Self::from_bytes(bytes.into(), extension))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Decode to stereo f32 at `target_rate`
    pub fn decode(&self, target_rate: u32) -> Result<DecodedAudio> {
        DecodedAudio::decode(Arc::clone(&self.bytes), self.extension(), target_rate)
    }
}

/// Immutable decoded audio: interleaved stereo f32 bytes at a fixed rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pcm: Arc<[u8]>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Decode a compressed file held in memory.
    ///
    /// `extension` is a format hint such as `"ogg"`; the probe also sniffs the
    /// content. The result is resampled to `target_rate` when the source rate
    /// differs. Mono sources are duplicated to both channels and channels
    /// beyond the first two are dropped.
    pub fn decode(bytes: Arc<[u8]>, extension: Option<&str>, target_rate: u32) -> Result<Self> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(Error::NoTrack)?;
        let track_id = track.id;
        let mut source_rate = track.codec_params.sample_rate;
        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut frames: Vec<[f32; 2]> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::warn!("Decode: skipping corrupt packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            if channels == 0 {
                return Err(Error::UnsupportedFormat("track has no channels".to_string()));
            }
            source_rate.get_or_insert(spec.rate);

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);

            for chunk in buf.samples().chunks_exact(channels) {
                let left = chunk[0];
                let right = if channels > 1 { chunk[1] } else { chunk[0] };
                frames.push([left, right]);
            }
        }

        let source_rate = source_rate
            .ok_or_else(|| Error::UnsupportedFormat("unknown sample rate".to_string()))?;

        log::info!(
            "Decode: {} frames at {} Hz ({:.2}s)",
            frames.len(),
            source_rate,
            frames.len() as f64 / source_rate as f64
        );

        if source_rate != target_rate {
            log::info!("Decode: resampling {} Hz -> {} Hz", source_rate, target_rate);
            frames = resample_stereo(&frames, source_rate, target_rate)?;
        }

        Ok(Self::from_frames(&frames, target_rate))
    }

    /// Build from already decoded stereo frames
    pub fn from_frames(frames: &[[f32; 2]], sample_rate: u32) -> Self {
        let mut pcm = Vec::with_capacity(frames.len() * FRAME_SIZE);
        for [left, right] in frames {
            pcm.extend_from_slice(&left.to_ne_bytes());
            pcm.extend_from_slice(&right.to_ne_bytes());
        }
        Self {
            pcm: pcm.into(),
            sample_rate,
        }
    }

    /// Shared handle to the raw interleaved bytes
    pub fn pcm(&self) -> Arc<[u8]> {
        Arc::clone(&self.pcm)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.pcm.len() / FRAME_SIZE
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{f32_samples, wav_bytes};

    fn samples_of(audio: &DecodedAudio) -> Vec<f32> {
        f32_samples(&audio.pcm())
    }

    #[test]
    fn test_decode_stereo_wav() {
        let wav = wav_bytes(2, 8000, &[16384, -16384, 0, 8192]);
        let audio = DecodedAudio::decode(wav, Some("wav"), 8000).unwrap();

        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.frames(), 2);
        assert_eq!(audio.pcm().len(), 2 * FRAME_SIZE);

        let samples = samples_of(&audio);
        assert!((samples[0] - 0.5).abs() < 1e-4);
        assert!((samples[1] + 0.5).abs() < 1e-4);
        assert!(samples[2].abs() < 1e-4);
        assert!((samples[3] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_decode_mono_wav_duplicates_channel() {
        let wav = wav_bytes(1, 8000, &[16384, -8192]);
        let audio = DecodedAudio::decode(wav, Some("wav"), 8000).unwrap();

        let samples = samples_of(&audio);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], samples[1]);
        assert_eq!(samples[2], samples[3]);
    }

    #[test]
    fn test_decode_resamples_to_target_rate() {
        let samples: Vec<i16> = (0..800).flat_map(|_| [1000i16, -1000]).collect();
        let wav = wav_bytes(2, 8000, &samples);
        let audio = DecodedAudio::decode(wav, Some("wav"), 16000).unwrap();

        assert_eq!(audio.sample_rate(), 16000);
        assert_eq!(audio.frames(), 1600);
        assert!((audio.duration().as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let garbage: Arc<[u8]> = Arc::from(&[0x13u8; 64][..]);
        assert!(DecodedAudio::decode(garbage, None, 48000).is_err());
    }

    #[test]
    fn test_encoded_audio_decodes_with_hint() {
        let encoded = EncodedAudio::from_bytes(wav_bytes(2, 8000, &[0, 0]), Some("wav"));
        assert_eq!(encoded.extension(), Some("wav"));
        assert_eq!(encoded.len(), 48);
        assert_eq!(encoded.decode(8000).unwrap().frames(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EncodedAudio::from_file("/nonexistent/ragtime.ogg").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_frames_layout() {
        let audio = DecodedAudio::from_frames(&[[1.0, -1.0]], 48000);
        assert_eq!(samples_of(&audio), vec![1.0, -1.0]);
        assert_eq!(audio.frames(), 1);
    }
}
