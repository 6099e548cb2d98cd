//! Band-limited sample rate conversion of decoded stereo frames via rubato

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::Result;

/// Input frames handed to the resampler per call
const RESAMPLE_CHUNK_FRAMES: usize = 1024;
const RESAMPLE_SINC_LEN: usize = 256;
/// Passband edge relative to the lower Nyquist frequency
const RESAMPLE_CUTOFF: f32 = 0.95;
const RESAMPLE_OVERSAMPLING_FACTOR: usize = 128;

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: RESAMPLE_SINC_LEN,
        f_cutoff: RESAMPLE_CUTOFF,
        oversampling_factor: RESAMPLE_OVERSAMPLING_FACTOR,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Convert a whole clip of stereo frames from `from_rate` to `to_rate`
///
/// Content above the target Nyquist frequency is filtered out. The result
/// has exactly `frames * to_rate / from_rate` frames with the filter delay
/// removed, so the clip still loops without a gap.
pub fn resample_stereo(frames: &[[f32; 2]], from_rate: u32, to_rate: u32) -> Result<Vec<[f32; 2]>> {
    if frames.is_empty() || from_rate == 0 || to_rate == 0 || from_rate == to_rate {
        return Ok(frames.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, sinc_parameters(), RESAMPLE_CHUNK_FRAMES, 2)?;

    let left: Vec<f32> = frames.iter().map(|f| f[0]).collect();
    let right: Vec<f32> = frames.iter().map(|f| f[1]).collect();

    let expected = (frames.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let wanted = delay + expected;

    let mut out: [Vec<f32>; 2] = [
        Vec::with_capacity(wanted + RESAMPLE_CHUNK_FRAMES * 2),
        Vec::with_capacity(wanted + RESAMPLE_CHUNK_FRAMES * 2),
    ];
    let mut pos = 0;
    while pos + resampler.input_frames_next() <= frames.len() {
        let n = resampler.input_frames_next();
        let chunk = [&left[pos..pos + n], &right[pos..pos + n]];
        append(&mut out, resampler.process(&chunk[..], None)?);
        pos += n;
    }

    if pos < frames.len() {
        let chunk = [&left[pos..], &right[pos..]];
        append(&mut out, resampler.process_partial(Some(&chunk[..]), None)?);
    }

    // Push silence through until the delayed tail has come out
    while out[0].len() < wanted {
        let block = resampler.process_partial::<Vec<f32>>(None, None)?;
        if block[0].is_empty() {
            break;
        }
        append(&mut out, block);
    }

    let end = wanted.min(out[0].len());
    let start = delay.min(end);
    Ok(out[0][start..end]
        .iter()
        .zip(&out[1][start..end])
        .map(|(&l, &r)| [l, r])
        .collect())
}

fn append(out: &mut [Vec<f32>; 2], block: Vec<Vec<f32>>) {
    for (dst, src) in out.iter_mut().zip(block) {
        dst.extend_from_slice(&src);
    }
}
