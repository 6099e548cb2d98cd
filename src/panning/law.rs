//! Pan position oscillator and the linear gain law

use std::f64::consts::PI;

/// Linear interpolation, `t` within 0.0 - 1.0
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Per-channel gains for a pan position in -1.0 - 1.0
///
/// Linear crossfade, clamped at 1.0: both sides are at full volume in the
/// centre and one side fades to silence towards each extreme.
#[inline]
pub fn linear_gains(pan: f64) -> (f64, f64) {
    let left = (1.0 - pan).min(1.0);
    let right = (1.0 + pan).min(1.0);
    (left, right)
}

/// Sweeps a horizontal position back and forth with cosine easing
///
/// -1 pan is x = 0, +1 pan is x = width. One full right-left-right cycle
/// takes `period_secs` at `ticks_per_second`.
#[derive(Debug, Clone)]
pub struct PanOscillator {
    ticks: u64,
    ticks_per_second: f64,
    period_secs: f64,
    width: f64,
}

impl PanOscillator {
    pub fn new(ticks_per_second: f64, period_secs: f64, width: f64) -> Self {
        Self {
            ticks: 0,
            ticks_per_second,
            period_secs,
            width,
        }
    }

    /// Advance one tick
    pub fn advance(&mut self) {
        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks in one full cycle
    pub fn period_ticks(&self) -> f64 {
        self.ticks_per_second * self.period_secs
    }

    /// Phase in radians, increasing without bound
    pub fn phase(&self) -> f64 {
        phase_at(self.ticks, self.ticks_per_second, self.period_secs)
    }

    /// Horizontal position in 0.0 - width
    pub fn x_position(&self) -> f64 {
        let half = self.width / 2.0;
        half + self.phase().cos() * half
    }

    /// Pan position in -1.0 - 1.0
    pub fn pan(&self) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        lerp(-1.0, 1.0, self.x_position() / self.width).clamp(-1.0, 1.0)
    }
}

/// Radians after `ticks` ticks
fn phase_at(ticks: u64, ticks_per_second: f64, period_secs: f64) -> f64 {
    if ticks_per_second <= 0.0 || period_secs <= 0.0 {
        return 0.0;
    }
    ticks as f64 * ((1.0 / ticks_per_second) * 2.0 * PI) * (1.0 / period_secs)
}
