//! # SpO2 Estimation Module
//!
//! Ratio-of-ratios SpO2 estimate over one full sample window, plus the
//! finger-presence heuristic that gates it.
//!
//! ## Algorithm
//! 1. Per channel, scan the window for max/min
//! 2. `AC = max - min`, `DC = (max + min) / 2`
//! 3. `R = (redAC / redDC) / (irAC / irDC)`
//! 4. `SpO2 = 110 - 25 * R`, clamped to `[70, 100]`
//!
//! This is the simplified linear Beer–Lambert approximation the device has
//! always shipped with. It is not calibrated and is kept as-is for parity.
//!
//! A return value of 0 means "no reading" (window not yet full, or a
//! degenerate window that would divide by zero).

use crate::sample_buffer::SampleBuffer;
use crate::timeseries::MinMaxExt;

/// Raw IR level the sensor reports with a finger on it
pub const DEFAULT_FINGER_THRESHOLD: u32 = 50_000;
/// How many of the most recent IR samples the presence check averages
pub const FINGER_WINDOW: usize = 10;

const SPO2_INTERCEPT: f32 = 110.0;
const SPO2_SLOPE: f32 = 25.0;
const SPO2_FLOOR: f32 = 70.0;
const SPO2_CEILING: f32 = 100.0;

pub struct SpO2Estimator {
    finger_threshold: u32,
}

impl SpO2Estimator {
    pub fn new(finger_threshold: u32) -> Self {
        Self { finger_threshold }
    }

    /// Estimated saturation in percent, or 0 if no estimate is possible
    pub fn estimate(&self, buffer: &SampleBuffer) -> f32 {
        let ratio = self.ratio(buffer);
        if ratio == 0.0 {
            return 0.0;
        }
        (SPO2_INTERCEPT - SPO2_SLOPE * ratio).clamp(SPO2_FLOOR, SPO2_CEILING)
    }

    /// Red/IR ratio of AC/DC modulation over the window, 0 when undefined
    pub fn ratio(&self, buffer: &SampleBuffer) -> f32 {
        if !buffer.is_full() {
            return 0.0;
        }

        let (Some(ir), Some(red)) = (modulation(buffer.ir()), modulation(buffer.red())) else {
            return 0.0;
        };
        if ir == 0.0 {
            return 0.0;
        }
        red / ir
    }

    /// Average of the last few IR samples exceeds the presence threshold
    pub fn finger_present(&self, buffer: &SampleBuffer) -> bool {
        let (sum, count) = buffer
            .recent_ir(FINGER_WINDOW)
            .fold((0u64, 0u64), |(sum, count), ir| (sum + u64::from(ir), count + 1));

        if count == 0 {
            return false;
        }
        sum / count > u64::from(self.finger_threshold)
    }

    pub fn finger_threshold(&self) -> u32 {
        self.finger_threshold
    }
}

impl Default for SpO2Estimator {
    fn default() -> Self {
        Self::new(DEFAULT_FINGER_THRESHOLD)
    }
}

/// AC/DC for one channel; `None` when DC is zero
fn modulation(window: &[u32]) -> Option<f32> {
    let (min, max) = window.min_max()?;
    let ac = (max - min) as f32;
    let dc = (f64::from(max) + f64::from(min)) as f32 / 2.0;
    if dc == 0.0 {
        return None;
    }
    Some(ac / dc)
}
