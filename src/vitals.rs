//! # Vitals Aggregation Module
//!
//! Turns estimator outputs into the one published `VitalsSnapshot` that the
//! alert engine, history log and any display read from.
//!
//! ## Gating Rules
//! - No finger: heart rate and SpO2 are published as 0, never left stale
//! - Finger present: a new heart rate is taken only in `(0, 200)` BPM and a
//!   new SpO2 only in `(0, 100]` %. Implausible values are dropped for the
//!   cycle and the last good value stays published.
//! - Battery level and timestamp update every cycle regardless.

const MAX_HEART_RATE_BPM: f32 = 200.0;
const MAX_SPO2_PERCENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VitalsSnapshot {
    pub heart_rate: f32,
    pub spo2: f32,
    pub battery_level: f32,
    pub finger_detected: bool,
    pub timestamp_ms: u64,
}

/// What the estimators produced this cycle, before gating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorReading {
    pub finger_detected: bool,
    pub heart_rate: f32,
    pub spo2: f32,
}

pub struct VitalsAggregator {
    current: VitalsSnapshot,
}

impl VitalsAggregator {
    pub fn new() -> Self {
        Self {
            current: VitalsSnapshot::default(),
        }
    }

    /// Gate `reading`, publish the resulting snapshot and return a copy of it
    pub fn publish(
        &mut self,
        reading: EstimatorReading,
        battery_level: f32,
        now_ms: u64,
    ) -> VitalsSnapshot {
        let mut next = self.current;
        next.battery_level = battery_level;
        next.timestamp_ms = now_ms;
        next.finger_detected = reading.finger_detected;

        if !reading.finger_detected {
            next.heart_rate = 0.0;
            next.spo2 = 0.0;
        } else {
            if reading.heart_rate > 0.0 && reading.heart_rate < MAX_HEART_RATE_BPM {
                next.heart_rate = reading.heart_rate;
            } else if reading.heart_rate != 0.0 {
                log::debug!("Discarding implausible heart rate {:.1} BPM", reading.heart_rate);
            }

            if reading.spo2 > 0.0 && reading.spo2 <= MAX_SPO2_PERCENT {
                next.spo2 = reading.spo2;
            } else if reading.spo2 != 0.0 {
                log::debug!("Discarding implausible SpO2 {:.1}%", reading.spo2);
            }
        }

        self.current = next;
        next
    }

    pub fn current(&self) -> VitalsSnapshot {
        self.current
    }
}
