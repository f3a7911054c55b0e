//! # Beat Detection Module
//!
//! Adaptive-threshold peak detector over the infrared PPG channel.
//!
//! The threshold tracks the signal with a 1/32 exponential smoother so it
//! follows slow DC drift while pulsatile peaks still cross it. A rising
//! crossing counts as a beat only once the 300 ms refractory window has
//! passed; the detector then re-arms when the signal falls 100 units below
//! the threshold.
//!
//! Inter-beat intervals in `[300, 3000)` ms (20–200 BPM) are converted to BPM
//! and kept in a 4-slot rolling array. Anything outside that range still
//! flags a beat but is left out of the average.

const RATE_SLOTS: usize = 4;
const INITIAL_THRESHOLD: i64 = 512;
const REFRACTORY_MS: u64 = 300;
const MIN_INTERVAL_MS: u64 = 300;
const MAX_INTERVAL_MS: u64 = 3000;
const REARM_HYSTERESIS: i64 = 100;
const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakState {
    Below,
    AboveThreshold,
}

pub struct BeatDetector {
    rates: [u32; RATE_SLOTS],
    rate_slot: usize,
    threshold: i64,
    state: PeakState,
    last_beat_ms: Option<u64>,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            rates: [0; RATE_SLOTS],
            rate_slot: 0,
            threshold: INITIAL_THRESHOLD,
            state: PeakState::Below,
            last_beat_ms: None,
        }
    }

    /// Feed one IR sample taken at `now_ms`; returns `true` if it is a beat.
    pub fn check_for_beat(&mut self, sample: u32, now_ms: u64) -> bool {
        let value = i64::from(sample);
        let refractory_over = self
            .last_beat_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= REFRACTORY_MS);

        let mut beat = false;
        match self.state {
            PeakState::Below if value > self.threshold && refractory_over => {
                self.state = PeakState::AboveThreshold;
                if let Some(last) = self.last_beat_ms {
                    self.record_interval(now_ms.saturating_sub(last));
                }
                self.last_beat_ms = Some(now_ms);
                beat = true;
            }
            PeakState::AboveThreshold if value < self.threshold - REARM_HYSTERESIS => {
                self.state = PeakState::Below;
            }
            _ => {}
        }

        self.threshold = (self.threshold * 31 + value) / 32;
        beat
    }

    fn record_interval(&mut self, delta_ms: u64) {
        if (MIN_INTERVAL_MS..MAX_INTERVAL_MS).contains(&delta_ms) {
            self.rates[self.rate_slot] = (MS_PER_MINUTE / delta_ms) as u32;
            self.rate_slot = (self.rate_slot + 1) % RATE_SLOTS;
        } else {
            log::trace!("Ignoring implausible beat interval of {} ms", delta_ms);
        }
    }

    /// Average of the recorded rates, or 0 when nothing valid has been seen
    pub fn beats_per_minute(&self) -> u32 {
        let (total, count) = self
            .rates
            .iter()
            .filter(|&&rate| rate != 0)
            .fold((0u32, 0u32), |(total, count), &rate| (total + rate, count + 1));

        if count == 0 {
            0
        } else {
            total / count
        }
    }

    pub fn reset(&mut self) {
        self.rates = [0; RATE_SLOTS];
        self.rate_slot = 0;
        self.state = PeakState::Below;
        self.last_beat_ms = None;
    }

    pub fn set_threshold(&mut self, threshold: i64) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn state(&self) -> PeakState {
        self.state
    }
}
