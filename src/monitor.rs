//! # Monitor Module
//!
//! Owns every piece of core state and is the only thing that mutates it.
//! The tick loop in `main.rs` calls into it on independent cadences:
//!
//! ```text
//! sampler ──channel──▶ drain() ──▶ SampleBuffer ──▶ BeatDetector
//!                                        │
//!                                        └──────▶ SpO2Estimator
//! aggregate() ──▶ VitalsAggregator ──▶ check_alerts() ──▶ AlertEngine
//!                                 └──▶ log_history()  ──▶ HistoryLog
//! ```
//!
//! Collaborators (display, storage, transport) read through the accessors and
//! only change state through `acknowledge`, `log_history` and `reset_sensor`.

use crate::alerts::{Alert, AlertEngine};
use crate::beat::BeatDetector;
use crate::config::Config;
use crate::history::HistoryLog;
use crate::notify::Notifier;
use crate::sample_buffer::{Sample, SampleBuffer};
use crate::sensor::SensorUpdate;
use crate::spo2::SpO2Estimator;
use crate::vitals::{EstimatorReading, VitalsAggregator, VitalsSnapshot};
use crossbeam_channel::{Receiver, TryRecvError};

/// What one `drain` call pulled off the sampler channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub samples: usize,
    pub beats: usize,
    pub sampler_stopped: bool,
}

/// Entries released by one low-memory signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reclaimed {
    pub history_entries: usize,
    pub alert_history_entries: usize,
}

pub struct Monitor {
    config: Config,
    buffer: SampleBuffer,
    beats: BeatDetector,
    spo2: SpO2Estimator,
    aggregator: VitalsAggregator,
    alerts: AlertEngine,
    history: HistoryLog,
    finger_seen_in_window: bool,
}

impl Monitor {
    /// Build the core from a validated config
    pub fn new(config: Config) -> Self {
        Self {
            buffer: SampleBuffer::new(config.sensor.buffer_capacity),
            beats: BeatDetector::new(),
            spo2: SpO2Estimator::new(config.sensor.finger_threshold),
            aggregator: VitalsAggregator::new(),
            alerts: AlertEngine::new(config.alerts.limits()),
            history: HistoryLog::new(config.history.limits()),
            finger_seen_in_window: false,
            config,
        }
    }

    /// Feed one sample through the buffer and beat detector.
    ///
    /// When a window closes without a finger on any of its samples, the beat
    /// detector and the buffer start over.
    pub fn ingest(&mut self, sample: Sample) -> bool {
        let window_done = self.buffer.add_sample(sample.ir, sample.red);
        let beat = self.beats.check_for_beat(sample.ir, sample.timestamp_ms);

        if self.spo2.finger_present(&self.buffer) {
            self.finger_seen_in_window = true;
        }

        if window_done {
            if !self.finger_seen_in_window {
                log::debug!("No finger for a full window, resetting estimators");
                self.beats.reset();
                self.buffer.reset();
            }
            self.finger_seen_in_window = false;
        }

        beat
    }

    /// Pull everything the sampler has queued without blocking
    pub fn drain(&mut self, receiver: &Receiver<SensorUpdate>) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            match receiver.try_recv() {
                Ok(SensorUpdate::Sample(sample)) => {
                    report.samples += 1;
                    if self.ingest(sample) {
                        report.beats += 1;
                    }
                }
                Ok(SensorUpdate::Stopped) | Err(TryRecvError::Disconnected) => {
                    report.sampler_stopped = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        report
    }

    /// Read the estimators and publish a fresh snapshot
    pub fn aggregate(&mut self, battery_level: f32, now_ms: u64) -> VitalsSnapshot {
        let reading = EstimatorReading {
            finger_detected: self.spo2.finger_present(&self.buffer),
            heart_rate: self.beats.beats_per_minute() as f32,
            spo2: self.spo2.estimate(&self.buffer),
        };
        self.aggregator.publish(reading, battery_level, now_ms)
    }

    /// One alert-check cycle: evaluate the rules, then sweep expired alerts
    pub fn check_alerts(&mut self, now_ms: u64, notifier: &mut dyn Notifier) -> usize {
        let vitals = self.aggregator.current();
        let created = self
            .alerts
            .evaluate(&vitals, &self.config.alerts.thresholds, now_ms, notifier);
        self.alerts.remove_old_alerts(now_ms);
        created
    }

    pub fn remind(&mut self, now_ms: u64, notifier: &mut dyn Notifier) -> bool {
        self.alerts.remind(now_ms, notifier)
    }

    /// Append the current snapshot to the vitals history
    pub fn log_history(&mut self) -> bool {
        self.history.append(self.aggregator.current())
    }

    /// React to a memory-pressure signal
    pub fn on_low_memory(&mut self) -> Reclaimed {
        Reclaimed {
            history_entries: self.history.on_low_memory(),
            alert_history_entries: self.alerts.shrink_history(),
        }
    }

    pub fn acknowledge(&mut self, index: usize) -> bool {
        self.alerts.acknowledge(index)
    }

    /// Operator dismissed everything on screen; alert history is kept
    pub fn clear_alerts(&mut self) {
        self.alerts.clear_active();
    }

    /// Sensor re-init: discard the window and beat state
    pub fn reset_sensor(&mut self) {
        self.buffer.reset();
        self.beats.reset();
        self.finger_seen_in_window = false;
    }

    pub fn vitals(&self) -> VitalsSnapshot {
        self.aggregator.current()
    }

    pub fn active_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.active()
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
