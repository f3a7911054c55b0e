//! # Sensor & Sampler Module
//!
//! The PPG sensor contract, a synthetic sensor for running without hardware,
//! and the sampler thread that polls the sensor and hands samples to the
//! tick loop.
//!
//! ## Threading
//! The sampler is the one concurrent producer in the system. It never touches
//! core state: each reading is stamped and sent over a bounded single-producer
//! channel, and the tick loop (sole owner of the `SampleBuffer`) drains it.
//! A full channel means the tick loop fell behind; the newest sample is
//! dropped rather than blocking the sampler.

use crate::collaborators::Clock;
use crate::error::SamplerError;
use crate::sample_buffer::Sample;
use crossbeam_channel::{Sender, TrySendError};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Raw PPG sensor: paired infrared/red intensities
pub trait PpgSensor {
    fn data_available(&mut self) -> bool;
    fn read_sample(&mut self) -> (u32, u32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorUpdate {
    Sample(Sample),
    Stopped,
}

/// Shape of the synthetic PPG signal
#[derive(Debug, Clone, Copy)]
pub struct SimulatedProfile {
    pub heart_rate_bpm: f32,
    /// Peak deviation of the heart rate around `heart_rate_bpm`
    pub heart_rate_swing_bpm: f32,
    pub swing_period_ms: u64,
    pub finger_on_ms: u64,
    pub finger_off_ms: u64,
}

impl Default for SimulatedProfile {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 75.0,
            heart_rate_swing_bpm: 40.0,
            swing_period_ms: 180_000,
            finger_on_ms: 90_000,
            finger_off_ms: 15_000,
        }
    }
}

const IR_DC: f32 = 100_000.0;
const IR_AC: f32 = 800.0;
const RED_DC: f32 = 60_000.0;
const RED_AC: f32 = 250.0;
const NO_FINGER_IR: u32 = 4_000;
const NO_FINGER_RED: u32 = 3_000;

/// Sinusoidal PPG at a slowly swinging heart rate, with periodic finger removal.
/// Time advances by `sample_interval_ms` on every read.
pub struct SimulatedPpgSensor {
    profile: SimulatedProfile,
    sample_interval_ms: u64,
    elapsed_ms: u64,
    phase: f32,
}

impl SimulatedPpgSensor {
    pub fn new(profile: SimulatedProfile, sample_interval_ms: u64) -> Self {
        Self {
            profile,
            sample_interval_ms,
            elapsed_ms: 0,
            phase: 0.0,
        }
    }

    fn finger_on(&self) -> bool {
        let cycle = self.profile.finger_on_ms + self.profile.finger_off_ms;
        if cycle == 0 || self.profile.finger_off_ms == 0 {
            return true;
        }
        self.elapsed_ms % cycle < self.profile.finger_on_ms
    }

    fn current_bpm(&self) -> f32 {
        if self.profile.swing_period_ms == 0 {
            return self.profile.heart_rate_bpm;
        }
        let t = (self.elapsed_ms % self.profile.swing_period_ms) as f32
            / self.profile.swing_period_ms as f32;
        self.profile.heart_rate_bpm + self.profile.heart_rate_swing_bpm * (TAU * t).sin()
    }
}

impl PpgSensor for SimulatedPpgSensor {
    fn data_available(&mut self) -> bool {
        true
    }

    fn read_sample(&mut self) -> (u32, u32) {
        let sample = if self.finger_on() {
            let pulse = (TAU * self.phase).sin();
            ((IR_DC + IR_AC * pulse) as u32, (RED_DC + RED_AC * pulse) as u32)
        } else {
            (NO_FINGER_IR, NO_FINGER_RED)
        };

        let period_ms = 60_000.0 / self.current_bpm().max(1.0);
        self.phase = (self.phase + self.sample_interval_ms as f32 / period_ms).fract();
        self.elapsed_ms += self.sample_interval_ms;
        sample
    }
}

/// Running sampler thread. Dropping the handle stops and joins it.
pub struct SamplerHandle {
    should_stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<(), SamplerError>>>,
}

impl SamplerHandle {
    /// Ask the sampler to stop and wait for it
    pub fn stop(mut self) -> Result<(), SamplerError> {
        self.join()
    }

    fn join(&mut self) -> Result<(), SamplerError> {
        self.should_stop.store(true, Ordering::Relaxed);
        match self.thread.take() {
            Some(handle) => handle.join().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

/// Start polling `sensor` every `interval` on a dedicated thread
pub fn spawn_sampler<S, C>(
    mut sensor: S,
    clock: C,
    interval: Duration,
    sender: Sender<SensorUpdate>,
) -> Result<SamplerHandle, SamplerError>
where
    S: PpgSensor + Send + 'static,
    C: Clock + Send + 'static,
{
    let should_stop = Arc::new(AtomicBool::new(false));
    let stop_flag = should_stop.clone();

    let thread = thread::Builder::new()
        .name("ppg-sampler".to_string())
        .spawn(move || {
            log::info!("Sampler started ({} ms interval)", interval.as_millis());
            let mut dropped = 0u64;

            while !stop_flag.load(Ordering::Relaxed) {
                if sensor.data_available() {
                    let (ir, red) = sensor.read_sample();
                    let sample = Sample {
                        ir,
                        red,
                        timestamp_ms: clock.now_ms(),
                    };
                    match sender.try_send(SensorUpdate::Sample(sample)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped += 1;
                            if dropped % 100 == 1 {
                                log::warn!("Sample channel full, {} samples dropped so far", dropped);
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            log::info!("Sampler: monitor went away, stopping");
                            return Err(SamplerError::Disconnected);
                        }
                    }
                }
                thread::sleep(interval);
            }

            let _ = sender.send(SensorUpdate::Stopped);
            log::info!("Sampler stopped");
            Ok(())
        })
        .map_err(SamplerError::ThreadSpawn)?;

    Ok(SamplerHandle {
        should_stop,
        thread: Some(thread),
    })
}
