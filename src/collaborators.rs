//! # Collaborator Interfaces Module
//!
//! Narrow contracts between the monitoring core and the hardware around it:
//! a monotonic clock, a battery gauge and a memory-pressure probe. The PPG
//! sensor itself lives in `sensor.rs` next to the sampler thread that polls it.
//!
//! Each trait comes with the simulated implementation the binary runs on a
//! workstation. Hardware targets plug in their own implementations; the core
//! never sees anything but the trait.

use std::time::Instant;

/// Monotonically increasing millisecond counter
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Battery charge in percent, already voltage-normalized to 0–100
pub trait BatteryGauge {
    fn level(&mut self) -> f32;
}

/// Reports whether the platform is short on memory
pub trait MemoryProbe {
    fn is_low(&mut self) -> bool;
}

/// Milliseconds since construction. Clones share the same origin.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Battery that drains linearly from a starting level
pub struct SimulatedBattery<C: Clock> {
    clock: C,
    start_level: f32,
    drain_per_minute: f32,
}

impl<C: Clock> SimulatedBattery<C> {
    pub fn new(clock: C, start_level: f32, drain_per_minute: f32) -> Self {
        Self {
            clock,
            start_level,
            drain_per_minute,
        }
    }
}

impl<C: Clock> BatteryGauge for SimulatedBattery<C> {
    fn level(&mut self) -> f32 {
        let minutes = self.clock.now_ms() as f32 / 60_000.0;
        (self.start_level - self.drain_per_minute * minutes).clamp(0.0, 100.0)
    }
}

/// Reports low memory on every `period`-th check
pub struct SimulatedMemory {
    period: u32,
    checks: u32,
}

impl SimulatedMemory {
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            checks: 0,
        }
    }
}

impl MemoryProbe for SimulatedMemory {
    fn is_low(&mut self) -> bool {
        self.checks = self.checks.wrapping_add(1);
        self.checks % self.period == 0
    }
}

/// Clock the test drives by hand
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<u64>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let copy = clock;
        let first = clock.now_ms();
        assert!(copy.now_ms() >= first);
    }

    #[test]
    fn test_battery_drains_and_clamps() {
        let clock = ManualClock::default();
        let mut battery = SimulatedBattery::new(clock.clone(), 50.0, 10.0);
        assert_eq!(battery.level(), 50.0);

        clock.set(60_000);
        assert!((battery.level() - 40.0).abs() < 1e-4);

        clock.set(60 * 60_000);
        assert_eq!(battery.level(), 0.0);
    }

    #[test]
    fn test_memory_probe_period() {
        let mut memory = SimulatedMemory::new(3);
        let readings: Vec<_> = (0..6).map(|_| memory.is_low()).collect();
        assert_eq!(readings, vec![false, false, true, false, false, true]);
    }
}
