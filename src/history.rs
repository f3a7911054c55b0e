//! # Vitals History Module
//!
//! Bounded, timestamped log of published vitals snapshots.
//!
//! ## Eviction
//! Two separate paths:
//! - Per append: when full, exactly one oldest entry goes (strict FIFO)
//! - Low memory: a whole batch of oldest entries goes at once, more than the
//!   pressure strictly needs, so the next check doesn't trip again right away.
//!   Logs at or below the floor are left alone.
//!
//! ## Export
//! `to_csv` renders `Timestamp,HeartRate,SpO2,BatteryLevel` rows for storage
//! and transport collaborators; the log itself does no I/O.

use crate::timeseries::BoundedSeries;
use crate::vitals::VitalsSnapshot;
use std::fmt::Write;

const CSV_HEADER: &str = "Timestamp,HeartRate,SpO2,BatteryLevel";

/// Sizing for a `HistoryLog`
#[derive(Debug, Clone, Copy)]
pub struct HistoryLimits {
    pub capacity: usize,
    pub low_memory_batch: usize,
    pub low_memory_floor: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            capacity: 100,
            low_memory_batch: 25,
            low_memory_floor: 50,
        }
    }
}

/// Summary over everything currently in the log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub count: usize,
    pub heart_rate_min: f32,
    pub heart_rate_max: f32,
    pub heart_rate_mean: f32,
    pub spo2_mean: f32,
}

pub struct HistoryLog {
    entries: BoundedSeries<VitalsSnapshot>,
    limits: HistoryLimits,
}

impl HistoryLog {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            entries: BoundedSeries::new(limits.capacity),
            limits,
        }
    }

    /// Record `snapshot` if it carries a real reading; returns whether it was kept
    pub fn append(&mut self, snapshot: VitalsSnapshot) -> bool {
        if !snapshot.finger_detected || snapshot.heart_rate <= 0.0 {
            return false;
        }
        if let Some(dropped) = self.entries.push(snapshot) {
            log::trace!("History full, dropped entry from {} ms", dropped.timestamp_ms);
        }
        true
    }

    /// Batch eviction for a memory-pressure signal; returns entries removed
    pub fn on_low_memory(&mut self) -> usize {
        if self.entries.len() <= self.limits.low_memory_floor {
            return 0;
        }
        let removed = self.entries.evict_oldest(self.limits.low_memory_batch);
        log::info!("Cleaned up {} history entries to free memory", removed);
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &VitalsSnapshot> {
        self.entries.last_n(n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VitalsSnapshot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn stats(&self) -> Option<HistoryStats> {
        if self.entries.is_empty() {
            return None;
        }

        let count = self.entries.len();
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut hr_sum = 0.0f64;
        let mut spo2_sum = 0.0f64;
        for entry in self.entries.iter() {
            min = min.min(entry.heart_rate);
            max = max.max(entry.heart_rate);
            hr_sum += f64::from(entry.heart_rate);
            spo2_sum += f64::from(entry.spo2);
        }

        Some(HistoryStats {
            count,
            heart_rate_min: min,
            heart_rate_max: max,
            heart_rate_mean: (hr_sum / count as f64) as f32,
            spo2_mean: (spo2_sum / count as f64) as f32,
        })
    }

    pub fn to_csv(&self) -> String {
        let mut csv = String::with_capacity(32 * (self.entries.len() + 1));
        csv.push_str(CSV_HEADER);
        csv.push('\n');
        for entry in self.entries.iter() {
            // Writing into a String cannot fail
            let _ = writeln!(
                csv,
                "{},{:.1},{:.1},{:.1}",
                entry.timestamp_ms, entry.heart_rate, entry.spo2, entry.battery_level
            );
        }
        csv
    }
}
