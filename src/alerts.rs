//! # Alert Engine Module
//!
//! Evaluates published vitals against operator thresholds and keeps the
//! bounded active and history alert lists.
//!
//! ## Rules (evaluated in this order, each independently)
//! 1. Heart rate outside `[heart_rate_min, heart_rate_max]`
//! 2. SpO2 below `spo2_min`
//! 3. Battery below `battery_min`
//!
//! The heart-rate and SpO2 rules only look at readings taken with a finger
//! on the sensor; a 0 there means "no reading", not a measurement.
//!
//! ## Rate Limiting
//! One global cooldown covers every rule and is checked per rule, in rule
//! order. The first rule that fires opens the 5 s window, so a storm of
//! simultaneous violations creates a single alert.
//!
//! A rule is also skipped while an active alert of the same kind is younger
//! than 30 s.
//!
//! ## Lifetimes
//! - Active: acknowledgeable, swept once unacknowledged and older than 30 s,
//!   overflow drops the oldest unacknowledged entry
//! - History: append-only, overflow drops the oldest, never aged out

use crate::notify::{BeepPattern, Notifier};
use crate::timeseries::BoundedSeries;
use crate::vitals::VitalsSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COOLDOWN_MS: u64 = 5_000;
pub const EXPIRY_MS: u64 = 30_000;
pub const MAX_MESSAGE_LEN: usize = 128;

// Severity cut-offs are fixed, only the trigger thresholds are configurable
const CRITICAL_HEART_RATE_LOW: f32 = 50.0;
const CRITICAL_HEART_RATE_HIGH: f32 = 120.0;
const CRITICAL_SPO2: f32 = 90.0;
const CRITICAL_BATTERY: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Which rule raised an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    HeartRate,
    SpO2,
    Battery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub severity: Severity,
    pub kind: AlertKind,
    pub message: String,
    pub created_at_ms: u64,
    pub acknowledged: bool,
}

impl Alert {
    fn new(severity: Severity, kind: AlertKind, message: String, created_at_ms: u64) -> Self {
        let message = if message.chars().count() > MAX_MESSAGE_LEN {
            message.chars().take(MAX_MESSAGE_LEN).collect()
        } else {
            message
        };
        Self {
            severity,
            kind,
            message,
            created_at_ms,
            acknowledged: false,
        }
    }

    fn is_expired(&self, now_ms: u64) -> bool {
        !self.acknowledged && now_ms.saturating_sub(self.created_at_ms) > EXPIRY_MS
    }
}

/// Operator-configured trigger levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub heart_rate_min: f32,
    pub heart_rate_max: f32,
    pub spo2_min: f32,
    pub battery_min: f32,
    pub enabled: bool,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            heart_rate_min: 60.0,
            heart_rate_max: 100.0,
            spo2_min: 95.0,
            battery_min: 20.0,
            enabled: true,
        }
    }
}

/// Sizing and pacing for an `AlertEngine`
#[derive(Debug, Clone, Copy)]
pub struct AlertLimits {
    pub active_capacity: usize,
    pub history_capacity: usize,
    pub reminder_interval_ms: u64,
    pub history_shrink_batch: usize,
    pub history_shrink_floor: usize,
}

impl Default for AlertLimits {
    fn default() -> Self {
        Self {
            active_capacity: 10,
            history_capacity: 50,
            reminder_interval_ms: 2_000,
            history_shrink_batch: 10,
            history_shrink_floor: 25,
        }
    }
}

pub struct AlertEngine {
    active: BoundedSeries<Alert>,
    history: BoundedSeries<Alert>,
    last_trigger_ms: Option<u64>,
    last_reminder_ms: Option<u64>,
    limits: AlertLimits,
}

impl AlertEngine {
    pub fn new(limits: AlertLimits) -> Self {
        Self {
            active: BoundedSeries::new(limits.active_capacity),
            history: BoundedSeries::new(limits.history_capacity),
            last_trigger_ms: None,
            last_reminder_ms: None,
            limits,
        }
    }

    /// Run every rule against `vitals`; returns how many alerts were created
    pub fn evaluate(
        &mut self,
        vitals: &VitalsSnapshot,
        thresholds: &AlertThresholds,
        now_ms: u64,
        notifier: &mut dyn Notifier,
    ) -> usize {
        if !thresholds.enabled {
            return 0;
        }

        let mut created = 0;
        for (severity, kind, message) in Self::fired_rules(vitals, thresholds) {
            if self.cooling_down(now_ms) {
                log::debug!("Alert cooldown active, suppressing: {}", message);
                continue;
            }
            if self.has_recent(kind, now_ms) {
                log::debug!("Recent {:?} alert still active, suppressing: {}", kind, message);
                continue;
            }
            self.trigger(severity, kind, message, now_ms, notifier);
            created += 1;
        }
        created
    }

    fn cooling_down(&self, now_ms: u64) -> bool {
        self.last_trigger_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < COOLDOWN_MS)
    }

    /// An active alert of the same kind younger than the expiry window
    fn has_recent(&self, kind: AlertKind, now_ms: u64) -> bool {
        self.active
            .iter()
            .any(|alert| alert.kind == kind && now_ms.saturating_sub(alert.created_at_ms) < EXPIRY_MS)
    }

    fn fired_rules(
        vitals: &VitalsSnapshot,
        thresholds: &AlertThresholds,
    ) -> Vec<(Severity, AlertKind, String)> {
        let mut fired = Vec::new();

        let hr = vitals.heart_rate;
        if vitals.finger_detected
            && hr > 0.0
            && (hr < thresholds.heart_rate_min || hr > thresholds.heart_rate_max)
        {
            let severity = if hr < CRITICAL_HEART_RATE_LOW || hr > CRITICAL_HEART_RATE_HIGH {
                Severity::Critical
            } else {
                Severity::Warning
            };
            fired.push((severity, AlertKind::HeartRate, format!("Heart rate: {} BPM", hr as i32)));
        }

        let spo2 = vitals.spo2;
        if vitals.finger_detected && spo2 > 0.0 && spo2 < thresholds.spo2_min {
            let severity = if spo2 < CRITICAL_SPO2 {
                Severity::Critical
            } else {
                Severity::Warning
            };
            fired.push((severity, AlertKind::SpO2, format!("Low SpO2: {}%", spo2 as i32)));
        }

        let battery = vitals.battery_level;
        if battery < thresholds.battery_min {
            let severity = if battery < CRITICAL_BATTERY {
                Severity::Critical
            } else {
                Severity::Warning
            };
            fired.push((severity, AlertKind::Battery, format!("Low battery: {}%", battery as i32)));
        }

        fired
    }

    fn trigger(
        &mut self,
        severity: Severity,
        kind: AlertKind,
        message: String,
        now_ms: u64,
        notifier: &mut dyn Notifier,
    ) {
        let alert = Alert::new(severity, kind, message, now_ms);

        if let Some(dropped) = self.active.push_evicting(alert.clone(), |a| !a.acknowledged) {
            log::debug!("Active alerts full, dropped: {}", dropped.message);
        }
        if let Some(dropped) = self.history.push(alert.clone()) {
            log::debug!("Alert history full, dropped: {}", dropped.message);
        }

        self.last_trigger_ms = Some(now_ms);
        self.last_reminder_ms = Some(now_ms);

        log::warn!("ALERT [{}]: {}", severity, alert.message);
        notifier.emit(severity, BeepPattern::for_severity(severity), &alert.message);
    }

    /// Drop active alerts that are unacknowledged and older than 30 s
    pub fn remove_old_alerts(&mut self, now_ms: u64) -> usize {
        let before = self.active.len();
        self.active.retain(|alert| !alert.is_expired(now_ms));
        let removed = before - self.active.len();
        if removed > 0 {
            log::debug!("Expired {} active alert(s)", removed);
        }
        removed
    }

    /// Mark the active alert at `index` as acknowledged; out of range is a no-op
    pub fn acknowledge(&mut self, index: usize) -> bool {
        match self.active.get_mut(index) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    pub fn has_unacknowledged(&self) -> bool {
        self.active.iter().any(|alert| !alert.acknowledged)
    }

    pub fn highest_unacknowledged(&self) -> Option<&Alert> {
        self.active
            .iter()
            .filter(|alert| !alert.acknowledged)
            .max_by_key(|alert| alert.severity)
    }

    /// Re-sound the most severe unacknowledged alert once per reminder interval
    pub fn remind(&mut self, now_ms: u64, notifier: &mut dyn Notifier) -> bool {
        let due = self
            .last_reminder_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.limits.reminder_interval_ms);
        if !due {
            return false;
        }

        let Some(alert) = self.highest_unacknowledged() else {
            return false;
        };
        let severity = alert.severity;
        let message = alert.message.clone();

        self.last_reminder_ms = Some(now_ms);
        notifier.emit(severity, BeepPattern::for_severity(severity), &message);
        true
    }

    /// Release alert history under memory pressure
    pub fn shrink_history(&mut self) -> usize {
        if self.history.len() <= self.limits.history_shrink_floor {
            return 0;
        }
        let removed = self.history.evict_oldest(self.limits.history_shrink_batch);
        log::info!("Cleaned up {} alert history entries to free memory", removed);
        removed
    }

    pub fn active(&self) -> impl Iterator<Item = &Alert> {
        self.active.iter()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    fn vitals(heart_rate: f32, spo2: f32, battery_level: f32) -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate,
            spo2,
            battery_level,
            finger_detected: true,
            timestamp_ms: 0,
        }
    }

    fn small_engine(active: usize, history: usize) -> AlertEngine {
        AlertEngine::new(AlertLimits {
            active_capacity: active,
            history_capacity: history,
            ..AlertLimits::default()
        })
    }

    /// Battery alerts this far apart clear both the cooldown and the same-kind window
    const SPACING: u64 = EXPIRY_MS;

    /// Raise one battery alert at `t`
    fn raise(engine: &mut AlertEngine, t: u64, notifier: &mut RecordingNotifier) {
        let created = engine.evaluate(&vitals(75.0, 98.0, 15.0), &AlertThresholds::default(), t, notifier);
        assert_eq!(created, 1);
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        let thresholds = AlertThresholds {
            enabled: false,
            ..AlertThresholds::default()
        };

        for t in [0, 10_000, 20_000] {
            assert_eq!(engine.evaluate(&vitals(30.0, 80.0, 1.0), &thresholds, t, &mut notifier), 0);
        }
        assert_eq!(engine.active_len(), 0);
        assert_eq!(engine.history_len(), 0);
        assert!(notifier.emitted.is_empty());
    }

    #[test]
    fn test_storm_creates_single_alert() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();

        // All three rules fire; the first one closes the cooldown gate
        let created = engine.evaluate(&vitals(130.0, 85.0, 5.0), &AlertThresholds::default(), 10_000, &mut notifier);
        assert_eq!(created, 1);
        assert_eq!(engine.active_len(), 1);
        assert_eq!(engine.history_len(), 1);

        let alert = engine.active().next().unwrap();
        assert_eq!((alert.kind, alert.severity), (AlertKind::HeartRate, Severity::Critical));
        assert_eq!(notifier.emitted.len(), 1);
        assert_eq!(notifier.emitted[0].message, "Heart rate: 130 BPM");
    }

    #[test]
    fn test_first_alert_not_held_back_at_start() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        assert_eq!(engine.evaluate(&vitals(75.0, 98.0, 5.0), &AlertThresholds::default(), 0, &mut notifier), 1);
    }

    #[test]
    fn test_same_kind_suppressed_while_recent() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        let thresholds = AlertThresholds::default();

        assert_eq!(engine.evaluate(&vitals(130.0, 98.0, 80.0), &thresholds, 0, &mut notifier), 1);

        // Cooldown is over, but the heart-rate alert is still recent.
        // The battery rule is a different kind and goes through.
        assert_eq!(engine.evaluate(&vitals(130.0, 98.0, 5.0), &thresholds, 10_000, &mut notifier), 1);
        let kinds: Vec<_> = engine.active().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::HeartRate, AlertKind::Battery]);

        assert_eq!(engine.evaluate(&vitals(130.0, 98.0, 80.0), &thresholds, 29_999, &mut notifier), 0);
        // Heart-rate alert from t=0 is now 30 s old
        assert_eq!(engine.evaluate(&vitals(130.0, 98.0, 80.0), &thresholds, 30_000, &mut notifier), 1);
        assert_eq!(engine.history_len(), 3);
    }

    #[test]
    fn test_severity_classification() {
        let thresholds = AlertThresholds::default();
        let cases = [
            (vitals(45.0, 98.0, 80.0), Severity::Critical),
            (vitals(55.0, 98.0, 80.0), Severity::Warning),
            (vitals(110.0, 98.0, 80.0), Severity::Warning),
            (vitals(121.0, 98.0, 80.0), Severity::Critical),
            (vitals(75.0, 89.0, 80.0), Severity::Critical),
            (vitals(75.0, 92.0, 80.0), Severity::Warning),
            (vitals(75.0, 98.0, 9.0), Severity::Critical),
            (vitals(75.0, 98.0, 15.0), Severity::Warning),
        ];

        for (snapshot, expected) in cases {
            let mut engine = AlertEngine::new(AlertLimits::default());
            let mut notifier = RecordingNotifier::default();
            assert_eq!(engine.evaluate(&snapshot, &thresholds, 0, &mut notifier), 1);
            assert_eq!(engine.active().next().map(|a| a.severity), Some(expected));
        }
    }

    #[test]
    fn test_no_reading_does_not_fire_vital_rules() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();

        let mut no_finger = vitals(0.0, 0.0, 80.0);
        no_finger.finger_detected = false;
        assert_eq!(engine.evaluate(&no_finger, &AlertThresholds::default(), 0, &mut notifier), 0);

        // Finger on but estimators not ready yet
        assert_eq!(engine.evaluate(&vitals(0.0, 0.0, 80.0), &AlertThresholds::default(), 0, &mut notifier), 0);
    }

    #[test]
    fn test_cooldown_suppresses_second_evaluation() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        let thresholds = AlertThresholds::default();

        assert_eq!(engine.evaluate(&vitals(130.0, 98.0, 80.0), &thresholds, 10_000, &mut notifier), 1);
        assert_eq!(engine.evaluate(&vitals(130.0, 85.0, 5.0), &thresholds, 14_999, &mut notifier), 0);
        assert_eq!(engine.history_len(), 1);
        assert_eq!(notifier.emitted.len(), 1);

        // Gate reopens exactly at the cooldown boundary
        assert_eq!(engine.evaluate(&vitals(75.0, 98.0, 5.0), &thresholds, 15_000, &mut notifier), 1);
        assert_eq!(engine.history_len(), 2);
    }

    #[test]
    fn test_active_overflow_drops_oldest() {
        let mut engine = small_engine(3, 50);
        let mut notifier = RecordingNotifier::default();

        for i in 0..3 {
            raise(&mut engine, i * SPACING, &mut notifier);
        }
        assert_eq!(engine.active_len(), 3);

        raise(&mut engine, 3 * SPACING, &mut notifier);
        let stamps: Vec<_> = engine.active().map(|a| a.created_at_ms).collect();
        assert_eq!(stamps, vec![30_000, 60_000, 90_000]);
    }

    #[test]
    fn test_active_overflow_spares_acknowledged() {
        let mut engine = small_engine(3, 50);
        let mut notifier = RecordingNotifier::default();

        for i in 0..3 {
            raise(&mut engine, i * SPACING, &mut notifier);
        }
        assert!(engine.acknowledge(0));

        raise(&mut engine, 3 * SPACING, &mut notifier);
        let stamps: Vec<_> = engine.active().map(|a| a.created_at_ms).collect();
        assert_eq!(stamps, vec![0, 60_000, 90_000]);
    }

    #[test]
    fn test_history_overflow_independent_of_active() {
        let mut engine = small_engine(10, 3);
        let mut notifier = RecordingNotifier::default();

        for i in 0..4 {
            raise(&mut engine, i * SPACING, &mut notifier);
        }
        assert_eq!(engine.active_len(), 4);
        let stamps: Vec<_> = engine.history().map(|a| a.created_at_ms).collect();
        assert_eq!(stamps, vec![30_000, 60_000, 90_000]);
    }

    #[test]
    fn test_sweep_keeps_acknowledged() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();

        engine.evaluate(&vitals(130.0, 98.0, 80.0), &AlertThresholds::default(), 1_000, &mut notifier);
        engine.evaluate(&vitals(75.0, 98.0, 5.0), &AlertThresholds::default(), 6_000, &mut notifier);
        assert_eq!(engine.active_len(), 2);
        engine.acknowledge(1);

        assert_eq!(engine.remove_old_alerts(1_000 + EXPIRY_MS), 0);
        assert_eq!(engine.remove_old_alerts(1_000 + EXPIRY_MS + 1), 1);

        let remaining: Vec<_> = engine.active().collect();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].acknowledged);
        assert_eq!(engine.history_len(), 2);
    }

    #[test]
    fn test_acknowledge_out_of_range_is_noop() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        raise(&mut engine, 0, &mut notifier);

        assert!(!engine.acknowledge(1));
        assert!(!engine.acknowledge(usize::MAX));
        assert!(engine.has_unacknowledged());

        assert!(engine.acknowledge(0));
        assert!(!engine.has_unacknowledged());
        assert_eq!(engine.active_len(), 1);
    }

    #[test]
    fn test_remind_sounds_highest_severity() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        let thresholds = AlertThresholds::default();

        engine.evaluate(&vitals(110.0, 98.0, 80.0), &thresholds, 0, &mut notifier);
        engine.evaluate(&vitals(75.0, 85.0, 80.0), &thresholds, 5_000, &mut notifier);
        notifier.emitted.clear();

        assert!(!engine.remind(6_999, &mut notifier));
        assert!(engine.remind(7_000, &mut notifier));
        assert_eq!(notifier.emitted.len(), 1);
        assert_eq!(notifier.emitted[0].severity, Severity::Critical);
        assert_eq!(notifier.emitted[0].message, "Low SpO2: 85%");

        engine.acknowledge(0);
        engine.acknowledge(1);
        assert!(!engine.remind(20_000, &mut notifier));
    }

    #[test]
    fn test_remind_on_every_interval_tick() {
        let mut engine = AlertEngine::new(AlertLimits::default());
        let mut notifier = RecordingNotifier::default();
        raise(&mut engine, 0, &mut notifier);

        let interval = AlertLimits::default().reminder_interval_ms;
        let sounded: Vec<_> = (1..=6).map(|k| engine.remind(k * interval, &mut notifier)).collect();
        assert_eq!(sounded, vec![true; 6]);
    }

    #[test]
    fn test_shrink_history_only_above_floor() {
        let mut engine = AlertEngine::new(AlertLimits {
            history_shrink_batch: 2,
            history_shrink_floor: 3,
            ..AlertLimits::default()
        });
        let mut notifier = RecordingNotifier::default();

        for i in 0..3 {
            raise(&mut engine, i * SPACING, &mut notifier);
        }
        assert_eq!(engine.shrink_history(), 0);

        raise(&mut engine, 3 * SPACING, &mut notifier);
        assert_eq!(engine.shrink_history(), 2);
        let stamps: Vec<_> = engine.history().map(|a| a.created_at_ms).collect();
        assert_eq!(stamps, vec![60_000, 90_000]);
    }

    #[test]
    fn test_long_message_truncated() {
        let alert = Alert::new(Severity::Info, AlertKind::Battery, "x".repeat(300), 0);
        assert_eq!(alert.message.len(), MAX_MESSAGE_LEN);
    }
}
