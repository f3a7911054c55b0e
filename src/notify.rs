//! # Notification Module
//!
//! The alert engine's only way out to the operator. The core hands over a
//! severity, a beep pattern and a message; buzzers, screens and tone timing
//! belong to whoever implements `Notifier`. The core never sleeps.

use crate::alerts::Severity;
use crossbeam_channel::Sender;

/// Buzzer cadence for one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub pulses: u8,
    pub on_ms: u16,
    pub gap_ms: u16,
}

impl BeepPattern {
    pub fn for_severity(severity: Severity) -> Self {
        let (pulses, on_ms) = match severity {
            Severity::Critical => (3, 500),
            Severity::Warning => (2, 300),
            Severity::Info => (1, 200),
        };
        Self {
            pulses,
            on_ms,
            gap_ms: 200,
        }
    }

    /// Wall time the pattern occupies, without a trailing gap
    pub fn duration_ms(&self) -> u32 {
        let pulses = u32::from(self.pulses);
        pulses * u32::from(self.on_ms) + pulses.saturating_sub(1) * u32::from(self.gap_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub pattern: BeepPattern,
    pub message: String,
}

pub trait Notifier {
    fn emit(&mut self, severity: Severity, pattern: BeepPattern, message: &str);
}

/// Forwards notifications to a display/buzzer consumer on another task
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }
}

impl Notifier for ChannelNotifier {
    fn emit(&mut self, severity: Severity, pattern: BeepPattern, message: &str) {
        let notification = Notification {
            severity,
            pattern,
            message: message.to_string(),
        };
        if let Err(why) = self.sender.send(notification) {
            log::error!("Could not deliver notification: {:?}", why);
        }
    }
}

/// Keeps everything it was asked to emit
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub emitted: Vec<Notification>,
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn emit(&mut self, severity: Severity, pattern: BeepPattern, message: &str) {
        self.emitted.push(Notification {
            severity,
            pattern,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_patterns_by_severity() {
        let critical = BeepPattern::for_severity(Severity::Critical);
        assert_eq!((critical.pulses, critical.on_ms), (3, 500));
        assert_eq!(critical.duration_ms(), 3 * 500 + 2 * 200);

        let warning = BeepPattern::for_severity(Severity::Warning);
        assert_eq!((warning.pulses, warning.on_ms), (2, 300));

        let info = BeepPattern::for_severity(Severity::Info);
        assert_eq!(info.duration_ms(), 200);
    }

    #[test]
    fn test_channel_notifier_forwards() {
        let (sender, receiver) = unbounded();
        let mut notifier = ChannelNotifier::new(sender);
        let pattern = BeepPattern::for_severity(Severity::Warning);

        notifier.emit(Severity::Warning, pattern, "Low SpO2: 93%");

        let received = receiver.try_recv().expect("notification should be queued");
        assert_eq!(received.severity, Severity::Warning);
        assert_eq!(received.message, "Low SpO2: 93%");
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (sender, receiver) = unbounded();
        drop(receiver);
        let mut notifier = ChannelNotifier::new(sender);
        notifier.emit(Severity::Info, BeepPattern::for_severity(Severity::Info), "ignored");
    }
}
