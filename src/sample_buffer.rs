//! # Sample Buffer Module
//!
//! Fixed-capacity circular store of paired infrared/red PPG intensities.
//! Feeds both the beat detector (latest IR sample) and the SpO2 estimator
//! (the full window).
//!
//! Overwriting the oldest slot is the steady state, not an error. The only
//! signal the buffer gives back is whether an `add_sample` call just closed a
//! window, i.e. the write index wrapped back to 0.
//!
//! ## Concurrency
//! The buffer itself is not synchronized. The sampler thread never touches it:
//! samples cross threads over the sampler channel (see `sensor.rs`) and the
//! tick loop is the only writer.

/// One raw reading from the PPG sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub ir: u32,
    pub red: u32,
    pub timestamp_ms: u64,
}

pub struct SampleBuffer {
    ir: Vec<u32>,
    red: Vec<u32>,
    index: usize,
    filled: usize,
    full: bool,
}

impl SampleBuffer {
    /// Create a zero-filled buffer holding `capacity` sample pairs.
    ///
    /// A zero capacity is a programming error and panics; `Config::validate`
    /// rejects it before it gets here.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sample buffer capacity must be non-zero");
        Self {
            ir: vec![0; capacity],
            red: vec![0; capacity],
            index: 0,
            filled: 0,
            full: false,
        }
    }

    /// Store a sample pair, returning `true` when this write completed a window
    pub fn add_sample(&mut self, ir: u32, red: u32) -> bool {
        self.ir[self.index] = ir;
        self.red[self.index] = red;

        self.index += 1;
        self.filled = (self.filled + 1).min(self.capacity());

        if self.index >= self.capacity() {
            self.index = 0;
            self.full = true;
            return true;
        }
        false
    }

    /// Whether at least one full window has been collected since reset
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Zero-fill and rewind, as on sensor re-init
    pub fn reset(&mut self) {
        self.ir.fill(0);
        self.red.fill(0);
        self.index = 0;
        self.filled = 0;
        self.full = false;
    }

    pub fn capacity(&self) -> usize {
        self.ir.len()
    }

    /// Number of slots written since reset (saturates at capacity)
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn ir(&self) -> &[u32] {
        &self.ir
    }

    pub fn red(&self) -> &[u32] {
        &self.red
    }

    /// Up to `n` of the most recent IR samples, newest first.
    /// Never yields slots that have not been written since reset.
    pub fn recent_ir(&self, n: usize) -> impl Iterator<Item = u32> + '_ {
        let cap = self.capacity();
        let count = n.min(self.filled);
        (0..count).map(move |i| self.ir[(self.index + cap - 1 - i) % cap])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sample_reports_wrap() {
        let mut buffer = SampleBuffer::new(3);
        assert!(!buffer.add_sample(1, 10));
        assert!(!buffer.add_sample(2, 20));
        assert!(!buffer.is_full());
        assert!(buffer.add_sample(3, 30));
        assert!(buffer.is_full());

        // Second lap overwrites the oldest slot and wraps again after three more
        assert!(!buffer.add_sample(4, 40));
        assert_eq!(buffer.ir(), &[4, 2, 3]);
        assert!(!buffer.add_sample(5, 50));
        assert!(buffer.add_sample(6, 60));
        assert_eq!(buffer.red(), &[40, 50, 60]);
    }

    #[test]
    fn test_reset_zero_fills() {
        let mut buffer = SampleBuffer::new(2);
        buffer.add_sample(7, 8);
        buffer.add_sample(9, 10);
        assert!(buffer.is_full());

        buffer.reset();
        assert!(!buffer.is_full());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.ir(), &[0, 0]);
        assert_eq!(buffer.red(), &[0, 0]);
        assert!(!buffer.add_sample(1, 1));
    }

    #[test]
    fn test_recent_ir_newest_first() {
        let mut buffer = SampleBuffer::new(4);
        assert_eq!(buffer.recent_ir(10).count(), 0);

        buffer.add_sample(1, 0);
        buffer.add_sample(2, 0);
        assert_eq!(buffer.recent_ir(10).collect::<Vec<_>>(), vec![2, 1]);

        for ir in 3..=6 {
            buffer.add_sample(ir, 0);
        }
        assert_eq!(buffer.recent_ir(10).collect::<Vec<_>>(), vec![6, 5, 4, 3]);
        assert_eq!(buffer.recent_ir(2).collect::<Vec<_>>(), vec![6, 5]);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _ = SampleBuffer::new(0);
    }
}
