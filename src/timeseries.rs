//! Bounded, time-ordered storage shared by the alert lists and the vitals log.
//!
//! `BoundedSeries` never grows past the capacity it was built with. Eviction
//! is always explicit: `push` hands back whatever it displaced, and the batch
//! path (`evict_oldest`) is separate from the per-push path.

use std::collections::VecDeque;

pub struct BoundedSeries<T> {
    data: VecDeque<T>,
    capacity: usize,
}

/// Min/max scan over a window of raw intensities
pub trait MinMaxExt {
    fn min_max(&self) -> Option<(u32, u32)>;
}

impl MinMaxExt for [u32] {
    fn min_max(&self) -> Option<(u32, u32)> {
        self.iter().fold(None, |acc, &value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
    }
}

impl<T> BoundedSeries<T> {
    /// Panics if `capacity` is zero; callers validate config before building.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedSeries capacity must be non-zero");
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, dropping the single oldest entry first when full
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    /// Append, dropping the oldest entry matching `prefer` when full.
    /// Falls back to the plain oldest entry if nothing matches.
    pub fn push_evicting<F>(&mut self, value: T, prefer: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let evicted = if self.data.len() == self.capacity {
            let idx = self.data.iter().position(prefer).unwrap_or(0);
            self.data.remove(idx)
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    /// Remove up to `n` oldest entries, returning how many were removed
    pub fn evict_oldest(&mut self, n: usize) -> usize {
        let n = n.min(self.data.len());
        self.data.drain(..n);
        n
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.data.retain(keep);
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }

    /// The `n` most recent entries, oldest first
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        self.data.iter().skip(self.data.len().saturating_sub(n))
    }

    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
