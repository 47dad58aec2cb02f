//! Per-subscription line transforms.

use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Transform applied to every line before it reaches the observer.
pub(crate) type Pipeline<T> = Box<dyn FnMut(String) -> Result<T> + Send>;

/// Stamps a 1-based, gap-free sequence number onto each value.
#[derive(Debug, Clone)]
pub struct Indexed {
    next: u64,
}

impl Indexed {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn stamp<T>(&mut self, value: T) -> (u64, T) {
        let index = self.next;
        self.next += 1;
        (index, value)
    }
}

impl Default for Indexed {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding window over the most recent values.
///
/// Each push returns a snapshot of at most `size` values, oldest first.
#[derive(Debug, Clone)]
pub struct Window<T> {
    size: usize,
    buffer: VecDeque<T>,
}

impl<T: Clone> Window<T> {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_config("window size must be at least 1"));
        }
        Ok(Self {
            size,
            buffer: VecDeque::with_capacity(size),
        })
    }

    pub fn push(&mut self, value: T) -> Vec<T> {
        self.buffer.push_back(value);
        while self.buffer.len() > self.size {
            self.buffer.pop_front();
        }
        self.buffer.iter().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
