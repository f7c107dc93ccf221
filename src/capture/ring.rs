// src/capture/ring.rs

/// Fixed-capacity history of the most recent samples. Writing always
/// overwrites the oldest slot; reading is by distance from the newest one.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    data: Vec<f32>,
    // Slot holding the most recent tap_in
    cursor: usize,
}

impl CircularBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self {
            data: Vec::new(),
            cursor: 0,
        };
        buffer.set_capacity(capacity);
        buffer
    }

    /// Reallocates and zeroes the history. Not for use while another thread
    /// is appending.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.data.clear();
        self.data.resize(capacity.max(1), 0.0);
        self.cursor = 0;
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.cursor = 0;
    }

    #[inline]
    pub fn tap_in(&mut self, sample: f32) {
        self.cursor += 1;
        if self.cursor == self.data.len() {
            self.cursor = 0;
        }
        self.data[self.cursor] = sample;
    }

    /// Sample written `offset` steps before the latest one. Callers keep
    /// `offset` below `capacity()`; larger values wrap.
    #[inline]
    pub fn tap_out(&self, offset: usize) -> f32 {
        let len = self.data.len();
        let back = offset % len;
        let idx = if back <= self.cursor {
            self.cursor - back
        } else {
            self.cursor + len - back
        };
        self.data[idx]
    }
}
