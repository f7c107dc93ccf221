// src/capture/mod.rs

pub mod ring;

pub use ring::CircularBuffer;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::dsp::{Bands, Crossover};

/// Frames analysed per lock acquisition when the host never told us its
/// block size.
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// One analysed frame, ready to be appended to every ring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptureFrame {
    pub left: f32,
    pub right: f32,
    pub bands: Bands,
}

/// The five rings the audio thread appends to. They always advance
/// together, so offset `i` names the same instant in each of them.
#[derive(Debug, Clone)]
pub struct CaptureBuffers {
    pub left: CircularBuffer,
    pub right: CircularBuffer,
    pub bass: CircularBuffer,
    pub mid: CircularBuffer,
    pub high: CircularBuffer,
}

impl CaptureBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            left: CircularBuffer::with_capacity(capacity),
            right: CircularBuffer::with_capacity(capacity),
            bass: CircularBuffer::with_capacity(capacity),
            mid: CircularBuffer::with_capacity(capacity),
            high: CircularBuffer::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.left.capacity()
    }

    #[inline]
    pub fn tap_in(&mut self, frame: &CaptureFrame) {
        self.left.tap_in(frame.left);
        self.right.tap_in(frame.right);
        self.bass.tap_in(frame.bands.bass);
        self.mid.tap_in(frame.bands.mid);
        self.high.tap_in(frame.bands.high);
    }

    pub fn clear(&mut self) {
        for ring in [
            &mut self.left,
            &mut self.right,
            &mut self.bass,
            &mut self.mid,
            &mut self.high,
        ] {
            ring.clear();
        }
    }
}

/// Hand-off point between the audio thread and the render tick. The mutex
/// is the only thing either side ever blocks on.
pub struct SharedCapture {
    buffers: Mutex<CaptureBuffers>,
    capacity: usize,
    max_wait_ns: AtomicU64,
    long_wait: AtomicBool,
    frames_written: AtomicU64,
}

impl SharedCapture {
    pub fn new(capacity: usize) -> Arc<Self> {
        let buffers = CaptureBuffers::new(capacity);
        Arc::new(Self {
            capacity: buffers.capacity(),
            buffers: Mutex::new(buffers),
            max_wait_ns: AtomicU64::new(0),
            long_wait: AtomicBool::new(false),
            frames_written: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `None` only if a previous holder panicked.
    pub fn lock(&self) -> Option<MutexGuard<'_, CaptureBuffers>> {
        self.buffers.lock().ok()
    }

    /// Total frames appended since construction.
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    /// Longest time the producer spent waiting for the lock since the last
    /// call. Resets the counter.
    pub fn take_max_wait(&self) -> Duration {
        Duration::from_nanos(self.max_wait_ns.swap(0, Ordering::Relaxed))
    }

    /// Whether any producer wait outlasted its own block since the last call.
    pub fn take_long_wait(&self) -> bool {
        self.long_wait.swap(false, Ordering::Relaxed)
    }

    fn record_wait(&self, waited: Duration, budget: Duration) {
        let ns = u64::try_from(waited.as_nanos()).unwrap_or(u64::MAX);
        self.max_wait_ns.fetch_max(ns, Ordering::Relaxed);
        if waited > budget {
            self.long_wait.store(true, Ordering::Relaxed);
        }
    }
}

/// Producer side. Lives on the audio thread: it filters outside the lock,
/// then appends a whole chunk under a single acquisition.
pub struct CaptureProcessor {
    shared: Arc<SharedCapture>,
    crossover: Crossover,
    scratch: Vec<CaptureFrame>,
}

impl CaptureProcessor {
    pub fn new(shared: Arc<SharedCapture>, sample_rate: f32, low_hz: f32, high_hz: f32) -> Self {
        Self {
            shared,
            crossover: Crossover::new(sample_rate, low_hz, high_hz),
            scratch: vec![CaptureFrame::default(); DEFAULT_BLOCK_FRAMES],
        }
    }

    pub fn shared(&self) -> &Arc<SharedCapture> {
        &self.shared
    }

    pub fn sample_rate(&self) -> f32 {
        self.crossover.sample_rate()
    }

    /// Not real-time safe: may reallocate the scratch block.
    pub fn prepare(&mut self, sample_rate: f32, max_block_frames: usize) {
        self.crossover.set_sample_rate(sample_rate);
        self.crossover.reset();
        self.scratch
            .resize(max_block_frames.max(1), CaptureFrame::default());
    }

    pub fn set_crossovers(&mut self, low_hz: f32, high_hz: f32) {
        self.crossover.set_crossovers(low_hz, high_hz);
    }

    /// Channel-major block. Channel 0 feeds the left ring, channel 1 (or 0
    /// again for mono) the right ring, and the average of every channel
    /// feeds the crossover.
    pub fn process_block(&mut self, channels: &[&[f32]]) {
        let Some(first) = channels.first() else {
            return;
        };
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let second = channels.get(1).unwrap_or(first);
        let scale = 1.0 / channels.len() as f32;

        let mut start = 0;
        while start < frames {
            let n = (frames - start).min(self.scratch.len());
            for i in 0..n {
                let idx = start + i;
                let sum: f32 = channels.iter().map(|c| c[idx]).sum();
                let bands = self.crossover.process(sum * scale);
                self.scratch[i] = CaptureFrame {
                    left: first[idx],
                    right: second[idx],
                    bands,
                };
            }
            self.commit(n);
            start += n;
        }
    }

    /// Interleaved block as delivered by most device callbacks. `convert`
    /// maps the device sample type to f32 without an intermediate buffer.
    pub fn process_interleaved<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: Fn(T) -> f32,
    {
        if channels == 0 {
            return;
        }
        let frames = data.len() / channels;
        let scale = 1.0 / channels as f32;

        let mut start = 0;
        while start < frames {
            let n = (frames - start).min(self.scratch.len());
            for i in 0..n {
                let frame = &data[(start + i) * channels..(start + i + 1) * channels];
                let left = convert(frame[0]);
                let (right, sum) = match frame.get(1) {
                    Some(&s) => {
                        let right = convert(s);
                        let rest: f32 = frame[2..].iter().map(|&s| convert(s)).sum();
                        (right, left + right + rest)
                    }
                    None => (left, left),
                };
                let bands = self.crossover.process(sum * scale);
                self.scratch[i] = CaptureFrame { left, right, bands };
            }
            self.commit(n);
            start += n;
        }
    }

    fn commit(&mut self, frames: usize) {
        let requested = Instant::now();
        let Some(mut buffers) = self.shared.lock() else {
            return;
        };
        let waited = requested.elapsed();
        for frame in &self.scratch[..frames] {
            buffers.tap_in(frame);
        }
        drop(buffers);

        self.shared
            .frames_written
            .fetch_add(frames as u64, Ordering::Relaxed);
        let budget = Duration::from_secs_f64(frames as f64 / self.sample_rate().max(1.0) as f64);
        self.shared.record_wait(waited, budget);
    }
}
