// src/editor.rs

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::capture::SharedCapture;
use crate::config::ScopeConfig;
use crate::dsp::Rgb;
use crate::render::{ColouredScope, ScopeStyle};
use crate::scope::{FileSource, LiveSource, SampleReader, ScopeChannel};

/// Producer diagnostics gathered since the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub max_wait: Duration,
    /// The producer waited longer than its block lasts at least once.
    pub long_wait: bool,
    pub frames_written: u64,
}

/// Consumer side of live capture: one scope per channel, both rendered
/// under a single lock per tick.
pub struct ScopeEditor {
    shared: Arc<SharedCapture>,
    left: ColouredScope,
    right: ColouredScope,
    window_size: usize,
    default_colour: Rgb,
}

impl ScopeEditor {
    pub fn new(shared: Arc<SharedCapture>, config: &ScopeConfig) -> Self {
        let window_size = config.live_window_size.clamp(1, shared.capacity());
        Self {
            shared,
            left: ColouredScope::new(config.style),
            right: ColouredScope::new(config.style),
            window_size,
            default_colour: config.default_colour,
        }
    }

    pub fn shared(&self) -> &Arc<SharedCapture> {
        &self.shared
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.clamp(1, self.shared.capacity());
    }

    pub fn left(&self) -> &ColouredScope {
        &self.left
    }

    pub fn right(&self) -> &ColouredScope {
        &self.right
    }

    pub fn tick(&mut self, width: f32, height: f32, scale_factor: f32) -> TickReport {
        self.left.prepare(width, scale_factor);
        self.right.prepare(width, scale_factor);

        match self.shared.lock() {
            Some(buffers) => {
                let left = LiveSource::new(&buffers, ScopeChannel::Left)
                    .with_window_size(self.window_size)
                    .with_default_colour(self.default_colour);
                let right = LiveSource::new(&buffers, ScopeChannel::Right)
                    .with_window_size(self.window_size)
                    .with_default_colour(self.default_colour);
                self.left.update(Some(&left), width, height, scale_factor);
                self.right.update(Some(&right), width, height, scale_factor);
            }
            None => {
                self.left.update(None, width, height, scale_factor);
                self.right.update(None, width, height, scale_factor);
            }
        }

        let report = TickReport {
            max_wait: self.shared.take_max_wait(),
            long_wait: self.shared.take_long_wait(),
            frames_written: self.shared.frames_written(),
        };
        if report.long_wait {
            debug!("producer waited {:?} for the capture lock", report.max_wait);
        }
        report
    }
}

/// A file scope with seeking, as driven by the binary.
pub struct FileView {
    source: FileSource,
    scope: ColouredScope,
    seek_frames: u64,
}

impl FileView {
    pub fn new(config: &ScopeConfig) -> Self {
        let mut source = FileSource::new();
        source.set_crossovers(config.low_crossover_hz, config.high_crossover_hz);
        source.set_gain_db(config.file_gain_db);
        source.set_default_colour(config.default_colour);
        source.set_window_size(config.file_window_size);

        // Files read left to right.
        let style = ScopeStyle {
            reverse: false,
            ..config.style
        };
        Self {
            source,
            scope: ColouredScope::new(style),
            seek_frames: config.seek_frames(),
        }
    }

    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.source.open_file(path)
    }

    pub fn open_reader(&mut self, reader: Box<dyn SampleReader>) {
        self.source.open_reader(reader);
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn scope(&self) -> &ColouredScope {
        &self.scope
    }

    /// Moves the window by whole seek steps, staying inside the file.
    pub fn seek(&mut self, steps: i64) {
        let Some(length) = self.source.file_length() else {
            return;
        };
        let last = length.saturating_sub(1);
        let delta = self.seek_frames.saturating_mul(steps.unsigned_abs());
        let offset = if steps < 0 {
            self.source.offset().saturating_sub(delta)
        } else {
            self.source.offset().saturating_add(delta).min(last)
        };
        self.source.set_offset(offset);
    }

    pub fn tick(&mut self, width: f32, height: f32, scale_factor: f32) {
        self.scope
            .update(Some(&self.source), width, height, scale_factor);
    }
}
