// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

use crate::dsp::{
    Rgb, DEFAULT_HIGH_CROSSOVER, DEFAULT_LOW_CROSSOVER, DEFAULT_SCOPE_COLOUR, MIN_CUTOFF,
};
use crate::render::ScopeStyle;

pub const DEFAULT_CAPTURE_SECONDS: f32 = 5.0;
/// 1.5 s at 44.1 kHz.
pub const DEFAULT_LIVE_WINDOW: usize = 66_300;
pub const DEFAULT_TICK_HZ: u32 = 30;
pub const DEFAULT_FILE_WINDOW: usize = 88_200;
/// One minute at 192 kHz.
pub const MAX_FILE_WINDOW: usize = 11_520_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub low_crossover_hz: f32,
    pub high_crossover_hz: f32,
    /// History kept by the capture rings.
    pub capture_seconds: f32,
    /// Frames of history the live scopes show.
    pub live_window_size: usize,
    pub tick_hz: u32,
    pub style: ScopeStyle,
    pub default_colour: Rgb,
    pub file_gain_db: f32,
    pub file_window_size: usize,
    /// Fraction of the file window moved per seek.
    pub seek_step: f32,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            low_crossover_hz: DEFAULT_LOW_CROSSOVER,
            high_crossover_hz: DEFAULT_HIGH_CROSSOVER,
            capture_seconds: DEFAULT_CAPTURE_SECONDS,
            live_window_size: DEFAULT_LIVE_WINDOW,
            tick_hz: DEFAULT_TICK_HZ,
            style: ScopeStyle::default(),
            default_colour: DEFAULT_SCOPE_COLOUR,
            file_gain_db: 0.0,
            file_window_size: DEFAULT_FILE_WINDOW,
            seek_step: 0.25,
        }
    }
}

impl ScopeConfig {
    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_from_disk(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config.sanitize())
    }

    /// Missing or unreadable files give the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_disk(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring config {}: {err:#}", path.display());
                Self::default()
            }
        }
    }

    /// Pulls every field back into a usable range.
    pub fn sanitize(mut self) -> Self {
        let defaults = Self::default();

        let mut low =
            finite_or(self.low_crossover_hz, defaults.low_crossover_hz).max(MIN_CUTOFF);
        let mut high =
            finite_or(self.high_crossover_hz, defaults.high_crossover_hz).max(MIN_CUTOFF);
        if high < low {
            std::mem::swap(&mut low, &mut high);
        }
        self.low_crossover_hz = low;
        self.high_crossover_hz = high;

        self.capture_seconds =
            finite_or(self.capture_seconds, defaults.capture_seconds).clamp(0.1, 60.0);
        self.live_window_size = self.live_window_size.max(1);
        self.tick_hz = self.tick_hz.clamp(1, 240);

        self.style.vertical_mid_point =
            finite_or(self.style.vertical_mid_point, defaults.style.vertical_mid_point)
                .clamp(0.0, 1.0);
        self.style.vertical_scale =
            finite_or(self.style.vertical_scale, defaults.style.vertical_scale).clamp(0.0, 4.0);

        self.file_gain_db = finite_or(self.file_gain_db, 0.0).clamp(-60.0, 24.0);
        self.file_window_size = self.file_window_size.clamp(1, MAX_FILE_WINDOW);
        self.seek_step = finite_or(self.seek_step, defaults.seek_step).clamp(0.01, 1.0);
        self
    }

    /// Ring length for a device rate.
    pub fn capture_capacity(&self, sample_rate: u32) -> usize {
        ((self.capture_seconds * sample_rate as f32).ceil() as usize).max(1)
    }

    /// Frames per seek for the file window.
    pub fn seek_frames(&self) -> u64 {
        ((self.file_window_size as f32 * self.seek_step).round() as u64).max(1)
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}
