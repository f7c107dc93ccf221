// src/scope/mod.rs

pub mod file;
pub mod live;
pub mod reader;

pub use file::{FileSource, FileSourceState, PROCESSING_LEAD_IN};
pub use live::LiveSource;
pub use reader::{DecodedFile, SampleReader};

use serde::{Deserialize, Serialize};

use crate::dsp::{band_colour, Rgb};

/// Summary of one pixel column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopePoint {
    pub min: f32,
    pub max: f32,
    pub colour: Rgb,
}

impl ScopePoint {
    pub fn silent(colour: Rgb) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            colour,
        }
    }
}

/// Anything the renderer can bin into pixel columns.
///
/// Indices live in the source's own space `[0, range_size())`. Out of range
/// indices are clamped, reversed pairs are swapped and an empty range is
/// read as the single sample at `start`, so no query can fail.
pub trait ScopeSource {
    fn range_size(&self) -> usize;
    fn range(&self, start: i64, end: i64) -> ScopePoint;
}

/// Which signal provides the envelope. Band colours always come from the
/// mono mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScopeChannel {
    Left,
    Right,
    #[default]
    Mix,
}

impl ScopeChannel {
    #[inline]
    pub fn pick(self, left: f32, right: f32) -> f32 {
        match self {
            ScopeChannel::Left => left,
            ScopeChannel::Right => right,
            ScopeChannel::Mix => crate::dsp::mix_to_mono(left, right),
        }
    }
}

/// Clamp both ends into `[0, len-1]` and order them. `None` when there is
/// nothing to read.
pub(crate) fn prepare_indexes(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let last = i64::try_from(len - 1).unwrap_or(i64::MAX);
    let a = start.clamp(0, last) as usize;
    let b = end.clamp(0, last) as usize;
    Some(if b < a { (b, a) } else { (a, b) })
}

/// Walks `[start, end)` (at least `start` itself) collecting the envelope and
/// per-band peak magnitude. `sample(i)` yields `(amplitude, [bass, mid, high])`.
pub(crate) fn summarize<F>(start: usize, end: usize, default: Rgb, sample: F) -> ScopePoint
where
    F: Fn(usize) -> (f32, [f32; 3]),
{
    let (first, bands) = sample(start);
    let mut min = first;
    let mut max = first;
    let mut peak = bands.map(f32::abs);

    for i in start + 1..end {
        let (t, bands) = sample(i);
        min = min.min(t);
        max = max.max(t);
        for (p, b) in peak.iter_mut().zip(bands) {
            *p = p.max(b.abs());
        }
    }

    ScopePoint {
        min,
        max,
        colour: band_colour(peak[0], peak[1], peak[2], default),
    }
}
