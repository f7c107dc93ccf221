// src/scope/live.rs

use super::{prepare_indexes, summarize, ScopeChannel, ScopePoint, ScopeSource};
use crate::capture::CaptureBuffers;
use crate::dsp::{Rgb, DEFAULT_SCOPE_COLOUR};

/// View over the capture rings, borrowed for the length of one render pass.
/// Borrowing the locked buffers is what keeps every query of the pass under
/// the same lock acquisition. Index 0 is the newest frame.
pub struct LiveSource<'a> {
    buffers: &'a CaptureBuffers,
    channel: ScopeChannel,
    window_size: usize,
    default_colour: Rgb,
}

impl<'a> LiveSource<'a> {
    pub fn new(buffers: &'a CaptureBuffers, channel: ScopeChannel) -> Self {
        Self {
            buffers,
            channel,
            window_size: buffers.capacity(),
            default_colour: DEFAULT_SCOPE_COLOUR,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.set_window_size(window_size);
        self
    }

    pub fn with_default_colour(mut self, colour: Rgb) -> Self {
        self.default_colour = colour;
        self
    }

    /// Narrows the visible history. Never touches the rings themselves.
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.min(self.buffers.capacity());
    }

    pub fn channel(&self) -> ScopeChannel {
        self.channel
    }
}

impl ScopeSource for LiveSource<'_> {
    fn range_size(&self) -> usize {
        self.window_size
    }

    fn range(&self, start: i64, end: i64) -> ScopePoint {
        let Some((start, end)) = prepare_indexes(start, end, self.buffers.capacity()) else {
            return ScopePoint::silent(self.default_colour);
        };
        let b = self.buffers;
        let channel = self.channel;
        summarize(start, end, self.default_colour, |i| {
            (
                channel.pick(b.left.tap_out(i), b.right.tap_out(i)),
                [b.bass.tap_out(i), b.mid.tap_out(i), b.high.tap_out(i)],
            )
        })
    }
}
