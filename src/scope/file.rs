// src/scope/file.rs

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use super::reader::{DecodedFile, SampleReader};
use super::{prepare_indexes, summarize, ScopeChannel, ScopePoint, ScopeSource};
use crate::dsp::{
    db_to_linear, mix_to_mono, Crossover, Rgb, DEFAULT_HIGH_CROSSOVER, DEFAULT_LOW_CROSSOVER,
    DEFAULT_SCOPE_COLOUR,
};

/// Frames decoded ahead of every window purely to settle the crossover.
pub const PROCESSING_LEAD_IN: usize = 512;

const FALLBACK_SAMPLE_RATE: f32 = 44_100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSourceState {
    Closed,
    OpenIdle,
    OpenWindowed,
}

/// Raw stereo plus the three bands of the mono mix, one entry per frame.
#[derive(Debug, Default)]
struct FileWindow {
    left: Vec<f32>,
    right: Vec<f32>,
    bass: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
}

impl FileWindow {
    fn rows(&mut self) -> [&mut Vec<f32>; 5] {
        [
            &mut self.left,
            &mut self.right,
            &mut self.bass,
            &mut self.mid,
            &mut self.high,
        ]
    }

    fn resize(&mut self, frames: usize) {
        for row in self.rows() {
            row.resize(frames, 0.0);
        }
    }

    fn clear(&mut self) {
        for row in self.rows() {
            row.fill(0.0);
        }
    }
}

/// Scope source over a window of a decoded file. The window is rebuilt only
/// when its offset or length actually changes.
pub struct FileSource {
    reader: Option<Box<dyn SampleReader>>,
    crossover: Crossover,
    window: FileWindow,
    lead_in: [Vec<f32>; 2],
    offset: u64,
    window_size: usize,
    gain: f32,
    channel: ScopeChannel,
    default_colour: Rgb,
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource {
    pub fn new() -> Self {
        Self {
            reader: None,
            crossover: Crossover::new(
                FALLBACK_SAMPLE_RATE,
                DEFAULT_LOW_CROSSOVER,
                DEFAULT_HIGH_CROSSOVER,
            ),
            window: FileWindow::default(),
            lead_in: [vec![0.0; PROCESSING_LEAD_IN], vec![0.0; PROCESSING_LEAD_IN]],
            offset: 0,
            window_size: 0,
            gain: 1.0,
            channel: ScopeChannel::Mix,
            default_colour: DEFAULT_SCOPE_COLOUR,
        }
    }

    /// Decode `path` and show it from the current offset. On failure the
    /// source is left closed.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match DecodedFile::open(path) {
            Ok(file) => {
                info!("file scope: opened {}", path.display());
                self.open_reader(Box::new(file));
                Ok(())
            }
            Err(e) => {
                warn!("file scope: cannot open {}: {e:#}", path.display());
                self.close_file();
                Err(e)
            }
        }
    }

    pub fn open_reader(&mut self, reader: Box<dyn SampleReader>) {
        self.crossover.set_sample_rate(reader.sample_rate() as f32);
        self.reader = Some(reader);
        self.update(self.offset, self.window_size, true);
    }

    pub fn close_file(&mut self) {
        if self.reader.take().is_some() {
            debug!("file scope: closed");
        }
        self.window.clear();
    }

    pub fn state(&self) -> FileSourceState {
        match (&self.reader, self.window_size) {
            (None, _) => FileSourceState::Closed,
            (Some(_), 0) => FileSourceState::OpenIdle,
            (Some(_), _) => FileSourceState::OpenWindowed,
        }
    }

    pub fn file_length(&self) -> Option<u64> {
        self.reader.as_ref().map(|r| r.length_frames())
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.reader.as_ref().map(|r| r.sample_rate())
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, linear_gain: f32) {
        self.gain = linear_gain;
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain = db_to_linear(gain_db);
    }

    pub fn set_channel(&mut self, channel: ScopeChannel) {
        self.channel = channel;
    }

    pub fn set_default_colour(&mut self, colour: Rgb) {
        self.default_colour = colour;
    }

    /// The stored bands depend on the cutoffs, so a change rebuilds the
    /// window.
    pub fn set_crossovers(&mut self, low_hz: f32, high_hz: f32) {
        if self.crossover.crossovers() != (low_hz, high_hz) {
            self.crossover.set_crossovers(low_hz, high_hz);
            self.update(self.offset, self.window_size, true);
        }
    }

    pub fn set_window_size(&mut self, window_size: usize) {
        self.update(self.offset, window_size, false);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.update(offset, self.window_size, false);
    }

    pub fn set_offset_and_window_size(&mut self, offset: u64, window_size: usize) {
        self.update(offset, window_size, false);
    }

    fn update(&mut self, offset: u64, window_size: usize, force: bool) {
        let size_changed = window_size != self.window_size;
        if !force && !size_changed && offset == self.offset {
            return;
        }
        if size_changed {
            self.window.resize(window_size);
        }
        self.offset = offset;
        self.window_size = window_size;

        let Some(reader) = self.reader.as_deref() else {
            self.window.clear();
            return;
        };
        let start = i64::try_from(offset).unwrap_or(i64::MAX);
        materialize(
            reader,
            &mut self.crossover,
            &mut self.lead_in,
            &mut self.window,
            start,
        );
        debug!("file scope: window {window_size} frames at {offset}");
    }
}

fn materialize(
    reader: &dyn SampleReader,
    crossover: &mut Crossover,
    lead_in: &mut [Vec<f32>; 2],
    window: &mut FileWindow,
    start: i64,
) {
    crossover.reset();
    let [lead_left, lead_right] = lead_in;
    reader.read(lead_left, lead_right, start.saturating_sub(PROCESSING_LEAD_IN as i64));
    for (&l, &r) in lead_left.iter().zip(lead_right.iter()) {
        crossover.process(mix_to_mono(l, r));
    }

    reader.read(&mut window.left, &mut window.right, start);
    for i in 0..window.left.len() {
        let bands = crossover.process(mix_to_mono(window.left[i], window.right[i]));
        window.bass[i] = bands.bass;
        window.mid[i] = bands.mid;
        window.high[i] = bands.high;
    }
}

impl ScopeSource for FileSource {
    fn range_size(&self) -> usize {
        self.window_size
    }

    fn range(&self, start: i64, end: i64) -> ScopePoint {
        let Some((start, end)) = prepare_indexes(start, end, self.window_size) else {
            return ScopePoint::silent(self.default_colour);
        };
        let w = &self.window;
        let gain = self.gain;
        let channel = self.channel;
        summarize(start, end, self.default_colour, |i| {
            (
                gain * channel.pick(w.left[i], w.right[i]),
                [w.bass[i], w.mid[i], w.high[i]],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn signal(n: usize) -> (Vec<f32>, Vec<f32>) {
        let left = (0..n)
            .map(|i| (i as f32 * 0.013).sin() * 0.6 + (i as f32 * 0.9).sin() * 0.3)
            .collect();
        let right = (0..n)
            .map(|i| (i as f32 * 0.05).cos() * 0.4 + (i as f32 * 1.7).sin() * 0.2)
            .collect();
        (left, right)
    }

    fn opened(n: usize) -> FileSource {
        let (left, right) = signal(n);
        let mut source = FileSource::new();
        source.open_reader(Box::new(DecodedFile::from_planar(left, right, 44_100)));
        source
    }

    struct CountingReader {
        inner: DecodedFile,
        reads: Arc<AtomicUsize>,
    }

    impl SampleReader for CountingReader {
        fn sample_rate(&self) -> u32 {
            self.inner.sample_rate()
        }
        fn length_frames(&self) -> u64 {
            self.inner.length_frames()
        }
        fn read(&self, left: &mut [f32], right: &mut [f32], start_frame: i64) {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.inner.read(left, right, start_frame);
        }
    }

    #[test]
    fn closed_source_is_silent() {
        let mut source = FileSource::new();
        assert_eq!(source.state(), FileSourceState::Closed);
        assert_eq!(source.range(0, 10), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));

        source.set_window_size(64);
        assert_eq!(source.state(), FileSourceState::Closed);
        assert_eq!(source.range_size(), 64);
        assert_eq!(source.range(-3, 70), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
        assert_eq!(source.file_length(), None);
    }

    #[test]
    fn open_without_window_is_idle() {
        let source = opened(1_000);
        assert_eq!(source.state(), FileSourceState::OpenIdle);
        assert_eq!(source.file_length(), Some(1_000));
        assert_eq!(source.sample_rate(), Some(44_100));
    }

    #[test]
    fn window_envelope_is_gain_scaled_mix() {
        let (left, right) = signal(4_000);
        let mut source = opened(4_000);
        source.set_gain(2.0);
        source.set_offset_and_window_size(1_000, 256);
        assert_eq!(source.state(), FileSourceState::OpenWindowed);

        let p = source.range(10, 20);
        let mixed: Vec<f32> = (1_010..1_020).map(|i| 2.0 * 0.5 * (left[i] + right[i])).collect();
        let min = mixed.iter().copied().fold(f32::INFINITY, f32::min);
        let max = mixed.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((p.min - min).abs() < 1e-6);
        assert!((p.max - max).abs() < 1e-6);
        assert_eq!(source.range(20, 10), p);
    }

    #[test]
    fn channel_selection_changes_envelope() {
        let (left, _) = signal(2_000);
        let mut source = opened(2_000);
        source.set_channel(ScopeChannel::Left);
        source.set_offset_and_window_size(500, 100);
        let p = source.range(3, 3);
        assert_eq!(p.min, left[503]);
        assert_eq!(p.max, left[503]);
    }

    #[test]
    fn lead_in_matches_continuous_processing() {
        let n = 6_000;
        let (left, right) = signal(n);
        let mut continuous =
            Crossover::new(44_100.0, DEFAULT_LOW_CROSSOVER, DEFAULT_HIGH_CROSSOVER);
        let reference: Vec<_> = (0..n)
            .map(|i| continuous.process(mix_to_mono(left[i], right[i])))
            .collect();

        for offset in [0usize, 100, 2_048, 5_000] {
            let mut source = opened(n);
            source.set_offset_and_window_size(offset as u64, 64);
            for i in 0..4 {
                let expect = reference[offset + i];
                let w = &source.window;
                assert!((w.bass[i] - expect.bass).abs() < 1e-4, "bass at {offset}+{i}");
                assert!((w.mid[i] - expect.mid).abs() < 1e-4, "mid at {offset}+{i}");
                assert!((w.high[i] - expect.high).abs() < 1e-4, "high at {offset}+{i}");
            }
        }
    }

    #[test]
    fn rebuilds_only_on_real_changes() {
        let (left, right) = signal(3_000);
        let reads = Arc::new(AtomicUsize::new(0));
        let mut source = FileSource::new();
        source.open_reader(Box::new(CountingReader {
            inner: DecodedFile::from_planar(left, right, 48_000),
            reads: reads.clone(),
        }));
        let count = || reads.load(Ordering::Relaxed);

        // every rebuild reads the lead-in and then the window
        assert_eq!(count(), 2);
        source.set_offset_and_window_size(700, 128);
        assert_eq!(count(), 4);
        let before = source.range(0, 128);

        source.set_offset_and_window_size(700, 128);
        source.set_offset(700);
        source.set_window_size(128);
        assert_eq!(count(), 4);
        assert_eq!(source.range(0, 128), before);

        source.set_offset(701);
        assert_eq!(count(), 6);
        source.set_crossovers(300.0, 3_000.0);
        assert_eq!(count(), 8);
        source.set_crossovers(300.0, 3_000.0);
        assert_eq!(count(), 8);
    }

    #[test]
    fn closing_clears_to_silence() {
        let mut source = opened(2_000);
        source.set_offset_and_window_size(0, 500);
        assert_ne!(source.range(0, 500), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));

        source.close_file();
        assert_eq!(source.state(), FileSourceState::Closed);
        assert_eq!(source.range(0, 500), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
        assert_eq!(source.range_size(), 500);
    }

    #[test]
    fn failed_open_leaves_source_closed() {
        let mut source = opened(1_000);
        source.set_window_size(10);
        assert!(source.open_file("/no/such/file.flac").is_err());
        assert_eq!(source.state(), FileSourceState::Closed);
        assert_eq!(source.range(0, 10), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
    }

    #[test]
    fn window_past_end_reads_silence() {
        let mut source = opened(1_000);
        source.set_offset_and_window_size(5_000, 32);
        assert_eq!(source.range(0, 32), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
    }

    #[test]
    fn largest_offset_reads_silence() {
        let mut source = opened(1_000);
        source.set_offset_and_window_size(u64::MAX, 64);
        assert_eq!(source.range(0, 64), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
        source.set_offset(u64::MAX - 1);
        assert_eq!(source.range(0, 64), ScopePoint::silent(DEFAULT_SCOPE_COLOUR));
    }

    #[test]
    fn gain_in_decibels() {
        let mut source = FileSource::new();
        source.set_gain_db(-6.0206);
        assert!((source.gain() - 0.5).abs() < 1e-4);
    }
}
