// src/scope/reader.rs

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

/// Random access to a stereo pair of decoded channels.
pub trait SampleReader: Send {
    fn sample_rate(&self) -> u32;
    fn length_frames(&self) -> u64;

    /// Fill `left` and `right` with the frames starting at `start_frame`.
    /// Anything before the first frame or past the last one reads as
    /// silence, so `start_frame` may be negative.
    fn read(&self, left: &mut [f32], right: &mut [f32], start_frame: i64);
}

/// A whole file decoded into memory. Mono files are mirrored into both
/// channels; anything past the second channel is dropped.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: u32,
}

impl DecodedFile {
    pub fn from_planar(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        let (mut left, mut right) = (left, right);
        left.truncate(frames);
        right.truncate(frames);
        Self {
            left,
            right,
            sample_rate,
        }
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            right: samples.clone(),
            left: samples,
            sample_rate,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("no decoder recognises {}", path.display()))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow!("no default audio track"))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let mut decoder = get_codecs().make(&codec_params, &DecoderOptions::default())?;

        let mut sample_rate = codec_params.sample_rate;
        let mut left = Vec::new();
        let mut right = Vec::new();
        if let Some(n_frames) = codec_params.n_frames {
            let hint = usize::try_from(n_frames).unwrap_or(0);
            left.reserve(hint);
            right.reserve(hint);
        }
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e).context("reading packet"),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(e) => return Err(e).context("decoding packet"),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            if channels == 0 || decoded.frames() == 0 {
                continue;
            }
            sample_rate.get_or_insert(spec.rate);

            let needs_alloc = sample_buf
                .as_ref()
                .is_none_or(|b| b.capacity() < decoded.capacity());
            if needs_alloc {
                sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks_exact(channels) {
                left.push(frame[0]);
                right.push(if channels > 1 { frame[1] } else { frame[0] });
            }
        }

        let sample_rate = sample_rate.ok_or_else(|| anyhow!("unknown sample rate"))?;
        info!(
            "decoded {}: {} frames at {} Hz",
            path.display(),
            left.len(),
            sample_rate
        );
        Ok(Self {
            left,
            right,
            sample_rate,
        })
    }
}

impl SampleReader for DecodedFile {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn length_frames(&self) -> u64 {
        self.left.len() as u64
    }

    fn read(&self, left: &mut [f32], right: &mut [f32], start_frame: i64) {
        copy_with_silence(&self.left, left, start_frame);
        copy_with_silence(&self.right, right, start_frame);
    }
}

fn copy_with_silence(src: &[f32], dst: &mut [f32], start_frame: i64) {
    dst.fill(0.0);
    let len = dst.len() as i64;
    let src_len = src.len() as i64;

    let from = start_frame.max(0);
    let to = start_frame.saturating_add(len).min(src_len);
    if from >= to {
        return;
    }
    let dst_at = (from - start_frame) as usize;
    let n = (to - from) as usize;
    dst[dst_at..dst_at + n].copy_from_slice(&src[from as usize..to as usize]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 + 1.0).collect()
    }

    #[test]
    fn reads_inside_the_file() {
        let file = DecodedFile::from_mono(ramp(10), 44_100);
        let (mut l, mut r) = (vec![9.0; 3], vec![9.0; 3]);
        file.read(&mut l, &mut r, 4);
        assert_eq!(l, vec![5.0, 6.0, 7.0]);
        assert_eq!(r, l);
    }

    #[test]
    fn pads_before_start_and_after_end() {
        let file = DecodedFile::from_planar(ramp(5), vec![-1.0; 5], 8_000);
        let (mut l, mut r) = (vec![9.0; 4], vec![9.0; 4]);
        file.read(&mut l, &mut r, -2);
        assert_eq!(l, vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(r, vec![0.0, 0.0, -1.0, -1.0]);

        file.read(&mut l, &mut r, 3);
        assert_eq!(l, vec![4.0, 5.0, 0.0, 0.0]);

        file.read(&mut l, &mut r, 50);
        assert_eq!(l, vec![0.0; 4]);
        file.read(&mut l, &mut r, -50);
        assert_eq!(r, vec![0.0; 4]);
    }

    #[test]
    fn extreme_start_frames_read_silence() {
        let file = DecodedFile::from_mono(ramp(5), 8_000);
        let (mut l, mut r) = (vec![9.0; 4], vec![9.0; 4]);
        file.read(&mut l, &mut r, i64::MAX);
        assert_eq!(l, vec![0.0; 4]);
        file.read(&mut l, &mut r, i64::MAX - 2);
        assert_eq!(r, vec![0.0; 4]);
        file.read(&mut l, &mut r, i64::MIN);
        assert_eq!(l, vec![0.0; 4]);
    }

    #[test]
    fn planar_lengths_are_matched() {
        let file = DecodedFile::from_planar(ramp(7), ramp(4), 48_000);
        assert_eq!(file.length_frames(), 4);
        assert_eq!(file.sample_rate(), 48_000);
    }

    #[test]
    fn missing_file_fails() {
        assert!(DecodedFile::open("/definitely/not/here.wav").is_err());
    }
}
