// src/audio.rs

use anyhow::{anyhow, bail, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{info, warn};

use crate::capture::{CaptureProcessor, DEFAULT_BLOCK_FRAMES};

/// The default input device and the format it will be opened with.
pub struct InputDevice {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl InputDevice {
    pub fn default_input() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        let supported_config = device.default_input_config()?;
        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        Ok(Self {
            device,
            config,
            sample_format,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

/// A running capture. Dropping it stops the device callback.
pub struct CaptureStream {
    _stream: Stream,
    sample_rate: u32,
    channels: usize,
}

impl CaptureStream {
    /// Prepares the processor for the device rate and hands it to the
    /// input callback.
    pub fn start(input: InputDevice, mut processor: CaptureProcessor) -> Result<Self> {
        let sample_rate = input.sample_rate();
        let channels = input.channels();
        processor.prepare(sample_rate as f32, DEFAULT_BLOCK_FRAMES);

        let stream = match input.sample_format {
            SampleFormat::F32 => build_stream(&input, processor, |s: f32| s)?,
            SampleFormat::I16 => {
                build_stream(&input, processor, |s: i16| s as f32 / i16::MAX as f32)?
            }
            SampleFormat::U16 => build_stream(&input, processor, |s: u16| {
                (s as f32 / u16::MAX as f32) * 2.0 - 1.0
            })?,
            other => bail!("Unsupported sample format: {:?}", other),
        };

        info!(
            "capturing from {} ({} ch @ {} Hz)",
            input.device.name().unwrap_or_else(|_| "unknown device".into()),
            channels,
            sample_rate
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

fn build_stream<T, F>(
    input: &InputDevice,
    mut processor: CaptureProcessor,
    convert: F,
) -> Result<Stream>
where
    T: SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let channels = input.channels();
    let err_fn = |err| warn!("Input stream error: {:?}", err);

    let stream = input.device.build_input_stream(
        &input.config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            processor.process_interleaved(data, channels, &convert);
        },
        err_fn,
        None,
    )?;

    stream.play()?;
    Ok(stream)
}
