use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Audio collaborator driven by the sound timer. The timer tick calls
/// `start` while the sound timer is nonzero and `stop` once it reaches zero;
/// both are called every tick, so implementations must be idempotent.
pub trait Beep: Send {
    /// Also called on the tick that takes the sound timer from 1 to 0, so the
    /// tone lasts one tick past the last nonzero value. `stop` follows on the
    /// next tick.
    fn start(&mut self);
    fn stop(&mut self);
    /// Releases device resources. Called once from `Emulator::cleanup`.
    fn cleanup(&mut self) {
        self.stop();
    }
}

/// Silence.
#[derive(Debug, Default)]
pub struct NoBeep;

impl Beep for NoBeep {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

/// Shared on/off switch. The emulator side flips it; an audio callback on
/// another thread reads it.
#[derive(Debug, Clone, Default)]
pub struct ToneGate {
    on: Arc<AtomicBool>,
}

impl ToneGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }
}

impl Beep for ToneGate {
    fn start(&mut self) {
        self.on.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        self.on.store(false, Ordering::Relaxed);
    }
}

#[cfg(feature = "host")]
pub use self::tone::Tone;

#[cfg(feature = "host")]
mod tone {
    use std::error::Error;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SizedSample};

    use super::ToneGate;

    const TONE_HZ: f32 = 440.0;

    /// A 440 Hz sine on the default output device, audible only
    /// while its gate is on. The stream stays on the thread that built it.
    pub struct Tone {
        _stream: cpal::Stream,
    }

    impl Tone {
        pub fn new(gate: ToneGate) -> Result<Self, Box<dyn Error>> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no output device available")?;
            let supported_config = device
                .supported_output_configs()?
                .next()
                .ok_or("no supported output config")?
                .with_max_sample_rate();
            let format = supported_config.sample_format();
            let config: cpal::StreamConfig = supported_config.into();

            let stream = match format {
                cpal::SampleFormat::I8 => run::<i8>(&device, &config, gate),
                cpal::SampleFormat::I16 => run::<i16>(&device, &config, gate),
                cpal::SampleFormat::I32 => run::<i32>(&device, &config, gate),
                cpal::SampleFormat::I64 => run::<i64>(&device, &config, gate),
                cpal::SampleFormat::U8 => run::<u8>(&device, &config, gate),
                cpal::SampleFormat::U16 => run::<u16>(&device, &config, gate),
                cpal::SampleFormat::U32 => run::<u32>(&device, &config, gate),
                cpal::SampleFormat::U64 => run::<u64>(&device, &config, gate),
                cpal::SampleFormat::F32 => run::<f32>(&device, &config, gate),
                cpal::SampleFormat::F64 => run::<f64>(&device, &config, gate),
                sample_format => {
                    return Err(format!("unsupported sample format '{sample_format}'").into())
                }
            }?;
            log::info!(
                "audio: {} Hz, {} channel(s), {:?}",
                config.sample_rate.0,
                config.channels,
                format
            );
            Ok(Self { _stream: stream })
        }
    }

    fn run<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        gate: ToneGate,
    ) -> Result<cpal::Stream, Box<dyn Error>>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        let mut sample_clock = 0f32;
        let mut next_value = move || {
            if !gate.is_on() {
                return 0.0;
            }
            sample_clock = (sample_clock + 1.0) % sample_rate;
            (sample_clock * TONE_HZ * 2.0 * std::f32::consts::PI / sample_rate).sin() * 0.25
        };

        let err_fn = |err| log::error!("an error occurred on stream: {}", err);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                write_data(data, channels, &mut next_value)
            },
            err_fn,
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }

    fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
    where
        T: Sample + FromSample<f32>,
    {
        for frame in output.chunks_mut(channels) {
            let value: T = T::from_sample(next_sample());
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}
