// Device sink built on cpal
// The mixer thread pushes interleaved f32 into a ring; the device callback drains it

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use ringbuf::{HeapRb, traits::{Consumer, Producer, Split}};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::AudioError;

/// About a quarter second of stereo at 48 kHz
const RING_CAPACITY: usize = 24_000;

/// State the device callback reads without taking a lock
struct CallbackShared {
    gain: AtomicU32,
    flush: AtomicBool,
    starved: AtomicU64,
}

impl CallbackShared {
    fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

/// Owns the device stream. The stream is not `Send` on every platform, so a
/// sink stays on the thread that opened it.
pub struct DeviceSink {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
    shared: Arc<CallbackShared>,
    sample_rate: u32,
    channels: u16,
}

impl DeviceSink {
    /// Open the default output device at its preferred configuration
    pub fn open_default() -> Result<Self, AudioError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| AudioError::Output("no output device available".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("no default output config: {}", e)))?;

        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let (producer, consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();
        let shared = Arc::new(CallbackShared {
            gain: AtomicU32::new(1.0f32.to_bits()),
            flush: AtomicBool::new(false),
            starved: AtomicU64::new(0),
        });

        let stream = match format {
            SampleFormat::F32 => open_stream::<f32>(&device, &config, consumer, shared.clone())?,
            SampleFormat::I16 => open_stream::<i16>(&device, &config, consumer, shared.clone())?,
            SampleFormat::U16 => open_stream::<u16>(&device, &config, consumer, shared.clone())?,
            other => {
                return Err(AudioError::Output(format!("unsupported sample format: {:?}", other)))
            }
        };
        stream
            .play()
            .map_err(|e| AudioError::Output(format!("failed to start stream: {}", e)))?;

        debug!(rate = config.sample_rate.0, channels = config.channels, ?format, "output device opened");
        Ok(Self {
            _stream: stream,
            producer,
            shared,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        })
    }

    /// Queue as many samples as fit; returns how many were taken
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Drop everything queued at the next device callback
    pub fn flush(&self) {
        self.shared.flush.store(true, Ordering::SeqCst);
    }

    pub fn set_gain(&self, gain: f32) {
        self.shared
            .gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    /// Callbacks that ran out of samples so far
    pub fn starved_callbacks(&self) -> u64 {
        self.shared.starved.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn open_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: ringbuf::HeapCons<f32>,
    shared: Arc<CallbackShared>,
) -> Result<Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if shared.flush.swap(false, Ordering::SeqCst) {
                    consumer.clear();
                }
                let gain = shared.gain();
                let mut short = false;
                for out in data.iter_mut() {
                    let value = match consumer.try_pop() {
                        Some(v) => v * gain,
                        None => {
                            short = true;
                            0.0
                        }
                    };
                    *out = T::from_sample(value);
                }
                if short {
                    shared.starved.fetch_add(1, Ordering::Relaxed);
                }
            },
            |err| error!(error = %err, "audio output stream error"),
            None,
        )
        .map_err(|e| AudioError::Output(format!("failed to build output stream: {}", e)))
}
