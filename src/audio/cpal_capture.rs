// Live microphone capture through cpal
//
// The device callback only copies the first channel into the frame pool; the
// session thread drains the pool from `read_available`. Dropping the stream
// stops the device.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::buffer_pool::{FramePool, MeterSide, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_SIZE};
use super::capture::{AudioCapture, CaptureConstraints, CaptureStream, StreamStatus};
use crate::error::AudioError;

pub struct CpalCapture {
    device_name: Option<String>,
    buffer_count: usize,
    buffer_size: usize,
}

impl CpalCapture {
    /// Capture from the named input device, or the host default when `None`
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            buffer_count: DEFAULT_BUFFER_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_pool(mut self, buffer_count: usize, buffer_size: usize) -> Self {
        self.buffer_count = buffer_count.max(1);
        self.buffer_size = buffer_size.max(1);
        self
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device, AudioError> {
        let Some(wanted) = &self.device_name else {
            return host
                .default_input_device()
                .ok_or(AudioError::DeviceUnavailable);
        };

        let devices = host
            .input_devices()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to enumerate input devices: {e}"),
            })?;
        devices
            .into_iter()
            .find(|device| device.name().map(|n| &n == wanted).unwrap_or(false))
            .ok_or(AudioError::DeviceUnavailable)
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable,
        cpal::BuildStreamError::StreamConfigNotSupported => AudioError::UnsupportedFormat {
            format: "default input config".to_string(),
        },
        other => AudioError::StreamOpenFailed {
            reason: other.to_string(),
        },
    }
}

impl AudioCapture for CpalCapture {
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AudioError> {
        if !constraints.is_raw() {
            // cpal exposes unprocessed device input only
            tracing::warn!("[CpalCapture] Ignoring processing constraints {:?}", constraints);
        }

        let host = cpal::default_host();
        let device = self.find_device(&host)?;
        let config = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => AudioError::DeviceUnavailable,
            other => AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {other}"),
            },
        })?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?}", config.sample_format()),
            });
        }

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate.0;

        let (mut capture_side, meter_side) = FramePool::new(self.buffer_count, self.buffer_size);
        let failure = Arc::new(Mutex::new(None));
        let failure_slot = Arc::clone(&failure);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    capture_side.write_interleaved(data, channels);
                },
                move |err| {
                    tracing::error!("[CpalCapture] Input stream error: {}", err);
                    let error = match err {
                        cpal::StreamError::DeviceNotAvailable => AudioError::StreamRevoked,
                        other => AudioError::StreamFailure {
                            reason: other.to_string(),
                        },
                    };
                    if let Ok(mut slot) = failure_slot.lock() {
                        slot.get_or_insert(error);
                    }
                },
                None,
            )
            .map_err(map_build_error)?;

        stream.play().map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to start input stream: {e}"),
        })?;

        tracing::info!(
            "[CpalCapture] Capturing {} channel(s) @ {} Hz",
            channels,
            sample_rate
        );

        Ok(Box::new(CpalStream {
            _stream: stream,
            meter_side,
            sample_rate,
            failure,
            reported_drops: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

struct CpalStream {
    _stream: cpal::Stream,
    meter_side: MeterSide,
    sample_rate: u32,
    /// First error reported by the backend's error callback
    failure: Arc<Mutex<Option<AudioError>>>,
    reported_drops: u64,
}

impl CaptureStream for CpalStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_available(
        &mut self,
        sink: &mut dyn FnMut(&[f32]),
    ) -> Result<StreamStatus, AudioError> {
        self.meter_side.drain(|frame| sink(frame));

        let dropped = self.meter_side.dropped_samples();
        if dropped > self.reported_drops {
            tracing::warn!(
                "[CpalCapture] {} samples dropped (meter fell behind)",
                dropped - self.reported_drops
            );
            self.reported_drops = dropped;
        }

        let failure = match self.failure.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => Some(AudioError::StreamFailure {
                reason: "error slot poisoned".to_string(),
            }),
        };
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(StreamStatus::Active)
    }
}
