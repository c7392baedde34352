// WAV file capture backend
//
// Replays a recording through the same path as a live microphone so that a
// field recording can be re-measured offline.

use std::path::{Path, PathBuf};

use super::capture::{AudioCapture, CaptureConstraints, CaptureStream, StreamStatus};
use crate::error::AudioError;

pub struct WavCapture {
    path: PathBuf,
    block_size: usize,
}

impl WavCapture {
    pub fn new(path: impl Into<PathBuf>, block_size: usize) -> Self {
        Self {
            path: path.into(),
            block_size: block_size.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioCapture for WavCapture {
    fn acquire(
        &self,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AudioError> {
        let (samples, sample_rate) = read_mono(&self.path)?;
        tracing::debug!(
            "[WavCapture] Opened {} ({} samples @ {} Hz)",
            self.path.display(),
            samples.len(),
            sample_rate
        );
        Ok(Box::new(WavStream {
            samples,
            sample_rate,
            position: 0,
            block_size: self.block_size,
        }))
    }

    fn name(&self) -> &'static str {
        "wav"
    }
}

struct WavStream {
    samples: Vec<f32>,
    sample_rate: u32,
    position: usize,
    block_size: usize,
}

impl CaptureStream for WavStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_available(
        &mut self,
        sink: &mut dyn FnMut(&[f32]),
    ) -> Result<StreamStatus, AudioError> {
        for block in self.samples[self.position..].chunks(self.block_size) {
            sink(block);
        }
        self.position = self.samples.len();
        Ok(StreamStatus::Ended)
    }
}

fn map_hound_error(path: &Path, err: hound::Error) -> AudioError {
    match err {
        hound::Error::IoError(io) => AudioError::from(io),
        hound::Error::Unsupported => AudioError::UnsupportedFormat {
            format: path.display().to_string(),
        },
        other => AudioError::StreamOpenFailed {
            reason: format!("{}: {other}", path.display()),
        },
    }
}

/// Decode a WAV file to mono f32 in [-1, 1], keeping the first channel
fn read_mono(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| map_hound_error(path, err))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| map_hound_error(path, err))?,
        hound::SampleFormat::Int => {
            let scale = match spec.bits_per_sample {
                bits @ 8..=32 => (1i64 << (bits - 1)) as f32,
                bits => {
                    return Err(AudioError::UnsupportedFormat {
                        format: format!("{bits}-bit PCM"),
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / scale))
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|err| map_hound_error(path, err))?
        }
    };

    let mono = if channels == 1 {
        samples
    } else {
        samples.chunks(channels).map(|frame| frame[0]).collect()
    };
    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_reads_blocks_and_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 1, &[16384; 10]);

        let capture = WavCapture::new(&path, 4);
        let mut stream = capture.acquire(&CaptureConstraints::RAW).unwrap();
        assert_eq!(stream.sample_rate(), 8000);

        let mut sizes = Vec::new();
        let mut first = None;
        let status = stream
            .read_available(&mut |block| {
                first.get_or_insert(block[0]);
                sizes.push(block.len());
            })
            .unwrap();

        assert_eq!(status, StreamStatus::Ended);
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!((first.unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, &[1000, -32768, 1000, -32768]);

        let (mono, _) = read_mono(&path).unwrap();
        assert_eq!(mono.len(), 2);
        assert!(mono.iter().all(|&s| s > 0.0));
    }

    #[test]
    fn test_missing_file_is_device_unavailable() {
        let capture = WavCapture::new("/nonexistent/recording.wav", 1024);
        let result = capture.acquire(&CaptureConstraints::RAW);
        assert!(matches!(result, Err(AudioError::DeviceUnavailable)));
    }
}
