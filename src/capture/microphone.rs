//! Microphone capture backend built on `cpal`.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on a
//! dedicated `mic-capture` thread and is controlled through channels.  The
//! thread batches callback samples and flushes one chunk per
//! [`CaptureProfile::chunk_interval`](super::CaptureProfile); finalization
//! wraps the collected 16-bit PCM into a WAV container with `hound`.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};

use super::backend::{CaptureBackend, CaptureError, CaptureProfile, CaptureStream, ClipEncoder};

// ---------------------------------------------------------------------------
// MicrophoneBackend
// ---------------------------------------------------------------------------

/// [`CaptureBackend`] using the system default input device.
#[derive(Debug, Default)]
pub struct MicrophoneBackend;

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn acquire(
        &self,
        profile: &CaptureProfile,
        tx: mpsc::Sender<Bytes>,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop);
        let thread_profile = profile.clone();
        let join = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_thread(thread_profile, tx, thread_stop, ready_tx))
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        // The thread reports either the negotiated format or the acquisition
        // error; either way nothing stays half-initialized behind it.
        let negotiated = ready_rx
            .await
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread exited early".into()))?;

        match negotiated {
            Ok((sample_rate, channels)) => {
                log::info!("capture: microphone acquired ({sample_rate} Hz, {channels} ch)");
                Ok(Box::new(MicStream {
                    stop,
                    join: Some(join),
                    sample_rate,
                    channels,
                }))
            }
            Err(e) => {
                let _ = join.join();
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

/// Owns the cpal stream for the whole session.
///
/// Exit paths: stop flag set, chunk receiver gone, or callback channel
/// disconnected — the stream is dropped (device released) on all of them.
fn capture_thread(
    profile: CaptureProfile,
    chunk_tx: mpsc::Sender<Bytes>,
    stop: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<(u32, u16), CaptureError>>,
) {
    let (sample_tx, sample_rx) = std::sync::mpsc::channel::<Vec<f32>>();

    let (stream, sample_rate, channels) = match build_stream(&profile, sample_tx) {
        Ok(built) => built,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        // `stream` drops on return, releasing the device.
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
        return;
    }

    if ready_tx.send(Ok((sample_rate, channels))).is_err() {
        return;
    }

    let mut pending: Vec<f32> = Vec::new();
    let mut last_flush = Instant::now();

    while !stop.load(Ordering::Acquire) {
        match sample_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(samples) => pending.extend(samples),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if last_flush.elapsed() >= profile.chunk_interval && !pending.is_empty() {
            if chunk_tx.blocking_send(pcm_chunk(&pending)).is_err() {
                break;
            }
            pending.clear();
            last_flush = Instant::now();
        }
    }

    // Final partial chunk, so the tail of the recording is not dropped.
    if !pending.is_empty() {
        let _ = chunk_tx.blocking_send(pcm_chunk(&pending));
    }

    drop(stream);
    log::debug!("capture: microphone thread exiting, device released");
}

/// Build the input stream, preferring the profile's nominal format and
/// falling back to the device default when the host rejects it.
fn build_stream(
    profile: &CaptureProfile,
    sample_tx: std::sync::mpsc::Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u32, u16), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no input device".into()))?;

    let nominal = cpal::StreamConfig {
        channels: profile.channels,
        sample_rate: cpal::SampleRate(profile.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    match open_stream(&device, &nominal, sample_tx.clone()) {
        Ok(stream) => Ok((stream, nominal.sample_rate.0, nominal.channels)),
        Err(nominal_err) => {
            let supported = device
                .default_input_config()
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
            let fallback: cpal::StreamConfig = supported.into();
            log::warn!(
                "capture: nominal format rejected ({nominal_err}), using device default \
                 ({} Hz, {} ch)",
                fallback.sample_rate.0,
                fallback.channels
            );
            let stream = open_stream(&device, &fallback, sample_tx)?;
            Ok((stream, fallback.sample_rate.0, fallback.channels))
        }
    }
}

fn open_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_tx: std::sync::mpsc::Sender<Vec<f32>>,
) -> Result<cpal::Stream, CaptureError> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Send errors mean the batching loop is gone; the stream is
                // about to be dropped anyway.
                let _ = sample_tx.send(data.to_vec());
            },
            |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
}

/// Convert one batch of `f32` samples to little-endian 16-bit PCM bytes.
fn pcm_chunk(samples: &[f32]) -> Bytes {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Bytes::from(out)
}

// ---------------------------------------------------------------------------
// MicStream
// ---------------------------------------------------------------------------

/// Guard over the capture thread.  Releasing (or dropping) stops the thread
/// and with it the device.
struct MicStream {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    sample_rate: u32,
    channels: u16,
}

impl MicStream {
    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl CaptureStream for MicStream {
    fn release(mut self: Box<Self>) -> Box<dyn ClipEncoder> {
        self.halt();
        Box::new(WavClipEncoder {
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

impl Drop for MicStream {
    fn drop(&mut self) {
        self.halt();
    }
}

// ---------------------------------------------------------------------------
// WavClipEncoder
// ---------------------------------------------------------------------------

/// Wraps collected 16-bit PCM chunks into a single WAV payload.
struct WavClipEncoder {
    sample_rate: u32,
    channels: u16,
}

impl ClipEncoder for WavClipEncoder {
    fn media_type(&self) -> &str {
        "audio/wav"
    }

    fn encode(&self, chunks: &[Bytes]) -> Result<Bytes, CaptureError> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;

            for chunk in chunks {
                for frame in chunk.chunks_exact(2) {
                    let sample = i16::from_le_bytes([frame[0], frame[1]]);
                    writer
                        .write_sample(sample)
                        .map_err(|e| CaptureError::Finalize(e.to_string()))?;
                }
            }

            writer
                .finalize()
                .map_err(|e| CaptureError::Finalize(e.to_string()))?;
        }

        Ok(Bytes::from(cursor.into_inner()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_chunk_converts_and_clamps() {
        let chunk = pcm_chunk(&[0.0, 1.0, -1.0, 2.0]);

        let samples: Vec<i16> = chunk
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], i16::MAX);
        // -1.0 and the clamped 2.0 hit the rails.
        assert_eq!(samples[2], -i16::MAX);
        assert_eq!(samples[3], i16::MAX);
    }

    #[test]
    fn encoder_round_trips_samples_through_hound() {
        let encoder = WavClipEncoder {
            sample_rate: 44_100,
            channels: 1,
        };
        let chunks = vec![pcm_chunk(&[0.0, 0.5]), pcm_chunk(&[-0.5])];

        let clip = encoder.encode(&chunks).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(clip.to_vec())).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0);
        assert!(samples[1] > 16_000);
        assert!(samples[2] < -16_000);
    }

    #[test]
    fn zero_chunks_encode_to_a_header_only_clip() {
        let encoder = WavClipEncoder {
            sample_rate: 44_100,
            channels: 1,
        };

        let clip = encoder.encode(&[]).unwrap();

        let reader = hound::WavReader::new(Cursor::new(clip.to_vec())).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn encoder_media_type_is_wav() {
        let encoder = WavClipEncoder {
            sample_rate: 44_100,
            channels: 1,
        };
        assert_eq!(encoder.media_type(), "audio/wav");
    }
}
