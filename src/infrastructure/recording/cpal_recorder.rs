//! Microphone capture using cpal
//!
//! The cpal stream is not `Send`, so each capture runs on its own thread.
//! The audio callback appends mono i16 samples to a shared buffer and
//! publishes the RMS level of every block through an atomic, which is what
//! the recorder's metering timer reads. On finish the buffer is resampled to
//! the preset rate and written out as FLAC.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use rubato::{FftFixedIn, Resampler};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::flac_encoder::encode_to_flac;
use crate::application::ports::{AudioInput, CaptureHandle, RecordingError};
use crate::domain::recording::{rms_dbfs, RecordingPreset};

/// How often the capture thread checks for a stop request
const STOP_POLL: StdDuration = StdDuration::from_millis(20);

/// Opens the default input device and records to `output_dir`
pub struct CpalAudioInput {
    output_dir: PathBuf,
}

impl CpalAudioInput {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Get the default input device
    fn get_input_device() -> Result<cpal::Device, RecordingError> {
        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| RecordingError::DeviceUnavailable("no default input device".into()))
    }

    /// Get an input configuration close to `target_rate`
    fn get_input_config(
        device: &cpal::Device,
        target_rate: u32,
    ) -> Result<(StreamConfig, SampleFormat), RecordingError> {
        let supported_configs = device.supported_input_configs().map_err(|e| {
            RecordingError::DeviceUnavailable(format!("Failed to get configs: {}", e))
        })?;

        // Prefer mono, and a range that includes the target rate
        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_target = config.min_sample_rate().0 <= target_rate
                && config.max_sample_rate().0 >= target_rate;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let current_includes = current.min_sample_rate().0 <= target_rate
                        && current.max_sample_rate().0 >= target_rate;
                    fewer_channels || (includes_target && !current_includes)
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config
            .ok_or_else(|| RecordingError::DeviceUnavailable("No suitable config found".into()))?;

        let sample_rate = if config_range.min_sample_rate().0 <= target_rate
            && config_range.max_sample_rate().0 >= target_rate
        {
            SampleRate(target_rate)
        } else {
            config_range.min_sample_rate()
        };

        let sample_format = config_range.sample_format();
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    fn next_path(&self, preset: &RecordingPreset) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.output_dir
            .join(format!("voice-{}.{}", millis, preset.extension()))
    }
}

#[async_trait]
impl AudioInput for CpalAudioInput {
    async fn begin(
        &self,
        preset: &RecordingPreset,
    ) -> Result<Box<dyn CaptureHandle>, RecordingError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| RecordingError::TransientIo(e.to_string()))?;

        let shared = Arc::new(CaptureShared::new());
        let (ready_tx, ready_rx) = oneshot::channel();
        let target_rate = preset.sample_rate();

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("voicenote-capture".into())
            .spawn(move || run_capture(thread_shared, target_rate, ready_tx))
            .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))?;

        let device_rate = match ready_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                drop(thread);
                return Err(e);
            }
            Err(_) => {
                return Err(RecordingError::DeviceUnavailable(
                    "capture thread exited before starting".into(),
                ))
            }
        };

        let path = self.next_path(preset);
        debug!(device_rate, target_rate, path = %path.display(), "capture started");

        Ok(Box::new(CpalCapture {
            shared,
            thread: StdMutex::new(Some(thread)),
            device_rate,
            target_rate,
            path,
        }))
    }
}

/// State shared between the capture thread and its handle
struct CaptureShared {
    /// Recorded audio samples (mono, i16, at device sample rate)
    buffer: StdMutex<Vec<i16>>,
    running: AtomicBool,
    paused: AtomicBool,
    /// Latest block level in dBFS as f32 bits; NaN until the first block
    level_bits: AtomicU32,
}

impl CaptureShared {
    fn new() -> Self {
        Self {
            buffer: StdMutex::new(Vec::new()),
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            level_bits: AtomicU32::new(f32::NAN.to_bits()),
        }
    }

    fn push_block(&self, mono: &[i16]) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        let block: Vec<f32> = mono.iter().map(|&s| s as f32 / 32768.0).collect();
        if let Some(db) = rms_dbfs(&block) {
            self.level_bits.store(db.to_bits(), Ordering::SeqCst);
        }
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(mono);
    }

    /// Level of the latest block, consumed so a stale level is never sampled twice
    fn take_level(&self) -> Option<f32> {
        let level = f32::from_bits(self.level_bits.swap(f32::NAN.to_bits(), Ordering::SeqCst));
        level.is_finite().then_some(level)
    }

    fn take_samples(&self) -> Vec<i16> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Body of the capture thread; reports the device rate once the stream runs
fn run_capture(
    shared: Arc<CaptureShared>,
    target_rate: u32,
    ready: oneshot::Sender<Result<u32, RecordingError>>,
) {
    let stream = match open_stream(&shared, target_rate) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let (stream, device_rate) = stream;

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(RecordingError::DeviceUnavailable(e.to_string())));
        return;
    }
    if ready.send(Ok(device_rate)).is_err() {
        return;
    }

    while shared.running.load(Ordering::SeqCst) {
        std::thread::sleep(STOP_POLL);
    }

    drop(stream);
}

fn open_stream(
    shared: &Arc<CaptureShared>,
    target_rate: u32,
) -> Result<(cpal::Stream, u32), RecordingError> {
    let device = CpalAudioInput::get_input_device()?;
    let (config, sample_format) = CpalAudioInput::get_input_config(&device, target_rate)?;
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let on_error = |err: cpal::StreamError| error!(error = %err, "audio input stream error");

    let stream = match sample_format {
        SampleFormat::I16 => {
            let shared = Arc::clone(shared);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    shared.push_block(&downmix(data, channels));
                },
                on_error,
                None,
            )
        }
        SampleFormat::F32 => {
            let shared = Arc::clone(shared);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let i16_data: Vec<i16> = data.iter().map(|&s| (s * 32767.0) as i16).collect();
                    shared.push_block(&downmix(&i16_data, channels));
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(RecordingError::DeviceUnavailable(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| RecordingError::DeviceUnavailable(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Mix interleaved channels down to mono
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / chunk.len() as i32) as i16
        })
        .collect()
}

/// Resample mono PCM from `source_rate` to `target_rate`
fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Result<Vec<i16>, RecordingError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let samples_f32: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples_f32.len() as f64 * ratio).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        1024, // Chunk size
        2,    // Sub-chunks
        1,    // Mono
    )
    .map_err(|e| RecordingError::EncodingFailed(format!("Resampler init failed: {}", e)))?;

    let mut output = Vec::with_capacity(output_len);
    let mut input_pos = 0;

    while input_pos < samples_f32.len() {
        let frames_needed = resampler.input_frames_next();
        let end_pos = (input_pos + frames_needed).min(samples_f32.len());

        // Last chunk is zero-padded
        let mut chunk = samples_f32[input_pos..end_pos].to_vec();
        chunk.resize(frames_needed, 0.0);

        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| RecordingError::EncodingFailed(format!("Resampling failed: {}", e)))?;

        output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
        input_pos = end_pos;
    }

    output.truncate(output_len);

    Ok(output)
}

/// A running cpal capture
pub struct CpalCapture {
    shared: Arc<CaptureShared>,
    thread: StdMutex<Option<JoinHandle<()>>>,
    device_rate: u32,
    target_rate: u32,
    path: PathBuf,
}

impl CpalCapture {
    /// Stop the stream and wait for its thread
    async fn stop_thread(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if tokio::task::spawn_blocking(move || thread.join()).await.is_err() {
                warn!("capture thread did not shut down cleanly");
            }
        }
    }
}

#[async_trait]
impl CaptureHandle for CpalCapture {
    fn level_db(&self) -> Option<f32> {
        self.shared.take_level()
    }

    async fn pause(&self) -> Result<(), RecordingError> {
        self.shared.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<(), RecordingError> {
        self.shared.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn finish(&self) -> Result<String, RecordingError> {
        self.stop_thread().await;

        let samples = self.shared.take_samples();
        let (device_rate, target_rate) = (self.device_rate, self.target_rate);

        let encoded = tokio::task::spawn_blocking(move || {
            let resampled = resample(&samples, device_rate, target_rate)?;
            encode_to_flac(&resampled, target_rate)
                .map_err(|e| RecordingError::EncodingFailed(e.to_string()))
        })
        .await
        .map_err(|e| RecordingError::EncodingFailed(format!("Encode task error: {}", e)))??;

        tokio::fs::write(&self.path, &encoded)
            .await
            .map_err(|e| RecordingError::TransientIo(e.to_string()))?;

        debug!(path = %self.path.display(), bytes = encoded.len(), "recording written");
        Ok(self.path.to_string_lossy().into_owned())
    }

    async fn discard(&self) {
        self.stop_thread().await;
        self.shared.take_samples();
        // Nothing reaches disk before finish, but a previous attempt may have
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to delete discarded recording");
            }
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_single_channel() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(downmix(&mono, 1), mono);
    }

    #[test]
    fn downmix_two_channels() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(downmix(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![1i16, 2, 3];
        assert_eq!(resample(&samples, 16_000, 16_000).unwrap(), samples);
    }

    #[test]
    fn resample_halves_length() {
        let samples = vec![0i16; 32_000];
        let out = resample(&samples, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn paused_blocks_are_dropped() {
        let shared = CaptureShared::new();
        shared.push_block(&[1000, -1000]);
        shared.paused.store(true, Ordering::SeqCst);
        shared.push_block(&[1000, -1000]);
        assert_eq!(shared.take_samples().len(), 2);
    }

    #[test]
    fn level_is_published_per_block() {
        let shared = CaptureShared::new();
        assert!(f32::from_bits(shared.level_bits.load(Ordering::SeqCst)).is_nan());
        shared.push_block(&[i16::MAX, i16::MIN + 1]);
        let level = f32::from_bits(shared.level_bits.load(Ordering::SeqCst));
        assert!(level > -1.0 && level <= 0.1);
    }

    #[test]
    fn level_is_consumed_by_read() {
        let shared = CaptureShared::new();
        assert_eq!(shared.take_level(), None);
        shared.push_block(&[i16::MAX, i16::MIN + 1]);
        assert!(shared.take_level().is_some());
        assert_eq!(shared.take_level(), None);

        shared.push_block(&[1000, -1000]);
        assert!(shared.take_level().is_some());
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn can_capture_from_default_device() {
        let dir = tempfile::tempdir().unwrap();
        let input = CpalAudioInput::new(dir.path());
        let capture = input.begin(&RecordingPreset::LowQuality).await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(500)).await;
        let uri = capture.finish().await.unwrap();
        assert!(std::path::Path::new(&uri).exists());
    }
}
