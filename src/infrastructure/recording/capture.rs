//! Cross-platform audio capture using cpal
//!
//! Captures the selected microphone and, when requested, a loopback
//! stream of the selected output device, mixing both into one mono
//! track at stop time.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::time::Duration as TokioDuration;
use tracing::warn;

use super::flac::{resample, TARGET_SAMPLE_RATE};
use crate::application::ports::{CaptureError, CaptureRecorder};
use crate::domain::audio::CapturedAudio;
use crate::domain::device::Device;

/// Capture adapter backed by cpal.
///
/// Streams are managed on a dedicated thread because cpal::Stream is not
/// Send; the struct only holds the shared buffers and flags.
pub struct CpalCapture {
    /// Microphone samples (mono, i16, at device sample rate)
    mic_buffer: Arc<StdMutex<Vec<i16>>>,
    /// Loopback samples (mono, i16, at loopback device sample rate)
    loop_buffer: Arc<StdMutex<Vec<i16>>>,
    mic_rate: Arc<AtomicU32>,
    loop_rate: Arc<AtomicU32>,
    is_recording: Arc<AtomicBool>,
    start_time_ms: Arc<AtomicU64>,
    elapsed_ms: Arc<AtomicU64>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self {
            mic_buffer: Arc::new(StdMutex::new(Vec::new())),
            loop_buffer: Arc::new(StdMutex::new(Vec::new())),
            mic_rate: Arc::new(AtomicU32::new(0)),
            loop_rate: Arc::new(AtomicU32::new(0)),
            is_recording: Arc::new(AtomicBool::new(false)),
            start_time_ms: Arc::new(AtomicU64::new(0)),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Find an input device by name
    fn find_input_device(name: &str) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to list devices: {}", e)))?;
        for device in devices {
            if device.name().map(|n| n == name).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(CaptureError::NoDevice)
    }

    /// Find a loopback source by name.
    ///
    /// Monitor sources show up as input devices on PulseAudio/PipeWire;
    /// WASAPI exposes loopback by opening an input stream on the output
    /// device itself. Both lists are searched.
    fn find_loopback_device(name: &str) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if device.name().map(|n| n == name).unwrap_or(false) {
                    return Ok(device);
                }
            }
        }
        let devices = host
            .output_devices()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to list devices: {}", e)))?;
        for device in devices {
            if device.name().map(|n| n == name).unwrap_or(false) {
                return Ok(device);
            }
        }
        Err(CaptureError::NoDevice)
    }

    /// Pick a suitable input configuration, preferring mono and rates that
    /// include 16kHz
    fn get_input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_target = config.min_sample_rate().0 <= TARGET_SAMPLE_RATE
                && config.max_sample_rate().0 >= TARGET_SAMPLE_RATE;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate =
                        includes_target && current.min_sample_rate().0 > TARGET_SAMPLE_RATE;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range = best_config
            .ok_or_else(|| CaptureError::StartFailed("No suitable config found".into()))?;

        let sample_rate = if config_range.min_sample_rate().0 <= TARGET_SAMPLE_RATE
            && config_range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        {
            SampleRate(TARGET_SAMPLE_RATE)
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

    /// Mix stereo to mono
    fn stereo_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels == 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }

    /// Open a capture stream that appends mono samples into `buffer` while
    /// `active` holds
    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        buffer: Arc<StdMutex<Vec<i16>>>,
        active: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, CaptureError> {
        let channels = config.channels;
        let stream = match sample_format {
            SampleFormat::I16 => device
                .build_input_stream(
                    config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if active.load(Ordering::SeqCst) {
                            let mono = CpalCapture::stereo_to_mono(data, channels);
                            if let Ok(mut buffer) = buffer.lock() {
                                buffer.extend_from_slice(&mono);
                            }
                        }
                    },
                    |err| warn!(error = %err, "Audio stream error"),
                    None,
                )
                .map_err(|e| CaptureError::StartFailed(e.to_string()))?,

            SampleFormat::F32 => device
                .build_input_stream(
                    config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if active.load(Ordering::SeqCst) {
                            let i16_data: Vec<i16> =
                                data.iter().map(|&s| (s * 32767.0) as i16).collect();
                            let mono = CpalCapture::stereo_to_mono(&i16_data, channels);
                            if let Ok(mut buffer) = buffer.lock() {
                                buffer.extend_from_slice(&mono);
                            }
                        }
                    },
                    |err| warn!(error = %err, "Audio stream error"),
                    None,
                )
                .map_err(|e| CaptureError::StartFailed(e.to_string()))?,

            _ => return Err(CaptureError::StartFailed("Unsupported sample format".into())),
        };
        Ok(stream)
    }

    /// Combine the microphone and loopback tracks into one mono track.
    ///
    /// The loopback track is resampled to the microphone rate, then the
    /// two are summed with saturation; the longer track's tail is kept.
    fn mix_tracks(
        mic: Vec<i16>,
        mic_rate: u32,
        loopback: Vec<i16>,
        loop_rate: u32,
    ) -> Result<CapturedAudio, CaptureError> {
        if loopback.is_empty() {
            return Ok(CapturedAudio {
                samples: mic,
                sample_rate: mic_rate,
            });
        }
        if mic.is_empty() {
            return Ok(CapturedAudio {
                samples: loopback,
                sample_rate: loop_rate,
            });
        }

        let loopback = resample(&loopback, loop_rate, mic_rate)
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        let len = mic.len().max(loopback.len());
        let mut mixed = Vec::with_capacity(len);
        for i in 0..len {
            let a = mic.get(i).copied().unwrap_or(0) as i32;
            let b = loopback.get(i).copied().unwrap_or(0) as i32;
            mixed.push((a + b).clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }

        Ok(CapturedAudio {
            samples: mixed,
            sample_rate: mic_rate,
        })
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureRecorder for CpalCapture {
    async fn start(&self, input: &Device, output: Option<&Device>) -> Result<(), CaptureError> {
        if self.is_recording.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRecording);
        }

        self.mic_buffer.lock().unwrap().clear();
        self.loop_buffer.lock().unwrap().clear();
        self.elapsed_ms.store(0, Ordering::SeqCst);
        self.is_recording.store(true, Ordering::SeqCst);
        self.start_time_ms.store(Self::now_ms(), Ordering::SeqCst);

        let mic_name = input.id.as_str().to_string();
        let loop_name = output.map(|d| d.id.as_str().to_string());

        let mic_buffer = Arc::clone(&self.mic_buffer);
        let loop_buffer = Arc::clone(&self.loop_buffer);
        let mic_rate = Arc::clone(&self.mic_rate);
        let loop_rate = Arc::clone(&self.loop_rate);
        let is_recording = Arc::clone(&self.is_recording);
        let start_time_ms = Arc::clone(&self.start_time_ms);
        let elapsed_ms = Arc::clone(&self.elapsed_ms);

        // Setup result comes back over a channel; the thread then owns the
        // streams until the flag drops.
        let (setup_tx, setup_rx) = mpsc::channel::<Result<(), CaptureError>>();

        std::thread::spawn(move || {
            let setup = (|| {
                let mic_device = CpalCapture::find_input_device(&mic_name)?;
                let (mic_config, mic_format) = CpalCapture::get_input_config(&mic_device)?;
                mic_rate.store(mic_config.sample_rate.0, Ordering::SeqCst);

                let mic_stream = CpalCapture::build_stream(
                    &mic_device,
                    &mic_config,
                    mic_format,
                    Arc::clone(&mic_buffer),
                    Arc::clone(&is_recording),
                )?;

                let loop_stream = match &loop_name {
                    Some(name) => {
                        let device = CpalCapture::find_loopback_device(name)?;
                        let (config, format) = CpalCapture::get_input_config(&device)?;
                        loop_rate.store(config.sample_rate.0, Ordering::SeqCst);
                        Some(CpalCapture::build_stream(
                            &device,
                            &config,
                            format,
                            Arc::clone(&loop_buffer),
                            Arc::clone(&is_recording),
                        )?)
                    }
                    None => None,
                };

                mic_stream
                    .play()
                    .map_err(|e| CaptureError::StartFailed(e.to_string()))?;
                if let Some(stream) = &loop_stream {
                    stream
                        .play()
                        .map_err(|e| CaptureError::StartFailed(e.to_string()))?;
                }
                Ok((mic_stream, loop_stream))
            })();

            let streams = match setup {
                Ok(streams) => {
                    let _ = setup_tx.send(Ok(()));
                    streams
                }
                Err(e) => {
                    is_recording.store(false, Ordering::SeqCst);
                    let _ = setup_tx.send(Err(e));
                    return;
                }
            };

            while is_recording.load(Ordering::SeqCst) {
                let start = start_time_ms.load(Ordering::SeqCst);
                elapsed_ms.store(
                    CpalCapture::now_ms().saturating_sub(start),
                    Ordering::SeqCst,
                );
                std::thread::sleep(std::time::Duration::from_millis(100));
            }

            drop(streams);
        });

        let setup = tokio::task::spawn_blocking(move || {
            setup_rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .unwrap_or_else(|_| Err(CaptureError::StartFailed("Capture thread stalled".into())))
        })
        .await
        .map_err(|e| CaptureError::StartFailed(format!("Task join error: {}", e)))?;

        if let Err(e) = setup {
            self.is_recording.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<CapturedAudio, CaptureError> {
        if !self.is_recording.load(Ordering::SeqCst) {
            return Err(CaptureError::NotRecording);
        }

        self.is_recording.store(false, Ordering::SeqCst);

        // Let the capture thread drop its streams
        tokio::time::sleep(TokioDuration::from_millis(100)).await;

        let mic_rate = self.mic_rate.load(Ordering::SeqCst);
        if mic_rate == 0 {
            return Err(CaptureError::CaptureFailed("Sample rate not set".into()));
        }
        let loop_rate = self.loop_rate.load(Ordering::SeqCst);

        let mic = std::mem::take(&mut *self.mic_buffer.lock().unwrap());
        let loopback = std::mem::take(&mut *self.loop_buffer.lock().unwrap());

        if mic.is_empty() && loopback.is_empty() {
            return Err(CaptureError::EmptyRecording);
        }

        // Resampling is CPU-bound
        tokio::task::spawn_blocking(move || Self::mix_tracks(mic, mic_rate, loopback, loop_rate))
            .await
            .map_err(|e| CaptureError::CaptureFailed(format!("Mix task error: {}", e)))?
    }

    async fn cancel(&self) -> Result<(), CaptureError> {
        self.is_recording.store(false, Ordering::SeqCst);

        tokio::time::sleep(TokioDuration::from_millis(100)).await;

        self.mic_buffer.lock().unwrap().clear();
        self.loop_buffer.lock().unwrap().clear();
        self.elapsed_ms.store(0, Ordering::SeqCst);

        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }
}
