//! Audio device seam: chunked 16-bit mono capture.
//!
//! The listener only ever sees the [`AudioDevice`] / [`AudioStream`] pair, so
//! the real CPAL microphone and the scripted device used in tests are
//! interchangeable. A stream owns exclusive access to the underlying device;
//! dropping it releases the device on every exit path.

use crate::error::DeviceError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed capture format. 480 samples = 30ms at 16kHz, the frame size the
/// WebRTC gate expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub chunk_size: usize,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_size: 480,
        }
    }
}

/// An open capture stream. Blocking reads; `Drop` releases the device.
pub trait AudioStream: Send {
    fn format(&self) -> AudioFormat;

    /// Read the next chunk of samples. Blocks until a chunk is available.
    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError>;
}

/// A microphone that can be opened for one exclusive capture at a time.
pub trait AudioDevice: Send + Sync {
    fn format(&self) -> AudioFormat;

    fn open(&self) -> Result<Box<dyn AudioStream>, DeviceError>;
}

/// Real microphone backed by CPAL.
///
/// The `cpal::Stream` is not `Send`, so each `open` spawns a dedicated thread
/// that owns the stream and feeds converted i16 chunks into a channel; the
/// returned [`AudioStream`] reads from that channel and stops the thread on
/// drop.
pub struct CpalDevice {
    format: AudioFormat,
}

impl CpalDevice {
    pub fn new(format: AudioFormat) -> Result<Self, DeviceError> {
        // Fail fast if there is no input device at all.
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| DeviceError::Unavailable("no input device".to_string()))?;
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = format.sample_rate,
            "audio input device found"
        );
        Ok(Self { format })
    }

    /// Names of available input devices, for operator diagnostics.
    pub fn list_input_devices() -> Result<Vec<String>, DeviceError> {
        let devices = cpal::default_host().input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl AudioDevice for CpalDevice {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn open(&self) -> Result<Box<dyn AudioStream>, DeviceError> {
        let format = self.format;
        let stop = Arc::new(AtomicBool::new(false));
        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<i16>>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), DeviceError>>();

        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let built = build_input_stream(format, chunk_tx);
            let stream = match built {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            while !thread_stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(20));
            }
            drop(stream);
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                stop.store(true, Ordering::Relaxed);
                let _ = handle.join();
                return Err(DeviceError::Stream(
                    "audio capture thread did not start".to_string(),
                ));
            }
        }

        Ok(Box::new(CpalStream {
            format,
            rx: chunk_rx,
            stop,
            worker: Some(handle),
        }))
    }
}

fn build_input_stream(
    format: AudioFormat,
    chunk_tx: mpsc::Sender<Vec<i16>>,
) -> Result<cpal::Stream, DeviceError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| DeviceError::Unavailable("no input device".to_string()))?;
    let config = StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let chunk_size = format.chunk_size;
    let mut buffer: Vec<i16> = Vec::with_capacity(chunk_size);
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for &sample in data {
                let clamped = sample.clamp(-1.0, 1.0);
                buffer.push((clamped * 32767.0) as i16);
                if buffer.len() >= chunk_size {
                    if chunk_tx.send(std::mem::take(&mut buffer)).is_err() {
                        return;
                    }
                    buffer.reserve(chunk_size);
                }
            }
        },
        move |err| {
            warn!("audio stream error: {err}");
        },
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

struct CpalStream {
    format: AudioFormat,
    rx: mpsc::Receiver<Vec<i16>>,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AudioStream for CpalStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError> {
        match self.rx.recv_timeout(Duration::from_secs(2)) {
            Ok(chunk) => Ok(chunk),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(DeviceError::Stream("audio capture stalled".to_string()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeviceError::Closed),
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// What a [`ScriptedDevice`] does once its scripted chunks run out.
#[derive(Debug, Clone)]
pub enum Tail {
    /// Emit silent chunks forever.
    Silence,
    /// Report a stream error.
    Fail(String),
}

/// Deterministic in-memory device for tests and demos. Every `open` replays
/// the same chunks at a fixed pace, then follows the tail behavior.
pub struct ScriptedDevice {
    format: AudioFormat,
    chunks: Vec<Vec<i16>>,
    tail: Tail,
    pace: Duration,
    refuse_open: Option<String>,
    opens: AtomicUsize,
}

impl ScriptedDevice {
    pub fn new(chunks: Vec<Vec<i16>>, tail: Tail, pace: Duration) -> Self {
        Self {
            format: AudioFormat::default(),
            chunks,
            tail,
            pace,
            refuse_open: None,
            opens: AtomicUsize::new(0),
        }
    }

    /// A device that only ever hears silence.
    pub fn silent(pace: Duration) -> Self {
        Self::new(Vec::new(), Tail::Silence, pace)
    }

    /// A device that hears `speech_chunks` voiced chunks and then silence.
    pub fn speaking(speech_chunks: usize, pace: Duration) -> Self {
        let format = AudioFormat::default();
        let chunks = (0..speech_chunks)
            .map(|_| Self::speech_chunk(format))
            .collect();
        Self::new(chunks, Tail::Silence, pace)
    }

    /// A device whose `open` fails, as when the microphone is unplugged.
    pub fn broken(reason: &str) -> Self {
        let mut device = Self::silent(Duration::from_millis(1));
        device.refuse_open = Some(reason.to_string());
        device
    }

    /// A loud chunk the energy gate will classify as speech.
    pub fn speech_chunk(format: AudioFormat) -> Vec<i16> {
        vec![12_000; format.chunk_size]
    }

    /// A silent chunk.
    pub fn silence_chunk(format: AudioFormat) -> Vec<i16> {
        vec![0; format.chunk_size]
    }

    /// How many times the device has been opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl AudioDevice for ScriptedDevice {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn open(&self) -> Result<Box<dyn AudioStream>, DeviceError> {
        if let Some(reason) = &self.refuse_open {
            return Err(DeviceError::Unavailable(reason.clone()));
        }
        self.opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(ScriptedStream {
            format: self.format,
            queue: self.chunks.iter().cloned().collect(),
            tail: self.tail.clone(),
            pace: self.pace,
        }))
    }
}

struct ScriptedStream {
    format: AudioFormat,
    queue: VecDeque<Vec<i16>>,
    tail: Tail,
    pace: Duration,
}

impl AudioStream for ScriptedStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_chunk(&mut self) -> Result<Vec<i16>, DeviceError> {
        thread::sleep(self.pace);
        match self.queue.pop_front() {
            Some(chunk) => Ok(chunk),
            None => match &self.tail {
                Tail::Silence => Ok(ScriptedDevice::silence_chunk(self.format)),
                Tail::Fail(reason) => Err(DeviceError::Stream(reason.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_device_replays_chunks_then_tail() {
        let format = AudioFormat::default();
        let device = ScriptedDevice::speaking(2, Duration::from_millis(1));
        let mut stream = device.open().unwrap();

        assert_eq!(stream.read_chunk().unwrap(), ScriptedDevice::speech_chunk(format));
        assert_eq!(stream.read_chunk().unwrap(), ScriptedDevice::speech_chunk(format));
        assert_eq!(stream.read_chunk().unwrap(), ScriptedDevice::silence_chunk(format));
    }

    #[test]
    fn broken_device_refuses_to_open() {
        let device = ScriptedDevice::broken("unplugged");
        assert!(matches!(device.open(), Err(DeviceError::Unavailable(_))));
    }

    #[test]
    fn open_count_is_tracked() {
        let device = ScriptedDevice::silent(Duration::from_millis(1));
        let _a = device.open().unwrap();
        let _b = device.open().unwrap();
        assert_eq!(device.opens(), 2);
    }
}
