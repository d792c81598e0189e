//! Endpointed microphone capture.
//!
//! One `capture` call records a single utterance: it waits for speech onset,
//! then keeps recording until a silence gap, a hard duration cap, or a device
//! failure ends the window. The CPAL stream and the speech gate both live on
//! a dedicated capture thread; the async side only watches deadlines and
//! drains frames.

use crate::audio::AudioDevice;
use crate::error::DeviceError;
use crate::gate::GateFactory;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Timing bounds for one capture window.
#[derive(Debug, Clone, Copy)]
pub struct ListenWindow {
    /// How long to wait for speech onset before giving up.
    pub max_wait_for_start: Duration,
    /// Hard cap on recording time after onset.
    pub max_listen_duration: Duration,
}

impl Default for ListenWindow {
    fn default() -> Self {
        Self {
            max_wait_for_start: Duration::from_secs(7),
            max_listen_duration: Duration::from_secs(20),
        }
    }
}

/// Endpointing policy applied within the window.
#[derive(Debug, Clone, Copy)]
pub struct SilencePolicy {
    /// Unvoiced gap after speech that ends the capture.
    pub gap: Duration,
    /// Clips shorter than this count as nothing heard.
    pub min_speech: Duration,
}

impl Default for SilencePolicy {
    fn default() -> Self {
        Self {
            gap: Duration::from_secs(2),
            min_speech: Duration::from_millis(200),
        }
    }
}

/// A finished recording, mono 16-bit PCM.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub duration: Duration,
    pub captured_at: DateTime<Utc>,
}

/// Outcome of one capture window.
#[derive(Debug)]
pub enum Heard {
    Speech(AudioClip),
    /// The window elapsed without qualifying speech.
    Nothing,
}

enum Frame {
    Audio { samples: Vec<i16>, voiced: bool },
    Error(DeviceError),
}

/// Serializes capture attempts over one audio device.
///
/// Engine fallback re-captures through the same `Microphone`, so the internal
/// lock guarantees the device is fully released before the next attempt
/// opens it.
pub struct Microphone {
    device: Arc<dyn AudioDevice>,
    gate_factory: GateFactory,
    silence: SilencePolicy,
    lock: tokio::sync::Mutex<()>,
}

impl Microphone {
    pub fn new(device: Arc<dyn AudioDevice>, gate_factory: GateFactory, silence: SilencePolicy) -> Self {
        Self {
            device,
            gate_factory,
            silence,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.device.format().sample_rate
    }

    /// Record one utterance. Returns [`Heard::Nothing`] when no speech starts
    /// within the window or the clip is too short to mean anything.
    pub async fn capture(&self, window: ListenWindow) -> Result<Heard, DeviceError> {
        let _guard = self.lock.lock().await;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        let worker = spawn_capture_worker(
            Arc::clone(&self.device),
            Arc::clone(&self.gate_factory),
            Arc::clone(&stop),
            tx,
        );

        let captured_at = Utc::now();
        let sample_rate = self.device.format().sample_rate;
        let onset_deadline = Instant::now() + window.max_wait_for_start;
        let mut hard_deadline = onset_deadline + window.max_listen_duration;
        let mut last_voiced = Instant::now();
        let mut started = false;
        let mut samples: Vec<i16> = Vec::new();
        let mut failure: Option<DeviceError> = None;

        loop {
            let deadline = if started {
                hard_deadline.min(last_voiced + self.silence.gap)
            } else {
                onset_deadline
            };
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => {
                    break;
                }
                frame = rx.recv() => {
                    match frame {
                        Some(Frame::Audio { samples: chunk, voiced }) => {
                            if !started {
                                if voiced {
                                    started = true;
                                    hard_deadline = Instant::now() + window.max_listen_duration;
                                    last_voiced = Instant::now();
                                    samples.extend_from_slice(&chunk);
                                    debug!("speech onset detected");
                                }
                            } else {
                                samples.extend_from_slice(&chunk);
                                if voiced {
                                    last_voiced = Instant::now();
                                }
                            }
                        }
                        Some(Frame::Error(e)) => {
                            failure = Some(e);
                            break;
                        }
                        None => {
                            failure = Some(DeviceError::Closed);
                            break;
                        }
                    }
                }
            }
        }

        // Release the device before reporting anything.
        stop.store(true, Ordering::Relaxed);
        rx.close();
        let _ = tokio::task::spawn_blocking(move || worker.join()).await;

        if let Some(e) = failure {
            return Err(e);
        }
        if !started {
            debug!("no speech within the listen window");
            return Ok(Heard::Nothing);
        }
        let duration =
            Duration::from_millis(samples.len() as u64 * 1_000 / sample_rate.max(1) as u64);
        if duration < self.silence.min_speech {
            debug!(?duration, "clip too short, dropping");
            return Ok(Heard::Nothing);
        }
        info!(?duration, samples = samples.len(), "captured utterance");
        Ok(Heard::Speech(AudioClip {
            samples,
            sample_rate,
            duration,
            captured_at,
        }))
    }
}

fn spawn_capture_worker(
    device: Arc<dyn AudioDevice>,
    gate_factory: GateFactory,
    stop: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Frame>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match device.open() {
            Ok(stream) => stream,
            Err(e) => {
                let _ = tx.send(Frame::Error(e));
                return;
            }
        };
        let mut gate = (gate_factory)();
        while !stop.load(Ordering::Relaxed) {
            match stream.read_chunk() {
                Ok(chunk) => {
                    let voiced = gate.is_speech(&chunk);
                    if tx.send(Frame::Audio { samples: chunk, voiced }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Frame::Error(e));
                    break;
                }
            }
        }
    })
}
