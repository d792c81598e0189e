//! Speech gates: per-chunk voiced/unvoiced classification.

use crate::error::VoiceError;
use std::sync::Arc;
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Classifies one chunk of samples as speech or silence.
///
/// Deliberately not `Send`: the WebRTC detector wraps a raw pointer, so each
/// capture thread builds its own gate through a [`GateFactory`] and the gate
/// never leaves that thread.
pub trait SpeechGate {
    fn is_speech(&mut self, frame: &[i16]) -> bool;
}

/// Builds a fresh gate on the capture thread. The factory crosses threads;
/// the gates it produces do not.
pub type GateFactory = Arc<dyn Fn() -> Box<dyn SpeechGate> + Send + Sync>;

/// Amplitude-threshold gate. Deterministic, so tests use it; it is also a
/// reasonable fallback on platforms where the WebRTC gate misbehaves.
pub struct EnergyGate {
    threshold: i16,
}

impl EnergyGate {
    pub fn new(threshold: i16) -> Self {
        Self { threshold }
    }

    pub fn factory(threshold: i16) -> GateFactory {
        Arc::new(move || Box::new(EnergyGate::new(threshold)))
    }
}

impl Default for EnergyGate {
    fn default() -> Self {
        Self { threshold: 1_000 }
    }
}

impl SpeechGate for EnergyGate {
    fn is_speech(&mut self, frame: &[i16]) -> bool {
        frame
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .map(|peak| peak >= self.threshold)
            .unwrap_or(false)
    }
}

/// WebRTC voice activity detector. Expects frames of 10, 20 or 30ms at
/// 8/16/32/48kHz; aggressiveness 0 (lenient) to 3 (strict).
pub struct WebRtcGate {
    vad: Vad,
}

impl WebRtcGate {
    pub fn new(sample_rate: u32, aggressiveness: u8) -> Result<Self, VoiceError> {
        let rate = match sample_rate {
            8_000 => SampleRate::Rate8kHz,
            16_000 => SampleRate::Rate16kHz,
            32_000 => SampleRate::Rate32kHz,
            48_000 => SampleRate::Rate48kHz,
            other => {
                return Err(VoiceError::Config(format!(
                    "unsupported VAD sample rate: {other}"
                )))
            }
        };
        let mode = match aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => {
                return Err(VoiceError::Config(format!(
                    "VAD aggressiveness must be 0..=3, got {other}"
                )))
            }
        };
        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(rate);
        Ok(Self { vad })
    }

    pub fn factory(sample_rate: u32, aggressiveness: u8) -> Result<GateFactory, VoiceError> {
        // Validate once up front so per-capture construction cannot fail.
        WebRtcGate::new(sample_rate, aggressiveness)?;
        Ok(Arc::new(move || {
            match WebRtcGate::new(sample_rate, aggressiveness) {
                Ok(gate) => Box::new(gate),
                Err(_) => Box::new(EnergyGate::default()),
            }
        }))
    }
}

impl SpeechGate for WebRtcGate {
    fn is_speech(&mut self, frame: &[i16]) -> bool {
        self.vad.is_voice_segment(frame).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_gate_separates_loud_from_quiet() {
        let mut gate = EnergyGate::default();
        assert!(gate.is_speech(&[12_000; 480]));
        assert!(!gate.is_speech(&[0; 480]));
        assert!(!gate.is_speech(&[200; 480]));
    }

    #[test]
    fn energy_gate_handles_negative_peaks() {
        let mut gate = EnergyGate::default();
        assert!(gate.is_speech(&[-12_000; 480]));
    }

    #[test]
    fn webrtc_gate_rejects_bad_parameters() {
        assert!(WebRtcGate::new(44_100, 2).is_err());
        assert!(WebRtcGate::new(16_000, 4).is_err());
        assert!(WebRtcGate::new(16_000, 3).is_ok());
    }
}
