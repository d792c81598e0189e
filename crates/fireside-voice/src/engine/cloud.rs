//! Cloud transcription over an OpenAI-compatible `/audio/transcriptions`
//! endpoint.

use crate::engine::{EngineOutcome, SpeechEngine};
use crate::error::EngineError;
use crate::listener::{AudioClip, Heard, ListenWindow, Microphone};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct CloudEngine {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl CloudEngine {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    async fn upload(&self, clip: &AudioClip) -> Result<String, EngineError> {
        let wav = clip_to_wav(clip);
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| EngineError::Decode(format!("multipart encoding failed: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "cloud transcription rejected");
            return Err(EngineError::Decode(format!(
                "transcription endpoint returned {status}: {body}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Decode(format!("malformed transcription response: {e}")))?;
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::Decode("transcription response missing text field".to_string())
            })?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SpeechEngine for CloudEngine {
    fn id(&self) -> &str {
        "cloud"
    }

    fn is_offline(&self) -> bool {
        false
    }

    async fn probe(&self) -> Result<(), EngineError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(format!("endpoint unreachable: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(format!(
                "endpoint returned {}",
                response.status()
            )))
        }
    }

    async fn transcribe(
        &self,
        microphone: &Microphone,
        window: ListenWindow,
    ) -> Result<EngineOutcome, EngineError> {
        let clip = match microphone.capture(window).await? {
            Heard::Speech(clip) => clip,
            Heard::Nothing => return Ok(EngineOutcome::NoSpeech),
        };
        debug!(duration = ?clip.duration, "uploading clip for transcription");
        let text = self.upload(&clip).await?;
        Ok(EngineOutcome::Text(text))
    }
}

/// Encode a clip as a 16-bit mono RIFF/WAVE buffer.
fn clip_to_wav(clip: &AudioClip) -> Vec<u8> {
    let sample_rate = clip.sample_rate;
    let num_samples = clip.samples.len() as u32;
    let bits_per_sample = 16u16;
    let channels = 1u16;
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    let data_size = num_samples * u32::from(block_align);

    let mut wav = Vec::with_capacity(44 + data_size as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    for sample in &clip.samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }
    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn clip(samples: Vec<i16>) -> AudioClip {
        AudioClip {
            duration: Duration::from_millis(samples.len() as u64 * 1_000 / 16_000),
            samples,
            sample_rate: 16_000,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn wav_header_is_well_formed() {
        let wav = clip_to_wav(&clip(vec![0i16; 160]));
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + 160 * 2);
        // Data chunk size field matches the payload.
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 320);
    }

    #[test]
    fn wav_sample_rate_is_encoded() {
        let wav = clip_to_wav(&clip(vec![1i16, -1, 2, -2]));
        let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(rate, 16_000);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let engine = CloudEngine::new("https://api.example.test/v1/", "key", "whisper-1").unwrap();
        assert_eq!(engine.base_url, "https://api.example.test/v1");
    }
}
