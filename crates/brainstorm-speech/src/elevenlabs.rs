//! ElevenLabs-compatible text-to-speech client.
//!
//! `POST {api_url}/text-to-speech/{voice_id}` with an `xi-api-key` header,
//! returning `audio/mpeg` bytes.

use std::time::Duration;

use async_trait::async_trait;
use brainstorm_core::config::SynthesisConfig;
use serde::Serialize;
use tracing::debug;

use crate::capability::{RemoteSynthesizer, SynthesisRequest};
use crate::error::SpeechError;

#[derive(Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Remote synthesizer backed by the ElevenLabs HTTP API.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<String>,
        model_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::RemoteSynthesisFailed(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model_id: model_id.into(),
        })
    }

    /// Build from config. A disabled section yields an unconfigured client.
    pub fn from_config(config: &SynthesisConfig) -> Result<Self, SpeechError> {
        let api_key = if config.enabled {
            config.resolved_api_key()
        } else {
            None
        };
        Self::new(
            config.api_url.clone(),
            api_key,
            config.model_id.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!("{}/text-to-speech/{}", self.api_url, voice_id)
    }
}

#[async_trait]
impl RemoteSynthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SpeechError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SpeechError::RemoteSynthesisFailed("no API key".to_string()))?;

        let body = TtsBody {
            text: &request.text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: request.stability,
                similarity_boost: request.similarity_boost,
            },
        };

        let url = self.endpoint(&request.voice_id);
        debug!(url = %url, chars = request.text.chars().count(), "Requesting synthesis");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::RemoteSynthesisFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::RemoteSynthesisFailed(format!("HTTP {status}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::RemoteSynthesisFailed(e.to_string()))?;
        if audio.is_empty() {
            return Err(SpeechError::RemoteSynthesisFailed(
                "empty audio payload".to_string(),
            ));
        }
        debug!(bytes = audio.len(), "Synthesis complete");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let synth = ElevenLabsSynthesizer::new(
            "https://tts.example/v1/",
            Some("key".to_string()),
            "eleven_monolingual_v1",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            synth.endpoint("voice-1"),
            "https://tts.example/v1/text-to-speech/voice-1"
        );
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        let synth = ElevenLabsSynthesizer::new(
            "https://tts.example/v1",
            Some("   ".to_string()),
            "m",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!synth.is_configured());
    }

    #[test]
    fn test_disabled_config_is_unconfigured() {
        let config = SynthesisConfig {
            enabled: false,
            api_key: "secret".to_string(),
            ..SynthesisConfig::default()
        };
        let synth = ElevenLabsSynthesizer::from_config(&config).unwrap();
        assert!(!synth.is_configured());

        let config = SynthesisConfig {
            api_key: "secret".to_string(),
            ..SynthesisConfig::default()
        };
        assert!(ElevenLabsSynthesizer::from_config(&config)
            .unwrap()
            .is_configured());
    }

    #[test]
    fn test_body_wire_format() {
        let body = TtsBody {
            text: "Hello",
            model_id: "eleven_monolingual_v1",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["model_id"], "eleven_monolingual_v1");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }
}
