//! Speech synthesis client for the Google Cloud TTS `text:synthesize` REST
//! API. One call synthesizes one already-bounded chunk; audio comes back as
//! base64 MP3 in the JSON response.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::contract::SpeechSynthesizer;
use crate::error::SynthesisError;

const API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

pub struct GoogleSynthesizer {
    http: reqwest::Client,
    api_key: String,
    voice: String,
    language_code: String,
    speaking_rate: f64,
}

impl GoogleSynthesizer {
    pub fn new(api_key: String, config: &SynthesisConfig) -> Self {
        GoogleSynthesizer {
            http: reqwest::Client::new(),
            api_key,
            voice: config.voice.clone(),
            language_code: config.language_code.clone(),
            speaking_rate: config.speaking_rate,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[async_trait]
impl SpeechSynthesizer for GoogleSynthesizer {
    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: self.speaking_rate,
            },
        };

        let response = self
            .http
            .post(API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Request(format!("{status}: {body}")));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        let audio = BASE64
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| SynthesisError::Request(format!("invalid audio payload: {e}")))?;
        debug!(chars = text.len(), bytes = audio.len(), "chunk synthesized");
        Ok(audio)
    }
}
