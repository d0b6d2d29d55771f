//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for OpenAI's Text-to-Speech (TTS) service.
//! It implements the `TextToSpeechService` port from the `core` crate and is
//! used to voice individual pages on request.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use tracing::debug;
use voicebook_core::ports::{PortError, PortResult, TextToSpeechService};

use crate::config::Config;
use crate::error::ApiError;

/// MIME type of the audio returned by the speech endpoint's default format.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextToSpeechService` port using the OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
}

impl OpenAiTtsAdapter {
    /// Creates a new `OpenAiTtsAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: SpeechModel, voice: Voice) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }

    /// Builds the adapter from configuration. Returns `Ok(None)` when no API key is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>, ApiError> {
        let Some(api_key) = config.openai_api_key.as_ref() else {
            return Ok(None);
        };
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Ok(Some(Self::new(
            client,
            parse_model(&config.tts_model)?,
            parse_voice(&config.tts_voice)?,
        )))
    }
}

fn parse_model(name: &str) -> Result<SpeechModel, ApiError> {
    match name.to_lowercase().as_str() {
        "tts-1" => Ok(SpeechModel::Tts1),
        "tts-1-hd" => Ok(SpeechModel::Tts1Hd),
        _ => Err(ApiError::Internal(format!(
            "Invalid TTS model specified in config: '{}'",
            name
        ))),
    }
}

fn parse_voice(name: &str) -> Result<Voice, ApiError> {
    match name.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        _ => Err(ApiError::Internal(format!(
            "Invalid TTS voice specified in config: '{}'",
            name
        ))),
    }
}

//=========================================================================================
// `TextToSpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextToSpeechService for OpenAiTtsAdapter {
    /// Generates a vector of audio data (`Vec<u8>`) from the given text.
    async fn generate_audio(&self, text: &str) -> PortResult<Vec<u8>> {
        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        debug!(bytes = response.bytes.len(), "Speech synthesized.");
        Ok(response.bytes.to_vec())
    }
}
