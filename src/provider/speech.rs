//! Speech-synthesis providers for narration.
//!
//! Both providers return encoded MP3 bytes; the voice stage writes clips
//! to disk and substitutes rendered silence when the whole chain fails.

use serde::Serialize;

use super::{classify_error_response, validate_prompt, Generate, ProviderError};
use crate::scene::VoiceId;

/// Default base URL for the OpenAI API.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";

/// Default base URL for the ElevenLabs API.
pub const ELEVENLABS_API_BASE_URL: &str = "https://api.elevenlabs.io";

/// ElevenLabs model used for narration.
const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";

/// Request handed to the speech providers.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Narration text to synthesize.
    pub text: String,
    /// Requested voice.
    pub voice: VoiceId,
}

/// Speech provider selection, closed set.
#[derive(Debug)]
pub enum SpeechProvider {
    OpenAi(OpenAiSpeech),
    ElevenLabs(ElevenLabs),
}

impl Generate for SpeechProvider {
    type Request = SpeechRequest;
    type Artifact = Vec<u8>;

    fn name(&self) -> &'static str {
        match self {
            SpeechProvider::OpenAi(_) => "openai-speech",
            SpeechProvider::ElevenLabs(_) => "elevenlabs",
        }
    }

    async fn generate(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        match self {
            SpeechProvider::OpenAi(p) => p.synthesize(request).await,
            SpeechProvider::ElevenLabs(p) => p.synthesize(request).await,
        }
    }
}

/// OpenAI text-to-speech client.
#[derive(Debug)]
pub struct OpenAiSpeech {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SpeechGenerationRequest {
    model: String,
    voice: &'static str,
    input: String,
}

impl OpenAiSpeech {
    /// Create a client with an explicit API key.
    pub fn new(api_key: String, model: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, model, OPENAI_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL, for testing against a mock
    /// server.
    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            model,
            base_url,
            http_client: super::http_client()?,
        })
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        validate_prompt(&request.text)?;

        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechGenerationRequest {
            model: self.model.clone(),
            voice: request.voice.as_str(),
            input: request.text.clone(),
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::Api(
                "speech response body was empty".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}

/// ElevenLabs text-to-speech client.
///
/// ElevenLabs addresses voices by opaque IDs rather than names, so the
/// configured `voice_id` stands in for whatever [`VoiceId`] the caller
/// requested.
#[derive(Debug)]
pub struct ElevenLabs {
    api_key: String,
    voice_id: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ElevenLabsRequest {
    text: String,
    model_id: &'static str,
}

impl ElevenLabs {
    /// Create a client with an explicit API key and voice.
    pub fn new(api_key: String, voice_id: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, voice_id, ELEVENLABS_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL, for testing against a mock
    /// server.
    pub fn with_base_url(
        api_key: String,
        voice_id: String,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            voice_id,
            base_url,
            http_client: super::http_client()?,
        })
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        validate_prompt(&request.text)?;

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);
        let body = ElevenLabsRequest {
            text: request.text.clone(),
            model_id: ELEVENLABS_MODEL,
        };

        let response = self
            .http_client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::Api(
                "speech response body was empty".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
