//! Image-generation providers for scene stills.
//!
//! Providers return raw encoded image bytes; the image stage decides where
//! they land on disk. Pollinations is keyless and serves as the tail of
//! most chains; the in-process placeholder lives in the image stage, not
//! here, so the chain still reports honest failures.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{classify_error_response, validate_prompt, Generate, ProviderError};
use crate::scene::Resolution;

/// Default base URL for the OpenAI API.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";

/// Default base URL for the Pollinations image API.
pub const POLLINATIONS_BASE_URL: &str = "https://image.pollinations.ai";

/// Request handed to the image providers.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Scene image prompt.
    pub prompt: String,
    /// Target output resolution.
    pub resolution: Resolution,
}

/// Image provider selection, closed set.
#[derive(Debug)]
pub enum ImageProvider {
    OpenAi(OpenAiImage),
    Pollinations(Pollinations),
}

impl Generate for ImageProvider {
    type Request = ImageRequest;
    type Artifact = Vec<u8>;

    fn name(&self) -> &'static str {
        match self {
            ImageProvider::OpenAi(_) => "openai-image",
            ImageProvider::Pollinations(_) => "pollinations",
        }
    }

    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError> {
        match self {
            ImageProvider::OpenAi(p) => p.generate_image(request).await,
            ImageProvider::Pollinations(p) => p.generate_image(request).await,
        }
    }
}

/// Derive a stable Pollinations seed from the prompt, so re-runs of the
/// same project fetch the same image.
pub fn seed_for_prompt(prompt: &str) -> u32 {
    let digest = Sha256::digest(prompt.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    head % 1_000_000
}

/// Map a target resolution onto the nearest size the OpenAI image API
/// accepts.
fn openai_size(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Square => "1024x1024",
        Resolution::Landscape | Resolution::Wide => "1792x1024",
        Resolution::Portrait => "1024x1792",
    }
}

/// OpenAI images API client.
#[derive(Debug)]
pub struct OpenAiImage {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest {
    model: String,
    prompt: String,
    n: u32,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

impl OpenAiImage {
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

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError> {
        validate_prompt(&request.prompt)?;

        let url = format!("{}/v1/images/generations", self.base_url);
        let body = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            n: 1,
            size: openai_size(request.resolution),
            response_format: "b64_json",
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

        let parsed: ImageGenerationResponse = response.json().await?;
        let b64 = parsed
            .data
            .first()
            .and_then(|d| d.b64_json.as_deref())
            .ok_or_else(|| ProviderError::Api("image response had no b64_json data".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| ProviderError::Api(format!("image payload was not valid base64: {}", e)))
    }
}

/// Keyless Pollinations client.
///
/// Images come back directly as the GET response body. The prompt travels
/// in the URL path, so it is percent-encoded via the URL segment API.
#[derive(Debug)]
pub struct Pollinations {
    base_url: String,
    model: Option<String>,
    http_client: reqwest::Client,
}

impl Pollinations {
    /// Create a keyless client against the public endpoint.
    pub fn new(model: Option<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(model, POLLINATIONS_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL, for testing against a mock
    /// server.
    pub fn with_base_url(model: Option<String>, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url,
            model,
            http_client: super::http_client()?,
        })
    }

    /// Build the request URL for a prompt at a resolution.
    fn build_url(&self, request: &ImageRequest) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Api(format!("invalid pollinations base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Api("pollinations base url cannot be a base".to_string()))?
            .push("prompt")
            .push(&request.prompt);

        let (width, height) = request.resolution.dimensions();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("width", &width.to_string());
            query.append_pair("height", &height.to_string());
            query.append_pair("seed", &seed_for_prompt(&request.prompt).to_string());
            query.append_pair("nologo", "true");
            if let Some(model) = &self.model {
                query.append_pair("model", model);
            }
        }
        Ok(url)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ProviderError> {
        validate_prompt(&request.prompt)?;

        let url = self.build_url(request)?;
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::Api(
                "pollinations returned an empty body".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
