//! Text-generation providers for script writing.
//!
//! Providers receive the video idea plus scene count and style, and return
//! a list of [`SceneDraft`]s parsed from the model's JSON response. Models
//! are asked for JSON only, but Gemini in particular likes to wrap it in a
//! markdown fence, so the parser strips fences before deserializing.

use serde::{Deserialize, Serialize};

use super::{classify_error_response, validate_prompt, Generate, ProviderError};
use crate::scene::Style;

/// Default base URL for the OpenAI API.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// System prompt shared by all text providers.
const SYSTEM_PROMPT: &str = "You are a professional movie script writer and storyboard artist. \
Your task is to create engaging, cinematic scenes that tell a compelling story. \
Always respond with valid JSON format only, no additional text.";

/// Request handed to the text providers.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    /// The overall video idea.
    pub prompt: String,
    /// Number of scenes to produce.
    pub num_scenes: usize,
    /// Narrative style.
    pub style: Style,
}

/// One scene as suggested by a text provider, before it becomes a
/// [`crate::scene::Scene`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDraft {
    #[serde(default)]
    pub title: String,
    /// What happens in the scene; doubles as the narration source.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_prompt: String,
    /// Suggested duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    #[serde(default)]
    scenes: Vec<SceneDraft>,
}

/// Build the user prompt sent to every text provider.
fn build_user_prompt(request: &ScriptRequest) -> String {
    format!(
        "Create {num} short cinematic scenes from this idea: \"{prompt}\".\n\
         \n\
         Style: {style}\n\
         \n\
         For each scene, provide:\n\
         - title: A brief, engaging title for the scene\n\
         - description: 1-2 sentences describing what happens in the scene\n\
         - image_prompt: A detailed prompt for generating a realistic, cinematic image \
           that captures the scene's mood and key elements\n\
         - duration: Suggested duration in seconds (2-5 seconds)\n\
         \n\
         Make the scenes flow naturally and tell a cohesive story.\n\
         Focus on visual storytelling with strong imagery.\n\
         \n\
         Output JSON format:\n\
         {{\"scenes\": [{{\"title\": \"...\", \"description\": \"...\", \
         \"image_prompt\": \"...\", \"duration\": 3}}]}}",
        num = request.num_scenes,
        prompt = request.prompt,
        style = request.style.as_str(),
    )
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a provider's response body into scene drafts.
///
/// Drafts beyond the requested count are dropped; a response with zero
/// scenes is an API error so the chain can fall through.
pub fn parse_script_response(
    content: &str,
    num_scenes: usize,
) -> Result<Vec<SceneDraft>, ProviderError> {
    let cleaned = strip_code_fence(content);
    let parsed: ScriptResponse = serde_json::from_str(cleaned)
        .map_err(|e| ProviderError::Api(format!("script response was not valid JSON: {}", e)))?;

    let mut scenes = parsed.scenes;
    if scenes.is_empty() {
        return Err(ProviderError::Api(
            "script response contained no scenes".to_string(),
        ));
    }
    scenes.truncate(num_scenes);
    Ok(scenes)
}

/// Text provider selection, closed set.
#[derive(Debug)]
pub enum TextProvider {
    OpenAi(OpenAiText),
    Gemini(GeminiText),
}

impl Generate for TextProvider {
    type Request = ScriptRequest;
    type Artifact = Vec<SceneDraft>;

    fn name(&self) -> &'static str {
        match self {
            TextProvider::OpenAi(_) => "openai-text",
            TextProvider::Gemini(_) => "gemini-text",
        }
    }

    async fn generate(&self, request: &ScriptRequest) -> Result<Vec<SceneDraft>, ProviderError> {
        match self {
            TextProvider::OpenAi(p) => p.generate_script(request).await,
            TextProvider::Gemini(p) => p.generate_script(request).await,
        }
    }
}

/// OpenAI chat-completions client for script generation.
#[derive(Debug)]
pub struct OpenAiText {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiText {
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

    async fn generate_script(
        &self,
        request: &ScriptRequest,
    ) -> Result<Vec<SceneDraft>, ProviderError> {
        validate_prompt(&request.prompt)?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(request),
                },
            ],
            temperature: 0.8,
            max_tokens: 2000,
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

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::Api("chat response had no choices".to_string()))?;

        log::debug!("openai script content: {:.200}", content);
        parse_script_response(content, request.num_scenes)
    }
}

/// Google Gemini client for script generation.
#[derive(Debug)]
pub struct GeminiText {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiText {
    /// Create a client with an explicit API key.
    pub fn new(api_key: String, model: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, model, GEMINI_API_BASE_URL.to_string())
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

    async fn generate_script(
        &self,
        request: &ScriptRequest,
    ) -> Result<Vec<SceneDraft>, ProviderError> {
        validate_prompt(&request.prompt)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: format!("{}\n\n{}", SYSTEM_PROMPT, build_user_prompt(request)),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response).await);
        }

        let gemini: GeminiResponse = response.json().await?;
        let content = gemini
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| ProviderError::Api("gemini response had no candidates".to_string()))?;

        log::debug!("gemini script content: {:.200}", content);
        parse_script_response(content, request.num_scenes)
    }
}
