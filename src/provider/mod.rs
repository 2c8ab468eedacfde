//! Provider clients for text, image, and speech generation.
//!
//! Every external service sits behind the [`Generate`] trait; callers hand
//! the fallback chain an ordered slice of providers and get back the first
//! successful artifact. Rate limits are retried with backoff, transient
//! network failures once, and auth/content rejections fall straight through
//! to the next provider. An error only escapes the chain when every
//! provider in it has failed.

pub mod image;
mod retry;
pub mod speech;
pub mod text;

use std::time::Duration;

pub use retry::{
    calculate_backoff, is_transient_network_error, parse_retry_after, RetryPolicy,
    DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX, DEFAULT_NETWORK_RETRIES,
    DEFAULT_RATE_LIMIT_RETRIES,
};

pub use image::{ImageProvider, ImageRequest, OpenAiImage, Pollinations};
pub use speech::{ElevenLabs, OpenAiSpeech, SpeechProvider, SpeechRequest};
pub use text::{GeminiText, OpenAiText, SceneDraft, ScriptRequest, TextProvider};

/// Default timeout for HTTP requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keywords that indicate a content policy rejection in error bodies.
const CONTENT_POLICY_KEYWORDS: &[&str] = &[
    "content policy",
    "policy violation",
    "inappropriate",
    "not allowed",
    "prohibited",
    "blocked",
    "unsafe",
    "violates",
    "moderation",
    "nsfw",
];

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("no providers configured")]
    NoProviders,

    #[error("authentication rejected: {message}")]
    Auth {
        /// Body of the 401/403 response.
        message: String,
    },

    #[error("rate limited: {message}")]
    RateLimit {
        /// Human-readable rate limit message.
        message: String,
        /// Retry-After header value in seconds, if provided.
        retry_after_secs: Option<u64>,
    },

    #[error("network error: {message} (after {attempts} attempts)")]
    Network {
        /// Human-readable network error message.
        message: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    #[error("content rejected: {message}")]
    Content {
        /// Explanation from the provider.
        message: String,
    },

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty prompt")]
    EmptyPrompt,

    #[error("all {attempts} providers failed, last error: {last}")]
    ChainExhausted {
        /// Number of providers tried.
        attempts: usize,
        /// Error from the last provider in the chain.
        last: Box<ProviderError>,
    },
}

/// Build the shared HTTP client with the standard timeouts.
pub fn http_client() -> Result<reqwest::Client, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Validate a prompt before sending it to any provider.
pub fn validate_prompt(prompt: &str) -> Result<(), ProviderError> {
    if prompt.trim().is_empty() {
        return Err(ProviderError::EmptyPrompt);
    }
    Ok(())
}

/// Check if an error body indicates a content policy rejection.
fn is_content_policy_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    CONTENT_POLICY_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Map a non-success HTTP response to the provider error taxonomy.
///
/// 429 becomes [`ProviderError::RateLimit`] (carrying Retry-After), 401/403
/// become [`ProviderError::Auth`] unless the body reads like a content
/// rejection, and 400 with policy keywords becomes
/// [`ProviderError::Content`]. Everything else is a generic API error.
pub(crate) async fn classify_error_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after_secs = parse_retry_after(&response);
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "rate limit exceeded".to_string());
        return ProviderError::RateLimit {
            message,
            retry_after_secs,
        };
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

    if status.as_u16() == 401 {
        return ProviderError::Auth { message: body };
    }

    if (status.as_u16() == 400 || status.as_u16() == 403) && is_content_policy_error(&body) {
        return ProviderError::Content { message: body };
    }

    if status.as_u16() == 403 {
        return ProviderError::Auth { message: body };
    }

    ProviderError::Api(format!("request failed with status {}: {}", status, body))
}

/// One generation capability behind a uniform call.
///
/// Implemented by the closed per-capability enums ([`TextProvider`],
/// [`ImageProvider`], [`SpeechProvider`]); no string-keyed dispatch.
#[allow(async_fn_in_trait)]
pub trait Generate {
    /// Request type for this capability.
    type Request;
    /// Artifact produced on success.
    type Artifact;

    /// Provider name for logs and warnings.
    fn name(&self) -> &'static str;

    /// Perform one generation call against the backing service.
    async fn generate(&self, request: &Self::Request) -> Result<Self::Artifact, ProviderError>;
}

/// Try each provider in order until one succeeds, with the default retry
/// policy per provider.
pub async fn try_chain<P: Generate>(
    providers: &[P],
    request: &P::Request,
) -> Result<P::Artifact, ProviderError> {
    try_chain_with_policy(providers, request, RetryPolicy::default()).await
}

/// Try each provider in order until one succeeds.
///
/// Each provider gets its own retry budget from `policy`; once exhausted,
/// the chain moves on. Providers after the first success are never invoked.
pub async fn try_chain_with_policy<P: Generate>(
    providers: &[P],
    request: &P::Request,
    policy: RetryPolicy,
) -> Result<P::Artifact, ProviderError> {
    if providers.is_empty() {
        return Err(ProviderError::NoProviders);
    }

    let mut last_error: Option<ProviderError> = None;

    for provider in providers {
        match try_provider(provider, request, policy).await {
            Ok(artifact) => return Ok(artifact),
            Err(e) => {
                log::warn!("provider {} failed: {}", provider.name(), e);
                last_error = Some(e);
            }
        }
    }

    Err(ProviderError::ChainExhausted {
        attempts: providers.len(),
        last: Box::new(last_error.unwrap_or(ProviderError::NoProviders)),
    })
}

/// Run a single provider with its per-kind retry budget.
async fn try_provider<P: Generate>(
    provider: &P,
    request: &P::Request,
    policy: RetryPolicy,
) -> Result<P::Artifact, ProviderError> {
    let mut rate_limit_attempt = 0u32;
    let mut network_attempt = 0u32;

    loop {
        match provider.generate(request).await {
            Ok(artifact) => return Ok(artifact),

            Err(ProviderError::RateLimit {
                message,
                retry_after_secs,
            }) => {
                rate_limit_attempt += 1;
                if rate_limit_attempt > policy.rate_limit_retries {
                    return Err(ProviderError::RateLimit {
                        message,
                        retry_after_secs,
                    });
                }

                let delay = if let Some(secs) = retry_after_secs {
                    Duration::from_secs(secs).min(policy.backoff_max)
                } else {
                    calculate_backoff(rate_limit_attempt - 1, policy.backoff_base, policy.backoff_max)
                };
                log::info!(
                    "{} rate limited (attempt {}/{}), retrying in {:?}",
                    provider.name(),
                    rate_limit_attempt,
                    policy.rate_limit_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            Err(ProviderError::Http(http_err)) if is_transient_network_error(&http_err) => {
                network_attempt += 1;
                if network_attempt > policy.network_retries {
                    return Err(ProviderError::Network {
                        message: http_err.to_string(),
                        attempts: network_attempt,
                    });
                }

                let delay =
                    calculate_backoff(network_attempt - 1, policy.backoff_base, policy.backoff_max);
                log::warn!(
                    "{} network error (attempt {}/{}): {}, retrying in {:?}",
                    provider.name(),
                    network_attempt,
                    policy.network_retries + 1,
                    http_err,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            // Auth, content, and plain API errors are never retried against
            // the same provider.
            Err(e) => return Err(e),
        }
    }
}
