//! Mock HTTP tests for the provider clients and the fallback chain.
//!
//! These tests cover:
//! - Request formatting against each provider's wire API
//! - Error classification (auth, rate limit, content policy)
//! - Fallback-chain ordering and retry budgets

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storyreel::provider::{
    try_chain_with_policy, ElevenLabs, Generate, GeminiText, ImageProvider, ImageRequest,
    OpenAiImage, OpenAiSpeech, OpenAiText, Pollinations, ProviderError, RetryPolicy,
    SpeechProvider, SpeechRequest, TextProvider,
};
use storyreel::scene::{Resolution, Style, VoiceId};

fn script_request() -> storyreel::provider::ScriptRequest {
    storyreel::provider::ScriptRequest {
        prompt: "a quiet morning in a village".to_string(),
        num_scenes: 2,
        style: Style::Cinematic,
    }
}

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

const SCRIPT_JSON: &str = r#"{"scenes": [
    {"title": "Dawn", "description": "The sun rises.", "image_prompt": "sunrise over rooftops", "duration": 3},
    {"title": "Market", "description": "Stalls open.", "image_prompt": "village market", "duration": 4}
]}"#;

// === Text providers ===

#[tokio::test]
async fn test_openai_text_sends_bearer_and_parses_scenes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(SCRIPT_JSON)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = TextProvider::OpenAi(
        OpenAiText::with_base_url(
            "test-key".to_string(),
            "gpt-4o-mini".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );

    let scenes = provider.generate(&script_request()).await.unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0].title, "Dawn");
    assert_eq!(scenes[1].duration, Some(4.0));
}

#[tokio::test]
async fn test_gemini_text_parses_fenced_json() {
    let mock_server = MockServer::start().await;

    let fenced = format!("```json\n{}\n```", SCRIPT_JSON);
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": fenced}]}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = TextProvider::Gemini(
        GeminiText::with_base_url(
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );

    let scenes = provider.generate(&script_request()).await.unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[1].title, "Market");
}

#[tokio::test]
async fn test_openai_text_401_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = TextProvider::OpenAi(
        OpenAiText::with_base_url(
            "bad-key".to_string(),
            "gpt-4o-mini".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );

    let result = provider.generate(&script_request()).await;
    assert!(matches!(result, Err(ProviderError::Auth { .. })));
}

#[tokio::test]
async fn test_content_policy_rejection_is_content_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("request violates content policy"),
        )
        .mount(&mock_server)
        .await;

    let provider = TextProvider::OpenAi(
        OpenAiText::with_base_url(
            "key".to_string(),
            "gpt-4o-mini".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );

    let result = provider.generate(&script_request()).await;
    assert!(matches!(result, Err(ProviderError::Content { .. })));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "17")
                .set_body_string("slow down"),
        )
        .mount(&mock_server)
        .await;

    let provider = TextProvider::OpenAi(
        OpenAiText::with_base_url(
            "key".to_string(),
            "gpt-4o-mini".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );

    let result = provider.generate(&script_request()).await;
    match result {
        Err(ProviderError::RateLimit {
            retry_after_secs, ..
        }) => assert_eq!(retry_after_secs, Some(17)),
        other => panic!("expected RateLimit, got {:?}", other),
    }
}

// === Fallback chain (K-1 failures, last succeeds) ===

#[tokio::test]
async fn test_chain_falls_through_to_last_provider() {
    let failing_500 = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .expect(1)
        .mount(&failing_500)
        .await;

    let failing_401 = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&failing_401)
        .await;

    let succeeding = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(SCRIPT_JSON)))
        .expect(1)
        .mount(&succeeding)
        .await;

    let chain = vec![
        TextProvider::OpenAi(
            OpenAiText::with_base_url("k1".to_string(), "m".to_string(), failing_500.uri())
                .unwrap(),
        ),
        TextProvider::OpenAi(
            OpenAiText::with_base_url("k2".to_string(), "m".to_string(), failing_401.uri())
                .unwrap(),
        ),
        TextProvider::OpenAi(
            OpenAiText::with_base_url("k3".to_string(), "m".to_string(), succeeding.uri())
                .unwrap(),
        ),
    ];

    let scenes = try_chain_with_policy(&chain, &script_request(), RetryPolicy::immediate())
        .await
        .unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0].title, "Dawn");
}

#[tokio::test]
async fn test_chain_never_calls_providers_past_the_first_success() {
    let succeeding = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(SCRIPT_JSON)))
        .expect(1)
        .mount(&succeeding)
        .await;

    // Mounted with expect(0): any request here fails the test on drop.
    let never_called = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(SCRIPT_JSON)))
        .expect(0)
        .mount(&never_called)
        .await;

    let chain = vec![
        TextProvider::OpenAi(
            OpenAiText::with_base_url("k1".to_string(), "m".to_string(), succeeding.uri())
                .unwrap(),
        ),
        TextProvider::OpenAi(
            OpenAiText::with_base_url("k2".to_string(), "m".to_string(), never_called.uri())
                .unwrap(),
        ),
    ];

    let result = try_chain_with_policy(&chain, &script_request(), RetryPolicy::immediate()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_auth_failure_gets_exactly_one_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chain = vec![TextProvider::OpenAi(
        OpenAiText::with_base_url("k".to_string(), "m".to_string(), mock_server.uri()).unwrap(),
    )];

    let result = try_chain_with_policy(&chain, &script_request(), RetryPolicy::immediate()).await;
    assert!(matches!(
        result,
        Err(ProviderError::ChainExhausted { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn test_rate_limited_provider_is_retried_with_budget() {
    let mock_server = MockServer::start().await;

    // First response rate-limits, the retry succeeds.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(SCRIPT_JSON)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chain = vec![TextProvider::OpenAi(
        OpenAiText::with_base_url("k".to_string(), "m".to_string(), mock_server.uri()).unwrap(),
    )];

    let scenes = try_chain_with_policy(&chain, &script_request(), RetryPolicy::immediate())
        .await
        .unwrap();
    assert_eq!(scenes.len(), 2);
}

// === Image providers ===

#[tokio::test]
async fn test_image_chain_falls_back_to_pollinations() {
    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .expect(1)
        .mount(&failing)
        .await;

    let pollinations = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-image-bytes".to_vec()))
        .expect(1)
        .mount(&pollinations)
        .await;

    let chain = vec![
        ImageProvider::OpenAi(
            OpenAiImage::with_base_url("k".to_string(), "dall-e-3".to_string(), failing.uri())
                .unwrap(),
        ),
        ImageProvider::Pollinations(
            Pollinations::with_base_url(None, pollinations.uri()).unwrap(),
        ),
    ];

    let request = ImageRequest {
        prompt: "village street".to_string(),
        resolution: Resolution::Landscape,
    };
    let bytes = try_chain_with_policy(&chain, &request, RetryPolicy::immediate())
        .await
        .unwrap();
    assert_eq!(bytes, b"fake-image-bytes");
}

#[tokio::test]
async fn test_openai_image_decodes_b64_payload() {
    use base64::Engine;

    let mock_server = MockServer::start().await;
    let payload = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"b64_json": payload}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = ImageProvider::OpenAi(
        OpenAiImage::with_base_url("k".to_string(), "dall-e-3".to_string(), mock_server.uri())
            .unwrap(),
    );
    let bytes = provider
        .generate(&ImageRequest {
            prompt: "village".to_string(),
            resolution: Resolution::Square,
        })
        .await
        .unwrap();
    assert_eq!(bytes, b"png-bytes");
}

// === Speech providers ===

#[tokio::test]
async fn test_openai_speech_returns_audio_bytes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = SpeechProvider::OpenAi(
        OpenAiSpeech::with_base_url(
            "test-key".to_string(),
            "tts-1".to_string(),
            mock_server.uri(),
        )
        .unwrap(),
    );
    let bytes = provider
        .generate(&SpeechRequest {
            text: "The sun rises.".to_string(),
            voice: VoiceId::Alloy,
        })
        .await
        .unwrap();
    assert_eq!(bytes, b"mp3-bytes");
}

#[tokio::test]
async fn test_elevenlabs_uses_xi_api_key_header() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .and(header("xi-api-key", "el-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = SpeechProvider::ElevenLabs(
        ElevenLabs::with_base_url("el-key".to_string(), "voice-1".to_string(), mock_server.uri())
            .unwrap(),
    );
    let bytes = provider
        .generate(&SpeechRequest {
            text: "The sun rises.".to_string(),
            voice: VoiceId::Nova,
        })
        .await
        .unwrap();
    assert_eq!(bytes, b"mp3-bytes");
}
