//! HTTP speech-to-text client

use super::{SpeechToText, Transcript};
use crate::config::SttConfig;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Deepgram-style pre-recorded transcription client
pub struct HttpSttClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SttResponse {
    transcript: String,
    /// Audio duration in seconds, reported by the service
    #[serde(default)]
    duration: f64,
}

impl HttpSttClient {
    pub fn new(config: &SttConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SpeechToText for HttpSttClient {
    async fn transcribe(&self, audio_url: &str) -> Result<Transcript> {
        let started = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&serde_json::json!({ "url": audio_url }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream("stt", format!("{}: {}", status, body)));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::auth("STT service rejected the API key"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::validation(format!(
                "STT request rejected ({}): {}",
                status, body
            )));
        }

        let parsed: SttResponse = response.json().await.map_err(|e| {
            GatewayError::upstream("stt", format!("unparseable response: {}", e))
        })?;

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "Transcribed {:.1}s of audio in {:.0}ms",
            parsed.duration, latency_ms
        );

        Ok(Transcript {
            text: parsed.transcript,
            audio_seconds: parsed.duration,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SttConfig {
        SttConfig {
            endpoint: server.uri(),
            api_key: "test-key".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Token test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcript": "patient reports chest pain",
                "duration": 12.5
            })))
            .mount(&server)
            .await;

        let client = HttpSttClient::new(&config_for(&server)).unwrap();
        let transcript = client.transcribe("https://example.com/a.wav").await.unwrap();

        assert_eq!(transcript.text, "patient reports chest pain");
        assert_eq!(transcript.audio_seconds, 12.5);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_upstream_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpSttClient::new(&config_for(&server)).unwrap();
        let err = client
            .transcribe("https://example.com/a.wav")
            .await
            .unwrap_err();

        // Upstream kind so the retry executor and breaker recognize it
        assert_eq!(err.kind(), "upstream_error");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = HttpSttClient::new(&config_for(&server)).unwrap();
        let err = client
            .transcribe("https://example.com/a.wav")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "validation_error");
    }
}
