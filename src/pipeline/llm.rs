//! HTTP note-generation client

use super::{ClinicalNote, GeneratedNote, NoteGenerator};
use crate::config::LlmConfig;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// System prompt instructing the model to emit the structured note JSON
const CLINICAL_SYSTEM_PROMPT: &str = "You are a clinical transcription assistant. Your goal is \
to convert doctor dictations into structured JSON notes. \
1. Correct transcription errors intelligently (e.g., 'iron olecranon' -> 'isotretinoin'). \
2. Output ONLY a JSON object with these keys: past_medical_history, allergies, \
current_medication, review_of_system, history_of_present_illness, examination, \
assessment_and_plan, procedure, icdCodes, cptCodes. \
3. Use HTML for the values. Do NOT include section headings inside the HTML strings. \
4. Bold and underline diagnosis names. No bullet points or numbering. \
5. Include correct ICD and CPT codes. \
6. If insufficient data exists, return {\"error\": \"Insufficient or unrelated content\"}. \
7. Format style: Focused, Comprehensive, or Categorized as requested in the transcript.";

/// OpenAI-compatible chat-completions client for note generation
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
        })
    }

    fn parse_note(content: &str) -> Result<ClinicalNote> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
            GatewayError::upstream("llm", format!("model returned non-JSON content: {}", e))
        })?;

        if let Some(err) = value.get("error").and_then(|v| v.as_str()) {
            return Err(GatewayError::validation(err.to_string()));
        }

        serde_json::from_value(value).map_err(|e| {
            GatewayError::upstream("llm", format!("model returned unexpected shape: {}", e))
        })
    }
}

#[async_trait]
impl NoteGenerator for HttpLlmClient {
    async fn generate(
        &self,
        transcript: &str,
        patient_context: &serde_json::Value,
    ) -> Result<GeneratedNote> {
        let started = Instant::now();

        let body = serde_json::json!({
            "model": self.model_id,
            "messages": [
                { "role": "system", "content": CLINICAL_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Patient context:\n{}\n\nDictation transcript:\n{}",
                        patient_context, transcript
                    )
                }
            ],
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream("llm", format!("{}: {}", status, body)));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::auth("LLM service rejected the API key"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::validation(format!(
                "LLM request rejected ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GatewayError::upstream("llm", format!("unparseable response: {}", e))
        })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| GatewayError::upstream("llm", "response contained no choices"))?;

        let note = Self::parse_note(content)?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Generated note in {:.0}ms ({} input / {} output tokens)",
            latency_ms, parsed.usage.prompt_tokens, parsed.usage.completion_tokens
        );

        Ok(GeneratedNote {
            note,
            input_tokens: parsed.usage.prompt_tokens,
            output_tokens: parsed.usage.completion_tokens,
            latency_ms,
        })
    }
}
