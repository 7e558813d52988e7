//! Clinical note generation endpoint
//!
//! Accepts a dictation (transcript text or an audio URL plus patient
//! context) and produces a structured clinical note. Every outbound call
//! runs through the retry executor and the per-service circuit breaker;
//! usage figures land in the metrics collector.

use crate::monitoring::SessionGuard;
use crate::pipeline::ClinicalNote;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Configure note-generation routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1").route("/notes", web::post().to(create_note)));
}

/// Request body for note generation
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    /// Patient context forwarded to the note generator
    pub patient_data: serde_json::Value,
    /// Dictation transcript, if transcription already happened upstream
    #[serde(default)]
    pub transcript: Option<String>,
    /// Recorded dictation to transcribe first
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Usage figures for one note-generation request
#[derive(Debug, Serialize)]
pub struct NoteUsage {
    pub audio_seconds: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Response body for note generation
#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub session_id: Uuid,
    pub note: ClinicalNote,
    pub transcript_length: usize,
    pub usage: NoteUsage,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

pub async fn create_note(
    state: web::Data<AppState>,
    payload: web::Json<NoteRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    validate(&request)?;

    let session_id = Uuid::new_v4();
    // Dropped on every exit path, cancellation included
    let _session = SessionGuard::begin(Arc::clone(&state.metrics));

    let mut audio_seconds = 0.0;
    // Blank strings count as absent, validate() already enforced one of them
    let supplied_transcript = request
        .transcript
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let supplied_audio = request
        .audio_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    let transcript = match (supplied_transcript, supplied_audio) {
        (Some(text), _) => text.to_string(),
        (None, Some(url)) => {
            let transcript = state
                .retries
                .run("stt", || {
                    state.stt_breaker.execute(|| state.stt.transcribe(url))
                })
                .await?;
            state
                .metrics
                .record_stt_usage(transcript.audio_seconds, transcript.latency_ms);
            audio_seconds = transcript.audio_seconds;
            transcript.text
        }
        (None, None) => {
            return Err(GatewayError::validation(
                "Provide either transcript or audio_url",
            ))
        }
    };

    let generated = state
        .retries
        .run("llm", || {
            state
                .llm_breaker
                .execute(|| state.llm.generate(&transcript, &request.patient_data))
        })
        .await?;
    state.metrics.record_llm_usage(
        generated.input_tokens,
        generated.output_tokens,
        generated.latency_ms,
    );

    info!(
        "Session {}: note generated ({} input / {} output tokens)",
        session_id, generated.input_tokens, generated.output_tokens
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(NoteResponse {
        session_id,
        note: generated.note,
        transcript_length: transcript.len(),
        usage: NoteUsage {
            audio_seconds,
            input_tokens: generated.input_tokens,
            output_tokens: generated.output_tokens,
        },
        generated_at: chrono::Utc::now(),
    })))
}

fn validate(request: &NoteRequest) -> Result<()> {
    let empty_context = match &request.patient_data {
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    };
    if empty_context {
        return Err(GatewayError::validation("patient_data cannot be empty"));
    }

    let has_transcript = request
        .transcript
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    let has_audio = request
        .audio_url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());

    if !has_transcript && !has_audio {
        return Err(GatewayError::validation(
            "Provide either transcript or audio_url",
        ));
    }

    Ok(())
}
