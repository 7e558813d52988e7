//! Narrow interfaces to the voice-pipeline services
//!
//! The gateway does not own audio transport, voice-activity detection, or
//! turn-taking; it consumes one speech-to-text call and one note-generation
//! call per request through the traits below. Each successful call yields the
//! usage figures the metrics collector needs.

pub mod llm;
pub mod stt;

pub use llm::HttpLlmClient;
pub use stt::HttpSttClient;

use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one speech-to-text call
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Duration of the transcribed audio, the STT billing unit
    pub audio_seconds: f64,
    pub latency_ms: f64,
}

/// One speech-to-text call against an external service
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> Result<Transcript>;
}

/// The structured clinical note produced from a dictation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalNote {
    #[serde(default)]
    pub past_medical_history: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub current_medication: String,
    #[serde(default)]
    pub review_of_system: String,
    #[serde(default)]
    pub history_of_present_illness: String,
    #[serde(default)]
    pub examination: String,
    #[serde(default)]
    pub assessment_and_plan: String,
    #[serde(default)]
    pub procedure: String,
    #[serde(default, rename = "icdCodes")]
    pub icd_codes: Vec<BillingCode>,
    #[serde(default, rename = "cptCodes")]
    pub cpt_codes: Vec<BillingCode>,
}

/// ICD or CPT code with its description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingCode {
    pub code: String,
    pub description: String,
}

/// Result of one note-generation call
#[derive(Debug, Clone)]
pub struct GeneratedNote {
    pub note: ClinicalNote,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: f64,
}

/// One LLM call turning a transcript plus patient context into a note
#[async_trait]
pub trait NoteGenerator: Send + Sync {
    async fn generate(&self, transcript: &str, patient_context: &serde_json::Value)
        -> Result<GeneratedNote>;
}
