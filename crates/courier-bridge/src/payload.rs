//! Decoded executor responses.
//!
//! The executor writes one JSON value to stdout per invocation. The shape
//! depends on the method: a plain array of strings for the chunk search, an
//! object with a `response` field for the generation methods, `{success}`
//! for document processing, and `{feedback, score}` for resume analysis. Any
//! of the object shapes may instead (or additionally) carry a non-empty
//! `error` field, which signals a reported failure even when the process
//! exited cleanly.

use serde::Deserialize;

use courier_core::{CourierError, Result};

use crate::method::BridgeMethod;

/// Acknowledgement for `process_document`.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReceipt {
    pub success: bool,
}

/// Output of the generation methods (`generate_chat_response`,
/// `generate_sql_from_natural_language`, `conduct_research`).
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub response: String,
}

/// Output of `analyze_resume`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeReport {
    pub feedback: String,
    pub score: i32,
}

/// A decoded, method-appropriate executor response.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgePayload {
    Ingest(IngestReceipt),
    Chunks(Vec<String>),
    Generation(GenerationOutput),
    Resume(ResumeReport),
}

#[derive(Deserialize)]
struct RawIngest {
    success: Option<bool>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct RawGeneration {
    response: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct RawResume {
    feedback: Option<String>,
    score: Option<i32>,
    error: Option<String>,
}

fn reported(error: Option<String>) -> Result<()> {
    match error {
        Some(message) if !message.trim().is_empty() => {
            Err(CourierError::BridgeReportedError(message))
        }
        _ => Ok(()),
    }
}

fn violation(method: BridgeMethod, detail: impl std::fmt::Display) -> CourierError {
    CourierError::BridgeProtocolViolation(format!("{}: {detail}", method.as_str()))
}

/// Decodes the executor's stdout for the given method.
///
/// A reported `error` field takes precedence over everything else in the
/// body, so a half-populated success payload can never leak out of a failed
/// call.
pub fn decode_response(method: BridgeMethod, stdout: &[u8]) -> Result<BridgePayload> {
    match method {
        BridgeMethod::SearchSimilarChunks => {
            let chunks: Vec<String> = serde_json::from_slice(stdout)
                .map_err(|e| violation(method, format_args!("expected string array: {e}")))?;
            Ok(BridgePayload::Chunks(chunks))
        }
        BridgeMethod::ProcessDocument => {
            let raw: RawIngest = serde_json::from_slice(stdout)
                .map_err(|e| violation(method, format_args!("expected object: {e}")))?;
            reported(raw.error)?;
            let success = raw
                .success
                .ok_or_else(|| violation(method, "missing success field"))?;
            Ok(BridgePayload::Ingest(IngestReceipt { success }))
        }
        BridgeMethod::GenerateChatResponse
        | BridgeMethod::GenerateSqlFromNaturalLanguage
        | BridgeMethod::ConductResearch => {
            let raw: RawGeneration = serde_json::from_slice(stdout)
                .map_err(|e| violation(method, format_args!("expected object: {e}")))?;
            reported(raw.error)?;
            let response = raw
                .response
                .ok_or_else(|| violation(method, "missing response field"))?;
            Ok(BridgePayload::Generation(GenerationOutput { response }))
        }
        BridgeMethod::AnalyzeResume => {
            let raw: RawResume = serde_json::from_slice(stdout)
                .map_err(|e| violation(method, format_args!("expected object: {e}")))?;
            reported(raw.error)?;
            let feedback = raw
                .feedback
                .ok_or_else(|| violation(method, "missing feedback field"))?;
            let score = raw
                .score
                .ok_or_else(|| violation(method, "missing score field"))?;
            Ok(BridgePayload::Resume(ResumeReport { feedback, score }))
        }
    }
}
