//! Mapping between task kinds and executor methods.
//!
//! One task kind maps to one executor method; the argument object uses the
//! parameter names the executor expects, which differ from the task input
//! field names in places (`research_query` vs `query`).

use serde_json::{json, Value};

use courier_bridge::{BridgeMethod, BridgePayload};
use courier_core::{CourierError, Result, TaskInput, TaskKind, TaskResult};

/// The executor call (method + argument object) for a task input.
pub fn bridge_call_for(input: &TaskInput) -> (BridgeMethod, Value) {
    match input {
        TaskInput::DocumentIngest {
            document_id,
            file_path,
        } => (
            BridgeMethod::ProcessDocument,
            json!({
                "document_id": document_id,
                "file_path": file_path,
            }),
        ),
        TaskInput::Research { query } => (
            BridgeMethod::ConductResearch,
            json!({ "research_query": query }),
        ),
        TaskInput::ResumeAnalysis {
            resume_path,
            job_description,
        } => (
            BridgeMethod::AnalyzeResume,
            json!({
                "resume_path": resume_path,
                "job_description": job_description,
            }),
        ),
        TaskInput::QueryTranslation { natural_query } => (
            BridgeMethod::GenerateSqlFromNaturalLanguage,
            json!({ "natural_query": natural_query }),
        ),
    }
}

/// Converts a decoded executor payload into the task's result type.
///
/// A payload of the wrong shape for the kind is a protocol violation; the
/// decoder already matched the method, so this only fires if the kind/method
/// mapping itself is violated.
pub fn result_from_payload(kind: TaskKind, payload: BridgePayload) -> Result<TaskResult> {
    match (kind, payload) {
        (TaskKind::DocumentIngest, BridgePayload::Ingest(receipt)) => {
            Ok(TaskResult::DocumentIngest {
                success: receipt.success,
            })
        }
        (TaskKind::Research, BridgePayload::Generation(out)) => Ok(TaskResult::Research {
            report: out.response,
        }),
        (TaskKind::ResumeAnalysis, BridgePayload::Resume(report)) => {
            Ok(TaskResult::ResumeAnalysis {
                feedback: report.feedback,
                score: report.score,
            })
        }
        (TaskKind::QueryTranslation, BridgePayload::Generation(out)) => {
            Ok(TaskResult::QueryTranslation { sql: out.response })
        }
        (kind, payload) => Err(CourierError::BridgeProtocolViolation(format!(
            "payload {payload:?} does not fit {kind} task"
        ))),
    }
}
