//! The fixed registry of executor methods.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A method the external executor knows how to perform.
///
/// The wire name (snake_case) is what gets passed as the executor's first
/// positional argument. Four methods back the asynchronous task kinds; the
/// remaining two ([`SearchSimilarChunks`](BridgeMethod::SearchSimilarChunks)
/// and [`GenerateChatResponse`](BridgeMethod::GenerateChatResponse)) serve
/// the synchronous document-chat flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BridgeMethod {
    ProcessDocument,
    SearchSimilarChunks,
    GenerateChatResponse,
    GenerateSqlFromNaturalLanguage,
    ConductResearch,
    AnalyzeResume,
}

impl BridgeMethod {
    /// The wire name passed to the executor.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessDocument => "process_document",
            Self::SearchSimilarChunks => "search_similar_chunks",
            Self::GenerateChatResponse => "generate_chat_response",
            Self::GenerateSqlFromNaturalLanguage => "generate_sql_from_natural_language",
            Self::ConductResearch => "conduct_research",
            Self::AnalyzeResume => "analyze_resume",
        }
    }
}
