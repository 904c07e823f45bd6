//! Normalized explanation request.

use serde::Deserialize;
use tracing::debug;

/// Question used when the caller does not ask one.
pub const DEFAULT_QUESTION: &str = "Why is my refund taking longer than expected?";

/// One explanation request, validated once at stream start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRequest {
    filing_id: Option<String>,
    question: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExplainBody {
    #[serde(default, alias = "filing_id")]
    return_id: Option<String>,
    #[serde(default)]
    question: Option<String>,
}

impl ExplanationRequest {
    /// Builds a request; blank values count as absent.
    pub fn new(filing_id: Option<String>, question: Option<String>) -> Self {
        let filing_id = filing_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());
        let question = question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| DEFAULT_QUESTION.to_string());
        Self { filing_id, question }
    }

    /// Parses a `{"return_id": .., "question": ..}` body. An empty or malformed
    /// body yields the defaults instead of an error.
    pub fn from_json_lenient(body: &[u8]) -> Self {
        let parsed = if body.iter().all(u8::is_ascii_whitespace) {
            ExplainBody::default()
        } else {
            serde_json::from_slice(body).unwrap_or_else(|e| {
                debug!(error = %e, "Ignoring malformed explain body");
                ExplainBody::default()
            })
        };
        Self::new(parsed.return_id, parsed.question)
    }

    pub fn filing_id(&self) -> Option<&str> {
        self.filing_id.as_deref()
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

impl Default for ExplanationRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}
