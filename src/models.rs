use serde::{Deserialize, Serialize};

use crate::dialect::DialectSelection;
use crate::error::{EMPTY_QUERY_MESSAGE, Result, SqleanError};
use crate::render::SafeHtml;

// Gemini generateContent request format
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// Single user turn carrying the whole prompt.
    pub fn from_prompt(prompt: &str, temperature: Option<f32>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: temperature.map(|t| GenerationConfig {
                temperature: Some(t),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// Gemini generateContent response format
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts joined. `None` when blank.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// A submitted query waiting on the generation API.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub query_text: String,
    pub dialect: DialectSelection,
}

impl AnalysisRequest {
    /// Rejects blank query text before anything is sent.
    pub fn new(query_text: &str, dialect: DialectSelection) -> Result<Self> {
        if query_text.trim().is_empty() {
            return Err(SqleanError::Validation(EMPTY_QUERY_MESSAGE.to_string()));
        }
        Ok(Self {
            query_text: query_text.to_string(),
            dialect,
        })
    }
}

/// Successful analysis: the model's Markdown and its structural HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub raw_markdown: String,
    pub html: SafeHtml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    Validation,
    Completion,
}

/// Failed analysis. Only the user-facing message is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub message: String,
}

impl From<SqleanError> for AnalysisError {
    fn from(err: SqleanError) -> Self {
        match err {
            SqleanError::Validation(message) => Self {
                kind: AnalysisErrorKind::Validation,
                message,
            },
            SqleanError::Completion(e) => Self {
                kind: AnalysisErrorKind::Completion,
                message: e.message().to_string(),
            },
            other => {
                tracing::error!("Analysis failed: {}", other);
                Self {
                    kind: AnalysisErrorKind::Completion,
                    message: crate::error::COMPLETION_FAILED_MESSAGE.to_string(),
                }
            }
        }
    }
}
