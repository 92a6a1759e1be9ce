//! Analysis engine seam
//!
//! The engine turns an encoded image into a JSON payload describing the
//! document. It is an external black box: this module defines the contract
//! the core consumes, and the host application supplies the real client
//! (a vision model behind an HTTP API).
//!
//! `MockEngine` returns preconfigured responses for testing.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A still image, base64 encoded for transport to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: STANDARD.encode(bytes),
        }
    }

    /// JPEG bytes, the format cameras hand back
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes, "image/jpeg")
    }

    /// `data:` URL form accepted by vision model APIs
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Errors from engine calls
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine not available: {0}")]
    Unavailable(String),
    #[error("analysis failed: {0}")]
    AnalysisFailure(String),
}

/// Contract for the external analysis engine
///
/// Calls are not retried here; a failed attempt is terminal and the caller
/// decides whether to try again.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Identifier recorded as the record's `model`
    fn model(&self) -> &str;

    /// Analyze an image, returning the engine's textual response
    ///
    /// The response should contain a JSON object of the form
    /// `{documentType, confidence, languages, data, rawText, additionalInfo}`.
    async fn analyze(&self, image: &EncodedImage) -> Result<String, EngineError>;

    /// Revise a record's `data` from free-text user corrections
    ///
    /// Returns the engine's textual response holding the updated object.
    async fn enhance(&self, data: &Value, corrections: &str) -> Result<String, EngineError>;
}

type Scripted = (Result<String, String>, Option<Duration>);

/// Mock engine for testing: replays scripted responses in order
pub struct MockEngine {
    model: String,
    analyses: Mutex<VecDeque<Scripted>>,
    enhancements: Mutex<VecDeque<Scripted>>,
}

impl MockEngine {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            analyses: Mutex::new(VecDeque::new()),
            enhancements: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a successful analysis response
    pub fn with_analysis(self, response: impl Into<String>) -> Self {
        self.push_analysis(Ok(response.into()), None)
    }

    /// Queue a successful analysis response that arrives after `delay`
    pub fn with_delayed_analysis(self, response: impl Into<String>, delay: Duration) -> Self {
        self.push_analysis(Ok(response.into()), Some(delay))
    }

    /// Queue a failed analysis
    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.push_analysis(Err(reason.into()), None)
    }

    /// Queue a successful enhancement response
    pub fn with_enhancement(mut self, response: impl Into<String>) -> Self {
        if let Ok(queue) = self.enhancements.get_mut() {
            queue.push_back((Ok(response.into()), None));
        }
        self
    }

    fn push_analysis(mut self, result: Result<String, String>, delay: Option<Duration>) -> Self {
        if let Ok(queue) = self.analyses.get_mut() {
            queue.push_back((result, delay));
        }
        self
    }

    async fn replay(queue: &Mutex<VecDeque<Scripted>>, what: &str) -> Result<String, EngineError> {
        let next = {
            let mut queue = queue
                .lock()
                .map_err(|_| EngineError::Unavailable("mock engine poisoned".to_string()))?;
            queue.pop_front()
        };

        let (result, delay) = next.ok_or_else(|| {
            EngineError::Unavailable(format!("no scripted {} response left", what))
        })?;

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map_err(EngineError::AnalysisFailure)
    }
}

#[async_trait]
impl AnalysisEngine for MockEngine {
    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, _image: &EncodedImage) -> Result<String, EngineError> {
        Self::replay(&self.analyses, "analysis").await
    }

    async fn enhance(&self, _data: &Value, _corrections: &str) -> Result<String, EngineError> {
        Self::replay(&self.enhancements, "enhancement").await
    }
}
