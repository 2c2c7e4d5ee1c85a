use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{CompletionError, Result};
use crate::models::GenerateRequest;
use crate::transport::{GeminiTransport, Transport};

/// One prompt in, one completion text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn request_completion(&self, prompt: &str) -> std::result::Result<String, CompletionError>;
}

pub struct GeminiCompletion {
    tx: Arc<dyn Transport>,
    model: String,
    temperature: Option<f32>,
}

impl GeminiCompletion {
    pub fn new(tx: Arc<dyn Transport>, model: String, temperature: Option<f32>) -> Self {
        Self {
            tx,
            model,
            temperature,
        }
    }

    /// Build the HTTPS client. Fails when the credential is missing.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let transport = GeminiTransport::new(
            cfg.gemini.api_key.clone(),
            cfg.gemini.base_url.clone(),
            cfg.request_timeout(),
        )?;
        Ok(Self::new(
            Arc::new(transport),
            cfg.gemini.model.clone(),
            cfg.gemini.temperature,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for GeminiCompletion {
    async fn request_completion(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        tracing::info!("Requesting completion from {} ({} prompt chars)", self.model, prompt.len());

        let request = GenerateRequest::from_prompt(prompt, self.temperature);
        let response = self.tx.generate(&self.model, &request).await.map_err(|e| {
            tracing::error!("Error calling generation API: {}", e);
            CompletionError::new()
        })?;

        response.text().ok_or_else(|| {
            tracing::error!(
                "Generation API returned no completion text ({} candidates)",
                response.candidates.len()
            );
            CompletionError::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{COMPLETION_FAILED_MESSAGE, SqleanError};
    use crate::models::{Candidate, Content, GenerateResponse, Part};
    use std::io::Write;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    // Mock Transport for testing
    struct MockTransport {
        responses: Mutex<Vec<Result<GenerateResponse>>>,
        seen: Mutex<Vec<(String, GenerateRequest)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<GenerateResponse>>) -> Self {
            MockTransport {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().expect("mock mutex should not be poisoned").len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn generate(&self, model: &str, req: &GenerateRequest) -> Result<GenerateResponse> {
            self.seen
                .lock()
                .expect("mock mutex should not be poisoned")
                .push((model.to_string(), req.clone()));
            self.responses
                .lock()
                .expect("mock mutex should not be poisoned")
                .pop()
                .unwrap_or_else(|| Err(SqleanError::Other(anyhow::anyhow!("No more mock responses"))))
        }
    }

    // Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log mutex should not be poisoned")).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log mutex should not be poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn text_response(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.to_string()),
                    }],
                }),
            }],
        }
    }

    #[tokio::test]
    async fn test_success_returns_text_and_sends_prompt() {
        let tx = Arc::new(MockTransport::new(vec![Ok(text_response("### Summary\nok"))]));
        let client = GeminiCompletion::new(tx.clone(), "gemini-2.5-flash".to_string(), Some(0.1));

        let text = client.request_completion("PROMPT").await.expect("completion");
        assert_eq!(text, "### Summary\nok");

        let seen = tx.seen.lock().expect("mock mutex should not be poisoned");
        assert_eq!(seen[0].0, "gemini-2.5-flash");
        assert_eq!(seen[0].1, GenerateRequest::from_prompt("PROMPT", Some(0.1)));
    }

    #[tokio::test]
    async fn test_transport_failures_are_normalized() {
        for failure in [
            SqleanError::Api {
                status: 403,
                body: "PERMISSION_DENIED".to_string(),
            },
            SqleanError::Serialization(
                serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json"),
            ),
        ] {
            let tx = Arc::new(MockTransport::new(vec![Err(failure)]));
            let client = GeminiCompletion::new(tx, "m".to_string(), None);
            let err = client.request_completion("p").await.expect_err("should fail");
            assert_eq!(err.message(), COMPLETION_FAILED_MESSAGE);
            assert!(!err.to_string().contains("PERMISSION_DENIED"));
        }
    }

    #[test]
    fn test_failure_cause_is_logged_but_not_shown() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let tx = Arc::new(MockTransport::new(vec![Err(SqleanError::Api {
            status: 403,
            body: "PERMISSION_DENIED".to_string(),
        })]));
        let client = GeminiCompletion::new(tx, "m".to_string(), None);
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let err = tracing::subscriber::with_default(subscriber, || {
            rt.block_on(client.request_completion("p"))
        })
        .expect_err("should fail");

        let captured = logs.contents();
        assert!(captured.contains("403"), "log was: {captured}");
        assert!(captured.contains("PERMISSION_DENIED"), "log was: {captured}");
        assert!(!err.to_string().contains("PERMISSION_DENIED"));
        assert!(!err.to_string().contains("403"));
        assert_eq!(err.to_string(), COMPLETION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_exhausted_transport_yields_generic_error() {
        let tx = Arc::new(MockTransport::new(Vec::new()));
        let client = GeminiCompletion::new(tx.clone(), "m".to_string(), None);
        let err = client.request_completion("p").await.expect_err("no responses left");
        assert_eq!(err.message(), COMPLETION_FAILED_MESSAGE);
        assert_eq!(tx.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_completion_is_an_error() {
        let tx = Arc::new(MockTransport::new(vec![Ok(GenerateResponse::default())]));
        let client = GeminiCompletion::new(tx, "m".to_string(), None);
        assert!(client.request_completion("p").await.is_err());

        let tx = Arc::new(MockTransport::new(vec![Ok(text_response("   "))]));
        let client = GeminiCompletion::new(tx, "m".to_string(), None);
        assert!(client.request_completion("p").await.is_err());
    }

    #[tokio::test]
    async fn test_identical_prompts_are_not_cached() {
        let tx = Arc::new(MockTransport::new(vec![
            Ok(text_response("second")),
            Ok(text_response("first")),
        ]));
        let client = GeminiCompletion::new(tx.clone(), "m".to_string(), None);
        assert_eq!(client.request_completion("same").await.expect("first call"), "first");
        assert_eq!(client.request_completion("same").await.expect("second call"), "second");
        assert_eq!(tx.calls(), 2);
    }

    #[test]
    fn test_from_config_fails_fast_without_key() {
        let cfg = Config::default();
        let result = GeminiCompletion::from_config(&cfg);
        assert!(matches!(result, Err(SqleanError::Configuration(_))));
    }

    #[test]
    fn test_from_config_with_key() {
        let mut cfg = Config::default();
        cfg.gemini.api_key = "key".to_string();
        let client = GeminiCompletion::from_config(&cfg).expect("client");
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
