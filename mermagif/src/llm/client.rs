//! HTTP client for an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::prompts::{GENERATE_SYSTEM_PROMPT, REPAIR_SYSTEM_PROMPT};
use super::{format_validation_issues, DiagramGenerator, GenerationOutcome};
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::{AnimationDirective, AnimationPreset};
use crate::validator::ValidationIssue;

/// Chat-completions-backed implementation of [`DiagramGenerator`].
pub struct HttpDiagramGenerator {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpDiagramGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDiagramGenerator")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl HttpDiagramGenerator {
    /// Creates a generator from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.llm_timeout,
        })
    }

    /// Sends one chat completion request and returns the message content.
    async fn complete(&self, system: &str, user: String) -> PipelineResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.2,
            "max_tokens": 2000,
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        // reqwest's own timeout is a backstop; the explicit race keeps the
        // timeout error distinct from transport failures.
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| PipelineError::GenerationTimeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::GenerationTimeout {
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    PipelineError::Generation(format!("completion request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Generation(format!(
                "completion request returned {status}: {}",
                detail.trim()
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            PipelineError::GenerationResponse(format!("unparseable completion body: {e}"))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::GenerationResponse("completion had no choices".to_string())
            })
    }
}

#[async_trait]
impl DiagramGenerator for HttpDiagramGenerator {
    async fn generate(&self, prompt: &str) -> PipelineResult<GenerationOutcome> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::Generation("prompt is empty".to_string()));
        }

        let user = format!("Convert this to a Mermaid diagram:\n\n{prompt}");
        let content = self.complete(GENERATE_SYSTEM_PROMPT, user).await?;
        parse_generation_payload(&content)
    }

    async fn repair(&self, source: &str, errors: &[ValidationIssue]) -> PipelineResult<String> {
        let user = format!(
            "Fix the following Mermaid diagram:\n\n```mermaid\n{source}\n```\n\n\
             Errors found:\n{}\n\nReturn the fixed Mermaid code.",
            format_validation_issues(errors)
        );
        let content = self.complete(REPAIR_SYSTEM_PROMPT, user).await?;
        parse_repair_payload(&content)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerationPayload {
    diagram: Option<String>,
    animation: Option<AnimationPayload>,
}

#[derive(Debug, Deserialize)]
struct AnimationPayload {
    duration: Option<f64>,
    preset: Option<String>,
}

/// Parses the structured generation payload out of the completion content.
///
/// # Errors
///
/// `GenerationResponse` when the content is not JSON or lacks the mandatory
/// `diagram` field.
pub(crate) fn parse_generation_payload(content: &str) -> PipelineResult<GenerationOutcome> {
    let payload: GenerationPayload = serde_json::from_str(content).map_err(|e| {
        PipelineError::GenerationResponse(format!("response is not valid JSON: {e}"))
    })?;

    let diagram_source = payload.diagram.filter(|d| !d.trim().is_empty()).ok_or_else(|| {
        PipelineError::GenerationResponse("response missing 'diagram' field".to_string())
    })?;

    let animation = payload.animation.map(|a| AnimationDirective {
        duration_secs: a.duration.unwrap_or(5.0),
        preset: a
            .preset
            .as_deref()
            .map(AnimationPreset::from_name)
            .unwrap_or_default(),
    });

    Ok(GenerationOutcome {
        diagram_source,
        animation,
    })
}

/// Parses the repair payload; only the `diagram` field is mandatory.
pub(crate) fn parse_repair_payload(content: &str) -> PipelineResult<String> {
    let outcome = parse_generation_payload(content)?;
    Ok(outcome.diagram_source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_animation_parses_fully() {
        let content = r#"{"diagram": "graph TD\nA --> B", "animation": {"duration": 7.5, "preset": "fast"}}"#;
        let outcome = parse_generation_payload(content).unwrap();
        assert_eq!(outcome.diagram_source, "graph TD\nA --> B");
        let animation = outcome.animation.unwrap();
        assert!((animation.duration_secs - 7.5).abs() < f64::EPSILON);
        assert_eq!(animation.preset, AnimationPreset::Fast);
    }

    #[test]
    fn payload_without_animation_leaves_directive_unset() {
        let content = r#"{"diagram": "graph TD"}"#;
        let outcome = parse_generation_payload(content).unwrap();
        assert!(outcome.animation.is_none());
    }

    #[test]
    fn missing_diagram_field_is_a_response_error() {
        let content = r#"{"animation": {"duration": 5.0}}"#;
        let err = parse_generation_payload(content).unwrap_err();
        assert!(matches!(err, PipelineError::GenerationResponse(_)));
    }

    #[test]
    fn non_json_content_is_a_response_error() {
        let err = parse_generation_payload("graph TD\nA --> B").unwrap_err();
        assert!(matches!(err, PipelineError::GenerationResponse(_)));
    }

    #[test]
    fn unknown_preset_falls_back_to_default() {
        let content = r#"{"diagram": "graph TD", "animation": {"preset": "sparkle"}}"#;
        let outcome = parse_generation_payload(content).unwrap();
        assert_eq!(
            outcome.animation.unwrap().preset,
            AnimationPreset::Default
        );
    }
}
