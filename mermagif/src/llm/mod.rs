//! External text-generation collaborator: diagram generation and repair.
//!
//! The pipeline depends only on the [`DiagramGenerator`] trait; the shipped
//! implementation is [`HttpDiagramGenerator`], which talks to an
//! OpenAI-compatible chat completions endpoint.

mod client;
mod prompts;

pub use client::HttpDiagramGenerator;
pub use prompts::{GENERATE_SYSTEM_PROMPT, REPAIR_SYSTEM_PROMPT};

use async_trait::async_trait;

use crate::errors::PipelineResult;
use crate::record::AnimationDirective;
use crate::validator::ValidationIssue;

/// Result of a successful generation call.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The generated diagram source.
    pub diagram_source: String,
    /// Animation directive, when the collaborator supplied one.
    pub animation: Option<AnimationDirective>,
}

/// The external text-generation collaborator.
///
/// Both operations are blocking-with-timeout from the pipeline's point of
/// view; implementations must fail with a timeout-specific error rather
/// than hang.
#[async_trait]
pub trait DiagramGenerator: Send + Sync {
    /// Turns a natural-language prompt into diagram source.
    ///
    /// # Errors
    ///
    /// `Generation` for an empty prompt or transport failure,
    /// `GenerationTimeout` when the call exceeds the configured timeout,
    /// `GenerationResponse` when the payload is malformed.
    async fn generate(&self, prompt: &str) -> PipelineResult<GenerationOutcome>;

    /// Repairs invalid diagram source given the validator's issue list.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DiagramGenerator::generate`].
    async fn repair(&self, source: &str, errors: &[ValidationIssue]) -> PipelineResult<String>;
}

/// Serializes validation issues as a numbered list for the repair prompt:
/// `1. [kind] Line <n>: <message>`, in input order.
#[must_use]
pub fn format_validation_issues(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return "No specific errors provided".to_string();
    }

    issues
        .iter()
        .enumerate()
        .map(|(index, issue)| {
            format!(
                "{}. [{}] Line {}: {}",
                index + 1,
                issue.kind,
                issue.line,
                issue.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::IssueKind;

    #[test]
    fn issues_format_as_numbered_lines_in_input_order() {
        let issues = vec![
            ValidationIssue::new(IssueKind::MissingDiagramType, "no type", 1),
            ValidationIssue::new(IssueKind::MismatchedBrackets, "unbalanced", 3),
        ];
        let formatted = format_validation_issues(&issues);
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines[0], "1. [MissingDiagramType] Line 1: no type");
        assert_eq!(lines[1], "2. [MismatchedBrackets] Line 3: unbalanced");
    }

    #[test]
    fn empty_issue_list_formats_to_placeholder() {
        assert_eq!(
            format_validation_issues(&[]),
            "No specific errors provided"
        );
    }
}
