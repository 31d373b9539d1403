//! Diagram source validation stage.
//!
//! Validation failures are recoverable: they populate
//! `record.validation_errors` for the retry controller instead of failing
//! the stage. Only a missing source (an upstream bug) is an error here.

use async_trait::async_trait;

use super::PipelineStage;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::PipelineRecord;
use crate::validator::DiagramValidator;

/// Runs the local syntax validator over the current diagram source.
pub struct ValidateStage {
    validator: DiagramValidator,
}

impl ValidateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(validator: DiagramValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl PipelineStage for ValidateStage {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        let Some(source) = record.diagram_source.clone() else {
            return Err(PipelineError::Precondition(
                "validate requires diagram source".to_string(),
            ));
        };

        match self.validator.validate(&source) {
            Ok(()) => {
                record.validation_errors.clear();
                tracing::info!(run_id = %record.run_id, "diagram source is valid");
            }
            Err(issues) => {
                tracing::info!(
                    run_id = %record.run_id,
                    issue_count = issues.len(),
                    "diagram source is invalid"
                );
                record.validation_errors = issues;
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::record::InputKind;
    use crate::validator::IssueKind;

    fn stage() -> ValidateStage {
        ValidateStage::new(DiagramValidator::new(&PipelineConfig::default()))
    }

    #[tokio::test]
    async fn valid_source_clears_previous_issues() {
        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.diagram_source = Some("graph TD\nA --> B".to_string());
        record.validation_errors = vec![crate::validator::ValidationIssue::new(
            IssueKind::MissingDiagramType,
            "stale",
            1,
        )];

        let record = stage().run(record).await.unwrap();
        assert!(record.is_valid());
    }

    #[tokio::test]
    async fn invalid_source_records_issues_without_failing() {
        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.diagram_source = Some("A[unbalanced --> B".to_string());

        let record = stage().run(record).await.unwrap();
        assert!(!record.is_valid());
        assert!(record.errors.is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_a_precondition_error() {
        let record = PipelineRecord::new("x", InputKind::DiagramSource);
        let err = stage().run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }
}
