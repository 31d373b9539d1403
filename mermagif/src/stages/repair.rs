//! Diagram source repair stage.
//!
//! The only retryable segment of the pipeline runs through here. The stage
//! accounts for its own attempts: the counter is bumped on entry and checked
//! against the ceiling before any external call, so a ceiling of N permits
//! exactly N repair calls before forced failure.

use std::sync::Arc;

use async_trait::async_trait;

use super::PipelineStage;
use crate::errors::{PipelineError, PipelineResult};
use crate::llm::DiagramGenerator;
use crate::record::PipelineRecord;

/// Calls the repair collaborator with the current source and the
/// validator's issue list.
pub struct RepairStage {
    generator: Arc<dyn DiagramGenerator>,
    ceiling: u32,
}

impl RepairStage {
    /// Creates the stage with the configured retry ceiling.
    #[must_use]
    pub fn new(generator: Arc<dyn DiagramGenerator>, ceiling: u32) -> Self {
        Self { generator, ceiling }
    }
}

#[async_trait]
impl PipelineStage for RepairStage {
    fn name(&self) -> &'static str {
        "repair"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        record.attempt_count += 1;
        if record.attempt_count > self.ceiling {
            tracing::warn!(
                run_id = %record.run_id,
                attempts = record.attempt_count,
                ceiling = self.ceiling,
                "repair ceiling exceeded"
            );
            return Err(PipelineError::RetryExhausted {
                attempts: record.attempt_count,
                ceiling: self.ceiling,
            });
        }

        let Some(source) = record.diagram_source.clone().filter(|s| !s.trim().is_empty())
        else {
            return Err(PipelineError::Precondition(
                "repair requires non-empty diagram source".to_string(),
            ));
        };
        if record.validation_errors.is_empty() {
            return Err(PipelineError::Precondition(
                "repair requires a non-empty validation issue list".to_string(),
            ));
        }

        tracing::info!(
            run_id = %record.run_id,
            attempt = record.attempt_count,
            issue_count = record.validation_errors.len(),
            "repairing diagram source"
        );

        let fixed = self
            .generator
            .repair(&source, &record.validation_errors)
            .await?;

        record.diagram_source = Some(fixed);
        // Cleared so the next validation round never sees stale issues.
        record.validation_errors.clear();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InputKind;
    use crate::testing::mocks::ScriptedGenerator;
    use crate::validator::{IssueKind, ValidationIssue};

    fn invalid_record() -> PipelineRecord {
        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.diagram_source = Some("A --> B".to_string());
        record.validation_errors = vec![ValidationIssue::new(
            IssueKind::MissingDiagramType,
            "no type",
            1,
        )];
        record
    }

    #[tokio::test]
    async fn repair_overwrites_source_and_clears_issues() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_repair_source("graph TD\nA --> B");

        let stage = RepairStage::new(generator.clone(), 2);
        let record = stage.run(invalid_record()).await.unwrap();

        assert_eq!(record.diagram_source.as_deref(), Some("graph TD\nA --> B"));
        assert!(record.validation_errors.is_empty());
        assert_eq!(record.attempt_count, 1);
        assert_eq!(generator.repair_calls(), 1);
    }

    #[tokio::test]
    async fn ceiling_check_runs_before_the_external_call() {
        let generator = Arc::new(ScriptedGenerator::new());
        let stage = RepairStage::new(generator.clone(), 2);

        let mut record = invalid_record();
        record.attempt_count = 2;

        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RetryExhausted { attempts: 3, ceiling: 2 }
        ));
        assert_eq!(generator.repair_calls(), 0);
    }

    #[tokio::test]
    async fn missing_preconditions_fail_locally() {
        let generator = Arc::new(ScriptedGenerator::new());
        let stage = RepairStage::new(generator.clone(), 2);

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.validation_errors = vec![ValidationIssue::new(
            IssueKind::MissingDiagramType,
            "no type",
            1,
        )];
        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.diagram_source = Some("A --> B".to_string());
        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        assert_eq!(generator.repair_calls(), 0);
    }
}
