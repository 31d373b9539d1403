//! Animation planning stage.
//!
//! Normalizes the animation directive: whatever upstream produced (or
//! didn't), a directive is guaranteed to exist after this stage.

use async_trait::async_trait;

use super::PipelineStage;
use crate::errors::PipelineResult;
use crate::record::{AnimationDirective, PipelineRecord};

/// Ensures the record carries an animation directive before rendering.
pub struct AnimatePlanStage {
    default_directive: AnimationDirective,
}

impl AnimatePlanStage {
    /// Creates the stage with the configured default directive.
    #[must_use]
    pub fn new(default_directive: AnimationDirective) -> Self {
        Self { default_directive }
    }
}

#[async_trait]
impl PipelineStage for AnimatePlanStage {
    fn name(&self) -> &'static str {
        "animate_plan"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        let directive = record.animation.unwrap_or(self.default_directive);
        tracing::debug!(
            run_id = %record.run_id,
            duration_secs = directive.duration_secs,
            preset = ?directive.preset,
            "animation planned"
        );
        record.animation = Some(directive);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnimationPreset, InputKind};

    #[tokio::test]
    async fn missing_directive_gets_the_default() {
        let stage = AnimatePlanStage::new(AnimationDirective::with_duration(5.0));
        let record = PipelineRecord::new("x", InputKind::DiagramSource);
        let record = stage.run(record).await.unwrap();
        assert!(record.animation.is_some());
    }

    #[tokio::test]
    async fn existing_directive_is_preserved() {
        let stage = AnimatePlanStage::new(AnimationDirective::with_duration(5.0));
        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.animation = Some(AnimationDirective {
            duration_secs: 8.0,
            preset: AnimationPreset::Slow,
        });

        let record = stage.run(record).await.unwrap();
        let directive = record.animation.unwrap();
        assert!((directive.duration_secs - 8.0).abs() < f64::EPSILON);
        assert_eq!(directive.preset, AnimationPreset::Slow);
    }
}
