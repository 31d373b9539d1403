//! Prompt-to-diagram generation stage.

use std::sync::Arc;

use async_trait::async_trait;

use super::PipelineStage;
use crate::errors::PipelineResult;
use crate::llm::DiagramGenerator;
use crate::record::{AnimationDirective, PipelineRecord};

/// Calls the generation collaborator to turn the raw prompt into diagram
/// source and an animation directive.
pub struct GenerateStage {
    generator: Arc<dyn DiagramGenerator>,
    default_directive: AnimationDirective,
}

impl GenerateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        generator: Arc<dyn DiagramGenerator>,
        default_directive: AnimationDirective,
    ) -> Self {
        Self {
            generator,
            default_directive,
        }
    }
}

#[async_trait]
impl PipelineStage for GenerateStage {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        tracing::debug!(run_id = %record.run_id, prompt_len = record.raw_input.len(), "generating diagram source");

        let outcome = self.generator.generate(&record.raw_input).await?;

        tracing::info!(
            run_id = %record.run_id,
            source_len = outcome.diagram_source.len(),
            has_animation = outcome.animation.is_some(),
            "diagram source generated"
        );

        record.diagram_source = Some(outcome.diagram_source);
        record.animation = Some(outcome.animation.unwrap_or(self.default_directive));
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnimationPreset, InputKind};
    use crate::testing::mocks::ScriptedGenerator;

    #[tokio::test]
    async fn generation_fills_source_and_defaults_directive() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_generate_source("graph TD\nA --> B");

        let stage = GenerateStage::new(generator.clone(), AnimationDirective::with_duration(5.0));
        let record = PipelineRecord::new("draw a flow", InputKind::Prompt);
        let record = stage.run(record).await.unwrap();

        assert_eq!(record.diagram_source.as_deref(), Some("graph TD\nA --> B"));
        let directive = record.animation.unwrap();
        assert!((directive.duration_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(directive.preset, AnimationPreset::Default);
        assert_eq!(generator.generate_calls(), 1);
    }
}
