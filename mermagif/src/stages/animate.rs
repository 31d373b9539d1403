//! Animation injection stage.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PipelineStage, ARTIFACT_ANIMATED_MARKUP, ARTIFACT_RENDER_MARKUP};
use crate::backend::RenderBackend;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::PipelineRecord;

/// Applies the animation effect to the rendered markup.
pub struct AnimateStage {
    backend: Arc<dyn RenderBackend>,
}

impl AnimateStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineStage for AnimateStage {
    fn name(&self) -> &'static str {
        "animate"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        if !record.rendered {
            return Err(PipelineError::Precondition(
                "animate requires the diagram to be rendered first".to_string(),
            ));
        }
        let Some(markup) = record.artifact_str(ARTIFACT_RENDER_MARKUP).map(String::from)
        else {
            return Err(PipelineError::Precondition(
                "animate requires the rendered markup artifact".to_string(),
            ));
        };
        let Some(directive) = record.animation else {
            return Err(PipelineError::Precondition(
                "animate requires an animation directive".to_string(),
            ));
        };

        let animated = self.backend.animate(&markup, &directive).await?;

        tracing::info!(
            run_id = %record.run_id,
            markup_len = animated.len(),
            "animation applied"
        );
        record.set_artifact(
            ARTIFACT_ANIMATED_MARKUP,
            serde_json::Value::String(animated),
        );
        record.animated = true;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnimationDirective, InputKind};
    use crate::testing::mocks::RecordingBackend;

    #[tokio::test]
    async fn animate_on_unrendered_record_fails_without_backend_call() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = AnimateStage::new(backend.clone());

        let record = PipelineRecord::new("x", InputKind::DiagramSource);
        let err = stage.run(record).await.unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(backend.animate_calls(), 0);
    }

    #[tokio::test]
    async fn animate_sets_flag_and_artifact() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = AnimateStage::new(backend.clone());

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.rendered = true;
        record.animation = Some(AnimationDirective::with_duration(5.0));
        record.set_artifact(
            ARTIFACT_RENDER_MARKUP,
            serde_json::Value::String("<svg/>".to_string()),
        );

        let record = stage.run(record).await.unwrap();
        assert!(record.animated);
        assert!(record.artifact_str(ARTIFACT_ANIMATED_MARKUP).is_some());
        assert_eq!(backend.animate_calls(), 1);
    }
}
