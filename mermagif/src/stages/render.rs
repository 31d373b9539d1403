//! Diagram rendering stage.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PipelineStage, ARTIFACT_RENDER_MARKUP};
use crate::backend::RenderBackend;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::PipelineRecord;

/// Renders the validated diagram source into markup with an embedded
/// vector graphic.
pub struct RenderStage {
    backend: Arc<dyn RenderBackend>,
}

impl RenderStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineStage for RenderStage {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        let Some(source) = record.diagram_source.clone().filter(|s| !s.trim().is_empty())
        else {
            return Err(PipelineError::Precondition(
                "render requires non-empty diagram source".to_string(),
            ));
        };

        let markup = self.backend.render(&source).await?;

        tracing::info!(
            run_id = %record.run_id,
            markup_len = markup.len(),
            "diagram rendered"
        );
        record.set_artifact(ARTIFACT_RENDER_MARKUP, serde_json::Value::String(markup));
        record.rendered = true;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InputKind;
    use crate::testing::mocks::RecordingBackend;

    #[tokio::test]
    async fn render_sets_flag_and_stores_markup() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = RenderStage::new(backend.clone());

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.diagram_source = Some("graph TD\nA --> B".to_string());

        let record = stage.run(record).await.unwrap();
        assert!(record.rendered);
        assert!(record.artifact_str(ARTIFACT_RENDER_MARKUP).is_some());
        assert_eq!(backend.render_calls(), 1);
    }

    #[tokio::test]
    async fn render_without_source_fails_fast() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = RenderStage::new(backend.clone());

        let record = PipelineRecord::new("x", InputKind::DiagramSource);
        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(backend.render_calls(), 0);
    }
}
