//! Video capture stage.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PipelineStage, ARTIFACT_ANIMATED_MARKUP, ARTIFACT_VIDEO_BYTES, ARTIFACT_VIDEO_PATH};
use crate::backend::RenderBackend;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::PipelineRecord;

/// Records the animated diagram to a video file.
pub struct CaptureStage {
    backend: Arc<dyn RenderBackend>,
}

impl CaptureStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PipelineStage for CaptureStage {
    fn name(&self) -> &'static str {
        "capture"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        if !record.animated {
            return Err(PipelineError::Precondition(
                "capture requires the animation to be applied first".to_string(),
            ));
        }
        let Some(markup) = record
            .artifact_str(ARTIFACT_ANIMATED_MARKUP)
            .map(String::from)
        else {
            return Err(PipelineError::Precondition(
                "capture requires the animated markup artifact".to_string(),
            ));
        };
        let Some(directive) = record.animation else {
            return Err(PipelineError::Precondition(
                "capture requires an animation directive".to_string(),
            ));
        };

        let output = self.backend.capture(&markup, &directive).await?;

        tracing::info!(
            run_id = %record.run_id,
            video_path = %output.video_path.display(),
            byte_len = output.byte_len,
            "video captured"
        );
        record.set_artifact(
            ARTIFACT_VIDEO_PATH,
            serde_json::Value::String(output.video_path.display().to_string()),
        );
        record.set_artifact(ARTIFACT_VIDEO_BYTES, serde_json::json!(output.byte_len));
        record.video_location = Some(output.video_path);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnimationDirective, InputKind};
    use crate::testing::mocks::RecordingBackend;

    #[tokio::test]
    async fn capture_requires_animated_flag() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = CaptureStage::new(backend.clone());

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.rendered = true;

        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(backend.capture_calls(), 0);
    }

    #[tokio::test]
    async fn capture_writes_video_location() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new(dir.path().to_path_buf()));
        let stage = CaptureStage::new(backend.clone());

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.rendered = true;
        record.animated = true;
        record.animation = Some(AnimationDirective::with_duration(5.0));
        record.set_artifact(
            ARTIFACT_ANIMATED_MARKUP,
            serde_json::Value::String("<svg/>".to_string()),
        );

        let record = stage.run(record).await.unwrap();
        assert!(record.video_location.is_some());
        assert!(record.artifacts.contains_key(ARTIFACT_VIDEO_BYTES));
        assert_eq!(backend.capture_calls(), 1);
    }
}
