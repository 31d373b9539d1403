//! GIF transcode stage: the pipeline's terminal artifact producer.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::{PipelineStage, ARTIFACT_GIF_BYTES};
use crate::backend::RenderBackend;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::PipelineRecord;

/// Converts the captured video into the final looping GIF.
pub struct TranscodeStage {
    backend: Arc<dyn RenderBackend>,
    fps: u32,
    default_duration_secs: f64,
    /// Explicit output path; defaults to a `.gif` sibling of the video.
    output_override: Option<PathBuf>,
}

impl TranscodeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        fps: u32,
        default_duration_secs: f64,
        output_override: Option<PathBuf>,
    ) -> Self {
        Self {
            backend,
            fps,
            default_duration_secs,
            output_override,
        }
    }
}

#[async_trait]
impl PipelineStage for TranscodeStage {
    fn name(&self) -> &'static str {
        "transcode"
    }

    async fn run(&self, mut record: PipelineRecord) -> PipelineResult<PipelineRecord> {
        let Some(video) = record.video_location.clone() else {
            return Err(PipelineError::Precondition(
                "transcode requires a captured video location".to_string(),
            ));
        };

        let output = match &self.output_override {
            Some(path) => path.clone(),
            None => video.with_extension("gif"),
        };
        let duration = record
            .animation
            .map_or(self.default_duration_secs, |d| d.duration_secs);

        let gif_bytes = self
            .backend
            .transcode(&video, &output, self.fps, duration)
            .await?;

        tracing::info!(
            run_id = %record.run_id,
            output = %output.display(),
            gif_bytes,
            "GIF encoded"
        );
        record.set_artifact(ARTIFACT_GIF_BYTES, serde_json::json!(gif_bytes));
        record.output_location = Some(output);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InputKind;
    use crate::testing::mocks::RecordingBackend;

    #[tokio::test]
    async fn transcode_requires_video_location() {
        let backend = Arc::new(RecordingBackend::new(std::env::temp_dir()));
        let stage = TranscodeStage::new(backend.clone(), 30, 5.0, None);

        let record = PipelineRecord::new("x", InputKind::DiagramSource);
        let err = stage.run(record).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
        assert_eq!(backend.transcode_calls(), 0);
    }

    #[tokio::test]
    async fn transcode_defaults_output_next_to_video() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new(dir.path().to_path_buf()));
        let stage = TranscodeStage::new(backend.clone(), 30, 5.0, None);

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.video_location = Some(dir.path().join("capture.webm"));

        let record = stage.run(record).await.unwrap();
        assert_eq!(
            record.output_location,
            Some(dir.path().join("capture.gif"))
        );
        assert!(record.artifacts.contains_key(ARTIFACT_GIF_BYTES));
    }

    #[tokio::test]
    async fn explicit_output_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::new(dir.path().to_path_buf()));
        let wanted = dir.path().join("final.gif");
        let stage = TranscodeStage::new(backend.clone(), 30, 5.0, Some(wanted.clone()));

        let mut record = PipelineRecord::new("x", InputKind::DiagramSource);
        record.video_location = Some(dir.path().join("capture.webm"));

        let record = stage.run(record).await.unwrap();
        assert_eq!(record.output_location, Some(wanted));
    }
}
