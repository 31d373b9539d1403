//! Pipeline stages.
//!
//! Each stage consumes the pipeline record, does one unit of work, and
//! returns the updated record. Stages validate their own preconditions and
//! fail fast with a precondition error before touching any collaborator.

mod animate;
mod capture;
mod generate;
mod plan;
mod render;
mod repair;
mod transcode;
mod validate;

pub use animate::AnimateStage;
pub use capture::CaptureStage;
pub use generate::GenerateStage;
pub use plan::AnimatePlanStage;
pub use render::RenderStage;
pub use repair::RepairStage;
pub use transcode::TranscodeStage;
pub use validate::ValidateStage;

use async_trait::async_trait;

use crate::errors::PipelineResult;
use crate::record::PipelineRecord;

/// Artifact key for markup produced by the render stage.
pub const ARTIFACT_RENDER_MARKUP: &str = "render_markup";
/// Artifact key for markup produced by the animate stage.
pub const ARTIFACT_ANIMATED_MARKUP: &str = "animated_markup";
/// Artifact key for the captured video path.
pub const ARTIFACT_VIDEO_PATH: &str = "video_path";
/// Artifact key for the captured video byte size.
pub const ARTIFACT_VIDEO_BYTES: &str = "video_bytes";
/// Artifact key for the final GIF byte size.
pub const ARTIFACT_GIF_BYTES: &str = "gif_bytes";

/// One unit of pipeline work.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Stage name used in logs and accumulated error messages.
    fn name(&self) -> &'static str;

    /// Executes the stage against the record.
    ///
    /// # Errors
    ///
    /// A stage-specific [`crate::errors::PipelineError`]; every error from
    /// a stage other than validation is fatal to the run.
    async fn run(&self, record: PipelineRecord) -> PipelineResult<PipelineRecord>;
}
