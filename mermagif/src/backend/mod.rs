//! Rendering backend: the external render/animate/capture/transcode
//! collaborators behind one pluggable interface.
//!
//! The pipeline core treats these operations as black boxes; any strategy
//! that can turn diagram source into markup, animate it, record it, and
//! encode a looping GIF can implement [`RenderBackend`].

mod chromium;

pub use chromium::ChromiumBackend;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::PipelineResult;
use crate::record::AnimationDirective;

/// Result of a successful capture operation.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Path to the recorded video.
    pub video_path: PathBuf,
    /// Size of the recorded video in bytes.
    pub byte_len: u64,
}

/// The external rendering/animation/capture/transcode collaborator.
///
/// Implementations own their sessions end to end: resources acquired for an
/// operation are released before it returns, on both success and failure.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Renders diagram source into self-contained markup with an embedded
    /// vector graphic.
    ///
    /// # Errors
    ///
    /// `Rendering` when the diagram cannot be rendered.
    async fn render(&self, source: &str) -> PipelineResult<String>;

    /// Injects the animation effect into rendered markup, parameterized by
    /// the directive.
    ///
    /// # Errors
    ///
    /// `Animation` when the markup cannot be animated.
    async fn animate(
        &self,
        markup: &str,
        directive: &AnimationDirective,
    ) -> PipelineResult<String>;

    /// Records the animated markup for the directive's duration plus lead
    /// and tail buffers.
    ///
    /// # Errors
    ///
    /// `Capture` when recording fails.
    async fn capture(
        &self,
        markup: &str,
        directive: &AnimationDirective,
    ) -> PipelineResult<CaptureOutput>;

    /// Converts the captured video into a looping GIF at `output`,
    /// returning the GIF's byte size.
    ///
    /// # Errors
    ///
    /// `Encoding` when conversion fails or produces an empty file.
    async fn transcode(
        &self,
        video: &Path,
        output: &Path,
        fps: u32,
        duration_secs: f64,
    ) -> PipelineResult<u64>;
}
