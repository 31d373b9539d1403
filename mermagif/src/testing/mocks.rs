//! Scripted in-memory doubles for [`DiagramGenerator`] and
//! [`RenderBackend`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::backend::{CaptureOutput, RenderBackend};
use crate::errors::{PipelineError, PipelineResult};
use crate::llm::{DiagramGenerator, GenerationOutcome};
use crate::record::AnimationDirective;
use crate::validator::ValidationIssue;

/// A [`DiagramGenerator`] that replays queued responses.
///
/// Responses are consumed front-to-back, one per call. A call against an
/// empty queue fails with a generation error, which keeps a forgotten
/// script visible in test output instead of silently looping.
#[derive(Default)]
pub struct ScriptedGenerator {
    generate_queue: Mutex<VecDeque<PipelineResult<GenerationOutcome>>>,
    repair_queue: Mutex<VecDeque<PipelineResult<String>>>,
    generate_calls: AtomicUsize,
    repair_calls: AtomicUsize,
}

impl ScriptedGenerator {
    /// Creates a generator with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful generation returning `source` and no
    /// animation directive.
    pub fn push_generate_source(&self, source: &str) {
        self.generate_queue
            .lock()
            .push_back(Ok(GenerationOutcome {
                diagram_source: source.to_string(),
                animation: None,
            }));
    }

    /// Queues a successful generation with an explicit directive.
    pub fn push_generate_outcome(&self, source: &str, animation: AnimationDirective) {
        self.generate_queue
            .lock()
            .push_back(Ok(GenerationOutcome {
                diagram_source: source.to_string(),
                animation: Some(animation),
            }));
    }

    /// Queues a generation failure.
    pub fn push_generate_error(&self, error: PipelineError) {
        self.generate_queue.lock().push_back(Err(error));
    }

    /// Queues a successful repair returning `source`.
    pub fn push_repair_source(&self, source: &str) {
        self.repair_queue.lock().push_back(Ok(source.to_string()));
    }

    /// Queues a repair failure.
    pub fn push_repair_error(&self, error: PipelineError) {
        self.repair_queue.lock().push_back(Err(error));
    }

    /// Number of `generate` calls observed.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of `repair` calls observed.
    #[must_use]
    pub fn repair_calls(&self) -> usize {
        self.repair_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagramGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> PipelineResult<GenerationOutcome> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generate_queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PipelineError::Generation(
                    "no scripted generate response".to_string(),
                ))
            })
    }

    async fn repair(
        &self,
        _source: &str,
        _errors: &[ValidationIssue],
    ) -> PipelineResult<String> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        self.repair_queue.lock().pop_front().unwrap_or_else(|| {
            Err(PipelineError::Generation(
                "no scripted repair response".to_string(),
            ))
        })
    }
}

/// A [`RenderBackend`] that records calls and fabricates tiny artifacts
/// on disk so downstream stages see real, non-empty files.
pub struct RecordingBackend {
    dir: PathBuf,
    render_calls: AtomicUsize,
    animate_calls: AtomicUsize,
    capture_calls: AtomicUsize,
    transcode_calls: AtomicUsize,
    fail_op: Mutex<Option<&'static str>>,
}

impl RecordingBackend {
    /// Creates a backend writing its fabricated files under `dir`.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            render_calls: AtomicUsize::new(0),
            animate_calls: AtomicUsize::new(0),
            capture_calls: AtomicUsize::new(0),
            transcode_calls: AtomicUsize::new(0),
            fail_op: Mutex::new(None),
        }
    }

    /// Makes the named operation (`"render"`, `"animate"`, `"capture"` or
    /// `"transcode"`) fail on every subsequent call.
    pub fn fail_on(&self, op: &'static str) {
        *self.fail_op.lock() = Some(op);
    }

    fn check_fail(&self, op: &'static str) -> PipelineResult<()> {
        if *self.fail_op.lock() == Some(op) {
            let message = format!("scripted {op} failure");
            return Err(match op {
                "render" => PipelineError::Rendering(message),
                "animate" => PipelineError::Animation(message),
                "capture" => PipelineError::Capture(message),
                _ => PipelineError::Encoding(message),
            });
        }
        Ok(())
    }

    /// Number of `render` calls observed.
    #[must_use]
    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    /// Number of `animate` calls observed.
    #[must_use]
    pub fn animate_calls(&self) -> usize {
        self.animate_calls.load(Ordering::SeqCst)
    }

    /// Number of `capture` calls observed.
    #[must_use]
    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    /// Number of `transcode` calls observed.
    #[must_use]
    pub fn transcode_calls(&self) -> usize {
        self.transcode_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBackend for RecordingBackend {
    async fn render(&self, source: &str) -> PipelineResult<String> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail("render")?;
        Ok(format!(
            "<html><body><svg data-source-len=\"{}\"></svg></body></html>",
            source.len()
        ))
    }

    async fn animate(
        &self,
        markup: &str,
        directive: &AnimationDirective,
    ) -> PipelineResult<String> {
        self.animate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail("animate")?;
        Ok(format!(
            "<!-- animated {}s -->{markup}",
            directive.duration_secs
        ))
    }

    async fn capture(
        &self,
        _markup: &str,
        _directive: &AnimationDirective,
    ) -> PipelineResult<CaptureOutput> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail("capture")?;

        let video_path = self.dir.join(format!("capture_{}.webm", Uuid::new_v4()));
        let payload = b"fake video payload";
        tokio::fs::write(&video_path, payload).await?;
        Ok(CaptureOutput {
            video_path,
            byte_len: payload.len() as u64,
        })
    }

    async fn transcode(
        &self,
        _video: &std::path::Path,
        output: &std::path::Path,
        _fps: u32,
        _duration_secs: f64,
    ) -> PipelineResult<u64> {
        self.transcode_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail("transcode")?;

        let payload = b"GIF89a fake";
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, payload).await?;
        Ok(payload.len() as u64)
    }
}
