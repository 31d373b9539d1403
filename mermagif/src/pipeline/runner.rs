//! The pipeline runner: drives the retry controller over the front
//! segment, then the linear render tail, and enforces the terminal
//! outcome invariant.

use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{ChromiumBackend, RenderBackend};
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::llm::{DiagramGenerator, HttpDiagramGenerator};
use crate::pipeline::controller::{self, ControllerState};
use crate::record::{AnimationDirective, InputKind, PipelineRecord};
use crate::stages::{
    AnimatePlanStage, AnimateStage, CaptureStage, GenerateStage, PipelineStage, RenderStage,
    RepairStage, TranscodeStage, ValidateStage,
};
use crate::validator::DiagramValidator;

/// The assembled pipeline.
///
/// Owns the configuration and the two external collaborators; each call to
/// [`Pipeline::run`] executes one complete invocation and returns the
/// terminal record.
pub struct Pipeline {
    config: PipelineConfig,
    generator: Arc<dyn DiagramGenerator>,
    backend: Arc<dyn RenderBackend>,
}

impl Pipeline {
    /// Assembles a pipeline from explicit collaborators.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn DiagramGenerator>,
        backend: Arc<dyn RenderBackend>,
    ) -> Self {
        Self {
            config,
            generator,
            backend,
        }
    }

    /// Assembles the production pipeline: HTTP generation plus the
    /// headless-browser render backend.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the HTTP client cannot be
    /// constructed from the configuration.
    pub fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        let generator = Arc::new(HttpDiagramGenerator::new(&config)?);
        let backend = Arc::new(ChromiumBackend::new(&config));
        Ok(Self::new(config, generator, backend))
    }

    /// The configuration this pipeline was assembled with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn default_directive(&self) -> AnimationDirective {
        AnimationDirective::with_duration(self.config.default_animation_duration)
    }

    /// Executes one pipeline invocation end to end.
    ///
    /// Never returns an error: every failure is folded into the record's
    /// accumulated error list, and the returned record always satisfies the
    /// terminal invariant of exactly one populated outcome.
    pub async fn run(
        &self,
        raw_input: impl Into<String>,
        input_kind: InputKind,
        output: Option<PathBuf>,
    ) -> PipelineRecord {
        let mut record = PipelineRecord::new(raw_input, input_kind);
        tracing::info!(
            run_id = %record.run_id,
            input_kind = ?record.input_kind,
            "pipeline run started"
        );

        let generate = GenerateStage::new(self.generator.clone(), self.default_directive());
        let validate = ValidateStage::new(DiagramValidator::new(&self.config));
        let repair = RepairStage::new(self.generator.clone(), self.config.retry_ceiling);
        let plan = AnimatePlanStage::new(self.default_directive());

        // Front segment: the generate/validate/repair loop. The ceiling
        // check inside the repair stage guarantees termination.
        let mut state = ControllerState::RouteInput;
        loop {
            match state {
                ControllerState::RouteInput => {
                    record = controller::route_input(record, self.default_directive());
                }
                ControllerState::Generate => {
                    record = match self.step(&generate, record).await {
                        Ok(r) => r,
                        Err(r) => return self.finish(r),
                    };
                }
                ControllerState::Validate => {
                    record = match self.step(&validate, record).await {
                        Ok(r) => r,
                        Err(r) => return self.finish(r),
                    };
                }
                ControllerState::Repair => {
                    record = match self.step(&repair, record).await {
                        Ok(r) => r,
                        Err(r) => return self.finish(r),
                    };
                }
                ControllerState::AnimatePlan => {
                    record = match self.step(&plan, record).await {
                        Ok(r) => r,
                        Err(r) => return self.finish(r),
                    };
                    break;
                }
                // Fatal errors short-circuit above, so the machine never
                // dwells here.
                ControllerState::Fail => return self.finish(record),
            }
            state = controller::next_state(state, &record, self.config.retry_ceiling);
        }

        // Linear tail: render, animate, capture, transcode, in that order,
        // aborting on the first failure.
        let tail: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(RenderStage::new(self.backend.clone())),
            Box::new(AnimateStage::new(self.backend.clone())),
            Box::new(CaptureStage::new(self.backend.clone())),
            Box::new(TranscodeStage::new(
                self.backend.clone(),
                self.config.default_fps,
                self.config.default_animation_duration,
                output,
            )),
        ];
        for stage in &tail {
            record = match self.step(stage.as_ref(), record).await {
                Ok(r) => r,
                Err(r) => return self.finish(r),
            };
        }

        self.finish(record)
    }

    /// Runs one stage against the record. On failure the pre-stage record
    /// is restored and the stage error is appended to its error list, with
    /// one exception: retry exhaustion keeps the attempt count from the
    /// failing check so the terminal record reflects it.
    async fn step(
        &self,
        stage: &dyn PipelineStage,
        record: PipelineRecord,
    ) -> Result<PipelineRecord, PipelineRecord> {
        let snapshot = record.clone();
        match stage.run(record).await {
            Ok(updated) => Ok(updated),
            Err(error) => {
                let mut failed = snapshot;
                if let PipelineError::RetryExhausted { attempts, .. } = error {
                    failed.attempt_count = attempts;
                }
                tracing::error!(
                    run_id = %failed.run_id,
                    stage = stage.name(),
                    kind = error.kind(),
                    %error,
                    "stage failed"
                );
                failed.push_error(format!("{} failed: {error}", stage.name()));
                Err(failed)
            }
        }
    }

    /// Seals the record: logs the summary and asserts the terminal
    /// invariant.
    fn finish(&self, mut record: PipelineRecord) -> PipelineRecord {
        // A failed run never advertises an output path, even if one was
        // produced before a later stage failed.
        if !record.errors.is_empty() {
            record.output_location = None;
        }

        if record.is_success() {
            tracing::info!(
                run_id = %record.run_id,
                output = %record
                    .output_location
                    .as_deref()
                    .unwrap_or_else(|| std::path::Path::new(""))
                    .display(),
                attempts = record.attempt_count,
                "pipeline run succeeded"
            );
        } else {
            tracing::warn!(
                run_id = %record.run_id,
                attempts = record.attempt_count,
                errors = record.errors.len(),
                "pipeline run failed"
            );
        }
        debug_assert!(record.is_terminal_consistent());
        record
    }
}
