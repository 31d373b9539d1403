//! The pipeline record: the single state aggregate carried through a run.
//!
//! Every stage communicates exclusively through this record. It is passed by
//! value from stage to stage; a stage consumes the record and returns an
//! updated one, so there is never shared mutable aliasing between stages.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validator::ValidationIssue;

/// How the caller-supplied input should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Natural-language prompt; routed through the generation stage.
    Prompt,
    /// Literal diagram source; routed straight to validation.
    DiagramSource,
}

/// Named animation styles understood by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    /// Flowing edges with a gentle node pulse.
    #[default]
    Default,
    /// Faster edge flow.
    Fast,
    /// Slower edge flow.
    Slow,
    /// Subdued styling for embedding in slides.
    Presentation,
}

impl AnimationPreset {
    /// Parses a preset name leniently; unknown names fall back to `Default`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fast" => Self::Fast,
            "slow" => Self::Slow,
            "presentation" => Self::Presentation,
            _ => Self::Default,
        }
    }

    /// Seconds per cycle of the edge-flow animation for this preset.
    #[must_use]
    pub fn flow_cycle_secs(self) -> f64 {
        match self {
            Self::Default => 3.0,
            Self::Fast => 1.5,
            Self::Slow => 6.0,
            Self::Presentation => 4.0,
        }
    }
}

/// How long and in what style the rendered diagram should animate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationDirective {
    /// Total animation (and recording) duration in seconds.
    pub duration_secs: f64,
    /// Animation style.
    pub preset: AnimationPreset,
}

impl AnimationDirective {
    /// Creates a directive with the given duration and the default preset.
    #[must_use]
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            preset: AnimationPreset::Default,
        }
    }
}

/// The shared state aggregate for one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRecord {
    /// Correlation id for this run, carried into every log line.
    pub run_id: Uuid,
    /// Original caller-supplied input. Set once, never mutated.
    pub raw_input: String,
    /// Initial routing decision. Set once.
    pub input_kind: InputKind,
    /// Current best diagram definition.
    pub diagram_source: Option<String>,
    /// Animation directive produced by generation or defaulted by routing.
    pub animation: Option<AnimationDirective>,
    /// Issues from the most recent validation; empty means valid.
    pub validation_errors: Vec<ValidationIssue>,
    /// Set true only by the render stage on success.
    pub rendered: bool,
    /// Set true only by the animate stage on success.
    pub animated: bool,
    /// Captured video path, set by the capture stage.
    pub video_location: Option<PathBuf>,
    /// Final GIF path, set by the transcode stage.
    pub output_location: Option<PathBuf>,
    /// Accumulated failure messages; any entry means overall failure.
    pub errors: Vec<String>,
    /// Number of repair-stage invocations so far.
    pub attempt_count: u32,
    /// Scratch area for stage-to-stage payloads (rendered markup etc.).
    pub artifacts: HashMap<String, serde_json::Value>,
}

impl PipelineRecord {
    /// Creates a fresh record for one invocation.
    #[must_use]
    pub fn new(raw_input: impl Into<String>, input_kind: InputKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            raw_input: raw_input.into(),
            input_kind,
            diagram_source: None,
            animation: None,
            validation_errors: Vec::new(),
            rendered: false,
            animated: false,
            video_location: None,
            output_location: None,
            errors: Vec::new(),
            attempt_count: 0,
            artifacts: HashMap::new(),
        }
    }

    /// True when the most recent validation found no issues.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Appends a failure message to the accumulated error list.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Stores a named artifact.
    pub fn set_artifact(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.artifacts.insert(name.into(), value);
    }

    /// Reads a string artifact written by a predecessor stage.
    #[must_use]
    pub fn artifact_str(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).and_then(|v| v.as_str())
    }

    /// True when the run terminated successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output_location.is_some() && self.errors.is_empty()
    }

    /// Checks the terminal invariant: exactly one of `output_location`
    /// or a non-empty `errors` holds.
    #[must_use]
    pub fn is_terminal_consistent(&self) -> bool {
        self.output_location.is_some() != !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_empty_optional_fields() {
        let record = PipelineRecord::new("graph TD", InputKind::DiagramSource);
        assert!(record.diagram_source.is_none());
        assert!(record.animation.is_none());
        assert!(record.validation_errors.is_empty());
        assert!(!record.rendered);
        assert!(!record.animated);
        assert!(record.video_location.is_none());
        assert!(record.output_location.is_none());
        assert!(record.errors.is_empty());
        assert_eq!(record.attempt_count, 0);
        assert!(record.artifacts.is_empty());
    }

    #[test]
    fn preset_parsing_is_lenient() {
        assert_eq!(AnimationPreset::from_name("FAST"), AnimationPreset::Fast);
        assert_eq!(AnimationPreset::from_name(" slow "), AnimationPreset::Slow);
        assert_eq!(
            AnimationPreset::from_name("presentation"),
            AnimationPreset::Presentation
        );
        assert_eq!(
            AnimationPreset::from_name("glitter"),
            AnimationPreset::Default
        );
    }

    #[test]
    fn terminal_consistency_requires_exactly_one_outcome() {
        let mut record = PipelineRecord::new("x", InputKind::Prompt);
        // Neither outcome populated.
        assert!(!record.is_terminal_consistent());

        record.output_location = Some(PathBuf::from("out.gif"));
        assert!(record.is_terminal_consistent());
        assert!(record.is_success());

        record.push_error("boom");
        assert!(!record.is_terminal_consistent());
        assert!(!record.is_success());

        record.output_location = None;
        assert!(record.is_terminal_consistent());
    }

    #[test]
    fn string_artifacts_round_trip() {
        let mut record = PipelineRecord::new("x", InputKind::Prompt);
        record.set_artifact("render_markup", serde_json::json!("<svg/>"));
        assert_eq!(record.artifact_str("render_markup"), Some("<svg/>"));
        assert_eq!(record.artifact_str("missing"), None);
    }
}
