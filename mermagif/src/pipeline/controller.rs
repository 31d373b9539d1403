//! The retry controller: an explicit finite-state machine over the
//! generate/validate/repair front segment of the pipeline.
//!
//! The original conditional-edge routing is expressed here as an enum of
//! states plus a pure transition function, independent of any graph
//! library. `AnimatePlan` is the hand-off to the strictly linear tail;
//! `Fail` is terminal.

use crate::record::{AnimationDirective, InputKind, PipelineRecord};

/// States of the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Initial routing on input kind.
    RouteInput,
    /// Prompt-to-diagram generation.
    Generate,
    /// Local syntax validation.
    Validate,
    /// External repair of invalid source.
    Repair,
    /// Proceed to the linear render tail.
    AnimatePlan,
    /// Terminal failure.
    Fail,
}

/// Routing step for `RouteInput`: literal diagram source is copied into
/// place and given the default animation directive; prompts go through
/// generation untouched.
#[must_use]
pub fn route_input(
    mut record: PipelineRecord,
    default_directive: AnimationDirective,
) -> PipelineRecord {
    if record.input_kind == InputKind::DiagramSource {
        record.diagram_source = Some(record.raw_input.clone());
        record.animation = Some(default_directive);
    }
    record
}

/// The transition function.
///
/// Only `Validate` and `Repair` branch on record state; the ceiling check
/// here mirrors the repair stage's own accounting, guaranteeing the loop
/// terminates after at most `ceiling` repair attempts.
#[must_use]
pub fn next_state(state: ControllerState, record: &PipelineRecord, ceiling: u32) -> ControllerState {
    match state {
        ControllerState::RouteInput => {
            if record.input_kind == InputKind::DiagramSource {
                ControllerState::Validate
            } else {
                ControllerState::Generate
            }
        }
        ControllerState::Generate => ControllerState::Validate,
        ControllerState::Validate => {
            if record.validation_errors.is_empty() {
                ControllerState::AnimatePlan
            } else {
                ControllerState::Repair
            }
        }
        ControllerState::Repair => {
            if record.attempt_count > ceiling {
                ControllerState::Fail
            } else {
                ControllerState::Validate
            }
        }
        // Terminal-ish states have no outgoing edges.
        ControllerState::AnimatePlan | ControllerState::Fail => state,
    }
}
