//! # Mermagif
//!
//! A text-to-animated-GIF diagram pipeline.
//!
//! Mermagif turns a natural-language prompt (or literal Mermaid source)
//! into a looping GIF of an animated diagram:
//!
//! - **Generation with repair**: an external model produces diagram source,
//!   and a bounded validate/repair loop fixes syntax issues before any
//!   rendering work starts
//! - **Local validation**: fast structural checks that never call out
//! - **Linear render tail**: render, animate, capture, and transcode run in
//!   a fixed order over one pipeline record
//! - **Pluggable rendering**: the render/animate/capture/transcode surface
//!   is a trait; the shipped backend drives headless Chromium and FFmpeg
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mermagif::prelude::*;
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = Pipeline::from_config(config)?;
//!
//! let record = pipeline
//!     .run("auth flow with retry", InputKind::Prompt, None)
//!     .await;
//! if let Some(path) = &record.output_location {
//!     println!("GIF written to {}", path.display());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod backend;
pub mod config;
pub mod errors;
pub mod llm;
pub mod pipeline;
pub mod record;
pub mod stages;
pub mod testing;
pub mod validator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{CaptureOutput, ChromiumBackend, RenderBackend};
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{PipelineError, PipelineResult};
    pub use crate::llm::{DiagramGenerator, GenerationOutcome, HttpDiagramGenerator};
    pub use crate::pipeline::Pipeline;
    pub use crate::record::{
        AnimationDirective, AnimationPreset, InputKind, PipelineRecord,
    };
    pub use crate::stages::PipelineStage;
    pub use crate::validator::{DiagramValidator, IssueKind, ValidationIssue};
}
