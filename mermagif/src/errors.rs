//! Error types for the mermagif pipeline.
//!
//! The taxonomy distinguishes the one recoverable failure class
//! (validation issues, handled by the repair loop and never surfaced here)
//! from the fatal kinds that abort a run.

use thiserror::Error;

/// The main error type for pipeline operations.
///
/// Every variant except [`PipelineError::RetryExhausted`] maps to a single
/// stage; `RetryExhausted` is raised only by the repair stage once the
/// configured ceiling is exceeded.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Diagram generation failed before or during the external call.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The external generation/repair call exceeded its timeout.
    #[error("generation timed out after {timeout_secs}s")]
    GenerationTimeout {
        /// The configured timeout that was exceeded.
        timeout_secs: u64,
    },

    /// The external response was malformed or missing the diagram field.
    #[error("generation response invalid: {0}")]
    GenerationResponse(String),

    /// The repair ceiling was exceeded before the source became valid.
    #[error("retry ceiling of {ceiling} exceeded after {attempts} repair attempts")]
    RetryExhausted {
        /// Attempt count at the failing ceiling check.
        attempts: u32,
        /// The configured ceiling.
        ceiling: u32,
    },

    /// The render stage failed.
    #[error("rendering failed: {0}")]
    Rendering(String),

    /// The animate stage failed.
    #[error("animation failed: {0}")]
    Animation(String),

    /// The capture stage failed.
    #[error("capture failed: {0}")]
    Capture(String),

    /// The transcode stage failed.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// A stage was entered without its precondition holding.
    #[error("stage precondition violated: {0}")]
    Precondition(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short machine-usable label for the error kind, used in logs and
    /// accumulated error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generation",
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::GenerationResponse(_) => "generation_response",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::Rendering(_) => "rendering",
            Self::Animation(_) => "animation",
            Self::Capture(_) => "capture",
            Self::Encoding(_) => "encoding",
            Self::Precondition(_) => "precondition",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience result alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_exhausted_message_names_the_ceiling() {
        let err = PipelineError::RetryExhausted {
            attempts: 3,
            ceiling: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("ceiling of 2"));
        assert!(msg.contains("exceeded"));
        assert!(msg.contains("3 repair attempts"));
    }

    #[test]
    fn timeout_message_includes_seconds() {
        let err = PipelineError::GenerationTimeout { timeout_secs: 30 };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(PipelineError::Rendering(String::new()).kind(), "rendering");
        assert_eq!(
            PipelineError::RetryExhausted { attempts: 0, ceiling: 0 }.kind(),
            "retry_exhausted"
        );
    }
}
