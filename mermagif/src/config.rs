//! Pipeline configuration.
//!
//! The configuration is constructed once at process start (usually via
//! [`PipelineConfig::from_env`]) and passed into every component that needs
//! it. There is deliberately no process-wide lazily-initialized instance.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{PipelineError, PipelineResult};

/// Environment variable prefix for [`PipelineConfig::from_env`].
const ENV_PREFIX: &str = "MERMAGIF_";

/// Tunables consumed by the pipeline core and its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of repair attempts before forced failure.
    pub retry_ceiling: u32,
    /// Timeout applied to each external generation/repair call.
    pub llm_timeout: Duration,
    /// Animation duration used when the generator omits a directive.
    pub default_animation_duration: f64,
    /// Frame rate for capture and GIF output.
    pub default_fps: u32,
    /// Output GIF width in pixels (height auto-scaled).
    pub gif_scale_width: u32,
    /// Viewport used for the measurement pass before capture.
    pub viewport_width: u32,
    /// Viewport height for the measurement pass.
    pub viewport_height: u32,
    /// Directory for captured video and default GIF output.
    pub output_dir: PathBuf,
    /// Base URL of the OpenAI-compatible completions endpoint.
    pub api_base: String,
    /// API key for the completions endpoint.
    pub api_key: Option<String>,
    /// Model identifier sent with each completion request.
    pub model: String,
    /// Chromium executable override; resolved from PATH when unset.
    pub chromium_path: Option<PathBuf>,
    /// FFmpeg executable override; resolved from PATH when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// ER-diagram cardinality tokens stripped before bracket counting.
    ///
    /// The set is heuristic, so it is configuration rather than contract.
    pub er_cardinality_tokens: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: 2,
            llm_timeout: Duration::from_secs(30),
            default_animation_duration: 5.0,
            default_fps: 30,
            gif_scale_width: 1280,
            viewport_width: 1920,
            viewport_height: 1080,
            output_dir: PathBuf::from("./output"),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            chromium_path: None,
            ffmpeg_path: None,
            er_cardinality_tokens: default_er_tokens(),
        }
    }
}

fn default_er_tokens() -> Vec<String> {
    ["||--o{", "}o--||", "||--||", "o{", "}o", "|{", "}|"]
        .iter()
        .map(|t| (*t).to_string())
        .collect()
}

impl PipelineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `MERMAGIF_*` environment variables,
    /// falling back to defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when a variable is present but
    /// unparseable or out of bounds.
    pub fn from_env() -> PipelineResult<Self> {
        let mut config = Self::default();

        if let Some(v) = env_var("RETRY_CEILING") {
            config.retry_ceiling = parse_env("RETRY_CEILING", &v)?;
        }
        if let Some(v) = env_var("LLM_TIMEOUT_SECS") {
            let secs: u64 = parse_env("LLM_TIMEOUT_SECS", &v)?;
            if secs == 0 {
                return Err(PipelineError::Config(
                    "MERMAGIF_LLM_TIMEOUT_SECS must be at least 1".to_string(),
                ));
            }
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = env_var("ANIMATION_DURATION") {
            let duration: f64 = parse_env("ANIMATION_DURATION", &v)?;
            if !(1.0..=60.0).contains(&duration) {
                return Err(PipelineError::Config(
                    "MERMAGIF_ANIMATION_DURATION must be between 1 and 60 seconds".to_string(),
                ));
            }
            config.default_animation_duration = duration;
        }
        if let Some(v) = env_var("FPS") {
            let fps: u32 = parse_env("FPS", &v)?;
            if !(10..=60).contains(&fps) {
                return Err(PipelineError::Config(
                    "MERMAGIF_FPS must be between 10 and 60".to_string(),
                ));
            }
            config.default_fps = fps;
        }
        if let Some(v) = env_var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("API_BASE") {
            config.api_base = v;
        }
        if let Some(v) = env_var("API_KEY") {
            config.api_key = Some(v);
        }
        if let Some(v) = env_var("MODEL") {
            config.model = v;
        }
        if let Some(v) = env_var("CHROMIUM_PATH") {
            config.chromium_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("FFMPEG_PATH") {
            config.ffmpeg_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("ER_TOKENS") {
            config.er_cardinality_tokens =
                v.split(',').map(|t| t.trim().to_string()).collect();
        }

        Ok(config)
    }

    /// Sets the retry ceiling.
    #[must_use]
    pub fn with_retry_ceiling(mut self, ceiling: u32) -> Self {
        self.retry_ceiling = ceiling;
        self
    }

    /// Sets the per-call LLM timeout.
    #[must_use]
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Sets the default animation duration in seconds.
    #[must_use]
    pub fn with_animation_duration(mut self, duration: f64) -> Self {
        self.default_animation_duration = duration;
        self
    }

    /// Sets the output frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.default_fps = fps;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the ER cardinality token exemption list.
    #[must_use]
    pub fn with_er_tokens(mut self, tokens: Vec<String>) -> Self {
        self.er_cardinality_tokens = tokens;
        self
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}"))
        .ok()
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(suffix: &str, value: &str) -> PipelineResult<T> {
    value.parse().map_err(|_| {
        PipelineError::Config(format!(
            "invalid value '{value}' for {ENV_PREFIX}{suffix}"
        ))
    })
}
