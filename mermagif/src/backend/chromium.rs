//! Headless-Chromium rendering backend.
//!
//! Rendering loads a mermaid.js HTML shell in headless Chromium and dumps
//! the post-script DOM. Animation is a CSS injection into that markup.
//! Capture replays the page frame by frame under Chromium's virtual clock
//! (`--virtual-time-budget`), which makes CSS animation sampling
//! deterministic, then assembles the frames with ffmpeg. Transcoding uses
//! ffmpeg's two-pass palette pipeline for a high-quality looping GIF.
//!
//! The system `chromium` and `ffmpeg` binaries are used rather than native
//! bindings, so no browser or FFmpeg dev headers are required at build time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;

use super::{CaptureOutput, RenderBackend};
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::record::AnimationDirective;

/// Extra seconds recorded around the animation: one second of lead to hide
/// the initial paint, one of tail to hide teardown. Trimmed at transcode.
const CAPTURE_BUFFER_SECS: f64 = 2.0;

/// Padding added around the measured diagram before capture.
const CAPTURE_PADDING_PX: u32 = 40;

/// Virtual time granted for script load before the first frame.
const RENDER_BUDGET_MS: u32 = 10_000;

/// Backend driving headless Chromium and system ffmpeg.
#[derive(Debug, Clone)]
pub struct ChromiumBackend {
    chromium: PathBuf,
    ffmpeg: PathBuf,
    output_dir: PathBuf,
    fps: u32,
    gif_scale_width: u32,
    viewport_width: u32,
    viewport_height: u32,
}

impl ChromiumBackend {
    /// Creates a backend from pipeline configuration.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            chromium: config
                .chromium_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("chromium")),
            ffmpeg: config
                .ffmpeg_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            output_dir: config.output_dir.clone(),
            fps: config.default_fps,
            gif_scale_width: config.gif_scale_width,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }

    /// HTML shell that loads mermaid.js and renders the diagram on load.
    fn html_shell(source: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Diagram</title>
    <script src="https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"></script>
    <script>
        mermaid.initialize({{
            startOnLoad: true,
            theme: 'default',
            securityLevel: 'loose',
            flowchart: {{ useMaxWidth: false, htmlLabels: true }}
        }});
    </script>
    <style>
        body {{
            margin: 0;
            padding: 20px;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            background: white;
        }}
    </style>
</head>
<body>
    <pre class="mermaid">{}</pre>
</body>
</html>
"#,
            escape_html(source)
        )
    }

    /// CSS flow/pulse animation block parameterized by the directive.
    fn animation_css(directive: &AnimationDirective) -> String {
        let flow_secs = directive.preset.flow_cycle_secs();
        format!(
            r#"<style id="diagram-animations">
    .edgePath .path,
    .flowchart-link {{
        stroke-dasharray: 8 4;
        animation: flow {flow_secs}s linear infinite;
    }}
    @keyframes flow {{
        0% {{ stroke-dashoffset: 0; }}
        100% {{ stroke-dashoffset: -12; }}
    }}
    .node rect,
    .node circle,
    .node polygon {{
        animation: pulse 4s ease-in-out infinite;
    }}
    @keyframes pulse {{
        0%, 100% {{ opacity: 1; transform: scale(1); }}
        50% {{ opacity: 0.95; transform: scale(1.02); }}
    }}
</style>
"#
        )
    }

    /// Writes markup to a unique temp file and returns its path.
    async fn write_temp_html(&self, markup: &str) -> PipelineResult<PathBuf> {
        let path = std::env::temp_dir().join(format!("mermagif-{}.html", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, markup).await?;
        Ok(path)
    }

    /// Runs a command to completion and returns stdout, mapping failures
    /// through `error`.
    async fn run(
        &self,
        command: &mut Command,
        error: fn(String) -> PipelineError,
    ) -> PipelineResult<Vec<u8>> {
        let program = format!("{:?}", command.as_std().get_program());
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| error(format!("failed to spawn {program} (is it on PATH?): {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(error(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    /// Chromium invocation with the flags shared by every operation.
    fn chromium_command(&self) -> Command {
        let mut cmd = Command::new(&self.chromium);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--hide-scrollbars");
        cmd
    }

    /// Captures one frame at the given virtual-time offset.
    async fn screenshot_frame(
        &self,
        page: &Path,
        frame_path: &Path,
        budget_ms: u32,
        width: u32,
        height: u32,
    ) -> PipelineResult<()> {
        let mut cmd = self.chromium_command();
        cmd.arg(format!("--window-size={width},{height}"))
            .arg(format!("--virtual-time-budget={budget_ms}"))
            .arg(format!("--screenshot={}", frame_path.display()))
            .arg(format!("file://{}", page.display()));
        self.run(&mut cmd, PipelineError::Capture).await?;
        Ok(())
    }

    /// Assembles PNG frames into a lossless-ish intermediate video.
    async fn assemble_video(&self, frame_dir: &Path, video_path: &Path) -> PipelineResult<()> {
        ensure_parent_dir(video_path).map_err(PipelineError::Capture)?;
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-v", "error", "-framerate"])
            .arg(self.fps.to_string())
            .arg("-i")
            .arg(frame_dir.join("frame_%05d.png"))
            .args(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"])
            .arg(video_path);
        self.run(&mut cmd, PipelineError::Capture).await?;
        Ok(())
    }

    /// Viewport for recording: the diagram's measured size plus padding,
    /// rounded up to even dimensions (encoder requirement), capped at the
    /// configured viewport.
    fn capture_viewport(&self, markup: &str) -> (u32, u32) {
        let (width, height) = measure_svg(markup)
            .unwrap_or((self.viewport_width, self.viewport_height));
        let width = even(width.saturating_add(CAPTURE_PADDING_PX)).min(even(self.viewport_width));
        let height =
            even(height.saturating_add(CAPTURE_PADDING_PX)).min(even(self.viewport_height));
        (width.max(2), height.max(2))
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn render(&self, source: &str) -> PipelineResult<String> {
        if source.trim().is_empty() {
            return Err(PipelineError::Rendering(
                "diagram source is empty".to_string(),
            ));
        }

        let page = self.write_temp_html(&Self::html_shell(source)).await?;
        let result = async {
            let mut cmd = self.chromium_command();
            cmd.arg(format!("--virtual-time-budget={RENDER_BUDGET_MS}"))
                .arg("--dump-dom")
                .arg(format!("file://{}", page.display()));
            let dom = self.run(&mut cmd, PipelineError::Rendering).await?;
            let markup = String::from_utf8_lossy(&dom).into_owned();

            if !markup.contains("<svg") {
                return Err(PipelineError::Rendering(
                    "rendered page contains no vector graphic".to_string(),
                ));
            }
            // mermaid renders a bomb-icon error SVG instead of throwing.
            if markup.contains("aria-roledescription=\"error\"") {
                return Err(PipelineError::Rendering(
                    "diagram failed to parse in the renderer".to_string(),
                ));
            }
            Ok(markup)
        }
        .await;

        let _ = tokio::fs::remove_file(&page).await;
        result
    }

    async fn animate(
        &self,
        markup: &str,
        directive: &AnimationDirective,
    ) -> PipelineResult<String> {
        if !markup.contains("<svg") {
            return Err(PipelineError::Animation(
                "markup contains no vector graphic to animate".to_string(),
            ));
        }
        let Some(head_end) = markup.find("</head>") else {
            return Err(PipelineError::Animation(
                "markup has no head element for style injection".to_string(),
            ));
        };

        let mut animated = String::with_capacity(markup.len() + 512);
        animated.push_str(&markup[..head_end]);
        animated.push_str(&Self::animation_css(directive));
        animated.push_str(&markup[head_end..]);
        Ok(animated)
    }

    async fn capture(
        &self,
        markup: &str,
        directive: &AnimationDirective,
    ) -> PipelineResult<CaptureOutput> {
        let (width, height) = self.capture_viewport(markup);
        let total_secs = directive.duration_secs + CAPTURE_BUFFER_SECS;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frame_count = (total_secs * f64::from(self.fps)).ceil() as u32;

        let page = self.write_temp_html(markup).await?;
        let frame_dir =
            std::env::temp_dir().join(format!("mermagif-frames-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&frame_dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let video_path = self.output_dir.join(format!("mermaid_{timestamp}.webm"));

        let result = async {
            for frame in 0..frame_count {
                let budget_ms = RENDER_BUDGET_MS + frame * 1000 / self.fps;
                let frame_path = frame_dir.join(format!("frame_{frame:05}.png"));
                self.screenshot_frame(&page, &frame_path, budget_ms, width, height)
                    .await?;
            }

            self.assemble_video(&frame_dir, &video_path).await?;

            let metadata = tokio::fs::metadata(&video_path).await.map_err(|e| {
                PipelineError::Capture(format!("recorded video missing: {e}"))
            })?;
            if metadata.len() == 0 {
                return Err(PipelineError::Capture(
                    "recorded video is empty".to_string(),
                ));
            }

            Ok(CaptureOutput {
                video_path: video_path.clone(),
                byte_len: metadata.len(),
            })
        }
        .await;

        // Session teardown happens on every exit path, including failure.
        let _ = tokio::fs::remove_file(&page).await;
        let _ = tokio::fs::remove_dir_all(&frame_dir).await;
        result
    }

    async fn transcode(
        &self,
        video: &Path,
        output: &Path,
        fps: u32,
        duration_secs: f64,
    ) -> PipelineResult<u64> {
        if tokio::fs::metadata(video).await.is_err() {
            return Err(PipelineError::Encoding(format!(
                "video file not found: {}",
                video.display()
            )));
        }
        ensure_parent_dir(output).map_err(PipelineError::Encoding)?;

        // Two-pass palette encoding in one filter graph: skip the 1s lead
        // buffer, generate an optimal palette, then map through it.
        let filter = format!(
            "fps={fps},scale={}:-1:flags=lanczos,split[a][b];\
             [a]palettegen=max_colors=256:stats_mode=diff[p];\
             [b][p]paletteuse=dither=sierra2_4a:diff_mode=rectangle",
            self.gif_scale_width
        );

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-v", "error", "-ss", "1.0", "-t"])
            .arg(format!("{duration_secs}"))
            .arg("-i")
            .arg(video)
            .arg("-filter_complex")
            .arg(&filter)
            .args(["-loop", "0"])
            .arg(output);
        self.run(&mut cmd, PipelineError::Encoding).await?;

        let metadata = tokio::fs::metadata(output)
            .await
            .map_err(|_| PipelineError::Encoding("GIF file was not created".to_string()))?;
        if metadata.len() == 0 {
            return Err(PipelineError::Encoding("GIF file is empty".to_string()));
        }
        Ok(metadata.len())
    }
}

/// Extracts the diagram's natural size from the SVG `viewBox`.
fn measure_svg(markup: &str) -> Option<(u32, u32)> {
    let start = markup.find("viewBox=\"")? + "viewBox=\"".len();
    let end = markup[start..].find('"')? + start;
    let mut parts = markup[start..end].split_ascii_whitespace().skip(2);
    let width: f64 = parts.next()?.parse().ok()?;
    let height: f64 = parts.next()?.parse().ok()?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((width.ceil() as u32, height.ceil() as u32))
}

fn even(n: u32) -> u32 {
    if n % 2 == 0 {
        n
    } else {
        n + 1
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create directory '{}': {e}", parent.display()))?;
        }
    }
    Ok(())
}

fn escape_html(source: &str) -> String {
    source
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AnimationPreset;

    #[test]
    fn html_shell_escapes_diagram_source() {
        let shell = ChromiumBackend::html_shell("graph TD\nA --> B");
        assert!(shell.contains("A --&gt; B"));
        assert!(shell.contains("mermaid.initialize"));
    }

    #[test]
    fn animation_css_uses_preset_cycle() {
        let directive = AnimationDirective {
            duration_secs: 5.0,
            preset: AnimationPreset::Fast,
        };
        let css = ChromiumBackend::animation_css(&directive);
        assert!(css.contains("animation: flow 1.5s linear infinite"));
    }

    #[tokio::test]
    async fn animate_requires_svg_and_head() {
        let backend = ChromiumBackend::new(&PipelineConfig::default());
        let directive = AnimationDirective::with_duration(5.0);

        let err = backend.animate("<html></html>", &directive).await.unwrap_err();
        assert!(matches!(err, PipelineError::Animation(_)));

        let markup = "<html><head></head><body><svg></svg></body></html>";
        let animated = backend.animate(markup, &directive).await.unwrap();
        assert!(animated.contains("diagram-animations"));
        let style_at = animated.find("diagram-animations").unwrap();
        let head_at = animated.find("</head>").unwrap();
        assert!(style_at < head_at);
    }

    #[test]
    fn viewbox_measurement_parses_dimensions() {
        let markup = r#"<svg viewBox="0 0 640.5 480" id="d"></svg>"#;
        assert_eq!(measure_svg(markup), Some((641, 480)));
        assert_eq!(measure_svg("<svg></svg>"), None);
    }

    #[test]
    fn capture_viewport_is_even_padded_and_capped() {
        let backend = ChromiumBackend::new(&PipelineConfig::default());
        let markup = r#"<svg viewBox="0 0 301 201"></svg>"#;
        let (w, h) = backend.capture_viewport(markup);
        // 301 + 40 = 341 -> 342; 201 + 40 = 241 -> 242
        assert_eq!((w, h), (342, 242));

        let huge = r#"<svg viewBox="0 0 9000 9000"></svg>"#;
        let (w, h) = backend.capture_viewport(huge);
        assert_eq!((w, h), (1920, 1080));
    }
}
