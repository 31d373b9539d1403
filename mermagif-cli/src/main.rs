//! mermagif - animated diagram GIFs from text.
//!
//! Takes a natural-language description (or literal Mermaid source via
//! `--input-file`) and produces a looping GIF of the animated diagram.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mermagif::config::PipelineConfig;
use mermagif::pipeline::Pipeline;
use mermagif::record::InputKind;

/// Exit code used when the run is interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "mermagif", version, about = "Animated diagram GIFs from text")]
struct Cli {
    /// Natural-language description of the diagram to generate.
    #[arg(value_name = "PROMPT", required_unless_present = "input_file")]
    prompt: Option<String>,

    /// Read literal Mermaid source from a file instead of generating it.
    #[arg(short, long, value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Output GIF path; defaults to a sibling of the captured video.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mermagif=debug"
    } else {
        "mermagif=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = PipelineConfig::from_env().context("invalid configuration")?;
    let pipeline = Pipeline::from_config(config).context("failed to assemble pipeline")?;

    let (raw_input, input_kind) = match (&cli.input_file, &cli.prompt) {
        (Some(path), prompt) => {
            if prompt.is_some() {
                tracing::warn!(
                    input_file = %path.display(),
                    "both a prompt and an input file were given; using the file"
                );
            }
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            (source, InputKind::DiagramSource)
        }
        (None, Some(prompt)) => (prompt.clone(), InputKind::Prompt),
        // clap's required_unless_present guarantees one of the two.
        (None, None) => anyhow::bail!("a prompt or --input-file is required"),
    };

    let record = tokio::select! {
        record = pipeline.run(raw_input, input_kind, cli.output.clone()) => record,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    if let Some(path) = &record.output_location {
        let len = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("output missing at {}", path.display()))?
            .len();
        if len == 0 {
            anyhow::bail!("output at {} is empty", path.display());
        }
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    for error in &record.errors {
        eprintln!("error: {error}");
    }
    Ok(ExitCode::FAILURE)
}
