//! Command-line front end for the cutlist engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use cutlist::core::ffmpeg::{detect_system_ffmpeg, FFmpegRunner};
use cutlist::core::render::{ExportOrchestrator, ExportProgress, ExportSettings};
use cutlist::core::sources::LocalSources;
use cutlist::core::timeline::plan_from_json;

#[derive(Parser)]
#[command(name = "cutlist", version, about = "Timeline compilation and export engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a project file and print the linearized edit plan as JSON
    Plan {
        /// Path to the project JSON file
        project: PathBuf,
        /// Base directory for relative media paths
        #[arg(long)]
        media_dir: Option<PathBuf>,
    },
    /// Export a project to a single media file
    Export {
        /// Path to the project JSON file
        project: PathBuf,
        /// Output file path
        #[arg(short, long, default_value = "output.mp4")]
        output: PathBuf,
        /// Output width (defaults to source resolution)
        #[arg(long, requires = "height")]
        width: Option<u32>,
        /// Output height (defaults to source resolution)
        #[arg(long, requires = "width")]
        height: Option<u32>,
        /// Output frame rate
        #[arg(long, default_value_t = 30)]
        fps: u32,
        /// Base directory for relative media paths
        #[arg(long)]
        media_dir: Option<PathBuf>,
    },
    /// Probe a media file and print stream information as JSON
    Probe {
        /// Path to the media file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan { project, media_dir } => {
            let plan = compile(&project, media_dir)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Export {
            project,
            output,
            width,
            height,
            fps,
            media_dir,
        } => {
            let plan = compile(&project, media_dir)?;

            let runner = FFmpegRunner::new(detect_system_ffmpeg()?);
            let orchestrator = ExportOrchestrator::new(&runner);

            let settings = ExportSettings {
                width,
                height,
                fps,
                output_path: output,
                ..Default::default()
            };

            let (tx, mut rx) = mpsc::channel::<ExportProgress>(32);
            let reporter = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    eprintln!("[{}/{}] {}", ev.current, ev.total, ev.message);
                }
            });

            let result = orchestrator.export(&plan, &settings, Some(tx), None).await?;
            let _ = reporter.await;

            println!(
                "{} ({} ms, {} bytes, {:.1}s)",
                result.output_path.display(),
                result.duration_ms,
                result.size_bytes,
                result.encoding_time_sec
            );
        }
        Command::Probe { input } => {
            let runner = FFmpegRunner::new(detect_system_ffmpeg()?);
            let media = runner.probe(&input).await?;
            println!("{}", serde_json::to_string_pretty(&media)?);
        }
    }

    Ok(())
}

fn compile(project: &PathBuf, media_dir: Option<PathBuf>) -> Result<cutlist::EditPlan> {
    let json = std::fs::read_to_string(project)
        .with_context(|| format!("failed to read {}", project.display()))?;
    let sources = match media_dir {
        Some(base) => LocalSources::with_base(base),
        None => LocalSources::new(),
    };
    Ok(plan_from_json(&json, &sources)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_width_and_height_must_be_given_together() {
        let only_width = Cli::try_parse_from(["cutlist", "export", "p.json", "--width", "1280"]);
        assert!(only_width.is_err());

        let only_height = Cli::try_parse_from(["cutlist", "export", "p.json", "--height", "720"]);
        assert!(only_height.is_err());

        let both = Cli::try_parse_from([
            "cutlist", "export", "p.json", "--width", "1280", "--height", "720",
        ]);
        assert!(both.is_ok());
    }
}
