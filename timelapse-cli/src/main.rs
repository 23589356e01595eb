//! timelapse: capture periodic stills from a camera stream and stitch them into a video.

mod commands;
mod observer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use timelapse_core::{CancellationToken, ExitStatus};

use commands::AssembleOptions;

#[derive(Parser)]
#[command(name = "timelapse", version, about = "Timelapse capture from network cameras")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a capture session and assemble the timelapse
    Run {
        /// YAML configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },
    /// Rebuild the timelapse from a previous session's manifest
    Assemble {
        /// session.json written by a previous run
        #[arg(short, long)]
        manifest: PathBuf,
        /// Frame rate (default: the one recorded in the manifest)
        #[arg(long)]
        fps: Option<f64>,
        /// Output video path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Drop frames whose size differs from the first instead of failing
        #[arg(long)]
        lenient: bool,
        /// ffmpeg binary
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let status = match cli.command {
        Command::Run { config } => run(config).await,
        Command::Assemble {
            manifest,
            fps,
            output,
            lenient,
            ffmpeg,
        } => {
            let options = AssembleOptions {
                manifest,
                fps,
                output,
                lenient,
                ffmpeg,
            };
            match tokio::task::spawn_blocking(move || commands::assemble_from_manifest(&options)).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    eprintln!("timelapse: {:#}", e);
                    ExitStatus::Fatal
                }
                Err(e) => {
                    eprintln!("timelapse: assembly task failed: {}", e);
                    ExitStatus::Fatal
                }
            }
        }
    };

    ExitCode::from(status.code() as u8)
}

/// Run the session on a blocking thread; Ctrl-C cancels it.
async fn run(config: PathBuf) -> ExitStatus {
    let cancel = CancellationToken::new();
    let session_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || commands::run_session(&config, &session_cancel));

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted; stopping after the current capture");
            cancel.cancel();
            task.await
        }
    };

    match joined {
        Ok(Ok(result)) => {
            println!("{}", result);
            result.exit_status()
        }
        Ok(Err(e)) => {
            eprintln!("timelapse: {:#}", e);
            ExitStatus::Fatal
        }
        Err(e) => {
            eprintln!("timelapse: session task failed: {}", e);
            ExitStatus::Fatal
        }
    }
}
