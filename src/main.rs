// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use object_announcer::config::{ConfigOverrides, PipelineConfig};
use object_announcer::pipelines::detection::Termination;
use object_announcer::{logging, terminal};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "object-announcer")]
#[command(about = "Detects objects in a camera feed and announces them out loud")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the annotated camera feed in the terminal (default)
    View,

    /// Run without a UI, logging results (Ctrl+C to stop)
    Headless,

    /// List available cameras
    List,

    /// Write the effective settings to the configuration file
    SaveConfig,
}

#[derive(Args)]
struct PipelineArgs {
    /// Camera index, /dev/video* path, image file or directory of images
    #[arg(short, long, global = true)]
    source: Option<String>,

    /// Seconds between detections (0 = as fast as possible)
    #[arg(short, long, global = true)]
    interval: Option<f64>,

    /// Language tag for announcements (e.g. en, es)
    #[arg(short, long, global = true)]
    lang: Option<String>,

    /// Configuration file (default: <config dir>/object-announcer/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Do not mirror frames horizontally
    #[arg(long, global = true)]
    no_mirror: bool,

    /// Discard detections below this confidence
    #[arg(long, global = true)]
    min_confidence: Option<f32>,

    /// Detector program to run
    #[arg(long, global = true)]
    detector_command: Option<String>,

    /// Argument for the detector program (repeatable)
    #[arg(long = "detector-arg", global = true, allow_hyphen_values = true)]
    detector_args: Vec<String>,

    /// Restart an image sequence when it ends
    #[arg(long, global = true)]
    loop_images: bool,

    /// Speak announcements
    #[arg(long, global = true, overrides_with = "no_speak")]
    speak: bool,

    /// Only log announcements
    #[arg(long, global = true, overrides_with = "speak")]
    no_speak: bool,
}

impl PipelineArgs {
    fn into_config(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = PipelineConfig::load_or_default(self.config.as_deref())?;
        config.apply_overrides(ConfigOverrides {
            camera_source: self.source,
            detection_interval_secs: self.interval,
            language: self.lang,
            min_confidence: self.min_confidence,
            mirror: self.no_mirror.then_some(false),
            loop_images: self.loop_images.then_some(true),
            detector_command: self.detector_command,
            detector_args: (!self.detector_args.is_empty()).then_some(self.detector_args),
            speak: match (self.speak, self.no_speak) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        });
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=object_announcer=debug
    let termination = match cli.command {
        Some(Commands::List) => {
            logging::init_stderr("warn");
            cli::list_cameras()?;
            return Ok(());
        }
        Some(Commands::SaveConfig) => {
            logging::init_stderr("info");
            let mut args = cli.pipeline;
            let path = match args.config.clone() {
                Some(path) => path,
                None => PipelineConfig::default_path().ok_or("No configuration directory")?,
            };
            // A new file starts from the defaults plus the given flags
            if !path.is_file() {
                args.config = None;
            }
            args.into_config()?.save(&path)?;
            println!("Configuration written to {}", path.display());
            return Ok(());
        }
        Some(Commands::Headless) => {
            logging::init_stderr("info");
            cli::run_headless(cli.pipeline.into_config()?)?
        }
        Some(Commands::View) | None => {
            // Dropping the guard flushes buffered log lines
            let _guard = logging::init_file(&logging::log_dir(), "warn");
            terminal::run(cli.pipeline.into_config()?)?
        }
    };

    match termination {
        Some(Termination::Failed(e)) => Err(e.into()),
        Some(Termination::EndOfStream) => {
            println!("Frame source ended.");
            Ok(())
        }
        _ => Ok(()),
    }
}
