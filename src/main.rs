use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vakt_logger::hook::LogInfrastructureFailure;
use vakt_logger::{
    Dispatch, LoggerBuilder, ProjectLogger, Record, RotationSource, Settings, Severity,
    UncaughtExceptionHook,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rotating per-severity project logger demo", long_about = None)]
struct Args {
    /// Settings file; the flags below are ignored when present.
    #[arg(long, env = "VAKT_CONFIG")]
    config: Option<PathBuf>,

    /// Project name used in paths and log lines.
    #[arg(long, env = "VAKT_PROJECT", default_value = "vakt-demo")]
    project: String,

    /// Root directory for log files.
    #[arg(long, env = "VAKT_ROOT", default_value = "./logs")]
    root: PathBuf,

    /// Rotation preset: minute, hourly or daily.
    #[arg(long, env = "VAKT_ROTATION")]
    rotation: Option<String>,

    /// Bucket log files under a per-day directory.
    #[arg(long, env = "VAKT_DAILY")]
    daily: bool,

    /// Panic on purpose to demonstrate the uncaught-exception hook.
    #[arg(long)]
    demo_panic: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

fn build_application_logger(args: &Args) -> anyhow::Result<ProjectLogger> {
    let logger = match &args.config {
        Some(path) => {
            let settings = Settings::from_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?;
            settings.builder().build()?
        }
        None => {
            let mut builder = LoggerBuilder::new(args.project.as_str()).root(args.root.clone());
            if let Some(rotation) = &args.rotation {
                builder = builder.rotation(RotationSource::Name(rotation.clone()));
            }
            if args.daily {
                builder = builder.daily_bucket(true);
            }
            builder.build()?
        }
    };
    Ok(logger)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    info!("vakt-logger v{}", vakt_logger::VERSION);

    // The hook goes in first so later setup failures can fast-exit
    // through it instead of unwinding with a bare traceback.
    let exception_logger = LoggerBuilder::exception_only(args.project.as_str())
        .root(args.root.clone())
        .build()?;
    UncaughtExceptionHook::new(exception_logger).install();

    let mut logger = match build_application_logger(&args) {
        Ok(logger) => logger,
        Err(e) => std::panic::panic_any(LogInfrastructureFailure::new(format!("{e:#}"))),
    };
    info!(
        "logging for '{}' under {}",
        logger.project(),
        logger.directory().display()
    );

    logger.log(Severity::Debug, "logger configured");
    logger.log(Severity::Info, "demo run started");
    logger.log(Severity::Warning, "this is what a warning looks like");
    logger.log_record(Record::new(Severity::Info, "run finished").echoed());
    logger.flush();

    if args.demo_panic {
        panic!("demonstration panic");
    }

    Ok(())
}
