use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pixelqart::{
    run_search, QartClient, RqrrDetector, SessionConfig, SourceDesign, StopFlag, DEFAULT_SERVICE,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Search for a scannable QR code that displays your pixel art"
)]
struct Args {
    /// 41x41 RGBA PNG design; blue marks necessary black, yellow necessary white
    design: PathBuf,

    /// URL or text the QR code must encode
    href: String,

    /// Number of concurrent search workers
    #[arg(short = 'n', long, default_value_t = 16)]
    concurrency: usize,

    /// Stop the whole session after the first persisted result
    #[arg(short = 'x', long)]
    stop_if_found: bool,

    /// Directory results are written into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Base URL of the QArt drawing service
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let design = SourceDesign::open(&args.design)?;

    let mut config = SessionConfig::new(&args.href);
    config.workers = args.concurrency;
    config.stop_on_found = args.stop_if_found;
    config.out_dir = args.out_dir;

    let stop = Arc::new(StopFlag::new());
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        info!("interrupt received, shutting down after in-flight attempts");
        handler_stop.set();
    })?;

    let found = run_search(
        &config,
        &design,
        Arc::new(QartClient::new(&args.service)),
        Arc::new(RqrrDetector),
        stop,
    )?;
    info!(found, "session finished");
    Ok(())
}
