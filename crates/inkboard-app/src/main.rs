//! Command-line entry point: replay an input trace and write the SVG.

#[cfg(feature = "native")]
use clap::Parser;

/// Replay a recorded Inkboard input trace and render the final canvas to SVG.
#[cfg(feature = "native")]
#[derive(Debug, Parser)]
#[command(name = "inkboard", version, about)]
struct Args {
    /// Trace file (JSON).
    trace: std::path::PathBuf,

    /// Configuration file (JSON).
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Output SVG file. Writes to stdout when omitted.
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,

    /// Surface width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Surface height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

#[cfg(feature = "native")]
fn run(args: Args) -> inkboard_app::ReplayResult<()> {
    let mut config = match &args.config {
        Some(path) => inkboard_app::AppConfig::load(path)?,
        None => inkboard_app::AppConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }

    let trace = inkboard_app::Trace::load(&args.trace)?;
    let replay = inkboard_app::replay(&trace, &config)?;
    let svg = replay.render_svg(&config)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, svg)
                .map_err(|e| inkboard_app::ReplayError::Io(format!("{}: {}", path.display(), e)))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "native")]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Starting Inkboard");

    match run(Args::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("inkboard: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
