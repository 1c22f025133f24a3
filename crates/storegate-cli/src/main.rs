use anyhow::Result;
use clap::Parser;
use tracing::debug;

use storegate_core::config::Profile;
use storegate_core::report::{model::ToolInfo, render};

mod args;

fn main() -> Result<()> {
    let args = args::Args::parse();
    init_logging(args.verbose, args.debug);

    let profile = match &args.config {
        Some(path) => Profile::load(path)?,
        None => args.profile.profile(),
    };
    debug!(profile = %profile.name, root = %args.root.display(), "starting validation");

    let tool = ToolInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let report = storegate_core::validate(&args.root, &profile, tool);

    let output = match args.format {
        args::OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        args::OutputFormat::Text => render::render_text(&report),
    };

    match args.out {
        Some(path) => std::fs::write(path, &output)?,
        None => print!("{output}"),
    }

    std::process::exit(render::exit_code(report.verdict.verdict, &profile.exit_codes));
}

/// Initialize tracing based on CLI flags. `RUST_LOG` wins when set.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
