use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use bringup_core::{BringupConfig, Orchestrator, TargetImage, discovery};

mod cli;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(error = %err, "bring-up failed");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let cfg = build_config(cli);

	let device = match discovery::find_console_tty() {
		Ok(device) => device,
		Err(err) if cfg.pretend => {
			warn!(error = %err, "pretend: using placeholder console device");
			"/dev/ttyUSB0".to_string()
		}
		Err(err) => return Err(err.into()),
	};
	info!(device = %device, "found console TTY");

	let conn = Orchestrator::new(cfg).run(&device).await?;
	conn.interact().await?;
	Ok(())
}

fn build_config(cli: Cli) -> BringupConfig {
	let mut cfg = BringupConfig::new(cli.firmware);
	cfg.pretend = cli.pretend;
	cfg.bitstream = cli.bitstream;
	cfg.probe_info = cli.probe_info;
	cfg.kernel = cli.kernel.map(|binary| TargetImage::with_debug_file(binary, cli.kernel_debug_file));
	cfg.gdb = resolve_tool(cli.gdb, "gdb");
	cfg.openocd = resolve_tool(cli.openocd, "openocd");
	cfg
}

/// Explicit path wins; otherwise resolve from PATH, falling back to the
/// bare name so the launch error mentions the tool we looked for.
fn resolve_tool(explicit: Option<PathBuf>, name: &str) -> PathBuf {
	explicit.unwrap_or_else(|| which::which(name).unwrap_or_else(|_| PathBuf::from(name)))
}
