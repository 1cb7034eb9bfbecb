//! Device programmer: drives the bitstream-programming tool through its
//! milestone sequence and cleans up after it.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use bringup_expect::{Session, SessionOptions};

use crate::config::BringupConfig;
use crate::error::{BringupError, Result};
use crate::milestone::Milestone;
use crate::scripts;

/// Programming a large FPGA takes a while, but five minutes is plenty.
const PROGRAM_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const VIVADO_EXIT: &str = "Exiting Vivado at";

/// Programs `bitstream` into the FPGA via the Vivado hardware manager.
///
/// In real mode this ends with a short pause so the FTDI probe interface is
/// released before the debug bridge claims it.
pub async fn program_bitstream(cfg: &BringupConfig, bitstream: &Path, probe_info: &Path) -> Result<()> {
	let vivado = if cfg.pretend {
		"vivado".to_string()
	} else {
		which::which("vivado")
			.map_err(|_| BringupError::ToolNotFound("vivado".to_string()))?
			.display()
			.to_string()
	};

	let script = scripts::write_script(scripts::VIVADO_TCL)?;
	let mut args: Vec<String> = ["-nojournal", "-notrace", "-nolog", "-source"]
		.iter()
		.map(|s| s.to_string())
		.collect();
	args.push(script.path().display().to_string());
	args.extend(["-mode".to_string(), "batch".to_string(), "-tclargs".to_string()]);
	args.push(bitstream.display().to_string());
	args.push(probe_info.display().to_string());

	let mut session = cfg.open_session(&vivado, &args, SessionOptions::default())?;
	drive_programming(&mut session).await?;

	// Vivado drops usage-reporting files in the working directory.
	remove_incidental_artifacts();

	if !cfg.pretend {
		// Without this the bridge can hit LIBUSB_ERROR_BUSY claiming the
		// probe interface right after programming.
		tokio::time::sleep(cfg.probe_release_delay).await;
	}
	Ok(())
}

/// The fixed milestone sequence of one programming run.
pub(crate) async fn drive_programming(session: &mut Session) -> Result<()> {
	Milestone::exact("programming tool started", "****** Vivado")
		.or_fail(VIVADO_EXIT)
		.confirm(session)
		.await?;
	Milestone::exact("programming started", "Programming...")
		.or_fail(VIVADO_EXIT)
		.within(PROGRAM_TIMEOUT)
		.confirm(session)
		.await?;
	Milestone::exact("programming finished", "Done!")
		.or_fail(VIVADO_EXIT)
		.within(PROGRAM_TIMEOUT)
		.confirm(session)
		.await?;
	Milestone::exact("programming tool exited", VIVADO_EXIT).confirm(session).await?;
	info!("FPGA programmed");
	Ok(())
}

/// Best-effort removal of tool-generated side files; never raises.
fn remove_incidental_artifacts() {
	for name in ["webtalk.log", "webtalk.jou"] {
		if std::fs::remove_file(name).is_ok() {
			debug!(file = name, "removed programming tool artifact");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn quiet() -> SessionOptions {
		SessionOptions {
			echo: false,
			..SessionOptions::default()
		}
	}

	#[tokio::test]
	async fn full_transcript_completes() {
		let (mut session, script) = Session::piped("vivado", quiet());
		script.push_line("****** Vivado v2019.1 (64-bit)");
		script.push_line("Programming...");
		script.push_line("Done!");
		script.push_line("Exiting Vivado at Mon Jan  1 00:00:00 2024...");
		drive_programming(&mut session).await.unwrap();
	}

	#[tokio::test]
	async fn early_exit_banner_is_mismatch() {
		let (mut session, script) = Session::piped("vivado", quiet());
		script.push_line("Exiting Vivado at Mon Jan  1 00:00:00 2024...");
		let err = drive_programming(&mut session).await.unwrap_err();
		assert!(matches!(
			err,
			BringupError::Mismatch {
				milestone: "programming tool started",
				..
			}
		));
	}

	#[tokio::test]
	async fn exit_during_programming_is_mismatch() {
		let (mut session, script) = Session::piped("vivado", quiet());
		script.push_line("****** Vivado v2019.1 (64-bit)");
		script.push_line("Programming...");
		script.push_line("Exiting Vivado at Mon Jan  1 00:00:00 2024...");
		let err = drive_programming(&mut session).await.unwrap_err();
		assert!(matches!(
			err,
			BringupError::Mismatch {
				milestone: "programming finished",
				..
			}
		));
	}

	#[tokio::test]
	async fn pretend_mode_never_launches_or_blocks() {
		let cfg = {
			let mut cfg = BringupConfig::new("/tmp/fw.elf".into());
			cfg.pretend = true;
			cfg.probe_release_delay = Duration::from_secs(3600);
			cfg
		};
		// The probe-release pause is a hardware workaround and must be
		// skipped in pretend mode, so this returns immediately.
		program_bitstream(&cfg, Path::new("/tmp/soc.bit"), Path::new("/tmp/soc.ltx"))
			.await
			.unwrap();
	}
}
