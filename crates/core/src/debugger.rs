//! Debugger driver: attaches GDB through the bridge, steps the target past
//! reset, and loads the kernel and firmware images into target memory.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use bringup_expect::{Session, SessionOptions};

use crate::config::BringupConfig;
use crate::error::Result;
use crate::image::TargetImage;
use crate::milestone::Milestone;

/// Instructions to single-step after reset-halt. The first few instructions
/// must execute before the device-tree data is valid; the exact count is an
/// opaque property of this target's boot ROM.
pub const RESET_STEP_COUNT: u32 = 5;

/// Kernel images are large and the JTAG link is slow.
pub const KERNEL_LOAD_TIMEOUT: Duration = Duration::from_secs(20 * 60);
/// Firmware is far smaller than a kernel; half the budget is generous.
pub const FIRMWARE_LOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const ATTACH_TIMEOUT: Duration = Duration::from_secs(60);

/// Reset vector inside the boot ROM where `reset halt` leaves the core.
const BOOT_ROM_ENTRY: &str = "0x0000000070000000 in ??";
/// First address outside the boot ROM, reached after the single-steps.
const BOOT_ROM_EXIT: &str = "0x0000000044000000 in ??";

/// Builds the debugger's full command line deterministically.
///
/// Symbol-file setup for the kernel must precede its `load`: `load` moves
/// the program counter to the image entry point, and the firmware `load`
/// comes last for the same reason.
pub fn debugger_args(port: u16, firmware: &Path, kernel: Option<&TargetImage>) -> Vec<String> {
	let mut args = vec![firmware.display().to_string()];
	let mut ex = |cmd: String| {
		args.push("-ex".to_string());
		args.push(cmd);
	};
	ex(format!("target extended-remote :{port}"));
	ex("set confirm off".to_string());
	ex("monitor reset init".to_string());
	ex(format!("si {RESET_STEP_COUNT}"));
	ex("set disassemble-next-line on".to_string());
	if let Some(kernel) = kernel {
		ex(format!("symbol-file {}", kernel.resolved_debug_file().display()));
		ex(format!("load {}", kernel.binary.display()));
	}
	ex(format!("load {}", firmware.display()));
	args
}

/// Starts the debugger against the bridge's port and drives it through the
/// full load sequence. Returns the attached session; the target is still
/// halted — the orchestrator issues the resume.
pub async fn attach_debugger(
	cfg: &BringupConfig,
	bridge: &mut Session,
	port: u16,
	firmware: &Path,
	kernel: Option<&TargetImage>,
) -> Result<Session> {
	let args = debugger_args(port, firmware, kernel);
	let opts = SessionOptions {
		default_timeout: ATTACH_TIMEOUT,
		..SessionOptions::default()
	};
	let mut gdb = cfg.open_session(&cfg.gdb.display().to_string(), &args, opts)?;
	confirm_attach(&mut gdb, bridge, port, kernel.is_some()).await?;
	Ok(gdb)
}

/// The fixed milestone sequence of one attach-and-load run.
///
/// The debugger and the bridge each observe one side of the same TCP
/// connection; both milestones must be confirmed, as two sequential waits,
/// before trusting that the link is up.
pub(crate) async fn confirm_attach(gdb: &mut Session, bridge: &mut Session, port: u16, kernel: bool) -> Result<()> {
	Milestone::exact("debugger read symbols", "Reading symbols from").confirm(gdb).await?;
	Milestone::exact(
		"bridge accepted debugger connection",
		format!("Info : accepting 'gdb' connection on tcp/{port}"),
	)
	.confirm(bridge)
	.await?;
	Milestone::exact("remote debugging established", format!("Remote debugging using :{port}"))
		.confirm(gdb)
		.await?;
	Milestone::exact("target halted in boot ROM", BOOT_ROM_ENTRY).confirm(gdb).await?;
	Milestone::exact("target ran past boot ROM", BOOT_ROM_EXIT).confirm(gdb).await?;

	if kernel {
		Milestone::exact("kernel load started", "Loading section .text").confirm(gdb).await?;
		let started = Instant::now();
		info!("loading kernel image (this may take a long time)");
		Milestone::exact("kernel load finished", "Transfer rate:")
			.within(KERNEL_LOAD_TIMEOUT)
			.confirm(gdb)
			.await?;
		info!(elapsed = ?started.elapsed(), "kernel image loaded");
	}

	Milestone::exact("firmware load started", "Loading section .text").confirm(gdb).await?;
	let started = Instant::now();
	Milestone::exact("firmware load finished", "Transfer rate:")
		.within(FIRMWARE_LOAD_TIMEOUT)
		.confirm(gdb)
		.await?;
	info!(elapsed = ?started.elapsed(), "firmware image loaded");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::path::PathBuf;

	fn quiet() -> SessionOptions {
		SessionOptions {
			echo: false,
			..SessionOptions::default()
		}
	}

	fn scripted_bridge(port: u16) -> (Session, bringup_expect::ScriptHandle) {
		let (bridge, script) = Session::piped("openocd", quiet());
		script.push_line(&format!("Info : accepting 'gdb' connection on tcp/{port}"));
		(bridge, script)
	}

	#[test]
	fn kernel_timeout_exceeds_firmware_timeout() {
		assert!(KERNEL_LOAD_TIMEOUT > FIRMWARE_LOAD_TIMEOUT);
	}

	#[test]
	fn args_without_kernel_load_firmware_only() {
		let args = debugger_args(3333, Path::new("/tmp/fw.elf"), None);
		assert_eq!(args[0], "/tmp/fw.elf");
		let script: Vec<&str> = args.iter().skip(1).filter(|a| *a != "-ex").map(String::as_str).collect();
		assert_eq!(
			script,
			vec![
				"target extended-remote :3333",
				"set confirm off",
				"monitor reset init",
				"si 5",
				"set disassemble-next-line on",
				"load /tmp/fw.elf",
			]
		);
	}

	#[test]
	fn kernel_symbols_precede_kernel_load_precede_firmware_load() {
		let kernel = TargetImage::with_debug_file(PathBuf::from("/img/kernel"), Some(PathBuf::from("/img/kernel.dbg")));
		let args = debugger_args(3333, Path::new("/img/fw.elf"), Some(&kernel));
		let joined = args.join(" ");
		let symbols = joined.find("symbol-file /img/kernel.dbg").unwrap();
		let kernel_load = joined.find("load /img/kernel").unwrap();
		let firmware_load = joined.find("load /img/fw.elf").unwrap();
		assert!(symbols < kernel_load);
		assert!(kernel_load < firmware_load);
	}

	#[tokio::test]
	async fn firmware_only_milestones() {
		let (mut gdb, gdb_script) = Session::piped("gdb", quiet());
		gdb_script.push_line("Reading symbols from /tmp/fw.elf...");
		gdb_script.push_line("Remote debugging using :3333");
		gdb_script.push_line("0x0000000070000000 in ?? ()");
		gdb_script.push_line("0x0000000044000000 in ?? ()");
		gdb_script.push_line("Loading section .text, size 0x1000 lma 0x44000000");
		gdb_script.push_line("Transfer rate: 10 KB/sec, 1024 bytes/write.");
		let (mut bridge, _bridge_script) = scripted_bridge(3333);

		confirm_attach(&mut gdb, &mut bridge, 3333, false).await.unwrap();
	}

	#[tokio::test]
	async fn kernel_milestones_run_before_firmware_milestones() {
		let (mut gdb, gdb_script) = Session::piped("gdb", quiet());
		gdb_script.push_line("Reading symbols from /img/fw.elf...");
		gdb_script.push_line("Remote debugging using :3333");
		gdb_script.push_line("0x0000000070000000 in ?? ()");
		gdb_script.push_line("0x0000000044000000 in ?? ()");
		// Kernel transfer transcript, then the firmware's.
		gdb_script.push_line("Loading section .text, size 0x400000 lma 0x80000000");
		gdb_script.push_line("Transfer rate: 10 KB/sec, 1024 bytes/write.");
		gdb_script.push_line("Loading section .text, size 0x1000 lma 0x44000000");
		gdb_script.push_line("Transfer rate: 12 KB/sec, 1024 bytes/write.");
		let (mut bridge, _bridge_script) = scripted_bridge(3333);

		confirm_attach(&mut gdb, &mut bridge, 3333, true).await.unwrap();
	}

	#[tokio::test]
	async fn bridge_must_see_matching_port() {
		let (mut gdb, gdb_script) = Session::piped("gdb", quiet());
		gdb_script.push_line("Reading symbols from /tmp/fw.elf...");
		// Bridge reports a different port than the one we attached to.
		let (mut bridge, bridge_script) = Session::piped("openocd", quiet());
		bridge_script.push_line("Info : accepting 'gdb' connection on tcp/42001");
		bridge_script.close();

		let err = confirm_attach(&mut gdb, &mut bridge, 3333, false).await.unwrap_err();
		assert!(matches!(
			err,
			crate::error::BringupError::StreamEnded {
				milestone: "bridge accepted debugger connection"
			}
		));
	}
}
