//! End-to-end orchestration runs against pretend sessions.

use std::path::PathBuf;

use bringup_core::{BringupConfig, BringupError, BringupStage, Orchestrator, TargetImage};

fn pretend_config() -> BringupConfig {
	let mut cfg = BringupConfig::new(PathBuf::from("/tmp/fw.elf"));
	cfg.pretend = true;
	cfg
}

#[tokio::test]
async fn pretend_run_reaches_running_without_hardware() {
	let cfg = pretend_config();
	let conn = Orchestrator::new(cfg).run("/dev/ttyUSB0").await.unwrap();
	assert!(conn.console.is_pretend());
	assert!(conn.bridge.is_pretend());
	assert!(conn.debugger.is_pretend());
}

#[tokio::test]
async fn pretend_run_with_bitstream_and_kernel() {
	let mut cfg = pretend_config();
	cfg.bitstream = Some(PathBuf::from("/tmp/soc.bit"));
	cfg.kernel = Some(TargetImage::new(PathBuf::from("/tmp/kernel")));
	// Probe-info intentionally unset: it defaults to the bitstream path
	// with an .ltx extension.
	let conn = Orchestrator::new(cfg).run("/dev/ttyUSB0").await.unwrap();
	assert!(conn.debugger.command_line().contains("symbol-file /tmp/kernel"));
	assert!(conn.debugger.command_line().contains("load /tmp/kernel"));
	assert!(conn.debugger.command_line().contains("load /tmp/fw.elf"));
}

#[tokio::test]
async fn omitted_bitstream_skips_programming_tool() {
	// Without a bitstream the programming stage never runs, so a missing
	// programming tool cannot matter even in real mode checks; in pretend
	// mode the debugger command line proves only bridge/debugger/console
	// sessions were created.
	let cfg = pretend_config();
	let conn = Orchestrator::new(cfg).run("/dev/ttyUSB0").await.unwrap();
	assert!(conn.debugger.command_line().starts_with("gdb"));
	assert!(conn.debugger.command_line().contains("target extended-remote :3333"));
}

#[tokio::test]
async fn pretend_port_defaults_to_well_known() {
	// Pretend bridge output carries no port announcement; the debugger must
	// still be aimed at the well-known default.
	let cfg = pretend_config();
	let conn = Orchestrator::new(cfg).run("/dev/ttyUSB0").await.unwrap();
	assert!(conn.debugger.command_line().contains(":3333"));
}

#[tokio::test]
async fn console_failure_aborts_before_any_other_stage() {
	let mut cfg = BringupConfig::new(PathBuf::from("/tmp/fw.elf"));
	cfg.pretend = false;
	cfg.console_command = "/nonexistent/serial-terminal".to_string();
	cfg.bitstream = Some(PathBuf::from("/tmp/soc.bit"));

	let err = Orchestrator::new(cfg).run("/dev/ttyUSB0").await.unwrap_err();
	// Failure is at the console launch while still idle; had programming
	// run first the error would name the programming tool instead.
	let BringupError::Stage { stage, source } = err else {
		panic!("expected stage annotation, got {err}");
	};
	assert_eq!(stage, BringupStage::Idle);
	assert!(matches!(*source, BringupError::Launch(_)));
}
