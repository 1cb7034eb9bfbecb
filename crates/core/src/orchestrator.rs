//! The bring-up state machine.
//!
//! Stages run strictly in sequence; each one is entered only after every
//! milestone of its predecessor is confirmed. A failure anywhere is
//! terminal: completed stages are not rolled back (the FPGA stays
//! programmed) and nothing is retried — the error names the stage reached
//! so the operator can decide where to pick up manually.

use std::fmt;
use std::time::Instant;

use tracing::info;

use bringup_expect::Session;

use crate::boot;
use crate::bridge;
use crate::config::BringupConfig;
use crate::console;
use crate::debugger;
use crate::error::{BringupError, Result};
use crate::programmer;

/// Orchestration progress, advanced only on confirmed milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupStage {
	Idle,
	ConsoleOpened,
	Programmed,
	BridgeReady,
	DebuggerAttached,
	Running,
	Interactive,
}

impl fmt::Display for BringupStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BringupStage::Idle => "idle",
			BringupStage::ConsoleOpened => "console-opened",
			BringupStage::Programmed => "programmed",
			BringupStage::BridgeReady => "bridge-ready",
			BringupStage::DebuggerAttached => "debugger-attached",
			BringupStage::Running => "running",
			BringupStage::Interactive => "interactive",
		};
		f.write_str(name)
	}
}

/// The three live sessions left over after a successful bring-up, owned by
/// the caller for the rest of the process's life.
#[derive(Debug)]
pub struct TargetConnection {
	pub debugger: Session,
	pub bridge: Session,
	pub console: Session,
}

impl TargetConnection {
	/// Resets the whole SoC, not just the core, through a GPIO block wired
	/// to the SoC reset line. The core is left running afterwards, so the
	/// continue/interrupt pair brings the debugger back in sync.
	pub async fn hard_reset(&mut self) -> Result<()> {
		self.debugger.send_line("set *(0x6fff0000)=1").await?;
		self.debugger.send_line("continue").await?;
		self.debugger.send_control('c').await?;
		Ok(())
	}

	/// Hands the operator the console, terminal state of the bring-up.
	///
	/// Sends the terminal's help chord first so the escape key is on
	/// screen, then silences transcript mirroring: interactive forwarding
	/// is unstructured and would be duplicated byte for byte.
	pub async fn interact(mut self) -> Result<()> {
		info!(stage = %BringupStage::Interactive, "interacting with target; press Ctrl-] to exit");
		self.console.send_control('t').await?;
		self.console.send_control('h').await?;
		self.console.set_echo(false);
		self.console.interact().await?;
		Ok(())
	}
}

/// Drives the stages of one bring-up attempt.
pub struct Orchestrator {
	cfg: BringupConfig,
	stage: BringupStage,
}

impl Orchestrator {
	pub fn new(cfg: BringupConfig) -> Self {
		Self {
			cfg,
			stage: BringupStage::Idle,
		}
	}

	pub fn stage(&self) -> BringupStage {
		self.stage
	}

	/// Runs every stage through `Running` and returns the session bundle.
	///
	/// `console_device` is the TTY found by discovery (or a placeholder in
	/// pretend mode). On failure the error is annotated with the last stage
	/// that was fully reached.
	pub async fn run(mut self, console_device: &str) -> Result<TargetConnection> {
		match self.drive(console_device).await {
			Ok(conn) => Ok(conn),
			Err(source) => Err(BringupError::Stage {
				stage: self.stage,
				source: Box::new(source),
			}),
		}
	}

	async fn drive(&mut self, console_device: &str) -> Result<TargetConnection> {
		// Console first: fail fast while the hardware is still untouched.
		let mut console = console::open_console(&self.cfg, console_device).await?;
		self.advance(BringupStage::ConsoleOpened);

		if let Some(bitstream) = self.cfg.bitstream.clone() {
			let probe_info = match &self.cfg.probe_info {
				Some(path) => path.clone(),
				None => bitstream.with_extension("ltx"),
			};
			programmer::program_bitstream(&self.cfg, &bitstream, &probe_info).await?;
			self.advance(BringupStage::Programmed);
		} else {
			info!("no bitstream configured; FPGA programming skipped");
		}

		let attach_started = Instant::now();
		let (mut bridge, port) = bridge::start_bridge(&self.cfg).await?;
		self.advance(BringupStage::BridgeReady);

		let mut debugger =
			debugger::attach_debugger(&self.cfg, &mut bridge, port, &self.cfg.firmware, self.cfg.kernel.as_ref()).await?;
		self.advance(BringupStage::DebuggerAttached);

		// The final load left the PC at the firmware entry point; from here
		// the target runs free and everything arrives on the console.
		debugger.send_line("continue").await?;
		info!(elapsed = ?attach_started.elapsed(), "target released");
		boot::wait_for_login(&mut console, Instant::now()).await?;
		self.advance(BringupStage::Running);

		Ok(TargetConnection {
			debugger,
			bridge,
			console,
		})
	}

	fn advance(&mut self, next: BringupStage) {
		info!(from = %self.stage, to = %next, "stage transition");
		self.stage = next;
	}
}
