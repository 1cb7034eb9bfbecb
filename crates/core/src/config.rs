//! Bring-up configuration shared by every stage.

use std::path::PathBuf;
use std::time::Duration;

use bringup_expect::{Session, SessionOptions};

use crate::error::Result;
use crate::image::TargetImage;

/// Console serial line rate expected by the prototype's UART.
pub const CONSOLE_BAUD_RATE: u32 = 115_200;

/// Everything the orchestrator needs to know, decided once at startup.
///
/// The pretend flag is carried here rather than in ambient global state so
/// each stage stays independently testable.
#[derive(Debug, Clone)]
pub struct BringupConfig {
	/// Walk the full control flow without launching real subordinates.
	pub pretend: bool,
	/// Bitstream to program; programming is skipped entirely when `None`.
	pub bitstream: Option<PathBuf>,
	/// Probe-info file for the programming tool. Defaults to the bitstream
	/// path with its extension replaced by `.ltx`.
	pub probe_info: Option<PathBuf>,
	/// Machine-mode firmware image, always loaded.
	pub firmware: PathBuf,
	/// Optional supervisor-mode kernel, loaded before the firmware.
	pub kernel: Option<TargetImage>,
	/// Debugger executable.
	pub gdb: PathBuf,
	/// Debug-probe bridge executable.
	pub openocd: PathBuf,
	/// Interpreter used to run the bundled serial terminal.
	pub console_command: String,
	pub baud_rate: u32,
	/// Pause after FPGA programming before anything else claims the probe.
	/// Empirically avoids LIBUSB_ERROR_BUSY from the bridge; there is no
	/// documented lower bound, so it stays configurable.
	pub probe_release_delay: Duration,
}

impl BringupConfig {
	pub fn new(firmware: PathBuf) -> Self {
		Self {
			pretend: false,
			bitstream: None,
			probe_info: None,
			firmware,
			kernel: None,
			gdb: PathBuf::from("gdb"),
			openocd: PathBuf::from("openocd"),
			console_command: "python3".to_string(),
			baud_rate: CONSOLE_BAUD_RATE,
			probe_release_delay: Duration::from_secs(3),
		}
	}

	/// Opens a real or pretend session according to the execution mode.
	pub(crate) fn open_session(&self, program: &str, args: &[String], opts: SessionOptions) -> Result<Session> {
		if self.pretend {
			Ok(Session::pretend(program, args, opts))
		} else {
			Ok(Session::spawn(program, args, opts)?)
		}
	}
}
