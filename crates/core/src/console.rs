//! Serial console session.
//!
//! Uses the miniterm tool bundled with PySerial as the interactive prompt,
//! so no external terminal emulator needs to be installed. The console is
//! opened before any hardware mutation: there is no point programming the
//! FPGA if its output can never be observed.

use std::time::Duration;

use bringup_expect::{Session, SessionOptions};

use crate::config::BringupConfig;
use crate::error::{BringupError, Result};
use crate::milestone::Milestone;

const CONSOLE_READY: &str = "--- Miniterm on ";
const CONSOLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens the serial console on `device` and waits for its ready banner.
pub async fn open_console(cfg: &BringupConfig, device: &str) -> Result<Session> {
	let args = vec![
		"-m".to_string(),
		"serial.tools.miniterm".to_string(),
		device.to_string(),
		cfg.baud_rate.to_string(),
		"--filter".to_string(),
		"colorize".to_string(),
	];
	let opts = SessionOptions {
		default_timeout: CONSOLE_TIMEOUT,
		..SessionOptions::default()
	};
	let mut console = cfg.open_session(&cfg.console_command, &args, opts)?;
	confirm_ready(&mut console).await?;
	Ok(console)
}

pub(crate) async fn confirm_ready(console: &mut Session) -> Result<()> {
	Milestone::exact("console ready", CONSOLE_READY)
		.confirm(console)
		.await
		.map_err(|err| BringupError::ConsoleUnavailable(Box::new(err)))?;
	Ok(())
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
	async fn ready_banner_confirms() {
		let (mut console, script) = Session::piped("miniterm", quiet());
		script.push_line("--- Miniterm on /dev/ttyUSB1  115200,8,N,1 ---");
		confirm_ready(&mut console).await.unwrap();
	}

	#[tokio::test]
	async fn missing_banner_is_console_unavailable() {
		let (mut console, script) = Session::piped("miniterm", quiet());
		script.push_line("could not open port");
		script.close();
		let err = confirm_ready(&mut console).await.unwrap_err();
		assert!(matches!(err, BringupError::ConsoleUnavailable(_)));
	}
}
