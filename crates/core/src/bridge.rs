//! Debug bridge launcher: starts the probe-to-network bridge and extracts
//! the debugger port from its startup banner.

use tracing::info;

use bringup_expect::{Session, SessionOptions};

use crate::config::BringupConfig;
use crate::error::{BringupError, Result};
use crate::milestone::Milestone;
use crate::scripts;

/// Well-known GDB server port, used when the bridge does not announce one.
pub const DEFAULT_GDB_PORT: u16 = 3333;

const BRIDGE_BANNER: &str = "Open On-Chip Debugger";
const GDB_PORT_LINE: &str = r"Info : Listening on port (\d+) for gdb connections";
const MONITOR_PORT_LINE: &str = "Info : Listening on port 4444 for telnet connections";

/// Launches the bridge against the bundled probe configuration and waits
/// until it is ready for an incoming debugger connection.
pub async fn start_bridge(cfg: &BringupConfig) -> Result<(Session, u16)> {
	let script = scripts::write_script(scripts::OPENOCD_CFG)?;
	let args = vec!["-f".to_string(), script.path().display().to_string()];
	let mut bridge = cfg.open_session(&cfg.openocd.display().to_string(), &args, SessionOptions::default())?;

	let port = match confirm_ready(&mut bridge).await {
		Ok(port) => port,
		Err(err) => return Err(BringupError::BridgeStartup(Box::new(err))),
	};
	info!(port, "bridge waiting for debugger connection");
	Ok((bridge, port))
}

/// The bridge's readiness handshake: banner, debugger port announcement,
/// monitor port announcement.
///
/// Some bridge builds assign the debugger port dynamically and some omit
/// the announcement altogether, so the port line and the monitor line are
/// matched as alternatives: seeing the monitor line first means no port was
/// announced and the well-known default applies.
pub(crate) async fn confirm_ready(bridge: &mut Session) -> Result<u16> {
	Milestone::exact("bridge started", BRIDGE_BANNER).confirm(bridge).await?;

	let port_or_monitor = Milestone::regex("bridge listening for debugger", GDB_PORT_LINE)?.or_fail(MONITOR_PORT_LINE);
	match port_or_monitor.confirm(bridge).await {
		Ok(found) => {
			let port = found
				.capture(1)
				.and_then(|digits| digits.parse().ok())
				.unwrap_or(DEFAULT_GDB_PORT);
			Milestone::exact("bridge listening for monitor", MONITOR_PORT_LINE)
				.confirm(bridge)
				.await?;
			Ok(port)
		}
		Err(BringupError::Mismatch { .. }) => {
			// Monitor line arrived without a port announcement.
			info!(port = DEFAULT_GDB_PORT, "bridge did not announce a debugger port, using default");
			Ok(DEFAULT_GDB_PORT)
		}
		Err(err) => Err(err),
	}
}
