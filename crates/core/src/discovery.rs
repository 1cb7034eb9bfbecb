//! Locates the board's serial console by its USB identifiers.

use serialport::SerialPortType;
use tracing::debug;

use crate::error::{BringupError, Result};

/// USB vendor ID of the board's CP210x UART bridge.
pub const CONSOLE_USB_VID: u16 = 0x10c4;
/// USB product ID of the board's CP210x UART bridge.
pub const CONSOLE_USB_PID: u16 = 0xea70;

/// Returns the device path of the attached console TTY.
///
/// Consumed once, before orchestration begins.
pub fn find_console_tty() -> Result<String> {
	let ports = serialport::available_ports()?;
	for port in ports {
		let SerialPortType::UsbPort(usb) = &port.port_type else {
			continue;
		};
		debug!(device = %port.port_name, vid = usb.vid, pid = usb.pid, "considering serial device");
		if usb.vid == CONSOLE_USB_VID && usb.pid == CONSOLE_USB_PID {
			return Ok(port.port_name);
		}
	}
	Err(BringupError::DeviceNotFound {
		vid: CONSOLE_USB_VID,
		pid: CONSOLE_USB_PID,
	})
}
