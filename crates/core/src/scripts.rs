//! Fixed control payloads handed to external tools.
//!
//! These are versioned with the orchestrator itself and are not
//! user-configurable; the only runtime inputs are the tclargs passed on the
//! programming tool's command line.

use std::io::Write as _;

use tempfile::NamedTempFile;

/// Batch script driving the Vivado hardware manager. Takes two tclargs:
/// the bitstream path and the probe-info (LTX) path.
pub const VIVADO_TCL: &str = r#"
if { [llength $argv] != 2 } {
    puts "ERROR!! Did not pass proper number of arguments to this script."
    puts "args: <bitfile path> <ltxfile path>"
    exit -1
}
set bitfile [lindex $argv 0]
set probfile [lindex $argv 1]

open_hw
connect_hw_server
open_hw_target
current_hw_device [get_hw_devices xcvu9p_0]
set_property PROBES.FILE $probfile [get_hw_devices xcvu9p_0]
set_property FULL_PROBES.FILE $probfile [get_hw_devices xcvu9p_0]
set_property PROGRAM.FILE $bitfile [get_hw_devices xcvu9p_0]
puts "---------------------"
puts "Program Configuration"
puts "---------------------"
puts "Bitstream : $bitfile"
puts "Probe Info: $probfile"
puts ""
puts "Programming..."
program_hw_devices [get_hw_devices xcvu9p_0]
close_hw_target
disconnect_hw_server
close_hw
puts "Done!"
exit 0
"#;

/// OpenOCD configuration for the on-board FTDI JTAG probe, ending in
/// `reset halt` so the target sits at its reset vector when GDB attaches.
pub const OPENOCD_CFG: &str = r#"
interface ftdi
transport select jtag
bindto 0.0.0.0
adapter_khz 2000

ftdi_tdo_sample_edge falling

ftdi_vid_pid 0x0403 0x6014

ftdi_channel 0
ftdi_layout_init 0x00e8 0x60eb

reset_config none

set _CHIPNAME riscv
jtag newtap $_CHIPNAME cpu -irlen 18 -ignore-version -expected-id 0x04B31093

set _TARGETNAME $_CHIPNAME.cpu
target create $_TARGETNAME riscv -chain-position $_TARGETNAME

riscv set_ir dtmcs 0x022924
riscv set_ir dmi 0x003924

init

halt
reset halt
"#;

/// Writes `contents` to a private temporary file. The returned handle must
/// outlive the subordinate's startup; the file is removed on drop.
pub fn write_script(contents: &str) -> std::io::Result<NamedTempFile> {
	let mut file = NamedTempFile::new()?;
	file.write_all(contents.as_bytes())?;
	file.flush()?;
	Ok(file)
}
