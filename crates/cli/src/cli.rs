use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fpga-run")]
#[command(about = "Program an FPGA SoC prototype and boot it under debugger control")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Bitstream to program into the FPGA; programming is skipped when omitted
	#[arg(long, value_name = "FILE")]
	pub bitstream: Option<PathBuf>,

	/// Probe-info file for the programming tool (default: bitstream with .ltx extension)
	#[arg(long, value_name = "FILE")]
	pub probe_info: Option<PathBuf>,

	/// Machine-mode firmware image to load
	#[arg(long, value_name = "FILE")]
	pub firmware: PathBuf,

	/// Supervisor-mode kernel image to load before the firmware
	#[arg(long, value_name = "FILE")]
	pub kernel: Option<PathBuf>,

	/// Separate debug-symbol file for the kernel
	#[arg(long, value_name = "FILE")]
	pub kernel_debug_file: Option<PathBuf>,

	/// Path to the debugger binary
	#[arg(long, value_name = "PATH")]
	pub gdb: Option<PathBuf>,

	/// Path to the debug bridge binary
	#[arg(long, value_name = "PATH")]
	pub openocd: Option<PathBuf>,

	/// Don't touch the hardware; walk the sequence against pretend sessions
	#[arg(long)]
	pub pretend: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_minimal_invocation() {
		let cli = Cli::try_parse_from(["fpga-run", "--firmware", "/tmp/fw.elf"]).unwrap();
		assert_eq!(cli.firmware, PathBuf::from("/tmp/fw.elf"));
		assert!(cli.bitstream.is_none());
		assert!(!cli.pretend);
	}

	#[test]
	fn firmware_is_required() {
		assert!(Cli::try_parse_from(["fpga-run", "--pretend"]).is_err());
	}

	#[test]
	fn parse_full_invocation() {
		let cli = Cli::try_parse_from([
			"fpga-run",
			"--bitstream",
			"/tmp/soc.bit",
			"--firmware",
			"/tmp/fw.elf",
			"--kernel",
			"/tmp/kernel",
			"--kernel-debug-file",
			"/tmp/kernel.dbg",
			"--gdb",
			"/opt/riscv/bin/gdb",
			"--pretend",
			"-vv",
		])
		.unwrap();
		assert_eq!(cli.bitstream, Some(PathBuf::from("/tmp/soc.bit")));
		assert_eq!(cli.kernel_debug_file, Some(PathBuf::from("/tmp/kernel.dbg")));
		assert_eq!(cli.gdb, Some(PathBuf::from("/opt/riscv/bin/gdb")));
		assert!(cli.pretend);
		assert_eq!(cli.verbose, 2);
	}
}
