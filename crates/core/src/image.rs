//! Firmware and kernel image artifacts.

use std::path::PathBuf;

/// A loadable target artifact: the binary itself plus an optional separate
/// debug-symbol file.
#[derive(Debug, Clone)]
pub struct TargetImage {
	pub binary: PathBuf,
	pub debug_file: Option<PathBuf>,
}

impl TargetImage {
	pub fn new(binary: PathBuf) -> Self {
		Self { binary, debug_file: None }
	}

	pub fn with_debug_file(binary: PathBuf, debug_file: Option<PathBuf>) -> Self {
		Self { binary, debug_file }
	}

	/// The file the debugger should read symbols from.
	///
	/// An explicit debug file wins. Otherwise a sibling `<name>.full` image
	/// (the build system's symbols-included variant) is preferred when it
	/// exists on disk, falling back to the binary's own symbols.
	pub fn resolved_debug_file(&self) -> PathBuf {
		if let Some(debug_file) = &self.debug_file {
			return debug_file.clone();
		}
		if let Some(name) = self.binary.file_name() {
			let mut full_name = name.to_os_string();
			full_name.push(".full");
			let full = self.binary.with_file_name(full_name);
			if full.exists() {
				return full;
			}
		}
		self.binary.clone()
	}
}
