//! Error types for session launch and matching.

use thiserror::Error;

/// Errors surfaced by [`crate::Session`] operations.
///
/// Timeouts and stream exhaustion are *not* errors at this layer; they are
/// reported as [`crate::ExpectOutcome`] variants so callers branch on every
/// case explicitly.
#[derive(Debug, Error)]
pub enum ExpectError {
	/// The subordinate executable could not be started.
	#[error("failed to launch `{command}`: {source}")]
	Launch {
		command: String,
		#[source]
		source: std::io::Error,
	},

	/// The session was closed; no further matching or writing is permitted.
	#[error("session `{0}` is closed")]
	Closed(String),

	/// An expect pattern failed to compile.
	#[error("invalid expect pattern: {0}")]
	BadPattern(#[from] regex_lite::Error),

	/// I/O failure talking to the subordinate or the controlling terminal.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExpectError>;
