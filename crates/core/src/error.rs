//! Bring-up error types.
//!
//! Every variant is fatal at the point it is raised; no stage is retried.
//! The orchestrator wraps stage failures in [`BringupError::Stage`] so the
//! terminating diagnostic names both the stage reached and the milestone
//! that failed, and the operator can see how far the hardware got.

use thiserror::Error;

use bringup_expect::ExpectError;

use crate::orchestrator::BringupStage;

#[derive(Debug, Error)]
pub enum BringupError {
	/// A subordinate process could not be started.
	#[error(transparent)]
	Launch(#[from] ExpectError),

	/// A milestone was not observed within its timeout.
	#[error("milestone `{milestone}` not observed in time")]
	Timeout { milestone: &'static str },

	/// The subordinate exited before the milestone appeared.
	#[error("subordinate exited before milestone `{milestone}`")]
	StreamEnded { milestone: &'static str },

	/// A recognized failure pattern matched where success was expected.
	#[error("milestone `{milestone}` failed: matched {matched} instead")]
	Mismatch { milestone: &'static str, matched: String },

	/// A required external tool is not resolvable.
	#[error("`{0}` not found in PATH, cannot continue")]
	ToolNotFound(String),

	/// No attached serial device matches the expected USB identifiers.
	#[error("no serial device with USB VID {vid:#06x} / PID {pid:#06x}")]
	DeviceNotFound { vid: u16, pid: u16 },

	/// Serial port enumeration itself failed.
	#[error("serial port enumeration failed: {0}")]
	SerialEnumeration(#[from] serialport::Error),

	/// The console did not report readiness; nothing else was attempted.
	#[error("serial console unavailable: {0}")]
	ConsoleUnavailable(#[source] Box<BringupError>),

	/// The debug bridge did not reach its listening state.
	#[error("debug bridge failed to start: {0}")]
	BridgeStartup(#[source] Box<BringupError>),

	/// Stage annotation added at the orchestrator boundary.
	#[error("bring-up failed after reaching stage `{stage}`: {source}")]
	Stage {
		stage: BringupStage,
		#[source]
		source: Box<BringupError>,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BringupError>;
