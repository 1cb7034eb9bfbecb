//! Expect-style control of subordinate interactive processes.
//!
//! A [`Session`] wraps one long-lived child process (a programming tool, a
//! debug bridge, a debugger, a serial terminal) and exposes line-oriented
//! writes plus pattern-matched reads with per-call timeouts. A pretend
//! backend exercises the same call sequence without launching anything, and
//! a piped backend lets tests script the subordinate's output by hand.

pub mod error;
mod pattern;
mod session;

pub use error::{ExpectError, Result};
pub use pattern::{Match, Pattern};
pub use session::{ExpectOutcome, ScriptHandle, Session, SessionOptions};
