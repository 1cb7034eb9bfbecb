//! Named, timed expectations against a session's output stream.

use std::time::Duration;

use tracing::info;

use bringup_expect::{ExpectOutcome, Match, Pattern, Session};

use crate::error::{BringupError, Result};

/// One ordered expectation: an expected pattern, zero or more recognized
/// failure patterns, and a timeout. Candidate 0 is the only success; any
/// alternate matching instead is a [`BringupError::Mismatch`], never a
/// timeout.
pub struct Milestone {
	name: &'static str,
	patterns: Vec<Pattern>,
	timeout: Option<Duration>,
}

impl Milestone {
	/// Expectation for a literal banner or status marker.
	pub fn exact(name: &'static str, text: impl Into<String>) -> Self {
		Self {
			name,
			patterns: vec![Pattern::exact(text)],
			timeout: None,
		}
	}

	/// Expectation matched by regular expression (capture groups reported).
	pub fn regex(name: &'static str, pattern: &str) -> Result<Self> {
		Ok(Self {
			name,
			patterns: vec![Pattern::regex(pattern)?],
			timeout: None,
		})
	}

	/// Adds a recognized failure pattern, e.g. a tool's exit banner.
	pub fn or_fail(mut self, text: impl Into<String>) -> Self {
		self.patterns.push(Pattern::exact(text));
		self
	}

	/// Overrides the session's default timeout for this milestone.
	pub fn within(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Blocks until the milestone resolves one way or the other.
	pub async fn confirm(&self, session: &mut Session) -> Result<Match> {
		match session.expect(&self.patterns, self.timeout).await? {
			ExpectOutcome::Matched(found) if found.index == 0 => {
				info!(milestone = self.name, "confirmed");
				Ok(found)
			}
			ExpectOutcome::Matched(found) => Err(BringupError::Mismatch {
				milestone: self.name,
				matched: self.patterns[found.index].to_string(),
			}),
			ExpectOutcome::TimedOut => Err(BringupError::Timeout { milestone: self.name }),
			ExpectOutcome::StreamEnded => Err(BringupError::StreamEnded { milestone: self.name }),
		}
	}
}
