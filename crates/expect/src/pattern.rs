//! Candidate patterns and match results for `Session::expect`.

use std::fmt;

use regex_lite::Regex;

use crate::error::Result;

/// One candidate expectation against the output stream.
#[derive(Debug, Clone)]
pub enum Pattern {
	/// Literal substring match (the common case for tool banners).
	Exact(String),
	/// Regular-expression match; capture groups are reported on [`Match`].
	Regex(Regex),
}

impl Pattern {
	pub fn exact(text: impl Into<String>) -> Self {
		Pattern::Exact(text.into())
	}

	pub fn regex(pattern: &str) -> Result<Self> {
		Ok(Pattern::Regex(Regex::new(pattern)?))
	}
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Pattern::Exact(text) => write!(f, "{text:?}"),
			Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
		}
	}
}

/// A confirmed match: which candidate hit and its capture groups.
#[derive(Debug, Clone)]
pub struct Match {
	/// Index into the candidate list passed to `expect`.
	pub index: usize,
	/// Capture groups 1.. of a [`Pattern::Regex`] candidate; empty otherwise.
	pub captures: Vec<Option<String>>,
}

impl Match {
	/// Returns capture group `group` (1-based) when present and non-empty.
	pub fn capture(&self, group: usize) -> Option<&str> {
		self.captures.get(group.checked_sub(1)?)?.as_deref()
	}
}
