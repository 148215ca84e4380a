//! Matching of unikernel console output against `expected-stdout.txt`.
//!
//! The expected text is turned into a regex: surrounding whitespace is
//! trimmed, every run of whitespace matches one or more whitespace
//! characters, and parentheses match literally. Other regex syntax in the
//! expected text stays active. The pattern may match anywhere in the output.

use std::fs::read_to_string;
use std::path::Path;
use regex::{NoExpand, Regex};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ExpectedOutput {
	pattern: Regex
}

impl ExpectedOutput {
	pub fn new(text: &str) -> Result<Self> {
		let pattern = Regex::new(&to_pattern(text)?)?;
		Ok(Self { pattern })
	}

	pub fn load(path: &Path) -> Result<Self> {
		let text = read_to_string(path)
			.map_err(Error::io("failed to read", path))?;
		Self::new(&text)
	}

	pub fn as_str(&self) -> &str {
		self.pattern.as_str()
	}

	pub fn is_match(&self, output: &str) -> bool {
		self.pattern.is_match(output)
	}

	pub fn verify(&self, output: &str) -> Result<()> {
		if self.is_match(output) {
			return Ok(());
		}

		Err(Error::Mismatch {
			expected: self.as_str().to_string(),
			obtained: output.to_string()
		})
	}
}

fn to_pattern(text: &str) -> Result<String> {
	let whitespace = Regex::new(r"\s+")?;

	let trimmed = text.trim();
	let collapsed = whitespace.replace_all(trimmed, NoExpand(r"\s+"));
	let escaped = collapsed.replace('(', r"\(").replace(')', r"\)");

	Ok(escaped)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pattern_is_trimmed_collapsed_and_escaped() {
		let expected = ExpectedOutput::new("  Hello (World)\n\n  Bye \n").unwrap();
		assert_eq!(expected.as_str(), r"Hello\s+\(World\)\s+Bye");
	}

	#[test]
	fn whitespace_runs_are_flexible() {
		let expected = ExpectedOutput::new("Hello (World)\n\n  Bye").unwrap();
		assert!(expected.is_match("Hello   (World)\nBye"));
	}

	#[test]
	fn parentheses_are_literal() {
		let expected = ExpectedOutput::new("Hello (World)\n\n  Bye").unwrap();
		assert!(!expected.is_match("Hello World Bye"));
	}

	#[test]
	fn matches_anywhere_in_output() {
		let expected = ExpectedOutput::new("Hello from OSv").unwrap();
		let output = "OSv v0.24\nBooting...\nHello from OSv\npowering off\n";
		assert!(expected.verify(output).is_ok());
	}

	#[test]
	fn mismatch_reports_both_sides() {
		let expected = ExpectedOutput::new("done (ok)").unwrap();
		match expected.verify("done") {
			Err(Error::Mismatch { expected, obtained }) => {
				assert_eq!(expected, r"done\s+\(ok\)");
				assert_eq!(obtained, "done");
			}
			other => panic!("unexpected result: {:?}", other)
		}
	}

	#[test]
	fn invalid_pattern_is_an_error() {
		assert!(matches!(ExpectedOutput::new("value [unclosed"), Err(Error::Pattern(_))));
	}

	#[test]
	fn loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("expected-stdout.txt");
		std::fs::write(&path, "Hello\n").unwrap();
		assert!(ExpectedOutput::load(&path).unwrap().is_match("> Hello <"));
	}
}
