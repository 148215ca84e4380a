//! Subprocess execution with an explicit working directory and an exact
//! environment. Nothing is inherited from the driver unless a caller copies
//! it in with [`Invocation::inherit`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Invocation {
	pub program: PathBuf,
	pub args: Vec<String>,
	pub cwd: PathBuf,
	pub env: BTreeMap<String, OsString>,
	pub stdin: Option<PathBuf>
}

impl Invocation {
	pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			cwd: cwd.into(),
			env: BTreeMap::new(),
			stdin: None
		}
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String> {
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, name: &str, value: impl Into<OsString>) -> Self {
		self.env.insert(name.to_string(), value.into());
		self
	}

	/// Copies `name` from the driver's environment, if it is set there.
	pub fn inherit(mut self, name: &str) -> Self {
		if let Some(value) = std::env::var_os(name) {
			self.env.insert(name.to_string(), value);
		}
		self
	}

	pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.stdin = Some(path.into());
		self
	}

	/// Program and arguments joined for log lines, e.g. `capstan package build`.
	pub fn describe(&self) -> String {
		let mut line = self.program.display().to_string();
		for arg in &self.args {
			line.push(' ');
			line.push_str(arg);
		}
		line
	}
}

/// Exit code and captured output of a finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct Captured {
	/// `None` when the process was killed by a signal.
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String
}

impl Captured {
	pub fn success(&self) -> bool {
		self.code == Some(0)
	}

	/// Turns an unsuccessful exit into [`Error::Status`].
	pub fn check(self, what: impl Into<String>, dir: &Path) -> Result<Self> {
		if self.success() {
			return Ok(self);
		}

		Err(Error::Status {
			what: what.into(),
			dir: dir.to_path_buf(),
			code: match self.code {
				Some(code) => code.to_string(),
				None => "killed by signal".to_string()
			},
			stdout: self.stdout,
			stderr: self.stderr
		})
	}
}

pub trait CommandRunner {
	/// Runs the invocation to completion. Spawn failures are errors; a
	/// non-zero exit is not, callers decide with [`Captured::check`].
	fn run(&self, invocation: &Invocation) -> Result<Captured>;
}

/// Runs invocations as real child processes, blocking until they exit.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
	fn run(&self, invocation: &Invocation) -> Result<Captured> {
		let mut cmd = Command::new(&invocation.program);
		cmd.args(&invocation.args)
			.current_dir(&invocation.cwd)
			.env_clear()
			.envs(&invocation.env);

		match &invocation.stdin {
			Some(path) => {
				let file = File::open(path)
					.map_err(Error::io("failed to open", path))?;
				cmd.stdin(Stdio::from(file));
			}
			None => {
				cmd.stdin(Stdio::null());
			}
		}

		let output = cmd.output().map_err(|source| Error::Spawn {
			program: invocation.describe(),
			source
		})?;

		Ok(Captured {
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned()
		})
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn environment_is_exactly_what_was_given() {
		let dir = tempfile::tempdir().unwrap();
		let invocation = Invocation::new("/usr/bin/env", dir.path())
			.env("ONLY_THIS", "1");

		let captured = SystemRunner.run(&invocation).unwrap();
		assert!(captured.success());
		assert_eq!(captured.stdout, "ONLY_THIS=1\n");
	}

	#[test]
	fn captures_output_and_exit_code() {
		let dir = tempfile::tempdir().unwrap();
		let invocation = Invocation::new("/bin/sh", dir.path())
			.args(["-c", "echo out; echo err >&2; exit 3"]);

		let captured = SystemRunner.run(&invocation).unwrap();
		assert_eq!(captured.code, Some(3));
		assert_eq!(captured.stdout, "out\n");
		assert_eq!(captured.stderr, "err\n");

		match captured.check("sh", dir.path()) {
			Err(Error::Status { code, stdout, stderr, .. }) => {
				assert_eq!(code, "3");
				assert_eq!(stdout, "out\n");
				assert_eq!(stderr, "err\n");
			}
			other => panic!("unexpected result: {:?}", other)
		}
	}

	#[test]
	fn runs_in_the_given_directory_with_stdin() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("input.txt");
		std::fs::write(&input, "from file\n").unwrap();

		let invocation = Invocation::new("/bin/sh", dir.path())
			.args(["-c", "cat; ls"])
			.inherit("PATH")
			.stdin_file(&input);

		let captured = SystemRunner.run(&invocation).unwrap();
		assert_eq!(captured.stdout, "from file\ninput.txt\n");
	}

	#[test]
	fn missing_program_is_a_spawn_error() {
		let dir = tempfile::tempdir().unwrap();
		let invocation = Invocation::new("/nonexistent/tool", dir.path()).args(["run"]);

		let result = SystemRunner.run(&invocation);
		assert!(matches!(result, Err(Error::Spawn { .. })));
	}

	#[test]
	fn describe_joins_program_and_args() {
		let invocation = Invocation::new("capstan", "/").args(["package", "compose", "demo"]);
		assert_eq!(invocation.describe(), "capstan package compose demo");
	}
}
