use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("{context} {}: {source}", .path.display())]
	Io {
		context: &'static str,
		path: PathBuf,
		#[source]
		source: std::io::Error
	},

	#[error("failed to parse config {}: {source}", .path.display())]
	Config {
		path: PathBuf,
		#[source]
		source: toml::de::Error
	},

	#[error("failed to spawn {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error
	},

	/// A subprocess ran but exited unsuccessfully.
	#[error("{what} returned non-zero status code ({code}) for {}", .dir.display())]
	Status {
		what: String,
		dir: PathBuf,
		code: String,
		stdout: String,
		stderr: String
	},

	#[error("build.sh did not create {}", .path.display())]
	MissingManifest {
		path: PathBuf
	},

	#[error("invalid template: {0}")]
	Template(String),

	#[error("expected output is not a valid pattern: {0}")]
	Pattern(#[from] regex::Error),

	#[error("unikernel stdout is not as expected")]
	Mismatch {
		expected: String,
		obtained: String
	},

	#[error("invalid glob pattern: {0}")]
	Glob(#[from] glob::PatternError)
}

impl Error {
	pub fn io(context: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { context, path, source }
	}

	/// Logs the error together with any subprocess output or mismatch
	/// details it carries.
	pub fn report(&self) {
		error!("{}", self);
		match self {
			Self::Status { stdout, stderr, .. } => {
				error!("--- STDOUT: ---\n{}", stdout);
				error!("--- STDERR: ---\n{}", stderr);
			}
			Self::Mismatch { expected, obtained } => {
				error!("expected =\n{}", expected);
				error!("obtained =\n{}", obtained);
			}
			_ => {}
		}
	}
}
