use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use tracing::{info, warn};
use crate::error::{Error, Result};

const SEARCH_PATHS: [&str; 2] = ["capstan-packages.toml", "/etc/capstan-packages.toml"];

fn default_osv_dir() -> PathBuf {
	PathBuf::from("/git-repos/osv")
}

fn default_recipes_dir() -> PathBuf {
	PathBuf::from("/recipes")
}

fn default_results_dir() -> PathBuf {
	PathBuf::from("/result")
}

fn default_patches() -> Vec<PathBuf> {
	vec![
		PathBuf::from("/common/skip_vm_uploads.patch"),
		PathBuf::from("/common/upload_manifest.py.patch")
	]
}

fn default_capstan() -> String {
	"capstan".to_string()
}

fn default_patch() -> String {
	"patch".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
	#[serde(default = "default_osv_dir")]
	pub osv_dir: PathBuf,
	#[serde(default = "default_recipes_dir")]
	pub recipes_dir: PathBuf,
	#[serde(default = "default_results_dir")]
	pub results_dir: PathBuf,
	#[serde(default = "default_patches")]
	pub patches: Vec<PathBuf>,
	/// Build every recipe against a private copy of the OSv tree.
	#[serde(default)]
	pub isolate_osv_dir: bool
}

impl Default for GeneralConfig {
	fn default() -> Self {
		Self {
			osv_dir: default_osv_dir(),
			recipes_dir: default_recipes_dir(),
			results_dir: default_results_dir(),
			patches: default_patches(),
			isolate_osv_dir: false
		}
	}
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToolsConfig {
	#[serde(default = "default_capstan")]
	pub capstan: String,
	#[serde(default = "default_patch")]
	pub patch: String
}

impl Default for ToolsConfig {
	fn default() -> Self {
		Self {
			capstan: default_capstan(),
			patch: default_patch()
		}
	}
}

fn default_format_version() -> String {
	"1".to_string()
}

fn default_loader_version() -> String {
	"v0.24-116-g73b38d8".to_string()
}

fn default_created() -> String {
	"2016-06-11T15:41:07".to_string()
}

fn default_description() -> String {
	"OSv Bootloader".to_string()
}

fn default_build() -> String {
	"scripts/build".to_string()
}

/// Contents of the `index.yaml` published next to the loader image.
#[derive(Deserialize, Debug, Clone)]
pub struct LoaderConfig {
	#[serde(default = "default_format_version")]
	pub format_version: String,
	#[serde(default = "default_loader_version")]
	pub version: String,
	#[serde(default = "default_created")]
	pub created: String,
	#[serde(default = "default_description")]
	pub description: String,
	#[serde(default = "default_build")]
	pub build: String
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			format_version: default_format_version(),
			version: default_loader_version(),
			created: default_created(),
			description: default_description(),
			build: default_build()
		}
	}
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
	#[serde(default)]
	pub general: GeneralConfig,
	#[serde(default)]
	pub tools: ToolsConfig,
	#[serde(default)]
	pub loader: LoaderConfig
}

impl Config {
	pub fn parse(data: &str, path: &Path) -> Result<Self> {
		toml::from_str(data).map_err(|source| Error::Config {
			path: path.to_path_buf(),
			source
		})
	}

	/// Loads `path` if given, otherwise the first config found on the search
	/// path, otherwise the built-in defaults.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		if let Some(path) = path {
			let data = read_to_string(path)
				.map_err(Error::io("failed to read config", path))?;
			info!("using config {}", path.display());
			return Self::parse(&data, path);
		}

		Self::search(&SEARCH_PATHS.map(PathBuf::from))
	}

	/// Parses the first of `paths` that exists. A config that exists but
	/// cannot be read is an error rather than a silent fallback.
	fn search(paths: &[PathBuf]) -> Result<Self> {
		for path in paths {
			let data = match read_to_string(path) {
				Ok(data) => data,
				Err(e) if e.kind() == ErrorKind::NotFound => continue,
				Err(e) => return Err(Error::io("failed to read config", path)(e))
			};

			info!("using config {}", path.display());
			return Self::parse(&data, path);
		}

		info!("no config file found, using built-in defaults");
		Ok(Self::default())
	}

	/// Warns about configured tools that cannot be found on `PATH`.
	pub fn check_tools(&self) {
		for tool in [&self.tools.capstan, &self.tools.patch] {
			if let Err(e) = which::which(tool) {
				warn!("{} not found in PATH: {}", tool, e);
			}
		}
	}
}
