use std::fs::{self, read_dir};
use std::path::PathBuf;
use tracing::{debug, info};
use crate::config::{Config, LoaderConfig};
use crate::error::{Error, Result};
use crate::fsutil::{remove_entry, set_mode};

pub const LOADER_FILE: &str = "osv-loader.qemu";
pub const LOADER_INDEX_FILE: &str = "index.yaml";

/// The shared result directory every recipe publishes into.
pub struct ResultArea {
	pub dir: PathBuf,
	/// `loader.img` of the last OSv build.
	loader_src: PathBuf,
	loader: LoaderConfig
}

impl ResultArea {
	pub fn new(config: &Config) -> Self {
		Self {
			dir: config.general.results_dir.clone(),
			loader_src: config.general.osv_dir.join("build").join("last").join("loader.img"),
			loader: config.loader.clone()
		}
	}

	pub fn loader_file(&self) -> PathBuf {
		self.dir.join(LOADER_FILE)
	}

	pub fn loader_index_file(&self) -> PathBuf {
		self.dir.join(LOADER_INDEX_FILE)
	}

	/// Deletes everything inside the result directory, keeping the directory.
	pub fn clear(&self) -> Result<()> {
		info!("Clearing result directory {}", self.dir.display());

		let entries = read_dir(&self.dir)
			.map_err(Error::io("failed to list result directory", &self.dir))?;

		for entry in entries {
			let entry = entry.map_err(Error::io("failed to list result directory", &self.dir))?;
			debug!("removing {}", entry.path().display());
			remove_entry(&entry.path())?;
		}

		Ok(())
	}

	/// Copies the OSv loader image into the result directory and writes the
	/// `index.yaml` describing it.
	pub fn publish_loader(&self) -> Result<()> {
		info!("Providing loader image into result directory {}", self.dir.display());

		let loader = self.loader_file();
		let index = self.loader_index_file();

		debug!("copy {} to {}", self.loader_src.display(), loader.display());
		fs::copy(&self.loader_src, &loader)
			.map_err(Error::io("failed to copy loader image", &self.loader_src))?;

		fs::write(&index, self.loader_index())
			.map_err(Error::io("failed to write", &index))?;

		set_mode(&loader, 0o777)?;
		set_mode(&index, 0o777)
	}

	pub fn loader_index(&self) -> String {
		let loader = &self.loader;
		format!(
			"format_version: \"{}\"\nversion: \"{}\"\ncreated: \"{}\"\ndescription: \"{}\"\nbuild: \"{}\"\n",
			loader.format_version,
			loader.version,
			loader.created,
			loader.description,
			loader.build)
	}
}
