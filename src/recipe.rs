use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;
use crate::config::GeneralConfig;
use crate::error::{Error, Result};

/// A recipe directory and every path derived from its name.
///
/// All paths are fixed at construction. `has_demo` reflects the demo
/// `run.yaml` at discovery time and does not track later changes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
	/// Package name, e.g. `eu.mikelangelo-project.osv.bootstrap`.
	pub name: String,
	pub dir: PathBuf,

	pub demo_pkg_dir: PathBuf,
	pub demo_expect: PathBuf,
	pub demo_yaml_templ: PathBuf,
	pub demo_yaml: PathBuf,
	pub demo_run_yaml: PathBuf,

	/// Unpacked package produced by `build.sh`.
	pub result_dir: PathBuf,
	pub result_mpm: PathBuf,
	pub result_yaml: PathBuf,
	/// Where `capstan package build` leaves the archive.
	pub result_orig_mpm: PathBuf,
	pub result_orig_yaml: PathBuf,

	pub osv_dir: PathBuf,
	pub isolate_osv_dir: bool,
	pub has_demo: bool
}

impl Recipe {
	pub fn new(general: &GeneralConfig, name: &str) -> Self {
		let dir = general.recipes_dir.join(name);

		let demo_dir = dir.join("demo");
		let demo_pkg_dir = demo_dir.join("package");
		let demo_meta = demo_pkg_dir.join("meta");

		let result_dir = general.results_dir.join(name);

		let demo_run_yaml = demo_meta.join("run.yaml");
		let has_demo = demo_run_yaml.is_file();

		Self {
			name: name.to_string(),
			demo_expect: demo_dir.join("expected-stdout.txt"),
			demo_yaml_templ: demo_meta.join("package.yaml.templ"),
			demo_yaml: demo_meta.join("package.yaml"),
			demo_run_yaml,
			demo_pkg_dir,
			dir,

			result_mpm: general.results_dir.join(format!("{}.mpm", name)),
			result_yaml: general.results_dir.join(format!("{}.yaml", name)),
			result_orig_mpm: result_dir.join(format!("{}.mpm", name)),
			result_orig_yaml: result_dir.join("meta").join("package.yaml"),
			result_dir,

			osv_dir: general.osv_dir.clone(),
			isolate_osv_dir: general.isolate_osv_dir,
			has_demo
		}
	}

	pub fn build_script(&self) -> PathBuf {
		self.dir.join("build.sh")
	}
}

/// OSv build locations handed to `build.sh`, relative to an OSv tree.
pub fn osv_build_dir(osv_dir: &Path) -> PathBuf {
	osv_dir.join("build").join("release.x64")
}

pub fn gcc_base(osv_dir: &Path) -> PathBuf {
	osv_dir.join("external").join("x64").join("gcc.bin")
}

pub fn misc_base(osv_dir: &Path) -> PathBuf {
	osv_dir.join("external").join("x64").join("misc.bin")
}

/// One recipe per directory directly under the recipes root, sorted by name.
pub fn discover(general: &GeneralConfig) -> Result<Vec<Recipe>> {
	let root = &general.recipes_dir;
	let mut recipes = Vec::new();

	let walker = WalkDir::new(root)
		.min_depth(1)
		.max_depth(1)
		.sort_by_file_name();

	for entry in walker {
		let entry = match entry {
			Ok(entry) => entry,
			// Only an unreadable root is fatal.
			Err(e) if e.depth() == 0 => {
				return Err(Error::Io {
					context: "failed to list recipes in",
					path: root.clone(),
					source: e.into()
				});
			}
			Err(e) => {
				warn!("skipping entry in {}: {}", root.display(), e);
				continue;
			}
		};

		// Follows symlinks; dangling ones are not directories.
		if !entry.path().is_dir() {
			continue;
		}

		let Some(name) = entry.file_name().to_str() else {
			continue;
		};

		recipes.push(Recipe::new(general, name));
	}

	Ok(recipes)
}
