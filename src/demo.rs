//! Smoke test of a recipe's demo: compose a unikernel from the freshly
//! published packages and check what it prints on the console.

use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::expect::ExpectedOutput;
use crate::process::{CommandRunner, Invocation};
use crate::recipe::Recipe;
use crate::results::{ResultArea, LOADER_FILE, LOADER_INDEX_FILE};
use crate::template::render_package_yaml;

/// A throwaway `CAPSTAN_ROOT` holding copies of everything published so far.
/// The directory is deleted when the registry is dropped.
pub struct Registry {
	root: TempDir
}

impl Registry {
	pub fn assemble(area: &ResultArea) -> Result<Self> {
		let root = TempDir::new()
			.map_err(Error::io("failed to create temporary directory in", std::env::temp_dir()))?;
		info!("CAPSTAN_ROOT={}", root.path().display());

		let packages = root.path().join("packages");
		create_dir_all(&packages)
			.map_err(Error::io("failed to create directory", &packages))?;

		let mpms = published(&area.dir, "mpm")?;
		let yamls = published(&area.dir, "yaml")?;
		for file in mpms.iter().chain(&yamls) {
			copy_into(file, &packages)?;
		}
		info!("number of mpms copied: {}", mpms.len());

		let loader_dir = root.path().join("repository").join("mike").join("osv-loader");
		create_dir_all(&loader_dir)
			.map_err(Error::io("failed to create directory", &loader_dir))?;
		copy_into(&area.dir.join(LOADER_FILE), &loader_dir)?;
		copy_into(&area.dir.join(LOADER_INDEX_FILE), &loader_dir)?;

		Ok(Self { root })
	}

	pub fn path(&self) -> &Path {
		self.root.path()
	}
}

/// Regular files directly in `dir` with the given extension.
fn published(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
	let pattern = format!(
		"{}/*.{}",
		glob::Pattern::escape(&dir.to_string_lossy()),
		ext);

	let mut files = Vec::new();
	for entry in glob::glob(&pattern)? {
		let path = entry.map_err(|e| Error::Io {
			context: "failed to read",
			path: e.path().to_path_buf(),
			source: e.into()
		})?;

		if path.is_file() {
			files.push(path);
		}
	}

	Ok(files)
}

fn copy_into(file: &Path, dir: &Path) -> Result<()> {
	let Some(name) = file.file_name() else {
		return Ok(());
	};

	debug!("copy {} into {}", file.display(), dir.display());
	fs::copy(file, dir.join(name))
		.map_err(Error::io("failed to copy", file))?;
	Ok(())
}

/// Composes and boots the recipe's demo package and checks its console
/// output against `demo/expected-stdout.txt`.
pub fn test_recipe(
	recipe: &Recipe,
	config: &Config,
	area: &ResultArea,
	runner: &dyn CommandRunner) -> bool {
	info!("Testing recipe {}", recipe.name);

	match try_test(recipe, config, area, runner) {
		Ok(()) => true,
		Err(e) => {
			e.report();
			false
		}
	}
}

fn try_test(
	recipe: &Recipe,
	config: &Config,
	area: &ResultArea,
	runner: &dyn CommandRunner) -> Result<()> {
	let registry = Registry::assemble(area)?;

	debug!("generating package.yaml from {}", recipe.demo_yaml_templ.display());
	render_package_yaml(&recipe.demo_yaml_templ, &recipe.demo_yaml, &recipe.name)?;

	let capstan = |args: &[&str]| {
		Invocation::new(config.tools.capstan.as_str(), recipe.demo_pkg_dir.as_path())
			.args(args.iter().copied())
			.env("CAPSTAN_ROOT", registry.path())
			.inherit("PATH")
	};

	let compose = capstan(&["package", "compose", "demo"]);
	info!("{} (demo_pkg_dir={})", compose.describe(), recipe.demo_pkg_dir.display());
	runner.run(&compose)?.check(compose.describe(), &recipe.demo_pkg_dir)?;

	let run = capstan(&["run", "demo"]);
	info!("{}", run.describe());
	let captured = runner.run(&run)?.check(run.describe(), &recipe.demo_pkg_dir)?;

	debug!("checking if unikernel stdout is as expected");
	ExpectedOutput::load(&recipe.demo_expect)?.verify(&captured.stdout)?;

	info!("cleanup {}", registry.path().display());
	Ok(())
}
