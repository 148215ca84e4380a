use std::fs::{self, symlink_metadata};
use tracing::{debug, info};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fsutil::{move_file, remove_entry, set_mode};
use crate::process::{CommandRunner, Invocation};
use crate::recipe::Recipe;

/// Compresses a built recipe with `capstan package build` and places the
/// `.mpm` and its manifest into the result directory under the recipe name.
///
/// Only meaningful after [`crate::builder::build_recipe`] succeeded for the
/// same recipe.
pub fn publish_recipe(recipe: &Recipe, config: &Config, runner: &dyn CommandRunner) -> bool {
	info!(
		"Providing mpm for package {} into result directory {}",
		recipe.name,
		config.general.results_dir.display());

	match try_publish(recipe, config, runner) {
		Ok(()) => true,
		Err(e) => {
			e.report();
			false
		}
	}
}

fn try_publish(recipe: &Recipe, config: &Config, runner: &dyn CommandRunner) -> Result<()> {
	let invocation = Invocation::new(config.tools.capstan.as_str(), recipe.result_dir.as_path())
		.args(["package", "build"])
		.inherit("PATH")
		.inherit("HOME");

	let what = invocation.describe();
	runner.run(&invocation)?.check(what, &recipe.result_dir)?;

	debug!("moving {} to {}", recipe.result_orig_mpm.display(), recipe.result_mpm.display());
	if symlink_metadata(&recipe.result_mpm).is_ok() {
		remove_entry(&recipe.result_mpm)?;
	}
	move_file(&recipe.result_orig_mpm, &recipe.result_mpm)?;

	debug!("copying {} to {}", recipe.result_orig_yaml.display(), recipe.result_yaml.display());
	fs::copy(&recipe.result_orig_yaml, &recipe.result_yaml)
		.map_err(Error::io("failed to copy", &recipe.result_orig_yaml))?;

	set_mode(&recipe.result_mpm, 0o666)?;
	set_mode(&recipe.result_yaml, 0o666)
}

#[cfg(test)]
mod tests {
	use std::fs::{create_dir_all, read_to_string, write};
	use std::os::unix::fs::PermissionsExt;
	use std::path::Path;
	use crate::process::fake::{failed, ok, ScriptedRunner};
	use crate::process::Captured;
	use super::*;

	fn setup(root: &Path) -> (Config, Recipe) {
		let mut config = Config::default();
		config.general.recipes_dir = root.join("recipes");
		config.general.results_dir = root.join("result");
		let recipe = Recipe::new(&config.general, "org.demo");
		create_dir_all(recipe.result_dir.join("meta")).unwrap();
		write(&recipe.result_orig_yaml, "name: org.demo\n").unwrap();
		(config, recipe)
	}

	fn packs(invocation: &Invocation) -> Captured {
		let name = invocation.cwd.file_name().unwrap().to_str().unwrap();
		write(invocation.cwd.join(format!("{}.mpm", name)), "archive").unwrap();
		ok("Building package org.demo...")
	}

	#[test]
	fn moves_archive_and_copies_manifest() {
		let dir = tempfile::tempdir().unwrap();
		let (config, recipe) = setup(dir.path());
		let runner = ScriptedRunner::new(packs);

		assert!(publish_recipe(&recipe, &config, &runner));

		assert_eq!(runner.described(), vec!["capstan package build"]);
		assert_eq!(runner.calls()[0].cwd, recipe.result_dir);
		assert!(runner.calls()[0].env.keys().all(|name| name == "PATH" || name == "HOME"));

		assert_eq!(read_to_string(&recipe.result_mpm).unwrap(), "archive");
		assert!(!recipe.result_orig_mpm.exists());
		assert_eq!(read_to_string(&recipe.result_yaml).unwrap(), "name: org.demo\n");
		assert!(recipe.result_orig_yaml.exists());

		for path in [&recipe.result_mpm, &recipe.result_yaml] {
			let mode = fs::metadata(path).unwrap().permissions().mode();
			assert_eq!(mode & 0o777, 0o666);
		}
	}

	#[test]
	fn replaces_stale_archive() {
		let dir = tempfile::tempdir().unwrap();
		let (config, recipe) = setup(dir.path());
		write(&recipe.result_mpm, "old").unwrap();

		let runner = ScriptedRunner::new(packs);
		assert!(publish_recipe(&recipe, &config, &runner));
		assert_eq!(read_to_string(&recipe.result_mpm).unwrap(), "archive");
	}

	#[test]
	fn packaging_failure_publishes_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let (config, recipe) = setup(dir.path());
		let runner = ScriptedRunner::new(|_| failed(1, "meta/package.yaml: invalid"));

		assert!(!publish_recipe(&recipe, &config, &runner));
		assert!(!recipe.result_mpm.exists());
		assert!(!recipe.result_yaml.exists());
	}

	#[test]
	fn missing_archive_is_a_failure() {
		let dir = tempfile::tempdir().unwrap();
		let (config, recipe) = setup(dir.path());
		let runner = ScriptedRunner::new(|_| ok(""));

		assert!(!publish_recipe(&recipe, &config, &runner));
		assert!(!recipe.result_mpm.exists());
	}
}
