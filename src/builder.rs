use std::fs::{create_dir_all, symlink_metadata};
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::fsutil::{copy_tree, remove_entry, set_mode};
use crate::process::{CommandRunner, Invocation};
use crate::recipe::{gcc_base, misc_base, osv_build_dir, Recipe};

/// Runs the recipe's `build.sh`, leaving an unpacked Capstan package with at
/// least `meta/package.yaml` in the recipe's result directory.
///
/// Failures are logged and reported as `false`.
pub fn build_recipe(recipe: &Recipe, runner: &dyn CommandRunner) -> bool {
	info!("Building recipe {}", recipe.name);

	match try_build(recipe, runner) {
		Ok(()) => true,
		Err(e) => {
			e.report();
			false
		}
	}
}

fn try_build(recipe: &Recipe, runner: &dyn CommandRunner) -> Result<()> {
	// Dropped at the end of this call, removing the clone on every path.
	let isolated = if recipe.isolate_osv_dir {
		Some(isolate_osv_dir(recipe)?)
	} else {
		None
	};

	let osv_dir = match &isolated {
		Some(tmp) => tmp.path().join("osv"),
		None => recipe.osv_dir.clone()
	};

	debug!("preparing result directory {}", recipe.result_dir.display());
	if symlink_metadata(&recipe.result_dir).is_ok() {
		remove_entry(&recipe.result_dir)?;
	}
	create_dir_all(&recipe.result_dir)
		.map_err(Error::io("failed to create directory", &recipe.result_dir))?;

	info!("running build.sh for {}", recipe.name);
	let invocation = Invocation::new(recipe.build_script(), recipe.dir.as_path())
		.env("RECIPE_DIR", &recipe.dir)
		.env("PACKAGE_RESULT_DIR", &recipe.result_dir)
		.env("PACKAGE_NAME", &recipe.name)
		.env("OSV_DIR", &osv_dir)
		.env("OSV_BUILD_DIR", osv_build_dir(&osv_dir))
		.env("GCCBASE", gcc_base(&osv_dir))
		.env("MISCBASE", misc_base(&osv_dir))
		.inherit("PATH");

	runner.run(&invocation)?.check("build.sh", &recipe.dir)?;

	debug!("verifying that result contains meta/package.yaml");
	if !recipe.result_orig_yaml.is_file() {
		return Err(Error::MissingManifest {
			path: PathBuf::from("meta").join("package.yaml")
		});
	}

	set_mode(&recipe.result_dir, 0o777)
}

fn isolate_osv_dir(recipe: &Recipe) -> Result<TempDir> {
	info!("preparing isolated copy of {}", recipe.osv_dir.display());

	let tmp = TempDir::new()
		.map_err(Error::io("failed to create temporary directory in", std::env::temp_dir()))?;
	copy_tree(&recipe.osv_dir, &tmp.path().join("osv"))?;

	Ok(tmp)
}
