use std::fmt;
use tracing::{error, info, warn};
use crate::builder::build_recipe;
use crate::config::Config;
use crate::demo::test_recipe;
use crate::error::Result;
use crate::prepare::prepare_osv_scripts;
use crate::process::CommandRunner;
use crate::publish::publish_recipe;
use crate::recipe::{discover, Recipe};
use crate::results::ResultArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Build,
	Publish,
	Test
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Stage::Build => "build",
			Stage::Publish => "publish",
			Stage::Test => "test"
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
	Passed,
	/// Built and published, but there is no demo to test.
	NoDemo,
	Failed(Stage)
}

#[derive(Debug, Default)]
pub struct RunReport {
	pub verdicts: Vec<(String, Verdict)>
}

impl RunReport {
	pub fn success(&self) -> bool {
		!self.verdicts.iter().any(|(_, verdict)| matches!(verdict, Verdict::Failed(_)))
	}

	pub fn log_summary(&self) {
		info!("Summary");
		for (name, verdict) in &self.verdicts {
			match verdict {
				Verdict::Passed => info!("{}: passed", name),
				Verdict::NoDemo => warn!("{}: no demo", name),
				Verdict::Failed(stage) => error!("{}: failed ({})", name, stage)
			}
		}
	}
}

pub struct Driver<'a> {
	config: &'a Config,
	runner: &'a dyn CommandRunner,
	/// Restricts the run to these recipe names when not empty.
	only: Vec<String>
}

impl<'a> Driver<'a> {
	pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
		Self {
			config,
			runner,
			only: Vec::new()
		}
	}

	pub fn only(mut self, names: Vec<String>) -> Self {
		self.only = names;
		self
	}

	/// Runs every phase in order. Errors are returned only for the setup
	/// phases; per-recipe failures end up in the report.
	pub fn run(&self) -> Result<RunReport> {
		prepare_osv_scripts(self.config, self.runner);

		let area = ResultArea::new(self.config);
		area.clear()?;
		area.publish_loader()?;

		info!("List recipes");
		let recipes = self.select(discover(&self.config.general)?);
		let names: Vec<_> = recipes.iter().map(|recipe| recipe.name.as_str()).collect();
		info!("recipes are: {:?}", names);

		info!("Build listed recipes");
		let mut built = Vec::with_capacity(recipes.len());
		for recipe in &recipes {
			let failed = if !build_recipe(recipe, self.runner) {
				Some(Stage::Build)
			} else if !publish_recipe(recipe, self.config, self.runner) {
				Some(Stage::Publish)
			} else {
				None
			};
			built.push(failed);
		}

		info!("Test listed recipes");
		let mut report = RunReport::default();
		for (recipe, failed) in recipes.iter().zip(built) {
			let verdict = if let Some(stage) = failed {
				warn!("Skipping test for {}, {} failed", recipe.name, stage);
				Verdict::Failed(stage)
			} else if !recipe.has_demo {
				warn!("Recipe {} contains no demo package ({} not found)", recipe.name, recipe.demo_run_yaml.display());
				Verdict::NoDemo
			} else if test_recipe(recipe, self.config, &area, self.runner) {
				info!("Test for {} passed.", recipe.name);
				Verdict::Passed
			} else {
				error!("Test for {} failed.", recipe.name);
				Verdict::Failed(Stage::Test)
			};

			report.verdicts.push((recipe.name.clone(), verdict));
		}

		Ok(report)
	}

	fn select(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
		if self.only.is_empty() {
			return recipes;
		}

		for name in &self.only {
			if !recipes.iter().any(|recipe| &recipe.name == name) {
				warn!("no recipe named {} in {}", name, self.config.general.recipes_dir.display());
			}
		}

		recipes.into_iter()
			.filter(|recipe| self.only.contains(&recipe.name))
			.collect()
	}
}
