use tracing::info;
use crate::config::Config;
use crate::error::Result;
use crate::process::{CommandRunner, Invocation};

/// Applies the configured patches to the OSv tree, in order, with `patch -p1`.
///
/// A patch that does not apply is reported and skipped; it has usually been
/// applied by an earlier run. Returns how many patches applied cleanly.
pub fn prepare_osv_scripts(config: &Config, runner: &dyn CommandRunner) -> usize {
	info!("Prepare OSv scripts");

	let osv_dir = &config.general.osv_dir;
	let mut applied = 0;

	for patch in &config.general.patches {
		let invocation = Invocation::new(config.tools.patch.as_str(), osv_dir.as_path())
			.args(["-p1"])
			.inherit("PATH")
			.stdin_file(patch);

		let what = format!("applying patch {}", patch.display());
		let result: Result<()> = runner.run(&invocation)
			.and_then(|captured| captured.check(what.as_str(), osv_dir))
			.map(|_| ());

		match result {
			Ok(()) => {
				info!("applied patch {}", patch.display());
				applied += 1;
			}
			Err(e) => e.report()
		}
	}

	applied
}
