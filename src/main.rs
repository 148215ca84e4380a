mod builder;
mod config;
mod demo;
mod driver;
mod error;
mod expect;
mod fsutil;
mod prepare;
mod process;
mod publish;
mod recipe;
mod results;
mod template;

use std::path::PathBuf;
use std::process::{exit, ExitCode};
use anyhow::Context;
use tracing::error;
use crate::config::Config;
use crate::driver::Driver;
use crate::process::SystemRunner;

fn usage(code: i32) -> ! {
	eprintln!(r"usage: capstan-packages [args]... [names]...
Builds, packages and tests every recipe, or only the named ones.
args:
    --config=<path_to_capstan-packages.toml>
    --help");
	exit(code);
}

#[derive(Debug, PartialEq)]
struct Args {
	config_path: Option<PathBuf>,
	names: Vec<String>
}

#[derive(Debug, PartialEq)]
enum Parsed {
	Run(Args),
	Help,
	Unsupported(String)
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Parsed {
	let mut config_path = None;
	let mut names = Vec::new();

	for arg in args {
		match arg.as_str() {
			"-h" | "--help" => return Parsed::Help,
			arg if arg.starts_with("--config=") => {
				config_path = arg.strip_prefix("--config=").map(PathBuf::from);
			}
			arg if arg.starts_with('-') => return Parsed::Unsupported(arg.to_string()),
			_ => names.push(arg)
		}
	}

	Parsed::Run(Args { config_path, names })
}

fn run(args: Args) -> anyhow::Result<bool> {
	let config = Config::load(args.config_path.as_deref())
		.context("failed to load configuration")?;
	config.check_tools();

	let report = Driver::new(&config, &SystemRunner)
		.only(args.names)
		.run()
		.context("setup failed")?;

	report.log_summary();
	Ok(report.success())
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.init();

	let args = match parse_args(std::env::args().skip(1)) {
		Parsed::Run(args) => args,
		Parsed::Help => usage(0),
		Parsed::Unsupported(arg) => {
			eprintln!("error: unsupported argument {}", arg);
			usage(2);
		}
	};

	match run(args) {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::from(1),
		Err(e) => {
			error!("{:#}", e);
			ExitCode::from(2)
		}
	}
}
