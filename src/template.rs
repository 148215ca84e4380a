use std::fs::{read_to_string, write};
use std::path::Path;
use aho_corasick::AhoCorasick;
use crate::error::{Error, Result};

pub const PACKAGE_NAME: &str = "${PACKAGE_NAME}";

/// Substitutes every occurrence of each placeholder in `text` in one pass.
/// Text that is not a listed placeholder is left untouched.
pub fn render(text: &str, vars: &[(&str, &str)]) -> Result<String> {
	let (patterns, replaces): (Vec<_>, Vec<_>) = vars.iter().copied().unzip();

	let aho = AhoCorasick::new(patterns)
		.map_err(|e| Error::Template(e.to_string()))?;

	Ok(aho.replace_all(text, &replaces))
}

/// Renders the demo `package.yaml.templ` at `templ` into `out` for `name`.
pub fn render_package_yaml(templ: &Path, out: &Path, name: &str) -> Result<()> {
	let text = read_to_string(templ)
		.map_err(Error::io("failed to read", templ))?;

	let rendered = render(&text, &[(PACKAGE_NAME, name)])?;

	write(out, rendered).map_err(Error::io("failed to write", out))
}
