use std::fs::{self, create_dir_all};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;
use crate::error::{Error, Result};

/// Copies the tree at `src` to `dest`, recreating symbolic links as links
/// instead of following them.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
	for entry in WalkDir::new(src).follow_links(false) {
		let entry = entry.map_err(|e| {
			let path = e.path().unwrap_or(src).to_path_buf();
			Error::Io {
				context: "failed to walk",
				path,
				source: e.into()
			}
		})?;

		let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
		let target = dest.join(rel);

		if entry.file_type().is_dir() {
			create_dir_all(&target)
				.map_err(Error::io("failed to create directory", &target))?;
		} else if entry.file_type().is_symlink() {
			let orig = fs::read_link(entry.path())
				.map_err(Error::io("failed to resolve symlink", entry.path()))?;
			std::os::unix::fs::symlink(orig, &target)
				.map_err(Error::io("failed to create symlink", &target))?;
		} else {
			fs::copy(entry.path(), &target)
				.map_err(Error::io("failed to copy", entry.path()))?;
		}
	}

	Ok(())
}

pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
	fs::set_permissions(path, fs::Permissions::from_mode(mode))
		.map_err(Error::io("failed to set permissions on", path))
}

/// Removes a file, symlink or whole directory tree. Symlinks to directories
/// are unlinked, never followed.
pub fn remove_entry(path: &Path) -> Result<()> {
	let meta = fs::symlink_metadata(path)
		.map_err(Error::io("failed to stat", path))?;

	if meta.is_dir() {
		fs::remove_dir_all(path)
	} else {
		fs::remove_file(path)
	}.map_err(Error::io("failed to remove", path))
}

/// Moves `src` to `dest`, copying when the two are on different filesystems.
pub fn move_file(src: &Path, dest: &Path) -> Result<()> {
	if fs::rename(src, dest).is_ok() {
		return Ok(());
	}

	fs::copy(src, dest).map_err(Error::io("failed to copy", src))?;
	fs::remove_file(src).map_err(Error::io("failed to remove", src))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn copy_tree_preserves_symlinks() {
		let dir = tempfile::tempdir().unwrap();
		let src = dir.path().join("src");
		create_dir_all(src.join("build/release.x64")).unwrap();
		fs::write(src.join("build/release.x64/loader.img"), "img").unwrap();
		std::os::unix::fs::symlink("release.x64", src.join("build/last")).unwrap();

		let dest = dir.path().join("clone");
		copy_tree(&src, &dest).unwrap();

		assert_eq!(fs::read_to_string(dest.join("build/release.x64/loader.img")).unwrap(), "img");
		let link = dest.join("build/last");
		assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
		assert_eq!(fs::read_link(&link).unwrap(), Path::new("release.x64"));
	}

	#[test]
	fn remove_entry_handles_files_and_trees() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("a.mpm");
		let tree = dir.path().join("pkg/meta");
		fs::write(&file, "").unwrap();
		create_dir_all(&tree).unwrap();
		fs::write(tree.join("package.yaml"), "").unwrap();

		remove_entry(&file).unwrap();
		remove_entry(&dir.path().join("pkg")).unwrap();
		assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
	}

	#[test]
	fn remove_entry_unlinks_directory_symlinks() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("target");
		create_dir_all(&target).unwrap();
		fs::write(target.join("keep"), "").unwrap();
		let link = dir.path().join("link");
		std::os::unix::fs::symlink(&target, &link).unwrap();

		remove_entry(&link).unwrap();
		assert!(target.join("keep").exists());
		assert!(fs::symlink_metadata(&link).is_err());
	}

	#[test]
	fn set_mode_applies_bits() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("x");
		fs::write(&file, "").unwrap();

		set_mode(&file, 0o666).unwrap();
		let mode = fs::metadata(&file).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o666);
	}
}
