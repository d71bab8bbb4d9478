//! Small filesystem helpers shared by the stages that write into package
//! directories.

use std::fs;
use std::io;
use std::path::Path;

/// Write `content` to `path` atomically (write to a sibling temp file, then rename).
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
  let file_name = path
    .file_name()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
  let mut temp_name = file_name.to_os_string();
  temp_name.push(".tmp");
  let temp_path = path.with_file_name(temp_name);

  fs::write(&temp_path, content)?;
  fs::rename(&temp_path, path)
}

/// Remove a directory tree, treating a missing directory as success.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  }
}
