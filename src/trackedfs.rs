//! Tracked filesystem wrapper.
//!
//! [`StageFs`] is the narrow set of mutation operations the copy
//! orchestrator needs. [`RealFs`] delegates straight to `std::fs`;
//! [`TrackedFs`] does the same but records the target path of every
//! successful creation, partitioned by kind (folder / file / link). The
//! point is cleanup: rather than a blanket recursive delete of a working
//! directory - rejected here as unsafe - `cleanup()` deletes exactly what
//! this process is known to have created, in reverse creation order, so
//! children go before parents even after a partial or failed build.
//!
//! Paths created by side-channel mechanisms (an external tool writing into
//! the staging tree, say) can be registered with `add_file` / `add_folder` /
//! `add_link` so they participate in the same reversal.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem mutations used while staging a tree.
pub trait StageFs {
    /// Create a single directory.
    fn create_dir(&mut self, path: &Path) -> Result<()>;
    /// Write a file, creating or truncating it.
    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()>;
    /// Create a symbolic link at `link` pointing at `target`.
    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()>;
}

fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    return std::os::unix::fs::symlink(target, link);
    #[cfg(windows)]
    return std::os::windows::fs::symlink_file(target, link);
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ))
    }
}

/// Pass-through implementation over the real filesystem.
#[derive(Debug, Default)]
pub struct RealFs;

impl StageFs for RealFs {
    fn create_dir(&mut self, path: &Path) -> Result<()> {
        fs::create_dir(path).with_context(|| format!("creating directory '{}'", path.display()))
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("writing file '{}'", path.display()))
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()> {
        create_symlink(target, link).with_context(|| {
            format!(
                "creating symlink '{}' -> '{}'",
                link.display(),
                target.display()
            )
        })
    }
}

/// Records created folders, files, and links for later reversal.
#[derive(Debug, Default)]
pub struct TrackedFs {
    folders: Vec<PathBuf>,
    files: Vec<PathBuf>,
    links: Vec<PathBuf>,
}

impl StageFs for TrackedFs {
    fn create_dir(&mut self, path: &Path) -> Result<()> {
        RealFs.create_dir(path)?;
        self.folders.push(path.to_path_buf());
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        RealFs.write_file(path, contents)?;
        self.files.push(path.to_path_buf());
        Ok(())
    }

    fn symlink(&mut self, target: &Path, link: &Path) -> Result<()> {
        RealFs.symlink(target, link)?;
        self.links.push(link.to_path_buf());
        Ok(())
    }
}

impl TrackedFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file created outside this wrapper.
    pub fn add_file(&mut self, path: &Path) {
        self.files.push(path.to_path_buf());
    }

    /// Register a folder created outside this wrapper.
    pub fn add_folder(&mut self, path: &Path) {
        self.folders.push(path.to_path_buf());
    }

    /// Register a link created outside this wrapper.
    pub fn add_link(&mut self, path: &Path) {
        self.links.push(path.to_path_buf());
    }

    /// Delete everything recorded, newest first: links, then files, then
    /// folders. Each deletion is best-effort; an entry that is already gone
    /// or cannot be removed is skipped silently. All logs are reset
    /// afterwards, so calling this again performs no further deletions.
    pub fn cleanup(&mut self) {
        for link in self.links.drain(..).rev() {
            delete_no_fail(&link);
        }
        for file in self.files.drain(..).rev() {
            delete_no_fail(&file);
        }
        for folder in self.folders.drain(..).rev() {
            delete_no_fail(&folder);
        }
    }
}

/// Delete a single path, ignoring every failure.
///
/// Directories are removed non-recursively: a directory that still has
/// contents simply stays behind.
pub fn delete_no_fail(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.is_dir() {
        let _ = fs::remove_dir(path);
    } else {
        let _ = fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_real_fs_does_not_track() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        RealFs.write_file(&file, b"x").unwrap();
        assert_eq!(fs::read(&file).unwrap(), b"x");
    }

    #[test]
    fn test_cleanup_removes_nested_creations_in_reverse_order() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("F");
        let file = folder.join("g.txt");
        let link = folder.join("l");

        let mut tracked = TrackedFs::new();
        tracked.create_dir(&folder).unwrap();
        tracked.write_file(&file, b"contents").unwrap();
        #[cfg(unix)]
        tracked.symlink(Path::new("g.txt"), &link).unwrap();

        tracked.cleanup();

        assert!(!link.exists());
        assert!(!file.exists());
        assert!(!folder.exists(), "folder should be empty and removed last");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("once");
        let file = folder.join("data.txt");

        let mut tracked = TrackedFs::new();
        tracked.create_dir(&folder).unwrap();
        tracked.write_file(&file, b"x").unwrap();
        tracked.cleanup();

        // Re-create the same paths outside the tracker. A second cleanup
        // must not touch them because the logs were reset.
        fs::create_dir(&folder).unwrap();
        fs::write(&file, b"x").unwrap();
        tracked.cleanup();

        assert!(folder.exists());
        assert!(file.exists());
    }

    #[test]
    fn test_cleanup_tolerates_externally_removed_paths() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("gone");
        let file = folder.join("data.txt");

        let mut tracked = TrackedFs::new();
        tracked.create_dir(&folder).unwrap();
        tracked.write_file(&file, b"x").unwrap();

        fs::remove_file(&file).unwrap();
        fs::remove_dir(&folder).unwrap();

        tracked.cleanup();
    }

    #[test]
    fn test_manual_registration_participates_in_cleanup() {
        let temp = TempDir::new().unwrap();
        let side_channel = temp.path().join("tool-output.bin");
        fs::write(&side_channel, b"made by an external tool").unwrap();

        let mut tracked = TrackedFs::new();
        tracked.add_file(&side_channel);
        tracked.cleanup();

        assert!(!side_channel.exists());
    }

    #[test]
    fn test_delete_no_fail_ignores_missing_and_nonempty() {
        let temp = TempDir::new().unwrap();
        delete_no_fail(&temp.path().join("never-existed"));

        let full = temp.path().join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("keep.txt"), b"x").unwrap();
        delete_no_fail(&full);
        assert!(full.exists(), "non-recursive removal leaves non-empty dirs");
    }
}
