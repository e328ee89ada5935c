//! Filtered tree walker.
//!
//! Lists every descendant of a root directory - files, directories, and
//! symbolic links - as forward-slash normalized paths relative to the root,
//! depth-first with parents before children. A predicate over relative
//! paths filters the traversal; rejecting a directory prunes its entire
//! subtree, so nothing beneath it is ever visited.
//!
//! Symbolic links are reported but never followed, which also means cyclic
//! links in the source tree cannot send the walk into a loop.

use anyhow::{bail, Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Walk `root`, keeping only entries (and subtrees) the predicate accepts.
///
/// The predicate receives paths already relative to `root`, normalized to
/// forward slashes. Any directory read failure aborts the walk; partial
/// results are discarded.
pub fn walk_tree<F>(root: &Path, mut accept: F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> bool,
{
    if !root.is_dir() {
        bail!("walk root '{}' is not a directory", root.display());
    }

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| match relative_slash(root, entry.path()) {
            Some(rel) => accept(&rel),
            None => true,
        });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("walking directory tree '{}'", root.display()))?;
        if let Some(rel) = relative_slash(root, entry.path()) {
            paths.push(rel);
        }
    }
    Ok(paths)
}

/// Walk `root` with no filtering.
pub fn walk_tree_all(root: &Path) -> Result<Vec<String>> {
    walk_tree(root, |_| true)
}

/// Strip the root prefix and normalize separators to `/`.
fn relative_slash(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("a/x.txt"), "hi").unwrap();
        fs::write(root.join("a/b/y.txt"), "yo").unwrap();
        temp
    }

    #[test]
    fn test_walk_lists_every_entry_relative_to_root() {
        let temp = sample_tree();
        let mut paths = walk_tree_all(temp.path()).unwrap();
        paths.sort();
        assert_eq!(paths, vec!["a", "a/b", "a/b/y.txt", "a/x.txt", "top.txt"]);
    }

    #[test]
    fn test_walk_emits_parents_before_children() {
        let temp = sample_tree();
        let paths = walk_tree_all(temp.path()).unwrap();
        let pos = |name: &str| paths.iter().position(|p| p == name).unwrap();
        assert!(pos("a") < pos("a/x.txt"));
        assert!(pos("a") < pos("a/b"));
        assert!(pos("a/b") < pos("a/b/y.txt"));
    }

    #[test]
    fn test_walk_prunes_rejected_directory_subtree() {
        let temp = sample_tree();
        let paths = walk_tree(temp.path(), |rel| rel != "a").unwrap();
        assert!(paths.iter().all(|p| !p.starts_with("a")));
        assert!(paths.contains(&"top.txt".to_string()));
    }

    #[test]
    fn test_walk_predicate_sees_normalized_relative_paths() {
        let temp = sample_tree();
        let mut seen = Vec::new();
        walk_tree(temp.path(), |rel| {
            seen.push(rel.to_string());
            true
        })
        .unwrap();
        assert!(seen.contains(&"a/b/y.txt".to_string()));
        assert!(seen.iter().all(|p| !p.contains('\\')));
        assert!(seen.iter().all(|p| !p.starts_with('/')));
    }

    #[test]
    fn test_walk_root_must_be_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(walk_tree_all(&file).is_err());
        assert!(walk_tree_all(&temp.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_reports_symlinks_without_following() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/inner.txt"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("target"), root.join("ln")).unwrap();

        let paths = walk_tree_all(root).unwrap();
        assert!(paths.contains(&"ln".to_string()));
        assert!(!paths.contains(&"ln/inner.txt".to_string()));
    }
}
