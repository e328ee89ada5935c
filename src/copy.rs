//! Copy-tree orchestrator.
//!
//! Replicates a filtered subset of a source tree at a destination, routing
//! every mutation through a [`StageFs`] so a tracked implementation can
//! reverse it all at exit time. Regular files and directories are
//! materialized in traversal order; symbolic links are deferred to a final
//! pass so their parent directories are guaranteed to exist by the time
//! they are created.
//!
//! File contents are read whole and written whole - the application trees
//! this handles are small, so streaming buys nothing.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exclude::{self, ExcludeRule};
use crate::trackedfs::StageFs;
use crate::walk::walk_tree;

/// Options for [`copy_tree`].
#[derive(Debug, Default)]
pub struct CopyOptions {
    /// Paths matching any rule are not copied.
    pub exclude: Vec<ExcludeRule>,
    /// Suppress symlink replication entirely.
    pub no_symlinks: bool,
    /// Print each operation.
    pub verbose: bool,
}

/// Copy a single file through a staging filesystem.
pub fn copy_file(src: &Path, dst: &Path, stage: &mut dyn StageFs) -> Result<()> {
    let data = fs::read(src).with_context(|| format!("reading '{}'", src.display()))?;
    stage.write_file(dst, &data)
}

/// Copy the filtered contents of `src` into `dst`.
///
/// `dst` itself must already exist. Exclusion rules without a separator are
/// applied while walking (pruning whole subtrees); rules containing a
/// separator are applied over the full relative paths afterwards, since a
/// fragment like `a/b` can only be tested once the relative path is known.
///
/// Any unrecoverable read or write error aborts the copy; partially created
/// destination entries are left for the tracked cleanup to remove.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    options: &CopyOptions,
    stage: &mut dyn StageFs,
) -> Result<()> {
    let (simple, path_shaped) = exclude::partition(&options.exclude);

    let names = walk_tree(src, |rel| !exclude::excluded(&simple, rel))?;
    let names: Vec<String> = names
        .into_iter()
        .filter(|rel| !exclude::excluded(&path_shaped, rel))
        .collect();

    let mut created: HashSet<PathBuf> = HashSet::new();
    let mut deferred_links: Vec<(PathBuf, PathBuf)> = Vec::new();

    for rel in &names {
        let src_path = src.join(rel);
        let dst_path = dst.join(rel);
        let metadata = fs::symlink_metadata(&src_path)
            .with_context(|| format!("reading metadata for '{}'", src_path.display()))?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            if !options.no_symlinks {
                deferred_links.push((src_path, dst_path));
            }
        } else if file_type.is_dir() {
            if options.verbose {
                println!("makedir: {} -> {}", src_path.display(), dst_path.display());
            }
            make_dir_once(&mut created, &dst_path, stage)?;
        } else {
            if options.verbose {
                println!("copying: {} -> {}", src_path.display(), dst_path.display());
            }
            copy_file(&src_path, &dst_path, stage)?;
        }
    }

    // Links last: every destination directory exists by now. The stored
    // link target is replicated verbatim, so relative targets stay relative
    // and resolve against the new link's own parent.
    for (src_link, dst_link) in deferred_links {
        let target = fs::read_link(&src_link)
            .with_context(|| format!("reading symlink target of '{}'", src_link.display()))?;
        if options.verbose {
            println!("symlink: {} -> {}", src_link.display(), dst_link.display());
        }
        stage.symlink(&target, &dst_link)?;
    }

    Ok(())
}

/// Create a destination directory at most once, skipping ones that already
/// exist on disk.
fn make_dir_once(
    created: &mut HashSet<PathBuf>,
    dir: &Path,
    stage: &mut dyn StageFs,
) -> Result<()> {
    if created.insert(dir.to_path_buf()) && !dir.exists() {
        stage.create_dir(dir)?;
    }
    Ok(())
}
