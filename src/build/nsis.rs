//! Windows NSIS installer builder.
//!
//! Inventories the runtime and application trees (sizes rounded up to the
//! filesystem block size so the installer's disk estimate is honest),
//! expands the platform's `installer.nsi` template with per-file install
//! and uninstall commands, writes the script CRLF-terminated into staging,
//! and compiles it with `makensis`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ensure_dst_dir, BuildOptions, PlatformPaths, Staging};
use crate::exclude::{self, ExcludeRule};
use crate::exec::run_tool;
use crate::manifest::{clean_version, AppManifest};
use crate::preflight;
use crate::template::replace_params;
use crate::trackedfs::StageFs;
use crate::walk::walk_tree;

/// Installed sizes are charged in whole filesystem blocks.
pub const BLOCK_SIZE: u64 = 4096;

/// Files and folders an installer will lay down, plus their on-disk size.
#[derive(Debug, Default)]
pub struct TreeInventory {
    pub folders: Vec<String>,
    pub files: Vec<String>,
    pub size: u64,
}

/// Inventory a tree with every exclusion rule active during the walk.
/// Symbolic links are skipped; installers carry none.
pub fn collect_inventory(root: &Path, rules: &[ExcludeRule]) -> Result<TreeInventory> {
    let rule_refs: Vec<&ExcludeRule> = rules.iter().collect();
    let names = walk_tree(root, |rel| !exclude::excluded(&rule_refs, rel))?;

    let mut inventory = TreeInventory::default();
    for rel in names {
        let full = root.join(&rel);
        let metadata = fs::symlink_metadata(&full)
            .with_context(|| format!("reading metadata for '{}'", full.display()))?;
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            inventory.folders.push(rel);
        } else {
            inventory.size += round_to_block(metadata.len());
            inventory.files.push(rel);
        }
    }
    Ok(inventory)
}

fn round_to_block(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn to_windows(rel: &str) -> String {
    rel.replace('/', "\\")
}

/// `setOutPath` + `File` pair installing `src` at `$INSTDIR\<dst_rel>`.
fn file_install_cmd(src: &Path, dst_rel: &str) -> String {
    let (out_dir, name) = match dst_rel.rsplit_once('/') {
        Some((dir, name)) => (format!("$INSTDIR\\{}", to_windows(dir)), name),
        None => ("$INSTDIR".to_string(), dst_rel),
    };
    format!(
        "setOutPath \"{}\"\nFile \"/oname={}\" \"{}\"",
        out_dir,
        name,
        src.display()
    )
}

fn delete_file_cmd(rel: &str) -> String {
    format!("delete \"$INSTDIR\\{}\"", to_windows(rel))
}

fn remove_dir_cmd(rel: &str) -> String {
    format!("rmDir \"$INSTDIR\\{}\"", to_windows(rel))
}

pub fn build(
    manifest: &AppManifest,
    paths: &PlatformPaths,
    options: &BuildOptions,
    staging: &mut Staging,
) -> Result<PathBuf> {
    let makensis = preflight::find_makensis()?;
    let (major, minor, patch) = clean_version(&manifest.version)?;
    let rules = manifest.exclude_rules()?;

    let runtime_inv = collect_inventory(&paths.runtime_dir, &rules)?;
    let app_inv = collect_inventory(&options.app_dir, &rules)?;

    let template_path = paths.src_dir.join("installer.nsi");
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("reading installer template '{}'", template_path.display()))?;

    let icon_path = paths.src_dir.join("logo.ico");
    ensure_dst_dir(&options.dst_dir)?;
    let artifact = options.dst_dir.join(format!(
        "{}-{}-installer.exe",
        manifest.name, manifest.version
    ));

    let mut files_to_install = vec![format!(
        "File \"/oname=logo.ico\" \"{}\"",
        icon_path.display()
    )];
    files_to_install.extend(
        runtime_inv
            .files
            .iter()
            .map(|rel| file_install_cmd(&paths.runtime_dir.join(rel), rel)),
    );
    files_to_install.extend(
        app_inv
            .files
            .iter()
            .map(|rel| file_install_cmd(&options.app_dir.join(rel), rel)),
    );

    // Uninstall commands: files first, then folders deepest-first so every
    // directory is empty by the time rmDir reaches it.
    let mut files_to_delete = vec![delete_file_cmd("logo.ico")];
    files_to_delete.extend(runtime_inv.files.iter().map(|rel| delete_file_cmd(rel)));
    files_to_delete.extend(app_inv.files.iter().map(|rel| delete_file_cmd(rel)));
    files_to_delete.extend(runtime_inv.folders.iter().rev().map(|rel| remove_dir_cmd(rel)));
    files_to_delete.extend(app_inv.folders.iter().rev().map(|rel| remove_dir_cmd(rel)));

    let install_size_kb = (runtime_inv.size + app_inv.size) / 1024;

    let mut params: HashMap<&str, String> = HashMap::new();
    params.insert("filesToInstall", files_to_install.join("\n"));
    params.insert("filesToDelete", files_to_delete.join("\n"));
    params.insert("iconPath", icon_path.display().to_string());
    params.insert(
        "licenseFile",
        paths.src_dir.join("license.rtf").display().to_string(),
    );
    params.insert("outFile", artifact.display().to_string());
    params.insert("installSizeKB", install_size_kb.to_string());
    params.insert("versionMajor", major.to_string());
    params.insert("versionMinor", minor.to_string());
    params.insert("versionPatch", patch.to_string());

    let script = replace_params(&template, &params);
    let script = script.replace("\r\n", "\n").replace('\n', "\r\n");
    let script_path = staging.root().join("installer.nsi");
    staging.fs.write_file(&script_path, script.as_bytes())?;

    run_tool(&makensis, [script_path.as_os_str()], options.verbose)?;

    Ok(artifact)
}
