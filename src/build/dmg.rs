//! OS X disk image builder.
//!
//! Assembles a `<Name>.app` bundle in the staging tree - launcher,
//! Info.plist, icons rendered with `iconutil`, the bundled runtime, and the
//! application payload - adds the customary `/Applications` drag-install
//! symlink, then packs the whole staging root into a compressed disk image
//! with `hdiutil`.

use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ensure_dst_dir, make_executable, BuildOptions, PlatformPaths, Staging};
use crate::copy::{copy_file, copy_tree, CopyOptions};
use crate::exec::run_tool;
use crate::manifest::AppManifest;
use crate::preflight;
use crate::trackedfs::StageFs;

pub fn build(
    manifest: &AppManifest,
    paths: &PlatformPaths,
    options: &BuildOptions,
    staging: &mut Staging,
) -> Result<PathBuf> {
    preflight::check_required_tools(preflight::DMG_TOOLS)?;

    let root = staging.root().to_path_buf();
    let base = root.join(format!("{}.app", manifest.name));
    let contents = base.join("Contents");
    let resources = contents.join("Resources");
    let exe_dir = contents.join("MacOS");
    let payload_dir = contents.join("app");
    for dir in [&base, &contents, &resources, &exe_dir, &payload_dir] {
        staging.fs.create_dir(dir)?;
    }

    copy_file(
        &paths.src_dir.join("Info.plist"),
        &contents.join("Info.plist"),
        &mut staging.fs,
    )?;
    let exe_path = exe_dir.join(&manifest.name);
    copy_file(&paths.src_dir.join("launcher"), &exe_path, &mut staging.fs)?;
    make_executable(&exe_path)?;

    // iconutil writes the icns itself; register it so cleanup removes it.
    let icns_path = resources.join("app.icns");
    staging.fs.add_file(&icns_path);
    let iconset_path = paths.src_dir.join("icons.iconset");
    let icon_args: Vec<OsString> = vec![
        "-c".into(),
        "icns".into(),
        "-o".into(),
        icns_path.as_os_str().into(),
        iconset_path.as_os_str().into(),
    ];
    run_tool("iconutil", icon_args, options.verbose)?;

    let copy_options = CopyOptions {
        exclude: manifest.exclude_rules()?,
        no_symlinks: true,
        verbose: options.verbose,
    };
    if options.verbose {
        println!("--copy runtime--");
    }
    copy_tree(&paths.runtime_dir, &exe_dir, &copy_options, &mut staging.fs)?;
    if options.verbose {
        println!("--copy app--");
    }
    copy_tree(&options.app_dir, &payload_dir, &copy_options, &mut staging.fs)?;
    for exe in &manifest.executables {
        make_executable(&exe_dir.join(exe))?;
    }

    // Drag-install affordance inside the mounted image.
    staging
        .fs
        .symlink(Path::new("/Applications"), &root.join("Applications"))?;

    ensure_dst_dir(&options.dst_dir)?;
    let artifact = options.dst_dir.join(format!("{}.dmg", manifest.name));
    let dmg_args: Vec<OsString> = vec![
        "create".into(),
        "-volname".into(),
        manifest.name.as_str().into(),
        "-srcFolder".into(),
        root.as_os_str().into(),
        "-ov".into(),
        "-format".into(),
        "UDBZ".into(),
        artifact.as_os_str().into(),
    ];
    run_tool("hdiutil", dmg_args, options.verbose)?;

    Ok(artifact)
}
