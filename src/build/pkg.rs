//! OS X installer package builder.
//!
//! Stages the app bundle from the platform's bundle template, stamps the
//! release version into its Info.plist, lays in the install scripts, the
//! bundled runtime, and the application payload, then produces a `.pkg`
//! with `pkgbuild` - signed when a certificate name is supplied.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use super::{ensure_dst_dir, make_executable, BuildOptions, PlatformPaths, Staging};
use crate::copy::{copy_tree, CopyOptions};
use crate::exec::run_tool;
use crate::manifest::AppManifest;
use crate::preflight;
use crate::trackedfs::StageFs;

const VERSION_NEEDLE: &str = "<key>CFBundleShortVersionString</key>\n\t<string>1.0</string>";

pub fn build(
    manifest: &AppManifest,
    paths: &PlatformPaths,
    options: &BuildOptions,
    staging: &mut Staging,
) -> Result<PathBuf> {
    preflight::check_required_tools(preflight::PKG_TOOLS)?;

    let root = staging.root().to_path_buf();
    let base = root.join(format!("{}.app", manifest.name));
    let contents = base.join("Contents");
    let resources = contents.join("Resources");
    let scripts = contents.join("Scripts");
    let exe_dir = contents.join("MacOS");
    let payload_dir = contents.join("app");
    for dir in [&base, &contents, &resources, &scripts, &exe_dir, &payload_dir] {
        staging.fs.create_dir(dir)?;
    }

    let copy_options = CopyOptions {
        exclude: manifest.exclude_rules()?,
        no_symlinks: true,
        verbose: options.verbose,
    };

    if options.verbose {
        println!("--copy bundle--");
    }
    copy_tree(&paths.src_dir.join("bundle"), &base, &copy_options, &mut staging.fs)?;
    make_executable(&exe_dir.join(&manifest.name))?;

    if options.verbose {
        println!("--copy scripts--");
    }
    copy_tree(&paths.src_dir.join("Scripts"), &scripts, &copy_options, &mut staging.fs)?;
    for script in ["preinstall", "postinstall"] {
        let path = scripts.join(script);
        if path.exists() {
            make_executable(&path)?;
        }
    }

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

    // Stamp the release version into the bundle template's Info.plist.
    let info_path = contents.join("Info.plist");
    let info = fs::read_to_string(&info_path)
        .with_context(|| format!("reading '{}'", info_path.display()))?;
    staging
        .fs
        .write_file(&info_path, apply_bundle_version(&info, &manifest.version).as_bytes())?;

    ensure_dst_dir(&options.dst_dir)?;
    let artifact = options
        .dst_dir
        .join(format!("{}-{}.pkg", manifest.name, manifest.version));

    let mut pkg_args: Vec<OsString> = Vec::new();
    if let Some(certificate) = &options.certificate {
        pkg_args.push("--sign".into());
        pkg_args.push(certificate.as_str().into());
    } else {
        eprintln!("warning: package not signed; it will not install easily");
    }
    pkg_args.extend(vec![
        "--identifier".into(),
        manifest.bundle_identifier().into(),
        "--root".into(),
        root.as_os_str().into(),
        "--version".into(),
        manifest.version.as_str().into(),
        "--scripts".into(),
        scripts.as_os_str().into(),
        "--install-location".into(),
        "/Applications".into(),
        artifact.as_os_str().into(),
    ]);
    run_tool("pkgbuild", pkg_args, options.verbose)?;

    Ok(artifact)
}

/// Replace the bundle template's placeholder version.
fn apply_bundle_version(plist: &str, version: &str) -> String {
    plist.replace(
        VERSION_NEEDLE,
        &format!(
            "<key>CFBundleShortVersionString</key>\n\t<string>{}</string>",
            version
        ),
    )
}
