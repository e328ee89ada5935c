//! Build pipelines.
//!
//! Each artifact kind is a one-shot pipeline: allocate a staging directory,
//! assemble the tree through the tracked filesystem, invoke the platform
//! packaging tool, and hand back the final artifact path. However the
//! pipeline ends - success, I/O failure, tool failure - the [`Staging`]
//! guard reverse-deletes everything that was tracked.

pub mod dmg;
pub mod nsis;
pub mod pkg;

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::AppManifest;
use crate::trackedfs::{self, TrackedFs};

/// Operating systems with a registered platform configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
}

impl Platform {
    /// Detect the platform this process runs on. Anything without a
    /// registered configuration fails fast, before any side effects.
    pub fn detect() -> Result<Platform> {
        match env::consts::OS {
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            other => bail!(
                "unsupported platform '{}': installers can only be built on macos or windows",
                other
            ),
        }
    }

    /// Directory name under the resources root holding this platform's
    /// assets.
    pub fn os_dir_name(self) -> &'static str {
        match self {
            Platform::MacOs => "osx",
            Platform::Windows => "win",
        }
    }

    pub fn default_format(self) -> ArtifactFormat {
        match self {
            Platform::MacOs => ArtifactFormat::Dmg,
            Platform::Windows => ArtifactFormat::Nsis,
        }
    }
}

/// The kind of installer artifact to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// OS X disk image (`hdiutil`).
    Dmg,
    /// OS X installer package (`pkgbuild`).
    Pkg,
    /// Windows NSIS installer executable (`makensis`).
    Nsis,
}

impl ArtifactFormat {
    pub fn parse(value: &str) -> Result<ArtifactFormat> {
        match value.to_ascii_lowercase().as_str() {
            "dmg" => Ok(ArtifactFormat::Dmg),
            "pkg" => Ok(ArtifactFormat::Pkg),
            "nsis" => Ok(ArtifactFormat::Nsis),
            other => bail!(
                "unsupported artifact format '{}'; expected one of: dmg, pkg, nsis",
                other
            ),
        }
    }

    /// The platform an artifact of this kind must be built on - packaging
    /// is not cross platform.
    pub fn required_platform(self) -> Platform {
        match self {
            ArtifactFormat::Dmg | ArtifactFormat::Pkg => Platform::MacOs,
            ArtifactFormat::Nsis => Platform::Windows,
        }
    }
}

/// Options for a single build.
#[derive(Debug)]
pub struct BuildOptions {
    /// Where the finished artifact lands.
    pub dst_dir: PathBuf,
    /// Artifact kind; `None` means the platform's native format.
    pub format: Option<ArtifactFormat>,
    /// Root of the application tree to package.
    pub app_dir: PathBuf,
    /// Directory holding `os/<platform>` assets and `runtime/<platform>`
    /// trees.
    pub resources_root: PathBuf,
    /// Code signing certificate name (pkg only).
    pub certificate: Option<String>,
    pub keep_temp_files: bool,
    pub verbose: bool,
}

/// Per-platform asset locations under the resources root.
#[derive(Debug)]
pub struct PlatformPaths {
    /// Static packaging assets: launcher, Info.plist, icons, NSIS template.
    pub src_dir: PathBuf,
    /// The bundled runtime tree shipped next to the application.
    pub runtime_dir: PathBuf,
}

impl PlatformPaths {
    pub fn new(resources_root: &Path, platform: Platform) -> Self {
        Self {
            src_dir: resources_root.join("os").join(platform.os_dir_name()),
            runtime_dir: resources_root.join("runtime").join(platform.os_dir_name()),
        }
    }
}

/// The staging directory and its tracked filesystem.
///
/// Dropping the staging performs cleanup: every tracked creation is deleted
/// in reverse order and the temp root itself is removed (it is empty by
/// then, so a non-recursive delete suffices). With `keep_temp_files` the
/// whole tree is left on disk for inspection.
pub struct Staging {
    root: PathBuf,
    pub fs: TrackedFs,
    keep: bool,
    verbose: bool,
}

impl Staging {
    /// Allocate a fresh temporary directory for this build.
    pub fn allocate(keep_temp_files: bool, verbose: bool) -> Result<Staging> {
        let dir = tempfile::Builder::new()
            .prefix("installer-builder-")
            .tempdir()
            .context("allocating temporary build directory")?;
        // Disable tempfile's recursive auto-delete; only tracked paths are
        // ever removed.
        let root = dir.keep();
        Ok(Staging {
            root,
            fs: TrackedFs::new(),
            keep: keep_temp_files,
            verbose,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reverse-delete everything tracked, then the (now empty) temp root.
    pub fn cleanup(&mut self) {
        if self.keep {
            return;
        }
        if self.verbose {
            println!("deleting: {}", self.root.display());
        }
        self.fs.cleanup();
        trackedfs::delete_no_fail(&self.root);
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Run the build pipeline for `options` and return the artifact path.
pub fn build(options: &BuildOptions) -> Result<PathBuf> {
    let platform = Platform::detect()?;
    let format = options.format.unwrap_or_else(|| platform.default_format());
    ensure_format_supported(platform, format)?;

    let manifest = AppManifest::load(&options.app_dir)?;
    let paths = PlatformPaths::new(&options.resources_root, platform);

    let mut staging = Staging::allocate(options.keep_temp_files, options.verbose)?;
    if options.verbose {
        println!("building in: {}", staging.root().display());
    }

    match format {
        ArtifactFormat::Dmg => dmg::build(&manifest, &paths, options, &mut staging),
        ArtifactFormat::Pkg => pkg::build(&manifest, &paths, options, &mut staging),
        ArtifactFormat::Nsis => nsis::build(&manifest, &paths, options, &mut staging),
    }
}

/// Fail when an artifact kind is requested on the wrong platform.
pub fn ensure_format_supported(platform: Platform, format: ArtifactFormat) -> Result<()> {
    let required = format.required_platform();
    if platform != required {
        bail!(
            "{:?} artifacts can only be built on {:?}, not {:?}",
            format,
            required,
            platform
        );
    }
    Ok(())
}

/// Ensure the destination directory exists. Not tracked: the artifact
/// inside it must survive cleanup.
pub(crate) fn ensure_dst_dir(dst_dir: &Path) -> Result<()> {
    if !dst_dir.exists() {
        fs::create_dir_all(dst_dir)
            .with_context(|| format!("creating destination directory '{}'", dst_dir.display()))?;
    }
    Ok(())
}

/// Mark a staged file executable. No-op on platforms without Unix modes.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path)
        .with_context(|| format!("reading permissions of '{}'", path.display()))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("marking '{}' executable", path.display()))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackedfs::StageFs;

    #[test]
    fn test_artifact_format_parse() {
        assert_eq!(ArtifactFormat::parse("dmg").unwrap(), ArtifactFormat::Dmg);
        assert_eq!(ArtifactFormat::parse("PKG").unwrap(), ArtifactFormat::Pkg);
        assert_eq!(ArtifactFormat::parse("nsis").unwrap(), ArtifactFormat::Nsis);
        assert!(ArtifactFormat::parse("msi").is_err());
    }

    #[test]
    fn test_format_platform_compatibility() {
        assert!(ensure_format_supported(Platform::MacOs, ArtifactFormat::Dmg).is_ok());
        assert!(ensure_format_supported(Platform::MacOs, ArtifactFormat::Pkg).is_ok());
        assert!(ensure_format_supported(Platform::Windows, ArtifactFormat::Nsis).is_ok());
        assert!(ensure_format_supported(Platform::Windows, ArtifactFormat::Dmg).is_err());
        assert!(ensure_format_supported(Platform::MacOs, ArtifactFormat::Nsis).is_err());
    }

    #[test]
    fn test_platform_paths_layout() {
        let paths = PlatformPaths::new(Path::new("/res"), Platform::Windows);
        assert_eq!(paths.src_dir, Path::new("/res/os/win"));
        assert_eq!(paths.runtime_dir, Path::new("/res/runtime/win"));
    }

    #[test]
    fn test_staging_cleanup_on_drop_removes_everything() {
        let root;
        {
            let mut staging = Staging::allocate(false, false).unwrap();
            root = staging.root().to_path_buf();
            let dir = root.join("work");
            staging.fs.create_dir(&dir).unwrap();
            staging.fs.write_file(&dir.join("a.txt"), b"a").unwrap();
        }
        assert!(!root.exists());
    }

    #[test]
    fn test_staging_keep_temp_files_skips_cleanup() {
        let root;
        {
            let mut staging = Staging::allocate(true, false).unwrap();
            root = staging.root().to_path_buf();
            staging.fs.write_file(&root.join("a.txt"), b"a").unwrap();
        }
        assert!(root.join("a.txt").exists());
        fs::remove_file(root.join("a.txt")).unwrap();
        fs::remove_dir(&root).unwrap();
    }

    #[test]
    fn test_staging_manual_cleanup_is_idempotent() {
        let mut staging = Staging::allocate(false, false).unwrap();
        let root = staging.root().to_path_buf();
        staging.fs.write_file(&root.join("a.txt"), b"a").unwrap();
        staging.cleanup();
        assert!(!root.exists());
        staging.cleanup();
        drop(staging);
    }
}
