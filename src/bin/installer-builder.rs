//! CLI entry point.
//!
//! Resolves the application install directory (flag, then the per-user
//! config file), runs the platform build pipeline, and prints the final
//! artifact path - or the failure, including any captured packaging-tool
//! output.

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use installer_builder::build::{self, ArtifactFormat, BuildOptions};
use installer_builder::config;
use installer_builder::exec::ToolError;

#[derive(Parser, Debug)]
#[command(
    name = "installer-builder",
    version,
    about = "Creates a native installer for a packaged application",
    long_about = "Creates a native installer for a packaged application.\n\n\
        Note: installers are not cross platform. To make a Windows installer \
        run this on Windows; to make an OS X disk image or package run it on OS X."
)]
struct Args {
    /// Destination directory for the finished installer
    #[arg(long)]
    dst_path: PathBuf,

    /// Installer format: dmg, pkg, or nsis (default: the platform's native format)
    #[arg(long)]
    format: Option<String>,

    /// Path to the application install directory (overrides the config file)
    #[arg(long)]
    app_dir: Option<PathBuf>,

    /// Path to the user configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the code signing certificate, eg "Developer ID Installer: My Name"
    #[arg(long)]
    certificate: Option<String>,

    /// Directory holding os/<platform> and runtime/<platform> resources
    #[arg(long)]
    resources_root: Option<PathBuf>,

    /// Keep temporary files
    #[arg(long)]
    keep_temp_files: bool,

    /// Print more stuff
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(artifact) => {
            println!("wrote: {}", artifact.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<PathBuf> {
    let app_dir = config::resolve_install_dir(args.app_dir, args.config)?;
    let resources_root = match args.resources_root {
        Some(root) => root,
        None => default_resources_root()?,
    };
    let format = args
        .format
        .as_deref()
        .map(ArtifactFormat::parse)
        .transpose()?;

    let options = BuildOptions {
        dst_dir: absolutize(&args.dst_path)?,
        format,
        app_dir,
        resources_root,
        certificate: args.certificate,
        keep_temp_files: args.keep_temp_files,
        verbose: args.verbose,
    };
    build::build(&options)
}

/// Platform resources ship next to the executable.
fn default_resources_root() -> Result<PathBuf> {
    let exe = env::current_exe().context("locating the running executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("the running executable has no parent directory")
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()
            .context("resolving the current directory")?
            .join(path))
    }
}

/// Print the failure; tool failures also carry the tool's own output.
fn report_error(err: &anyhow::Error) {
    eprintln!("error: {:#}", err);
    if let Some(tool_err) = err.downcast_ref::<ToolError>() {
        if !tool_err.stdout.is_empty() {
            eprintln!("{}", tool_err.stdout);
        }
        if !tool_err.stderr.is_empty() {
            eprintln!("{}", tool_err.stderr);
        }
    }
}
