//! Preflight checks for the host packaging tools.
//!
//! Validates that the external tools a pipeline will invoke exist before
//! any staging work starts. This prevents a half-built staging tree when
//! the final packaging step would have failed anyway.

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Tools the OS X disk image pipeline invokes.
pub const DMG_TOOLS: &[(&str, &str)] = &[
    ("iconutil", "Xcode command line tools"),
    ("hdiutil", "macOS disk utilities"),
];

/// Tools the OS X installer package pipeline invokes.
pub const PKG_TOOLS: &[(&str, &str)] = &[("pkgbuild", "Xcode command line tools")];

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, provider) tuples
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();
    for (tool, provider) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *provider));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(tool, provider)| format!("  {} (from: {})", tool, provider))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("missing required host tools:\n{}", msg);
    }
    Ok(())
}

/// Locate `makensis`, falling back to the stock NSIS install locations
/// when it is not on PATH.
pub fn find_makensis() -> Result<PathBuf> {
    if let Ok(path) = which::which("makensis") {
        return Ok(path);
    }
    let fallbacks = [
        r"C:\Program Files\NSIS\makensis.exe",
        r"C:\Program Files (x86)\NSIS\makensis.exe",
    ];
    for candidate in fallbacks {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }
    bail!("makensis.exe not found in PATH; install NSIS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_reports_all_missing() {
        let tools = &[
            ("ls", "coreutils"),
            ("no_such_tool_a_31415", "pkg-a"),
            ("no_such_tool_b_27182", "pkg-b"),
        ];
        let err = check_required_tools(tools).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no_such_tool_a_31415"));
        assert!(msg.contains("no_such_tool_b_27182"));
        assert!(!msg.contains("coreutils"));
    }

    #[test]
    fn test_check_required_tools_passes_when_present() {
        assert!(check_required_tools(&[("ls", "coreutils")]).is_ok());
    }
}
