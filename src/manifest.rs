//! Application package metadata.
//!
//! Every packaged application carries a `package.json` at the root of its
//! install directory. The builders take the artifact name, version, and
//! bundle identifier from it, and the exclusion lists that keep development
//! droppings out of the installer.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::exclude::ExcludeRule;

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Paths no installer ever wants, applied on top of the manifest's own
/// exclusion lists.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".hg", ".svn", ".DS_Store", "Thumbs.db"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    /// Artifact and bundle display name.
    pub name: String,
    /// Must clean to `major.minor.patch` for the NSIS builder.
    pub version: String,
    /// Reverse-DNS bundle identifier for `pkgbuild`.
    pub identifier: Option<String>,
    /// Extra substring exclusion rules.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Extra regular-expression exclusion rules.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Paths relative to the bundled runtime that must be executable after
    /// staging (e.g. `bin/node`).
    #[serde(default)]
    pub executables: Vec<String>,
}

impl AppManifest {
    /// Load the manifest from `app_dir/package.json`.
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(MANIFEST_FILE_NAME);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading app manifest '{}'", path.display()))?;
        let manifest: AppManifest = serde_json::from_str(&contents)
            .with_context(|| format!("parsing app manifest '{}'", path.display()))?;
        if manifest.name.is_empty() {
            bail!("app manifest '{}' has an empty name", path.display());
        }
        Ok(manifest)
    }

    /// The bundle identifier, defaulting to one derived from the name.
    pub fn bundle_identifier(&self) -> String {
        match &self.identifier {
            Some(identifier) => identifier.clone(),
            None => format!("com.example.{}", slug(&self.name)),
        }
    }

    /// The full exclusion rule set: defaults, then the manifest's fragments
    /// and patterns.
    pub fn exclude_rules(&self) -> Result<Vec<ExcludeRule>> {
        let mut rules: Vec<ExcludeRule> = DEFAULT_EXCLUDES
            .iter()
            .map(|fragment| ExcludeRule::fragment(*fragment))
            .collect();
        rules.extend(self.exclude.iter().map(ExcludeRule::fragment));
        for pattern in &self.exclude_patterns {
            rules.push(ExcludeRule::pattern(pattern)?);
        }
        Ok(rules)
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Reduce a version string to its three numeric parts, accepting an
/// optional leading `v`.
pub fn clean_version(version: &str) -> Result<(u32, u32, u32)> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() != 3 {
        bail!("version '{}' is not MAJOR.MINOR.PATCH", version);
    }
    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("version '{}' has a non-numeric part '{}'", version, part))?;
    }
    Ok((numbers[0], numbers[1], numbers[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(contents: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE_NAME), contents).unwrap();
        temp
    }

    #[test]
    fn test_load_reads_required_fields() {
        let temp = write_manifest(r#"{"name": "DemoApp", "version": "1.2.3"}"#);
        let manifest = AppManifest::load(temp.path()).unwrap();
        assert_eq!(manifest.name, "DemoApp");
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.bundle_identifier(), "com.example.demoapp");
    }

    #[test]
    fn test_load_missing_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(AppManifest::load(temp.path()).is_err());
    }

    #[test]
    fn test_explicit_identifier_wins() {
        let temp = write_manifest(
            r#"{"name": "Demo", "version": "1.0.0", "identifier": "org.demo.Desktop"}"#,
        );
        let manifest = AppManifest::load(temp.path()).unwrap();
        assert_eq!(manifest.bundle_identifier(), "org.demo.Desktop");
    }

    #[test]
    fn test_exclude_rules_combine_defaults_and_manifest() {
        let temp = write_manifest(
            r#"{
                "name": "Demo",
                "version": "1.0.0",
                "exclude": ["docs/", "extras"],
                "excludePatterns": ["\\.log$"]
            }"#,
        );
        let manifest = AppManifest::load(temp.path()).unwrap();
        let rules = manifest.exclude_rules().unwrap();

        let matches = |path: &str| rules.iter().any(|rule| rule.matches(path));
        assert!(matches(".git/HEAD"));
        assert!(matches("docs/index.html"));
        assert!(matches("extras/readme"));
        assert!(matches("var/server.log"));
        assert!(!matches("src/main.js"));
    }

    #[test]
    fn test_clean_version_accepts_v_prefix() {
        assert_eq!(clean_version("v1.2.3").unwrap(), (1, 2, 3));
        assert_eq!(clean_version("0.10.4").unwrap(), (0, 10, 4));
    }

    #[test]
    fn test_clean_version_rejects_short_and_nonnumeric() {
        assert!(clean_version("1.2").is_err());
        assert!(clean_version("1.2.x").is_err());
        assert!(clean_version("1.2.3.4").is_err());
    }
}
