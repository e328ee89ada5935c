//! Per-user configuration.
//!
//! A JSON file at `~/.installer-builder/config.json` records where the
//! application to package is installed. A missing file just means "not
//! configured" - the `--app-dir` flag can stand in - but a file that exists
//! and fails to parse is a fatal error.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = ".installer-builder";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Where the application tree to package is installed.
    pub install_dir: Option<PathBuf>,
}

/// The fixed per-user config location, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Read the config at `path`. Absent file is `Ok(None)`; malformed JSON is
/// an error.
pub fn load(path: &Path) -> Result<Option<UserConfig>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("reading config '{}'", path.display()))
        }
    };
    let parsed: UserConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config '{}'", path.display()))?;
    Ok(Some(parsed))
}

/// Resolve the app install directory: an explicit override wins, then the
/// config file's `installDir`. Neither present is a configuration error,
/// reported before any build work starts.
pub fn resolve_install_dir(
    override_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir);
    }

    let Some(path) = config_path.or_else(default_config_path) else {
        bail!("cannot determine home directory; pass --app-dir");
    };
    if let Some(config) = load(&path)? {
        if let Some(dir) = config.install_dir {
            return Ok(dir);
        }
    }
    bail!(
        "the application does not appear to be installed; pass --app-dir or set \
         installDir in '{}'",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_not_configured() {
        let temp = TempDir::new().unwrap();
        let result = load(&temp.path().join("config.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_reads_install_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"installDir": "/opt/demo-app"}"#).unwrap();

        let config = load(&path).unwrap().unwrap();
        assert_eq!(config.install_dir, Some(PathBuf::from("/opt/demo-app")));
    }

    #[test]
    fn test_load_malformed_json_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_override() {
        let dir = resolve_install_dir(Some(PathBuf::from("/explicit")), None).unwrap();
        assert_eq!(dir, PathBuf::from("/explicit"));
    }

    #[test]
    fn test_resolve_falls_back_to_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"installDir": "/from/config"}"#).unwrap();

        let dir = resolve_install_dir(None, Some(path)).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));
    }

    #[test]
    fn test_resolve_unconfigured_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = resolve_install_dir(None, Some(temp.path().join("config.json"))).unwrap_err();
        assert!(err.to_string().contains("--app-dir"));
    }
}
