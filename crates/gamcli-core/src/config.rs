//! Config bootstrap for the `~/.gam-cli` directory
//!
//! The YAML config is the same document the vendor SDK consumes; `init`
//! validates the required keys and copies it verbatim into the fixed
//! per-user location.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Per-user config directory (`~/.gam-cli`)
pub fn config_dir() -> Result<PathBuf, CoreError> {
    dirs::home_dir()
        .map(|h| h.join(".gam-cli"))
        .ok_or(CoreError::HomeDirNotFound)
}

/// Fixed config file location (`~/.gam-cli/config.yaml`)
pub fn default_config_path() -> Result<PathBuf, CoreError> {
    Ok(config_dir()?.join("config.yaml"))
}

/// Network codes appear both quoted and unquoted in the wild, so YAML may
/// hand us either a string or an integer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NetworkCode {
    Text(String),
    Number(i64),
}

impl fmt::Display for NetworkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkCode::Text(s) => f.write_str(s),
            NetworkCode::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The `ad_manager` section of the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdManagerConfig {
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(default)]
    pub network_code: Option<NetworkCode>,
    #[serde(default)]
    pub path_to_private_key_file: Option<String>,
}

/// Parsed gam.yaml document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamConfig {
    pub ad_manager: AdManagerConfig,
}

impl GamConfig {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        serde_yaml::from_str(&content).map_err(|e| CoreError::YamlParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })
    }

    /// Load from `~/.gam-cli/config.yaml`, or an explicit override path.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, CoreError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        Self::load(&path)
    }

    /// Validate the keys `init` requires.
    pub fn validate(&self) -> Result<(), CoreError> {
        match &self.ad_manager.network_code {
            Some(NetworkCode::Text(s)) if s.trim().is_empty() => {
                return Err(CoreError::MissingConfigKey {
                    key: "ad_manager.network_code",
                })
            }
            Some(_) => {}
            None => {
                return Err(CoreError::MissingConfigKey {
                    key: "ad_manager.network_code",
                })
            }
        }
        match self.ad_manager.path_to_private_key_file.as_deref() {
            Some(p) if !p.trim().is_empty() => Ok(()),
            _ => Err(CoreError::MissingConfigKey {
                key: "ad_manager.path_to_private_key_file",
            }),
        }
    }

    /// Network code as a string, if configured.
    pub fn network_code(&self) -> Option<String> {
        self.ad_manager.network_code.as_ref().map(|c| c.to_string())
    }

    pub fn application_name(&self) -> &str {
        self.ad_manager
            .application_name
            .as_deref()
            .unwrap_or("gamcli")
    }
}

/// Validate a user-supplied config file and copy it verbatim into
/// `~/.gam-cli/config.yaml`. Returns the network code for confirmation
/// output.
pub fn init_config(source: &Path) -> Result<String, CoreError> {
    init_config_into(source, &config_dir()?)
}

fn init_config_into(source: &Path, dir: &Path) -> Result<String, CoreError> {
    let resolved = if source.is_absolute() {
        source.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CoreError::ConfigRead {
                path: source.to_path_buf(),
                source: e,
            })?
            .join(source)
    };

    if !resolved.exists() {
        return Err(CoreError::InvalidArgument {
            message: format!("Config file not found: {}", resolved.display()),
        });
    }

    let config = GamConfig::load(&resolved)?;
    config.validate()?;

    std::fs::create_dir_all(dir).map_err(|e| CoreError::ConfigRead {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let dest = dir.join("config.yaml");
    std::fs::copy(&resolved, &dest).map_err(|e| CoreError::ConfigRead {
        path: dest,
        source: e,
    })?;

    // validate() guarantees the code is present
    Ok(config.network_code().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("gam.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "ad_manager:\n  application_name: \"My App\"\n  network_code: \"12345678\"\n  path_to_private_key_file: \"/keys/sa.json\"\n",
        );

        let config = GamConfig::load(&path).unwrap();
        assert_eq!(config.network_code().as_deref(), Some("12345678"));
        assert_eq!(config.application_name(), "My App");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unquoted_network_code_parses_as_number() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "ad_manager:\n  network_code: 12345678\n  path_to_private_key_file: sa.json\n",
        );

        let config = GamConfig::load(&path).unwrap();
        assert_eq!(config.network_code().as_deref(), Some("12345678"));
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = GamConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_missing_network_code_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "ad_manager:\n  path_to_private_key_file: sa.json\n");

        let config = GamConfig::load(&path).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ad_manager.network_code"));
    }

    #[test]
    fn test_missing_key_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "ad_manager:\n  network_code: \"42\"\n");

        let config = GamConfig::load(&path).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("ad_manager.path_to_private_key_file"));
    }

    #[test]
    fn test_init_copies_verbatim() {
        let dir = TempDir::new().unwrap();
        let content = "ad_manager:\n  network_code: \"42\"\n  path_to_private_key_file: sa.json\n# trailing comment survives the copy\n";
        let path = write_config(&dir, content);
        let dest_dir = dir.path().join("gam-cli");

        let code = init_config_into(&path, &dest_dir).unwrap();
        assert_eq!(code, "42");

        let copied = std::fs::read_to_string(dest_dir.join("config.yaml")).unwrap();
        assert_eq!(copied, content);
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "ad_manager:\n  network_code: \"42\"\n");
        let dest_dir = dir.path().join("gam-cli");

        let err = init_config_into(&path, &dest_dir).unwrap_err();
        assert!(err.to_string().contains("path_to_private_key_file"));
        assert!(!dest_dir.join("config.yaml").exists());
    }

    #[test]
    fn test_init_missing_source() {
        let dir = TempDir::new().unwrap();
        let err =
            init_config_into(&dir.path().join("absent.yaml"), &dir.path().join("d")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_missing_ad_manager_section_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "something_else: true\n");

        assert!(matches!(
            GamConfig::load(&path),
            Err(CoreError::YamlParse { .. })
        ));
    }
}
