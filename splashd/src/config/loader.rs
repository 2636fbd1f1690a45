//! Configuration loading
//!
//! Parses the embedded defaults, layers a configuration file on top and
//! deserializes the result. Tables merge key by key, so a file only needs
//! the settings it changes.

use std::io;
use std::path::{Path, PathBuf};

use splash_display::ImageError;
use tracing::{debug, info};

use super::SplashConfig;

/// Embedded default configuration (compiled into the daemon)
/// Edit splashd.toml and rebuild to customize
pub const EMBEDDED_CONFIG: &str = include_str!("../../splashd.toml");

/// Configuration file consulted when none is given
pub const SYSTEM_CONFIG: &str = "/etc/splashd.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid TOML in {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid logo {path}: {reason:?}")]
    Logo { path: PathBuf, reason: ImageError },
}

/// Load the configuration
///
/// With `path` that file must exist. Without it `/etc/splashd.toml` is used
/// when present, otherwise only the embedded defaults apply.
pub fn load(path: Option<&Path>) -> Result<SplashConfig, ConfigError> {
    let overlay = match path {
        Some(path) => Some(read(path)?),
        None => {
            let system = Path::new(SYSTEM_CONFIG);
            if system.exists() {
                Some(read(system)?)
            } else {
                debug!("no {}, using embedded defaults", SYSTEM_CONFIG);
                None
            }
        }
    };

    let overlay = overlay
        .as_ref()
        .map(|(origin, text)| (origin.as_str(), text.as_str()));
    let config = load_str(overlay)?;
    log_config_summary(&config);
    Ok(config)
}

/// Load from the embedded defaults plus optional `(origin, text)` overrides
pub fn load_str(overlay: Option<(&str, &str)>) -> Result<SplashConfig, ConfigError> {
    let mut value = parse("embedded splashd.toml", EMBEDDED_CONFIG)?;
    if let Some((origin, text)) = overlay {
        merge(&mut value, parse(origin, text)?);
        info!("loaded configuration from {}", origin);
    }

    let config: SplashConfig = value.try_into().map_err(|source| ConfigError::Parse {
        origin: overlay.map_or("embedded splashd.toml", |(origin, _)| origin).to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

fn read(path: &Path) -> Result<(String, String), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((path.display().to_string(), text))
}

fn parse(origin: &str, text: &str) -> Result<toml::Value, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Merge `overlay` into `base`, recursing into tables
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &SplashConfig) {
    debug!("  fifo: {:?}/{}", config.fifo_dir, config.fifo_name);
    debug!("  fbdev: {}, angle: {}", config.fbdev, config.angle);
    debug!("  console switch: {}", config.console_switch);
    debug!("  flip policy: {:?}", config.flip_policy);
    debug!("  wait timeout: {}s", config.wait_timeout_s);
    debug!("  font: {}", config.scene.font);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlipMode;

    #[test]
    fn test_embedded_matches_defaults() {
        let config = load_str(None).unwrap();
        assert_eq!(config, SplashConfig::default());
    }

    #[test]
    fn test_overlay_changes_only_given_keys() {
        let config = load_str(Some((
            "test",
            "angle = 90\nflip_policy = \"on-draw\"\n[scene]\nfont = \"6x10\"\n",
        )))
        .unwrap();

        assert_eq!(config.angle, 90);
        assert_eq!(config.flip_policy, FlipMode::OnDraw);
        assert_eq!(config.scene.font, "6x10");
        // Untouched keys in the same table keep their defaults
        assert_eq!(config.scene.split_denominator, 6);
        assert!(config.console_switch);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = load_str(Some(("test", "colour = 1\n"))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = load_str(Some(("test", "angle = 45\n"))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_syntax_error_names_origin() {
        let err = load_str(Some(("/etc/broken.toml", "angle = \n"))).unwrap_err();
        assert!(err.to_string().contains("/etc/broken.toml"));
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_explicit_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splashd.toml");
        std::fs::write(&path, "fbdev = 1\n[colors]\ntext = 0x000000\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.fbdev, 1);
        assert_eq!(config.colors.text, 0);
        assert_eq!(config.colors.background, 0xecece1);
    }
}
