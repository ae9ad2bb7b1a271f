//! Optional TOML configuration, grounded in the teacher's `Config::load_from_file`
//! (serde + toml, loaded once at startup and overridden by CLI flags).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Synth backend selection and tuning, independent of which binary loads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirtualMidiConfig {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub audio_device: Option<String>,
    #[serde(default)]
    pub soundfont: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VirtualMidiConfig {
    fn default() -> Self {
        Self {
            driver: None,
            audio_device: None,
            soundfont: None,
            log_level: default_log_level(),
        }
    }
}

impl VirtualMidiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read config file {}", path.as_ref().display())
        })?;
        let config: VirtualMidiConfig = toml::from_str(&contents).with_context(|| {
            format!("failed to parse config file {}", path.as_ref().display())
        })?;
        Ok(config)
    }
}

impl From<&VirtualMidiConfig> for crate::synth::BackendOptions {
    fn from(cfg: &VirtualMidiConfig) -> Self {
        crate::synth::BackendOptions {
            driver: cfg.driver.clone(),
            device: cfg.audio_device.clone(),
            soundfont: cfg.soundfont.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            driver = "oss"
            audio_device = "/dev/dsp"
            soundfont = "/usr/share/sounds/sf2/default.sf2"
            log_level = "debug"
            "#
        )
        .unwrap();
        let config = VirtualMidiConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.driver.as_deref(), Some("oss"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_missing_fields_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"driver = "alsa""#).unwrap();
        let config = VirtualMidiConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.driver.as_deref(), Some("alsa"));
        assert_eq!(config.log_level, "info");
        assert!(config.soundfont.is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let result = VirtualMidiConfig::load_from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
