//! Runtime configuration, persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default OTP block 0 contents.
pub const DEFAULT_REVISION_TAG: &str = "CRYPTOTRONIX ECLET REV: A";
/// Default OTP block 1 contents.
pub const DEFAULT_SOFTWARE_VERSION: &str =
    concat!("SOFTWARE VERSION: ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcletConfig {
    /// Image file of the simulated device used by the CLI.
    pub device_image: PathBuf,
    /// Advisory response timeout handed to transports.
    pub response_timeout_ms: u64,
    /// Lock the config zone with the CRC of its contents.
    pub verify_config_crc: bool,
    /// Lock the data/OTP zones with the CRC of their expected contents.
    pub verify_data_crc: bool,
    /// Device revision tag burned into OTP block 0.
    pub revision_tag: String,
    /// Software version string burned into OTP block 1.
    pub software_version: String,
}

impl Default for EcletConfig {
    fn default() -> Self {
        Self {
            device_image: PathBuf::from("eclet-device.toml"),
            response_timeout_ms: 200,
            verify_config_crc: true,
            verify_data_crc: false,
            revision_tag: DEFAULT_REVISION_TAG.to_string(),
            software_version: DEFAULT_SOFTWARE_VERSION.to_string(),
        }
    }
}

impl EcletConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::EcletError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let config: EcletConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content).map_err(|e| {
            crate::EcletError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EcletConfig::default();
        assert!(cfg.verify_config_crc);
        assert!(!cfg.verify_data_crc);
        assert_eq!(cfg.revision_tag, "CRYPTOTRONIX ECLET REV: A");
        assert_eq!(
            cfg.software_version,
            format!("SOFTWARE VERSION: {}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: EcletConfig = toml::from_str("verify_data_crc = true\n").unwrap();
        assert!(cfg.verify_data_crc);
        assert_eq!(cfg.revision_tag, DEFAULT_REVISION_TAG);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("eclet-config-{}.toml", std::process::id()));
        let cfg = EcletConfig {
            response_timeout_ms: 50,
            revision_tag: "REV-B".into(),
            ..Default::default()
        };
        cfg.save_to_file(&path).unwrap();
        let loaded = EcletConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = EcletConfig::load_from_file("/nonexistent/eclet.toml").unwrap_err();
        assert!(matches!(err, crate::EcletError::Config(_)));
    }
}
