//! Reader configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::apdu::CommandCatalog;
use crate::error::ConfigError;
use crate::sequencer::ExchangeSettings;
use crate::transport::{Protocol, DEFAULT_MAX_RESPONSE_LEN, MAX_RESPONSE_LEN};

/// PC/SC share mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    #[default]
    Shared,
    Exclusive,
    Direct,
}

#[cfg(feature = "pcsc")]
impl From<ShareMode> for pcsc::ShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Shared => pcsc::ShareMode::Shared,
            ShareMode::Exclusive => pcsc::ShareMode::Exclusive,
            ShareMode::Direct => pcsc::ShareMode::Direct,
        }
    }
}

/// Settings for reading a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Reader name. The first reader is used when absent.
    #[serde(default)]
    pub reader: Option<String>,
    #[serde(default)]
    pub share_mode: ShareMode,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_max_response_len")]
    pub max_response_len: usize,
    #[serde(default)]
    pub with_photo: bool,
    #[serde(default)]
    pub catalog: CommandCatalog,
}

fn default_max_response_len() -> usize {
    DEFAULT_MAX_RESPONSE_LEN
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            reader: None,
            share_mode: ShareMode::default(),
            protocol: Protocol::default(),
            max_response_len: default_max_response_len(),
            with_photo: false,
            catalog: CommandCatalog::default(),
        }
    }
}

impl ReaderConfig {
    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ReaderConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_response_len == 0 {
            return Err(ConfigError::Validation("max_response_len must be positive".into()));
        }
        if self.max_response_len > MAX_RESPONSE_LEN {
            return Err(ConfigError::Validation(format!(
                "max_response_len must be at most {}",
                MAX_RESPONSE_LEN
            )));
        }
        for (name, command) in self.catalog.commands() {
            if command.is_empty() {
                return Err(ConfigError::Validation(format!("command {} has no APDUs", name)));
            }
            if command.iter().any(|apdu| apdu.as_bytes().is_empty()) {
                return Err(ConfigError::Validation(format!("command {} has an empty APDU", name)));
            }
        }
        for (index, chunk) in self.catalog.photo.iter().enumerate() {
            if chunk.pointer.as_bytes().is_empty() || chunk.read.as_bytes().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "photo chunk {} has an empty APDU",
                    index + 1
                )));
            }
        }
        Ok(())
    }

    pub fn exchange(&self) -> ExchangeSettings {
        ExchangeSettings {
            max_response_len: self.max_response_len,
            protocol: self.protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::Apdu;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ReaderConfig::from_json("{}").unwrap();
        assert_eq!(config.reader, None);
        assert_eq!(config.share_mode, ShareMode::Shared);
        assert_eq!(config.protocol, Protocol::Any);
        assert_eq!(config.max_response_len, 256);
        assert!(!config.with_photo);
        assert_eq!(config.catalog, CommandCatalog::thai_id());
    }

    #[test]
    fn test_overrides() {
        let config = ReaderConfig::from_json(
            r#"{ "reader": "ACS ACR39U", "protocol": "t0", "share_mode": "exclusive", "with_photo": true }"#,
        )
        .unwrap();
        assert_eq!(config.reader.as_deref(), Some("ACS ACR39U"));
        assert_eq!(config.exchange().protocol, Protocol::T0);
        assert_eq!(config.share_mode, ShareMode::Exclusive);
        assert!(config.with_photo);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ReaderConfig::from_json(r#"{ "max_response_len": 0 }"#),
            Err(ConfigError::Validation(_))
        ));

        let mut config = ReaderConfig::default();
        config.catalog.address.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(m)) if m.contains("address")));

        assert!(matches!(ReaderConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_response_len_bound() {
        assert!(matches!(
            ReaderConfig::from_json(r#"{ "max_response_len": 1000000000000000000, "with_photo": true }"#),
            Err(ConfigError::Validation(m)) if m.contains("at most 65536")
        ));
        assert!(matches!(
            ReaderConfig::from_json(r#"{ "max_response_len": 65537 }"#),
            Err(ConfigError::Validation(_))
        ));

        let config = ReaderConfig::from_json(r#"{ "max_response_len": 65536 }"#).unwrap();
        assert_eq!(config.exchange().max_response_len, MAX_RESPONSE_LEN);
    }

    #[test]
    fn test_empty_photo_apdu_rejected() {
        let mut config = ReaderConfig::default();
        config.catalog.photo[3].read = Apdu(Vec::new());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(m)) if m.contains("photo chunk 4")));

        let mut config = ReaderConfig::default();
        config.catalog.photo[0].pointer = Apdu(Vec::new());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(m)) if m.contains("photo chunk 1")));

        let mut value = serde_json::to_value(ReaderConfig::default()).unwrap();
        value["catalog"]["photo"][19]["pointer"] = serde_json::Value::from("");
        let json = value.to_string();
        assert!(matches!(ReaderConfig::from_json(&json), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_catalog_survives_json() {
        let config = ReaderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = ReaderConfig::from_json(&json).unwrap();
        assert_eq!(back.catalog, config.catalog);
    }
}
