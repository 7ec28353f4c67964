//! Ledger configuration file.
//!
//! A plain `key=value` file with `#` comments:
//!
//! ```text
//! version=1
//! system=eosio
//! max_node_size=64000
//! ```

use crate::error::{Error, Result};
use crate::name::Name;
use crate::system::DEFAULT_SYSTEM_ACCOUNT;

/// Supported config file version.
pub const CONFIG_VERSION: &str = "1";

/// Recommended per-node payload cap.
///
/// Hex-encoding 64000 bytes on a command line doubles it to 128000, which
/// still fits common 128KB argument limits with room to spare.
pub const DEFAULT_MAX_NODE_SIZE: usize = 64_000;

/// Settings of a ledger directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Account that owns the name-auction registry.
    pub system_account: Name,
    /// Largest accepted node payload in bytes. 0 disables the check.
    pub max_node_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            system_account: DEFAULT_SYSTEM_ACCOUNT,
            max_node_size: DEFAULT_MAX_NODE_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Parse a config file. Missing optional keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::invalid_argument(format!(
                    "Malformed config line: {}",
                    line
                )));
            };
            let value = value.trim();

            match key.trim() {
                "version" => version = Some(value.to_string()),
                "system" => config.system_account = Name::parse(value)?,
                "max_node_size" => {
                    config.max_node_size = value.parse().map_err(|_| {
                        Error::invalid_argument(format!("Invalid max_node_size: {}", value))
                    })?;
                }
                _ => {}
            }
        }

        if version.as_deref() != Some(CONFIG_VERSION) {
            return Err(Error::invalid_argument(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        if config.system_account.is_empty() {
            return Err(Error::invalid_argument("system account cannot be empty"));
        }

        Ok(config)
    }

    /// Render the config file contents.
    pub fn render(&self) -> String {
        format!(
            "version={}\nsystem={}\nmax_node_size={}\n",
            CONFIG_VERSION, self.system_account, self.max_node_size
        )
    }

    /// Check a node payload against the size cap.
    pub fn check_node_size(&self, size: usize) -> Result<()> {
        if self.max_node_size > 0 && size > self.max_node_size {
            return Err(Error::node_too_large(size, self.max_node_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = LedgerConfig::parse("version=1\nsystem=eosio\nmax_node_size=1024\n").unwrap();
        assert_eq!(config.system_account, Name::parse("eosio").unwrap());
        assert_eq!(config.max_node_size, 1024);
    }

    #[test]
    fn test_parse_config_defaults_and_comments() {
        let config = LedgerConfig::parse("# Comment\nversion=1\n# Another comment\n").unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_parse_config_invalid() {
        assert!(LedgerConfig::parse("version=99\n").is_err());
        assert!(LedgerConfig::parse("system=eosio\n").is_err());
        assert!(LedgerConfig::parse("version=1\nsystem=EOSIO\n").is_err());
        assert!(LedgerConfig::parse("version=1\nmax_node_size=lots\n").is_err());
        assert!(LedgerConfig::parse("version=1\nnonsense\n").is_err());
    }

    #[test]
    fn test_render_roundtrip() {
        let config = LedgerConfig {
            system_account: Name::parse("sys.names").unwrap(),
            max_node_size: 0,
        };
        assert_eq!(LedgerConfig::parse(&config.render()).unwrap(), config);
    }

    #[test]
    fn test_check_node_size() {
        let config = LedgerConfig {
            max_node_size: 4,
            ..LedgerConfig::default()
        };
        assert!(config.check_node_size(4).is_ok());
        assert!(matches!(
            config.check_node_size(5),
            Err(Error::NodeTooLarge { size: 5, limit: 4 })
        ));

        let unlimited = LedgerConfig {
            max_node_size: 0,
            ..LedgerConfig::default()
        };
        assert!(unlimited.check_node_size(10_000_000).is_ok());
    }
}
