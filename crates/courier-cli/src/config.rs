//! Courier CLI Configuration Management
//!
//! Configuration is read from a TOML file when one is given and falls back to defaults
//! otherwise. Missing sections and keys take their default values.

use std::path::Path;

use courier_core::DeliveryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the courier CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Delivery engine configuration
    pub delivery: DeliveryConfig,
    /// CLI-specific configuration
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Recipient used by `demo` when none is given on the command line
    pub demo_recipient: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            demo_recipient: "alice".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.delivery.validate()?;
        if self.cli.demo_recipient.trim().is_empty() {
            return Err(CliError::Config(
                "cli.demo_recipient must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
