//! REPL configuration loaded from TOML.

use std::path::Path;

use serde::Deserialize;

use crate::error::{IncantError, Result};

/// Settings for an interactive session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Prompt text; a single space is appended when rendered.
    pub prompt: String,
    /// Line-editor history entries to retain.
    pub history_size: usize,
    /// End-of-input terminates a looping session. When false, a notice is
    /// printed and the prompt is issued again.
    pub exit_on_eof: bool,
    /// Default `env_logger` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Terminal width for columnised output such as the `help` command list.
    pub columns: usize,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: ">>>".to_string(),
            history_size: 100,
            exit_on_eof: true,
            log_filter: "warn".to_string(),
            columns: 80,
        }
    }
}

impl ReplConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)
            .map_err(|e| IncantError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// The prompt as shown to the user.
    pub fn rendered_prompt(&self) -> String {
        format!("{} ", self.prompt)
    }

    fn validate(&self) -> Result<()> {
        if self.prompt.contains('\n') {
            return Err(IncantError::Config(
                "prompt must fit on one line".to_string(),
            ));
        }
        if self.columns == 0 {
            return Err(IncantError::Config("columns must be positive".to_string()));
        }
        Ok(())
    }
}
