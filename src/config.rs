//! Startup configuration: how large the per-frame buffers are.
//!
//! ```toml
//! texture_slots = 256
//!
//! [budget]
//! command_bytes = 65536
//! vertices = 60000
//! textured_vertices = 60000
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Fixed capacities of the per-frame buffers, chosen for the worst frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameBudget {
    /// Size of the command arena in bytes.
    pub command_bytes: usize,
    /// Capacity of the untextured vertex pool.
    pub vertices: usize,
    /// Capacity of the textured vertex pool.
    pub textured_vertices: usize,
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self {
            command_bytes: 64 * 1024,
            vertices: 60_000,
            textured_vertices: 60_000,
        }
    }
}

impl FrameBudget {
    /// Reject zero capacities and pools too large for `u32` vertex indices.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBudget`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_bytes == 0 {
            return Err(ConfigError::InvalidBudget(
                "command_bytes must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("vertices", self.vertices),
            ("textured_vertices", self.textured_vertices),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidBudget(format!(
                    "{name} must be greater than zero"
                )));
            }
            if u32::try_from(value).is_err() {
                return Err(ConfigError::InvalidBudget(format!(
                    "{name} = {value} exceeds the u32 vertex index range"
                )));
            }
        }
        Ok(())
    }
}

/// Renderer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Per-frame buffer capacities.
    pub budget: FrameBudget,
    /// Number of textures the backend can hold at once.
    pub texture_slots: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            budget: FrameBudget::default(),
            texture_slots: 256,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidBudget`] for out-of-range capacities.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// As [`from_toml_str`](Self::from_toml_str), plus [`ConfigError::Io`]
    /// if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded render config");
        Ok(config)
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBudget`] for the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.budget.validate()?;
        if self.texture_slots == 0 {
            return Err(ConfigError::InvalidBudget(
                "texture_slots must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
