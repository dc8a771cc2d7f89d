//! Engine configuration.
//!
//! The defaults reproduce the stock rules: every skill draws on the
//! `proficiencyBonus` attribute, and `carryMultiplier` is the one attribute
//! whose result is never floored.

use crate::error::StatError;
use crate::stat_id::fold;
use serde::{Deserialize, Serialize};

/// Tunables for an [`Engine`](crate::Engine).
///
/// # Examples
///
/// ```rust
/// use statsheet::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "unflooredAttributes": ["speedMultiplier"] }"#)
///     .unwrap();
/// assert_eq!(config.proficiency_bonus_attribute, "proficiencyBonus");
/// assert!(config.is_unfloored("SpeedMultiplier"));
/// assert!(!config.is_unfloored("carryMultiplier"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Attribute that every skill's proficiency multiplies.
    pub proficiency_bonus_attribute: String,
    /// Attributes whose combined result is not floored.
    pub unfloored_attributes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proficiency_bonus_attribute: "proficiencyBonus".to_string(),
            unfloored_attributes: vec!["carryMultiplier".to_string()],
        }
    }
}

impl EngineConfig {
    /// Read a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, StatError> {
        serde_json::from_str(json).map_err(|e| StatError::InvalidConfig(e.to_string()))
    }

    /// Whether the named attribute keeps its fractional part.
    pub fn is_unfloored(&self, attribute: &str) -> bool {
        let key = fold(attribute);
        self.unfloored_attributes.iter().any(|name| fold(name) == key)
    }
}
