//! Lab configuration
//!
//! All fields default to the classic three-column layout: twenty symbols per
//! column, rotation every four actions in Chaos mode, and "Guest" as the
//! participant placeholder.

use serde::{Deserialize, Serialize};

use crate::error::LabError;
use crate::types::Category;

/// Default number of symbols expected per column and per category
pub const DEFAULT_TARGET_COUNT: usize = 20;

/// Default number of actions before Chaos mode rotates to the next column
pub const DEFAULT_CHAOS_ROTATION: usize = 4;

/// Placeholder used when a participant leaves the name blank
pub const DEFAULT_PARTICIPANT: &str = "Guest";

const MIN_COLUMNS: usize = 2;
const MAX_COLUMNS: usize = 3;

/// Letters run A..Z, so the target cannot exceed the alphabet
const MAX_TARGET_COUNT: usize = 26;

static COLUMN_CATEGORIES: [Category; MAX_COLUMNS] = Category::ALL;

/// Lab layout and scoring parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConfig {
    /// Number of physical columns (2 or 3)
    #[serde(default = "default_column_count")]
    pub column_count: usize,
    /// Symbols expected per column and per category
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    /// Actions per forced rotation in Chaos mode
    #[serde(default = "default_chaos_rotation")]
    pub chaos_rotation: usize,
    /// Name recorded when the participant name is blank
    #[serde(default = "default_participant")]
    pub default_participant: String,
}

fn default_column_count() -> usize {
    MAX_COLUMNS
}

fn default_target_count() -> usize {
    DEFAULT_TARGET_COUNT
}

fn default_chaos_rotation() -> usize {
    DEFAULT_CHAOS_ROTATION
}

fn default_participant() -> String {
    DEFAULT_PARTICIPANT.to_string()
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            column_count: default_column_count(),
            target_count: default_target_count(),
            chaos_rotation: default_chaos_rotation(),
            default_participant: default_participant(),
        }
    }
}

impl LabConfig {
    /// Two-column layout (Numbers and Letters only)
    pub fn two_column() -> Self {
        Self {
            column_count: MIN_COLUMNS,
            ..Self::default()
        }
    }

    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, LabError> {
        let config: LabConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a playable lab
    pub fn validate(&self) -> Result<(), LabError> {
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&self.column_count) {
            return Err(LabError::InvalidConfig(format!(
                "column_count must be between {} and {}, got {}",
                MIN_COLUMNS, MAX_COLUMNS, self.column_count
            )));
        }
        if self.target_count == 0 || self.target_count > MAX_TARGET_COUNT {
            return Err(LabError::InvalidConfig(format!(
                "target_count must be between 1 and {}, got {}",
                MAX_TARGET_COUNT, self.target_count
            )));
        }
        if self.chaos_rotation == 0 {
            return Err(LabError::InvalidConfig(
                "chaos_rotation must be at least 1".to_string(),
            ));
        }
        if self.default_participant.trim().is_empty() {
            return Err(LabError::InvalidConfig(
                "default_participant must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Categories audited under this layout, one per column
    pub fn categories(&self) -> &'static [Category] {
        &COLUMN_CATEGORIES[..self.column_count.min(MAX_COLUMNS)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LabConfig::default();
        assert_eq!(config.column_count, 3);
        assert_eq!(config.target_count, 20);
        assert_eq!(config.chaos_rotation, 4);
        assert_eq!(config.default_participant, "Guest");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = LabConfig::from_json(r#"{ "column_count": 2 }"#).unwrap();
        assert_eq!(config, LabConfig::two_column());
        assert_eq!(config.categories(), &[Category::Numbers, Category::Letters]);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert!(matches!(
            LabConfig::from_json(r#"{ "column_count": 4 }"#),
            Err(LabError::InvalidConfig(_))
        ));
        assert!(matches!(
            LabConfig::from_json(r#"{ "target_count": 27 }"#),
            Err(LabError::InvalidConfig(_))
        ));
        assert!(matches!(
            LabConfig::from_json(r#"{ "chaos_rotation": 0 }"#),
            Err(LabError::InvalidConfig(_))
        ));
        assert!(matches!(
            LabConfig::from_json("not json"),
            Err(LabError::Json(_))
        ));
    }
}
