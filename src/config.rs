use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ArenaConfig, Screen};

/// Grid and rules for one arena session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub screen: Screen,
    pub config: ArenaConfig,
}

impl ArenaSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// `ARENA_SETTINGS_PATH` first, then `ARENA_WIDTH` / `ARENA_HEIGHT` on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var("ARENA_SETTINGS_PATH") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        if let Some(width) = parse_env_i32("ARENA_WIDTH")? {
            settings.screen.width = width;
        }
        if let Some(height) = parse_env_i32("ARENA_HEIGHT")? {
            settings.screen.height = height;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen.width < 1 || self.screen.height < 1 {
            return Err(ConfigError::Invalid(format!(
                "screen must be at least 1x1, got {}x{}",
                self.screen.width, self.screen.height
            )));
        }
        let config = &self.config;
        if config.max_collision_distance < 0
            || config.loss_on_collision < 0
            || config.initial_score < 0
        {
            return Err(ConfigError::Invalid(
                "collision distance, loss and initial score must be non-negative".to_string(),
            ));
        }
        if config.auto_drop_fruit_value < 1 {
            return Err(ConfigError::Invalid(format!(
                "autoDropFruitValue must be at least 1, got {}",
                config.auto_drop_fruit_value
            )));
        }
        Ok(())
    }
}

fn parse_env_i32(name: &str) -> Result<Option<i32>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} is not an integer: {raw}"))),
        Err(_) => Ok(None),
    }
}
