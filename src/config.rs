use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::progression::ProgressionConfig;

const DEFAULT_DIFFICULTY: u32 = 1;
const MAX_DIFFICULTY: u32 = 10;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub progression: ProgressionConfig,
    pub quests: QuestConfig,
    pub logging: LoggingConfig,
    /// where quizzy.db lives, platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    pub default_difficulty: u32,
    pub max_difficulty: u32,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            default_difficulty: DEFAULT_DIFFICULTY,
            max_difficulty: MAX_DIFFICULTY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter, `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// config file path
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quizzy").join("config.toml"))
}

/// Load the user's config, defaults when there is no file.
pub fn load_config() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, path)
}

fn parse(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.progression;
        if p.base_level_xp == 0 || p.base_quest_xp == 0 || p.base_credits == 0 {
            return Err(ConfigError::Invalid("base amounts must be at least 1".to_string()));
        }
        // the level curve must strictly grow, rewards may stay flat
        if !p.level_growth.is_finite() || p.level_growth <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "level_growth must be > 1.0, got {}",
                p.level_growth
            )));
        }
        for (name, growth) in [
            ("quest_xp_growth", p.quest_xp_growth),
            ("credit_growth", p.credit_growth),
        ] {
            if !growth.is_finite() || growth < 1.0 {
                return Err(ConfigError::Invalid(format!("{} must be >= 1.0, got {}", name, growth)));
            }
        }
        let q = &self.quests;
        if q.max_difficulty == 0 || q.default_difficulty == 0 || q.default_difficulty > q.max_difficulty {
            return Err(ConfigError::Invalid(format!(
                "difficulty range 1..={} does not contain default {}",
                q.max_difficulty, q.default_difficulty
            )));
        }
        Ok(())
    }
}
