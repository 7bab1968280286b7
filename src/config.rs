use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::caller::{DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS};
use crate::defs::MAXCARDS;
use crate::logging::{log_info, log_warning};

pub const DEFAULT_CONFIG_PATH: &str = "conf/bingo.conf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub cards: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cards: 1,
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Self::from_str_content(&content)
    }

    pub fn from_str_content(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config_map = parse_config(content)?;
        let defaults = Self::default();

        let cards = match config_map.get("cards") {
            Some(value) => value.parse::<usize>()?,
            None => defaults.cards,
        };

        let min_delay_ms = match config_map.get("min_delay_ms") {
            Some(value) => value.parse::<u64>()?,
            None => defaults.min_delay_ms,
        };

        let max_delay_ms = match config_map.get("max_delay_ms") {
            Some(value) => value.parse::<u64>()?,
            None => defaults.max_delay_ms,
        };

        let seed = match config_map.get("seed") {
            Some(value) => Some(value.parse::<u64>()?),
            None => defaults.seed,
        };

        let config = GameConfig { cards, min_delay_ms, max_delay_ms, seed };
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match Self::from_file(path) {
            Ok(config) => {
                log_info(&format!("Loaded configuration from {}", path.display()));
                config
            }
            Err(e) => {
                log_warning(&format!(
                    "Could not load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cards == 0 || self.cards > MAXCARDS {
            return Err(format!("cards must be between 1 and {MAXCARDS}, got {}", self.cards));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(format!(
                "min_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            ));
        }
        Ok(())
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

fn parse_config(content: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut config = HashMap::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse key = value pairs
        match line.split_once('=') {
            Some((key, value)) => {
                config.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => return Err(format!("line {}: expected key = value", index + 1).into()),
        }
    }

    Ok(config)
}
