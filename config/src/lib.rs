// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_DAILY_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub psql_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Run a review mutation and the average recompute in one transaction
    pub recompute_in_transaction: bool,
    pub recompute_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recompute_in_transaction: true,
            recompute_chunk_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimiterConfig {
    /// Used when the settings table has no daily limit row
    pub fallback_daily_limit: u32,
    pub count_admin_creations: bool,
    pub increment_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            fallback_daily_limit: DEFAULT_DAILY_LIMIT,
            count_admin_creations: true,
            increment_retries: 3,
            retry_backoff_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Empty when the file has no `[databases]` table
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,
    pub engine: EngineConfig,
    pub limiter: LimiterConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert(
            "flashcards".to_string(),
            DatabaseConfig {
                psql_url: "postgres://postgres:@localhost/flashcards".into(),
            },
        );

        Self {
            databases,
            engine: EngineConfig::default(),
            limiter: LimiterConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let parsed: Self = toml::from_str(&contents)?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Error;
    use common_macros::hash_map;

    #[test]
    fn load_example_config() -> Result<(), Error> {
        let expected = Config {
            databases: hash_map! {
                "flashcards".to_string() => DatabaseConfig {
                    psql_url: "postgres://postgres:@localhost/flashcards".into(),
                },
            },
            engine: EngineConfig {
                recompute_in_transaction: true,
                recompute_chunk_size: 500,
            },
            limiter: LimiterConfig {
                fallback_daily_limit: 20,
                count_admin_creations: true,
                increment_retries: 5,
                retry_backoff_ms: 25,
            },
            log: LogConfig {
                level: "debug".into(),
            },
        };

        let loaded = Config::load("example.toml")?;
        assert_eq!(expected, loaded);

        Ok(())
    }

    #[test]
    fn missing_sections_use_defaults() -> Result<(), Error> {
        let parsed: Config = toml::from_str("[limiter]\nfallback_daily_limit = 5\n")?;

        assert_eq!(parsed.limiter.fallback_daily_limit, 5);
        assert_eq!(parsed.limiter.increment_retries, 3);
        assert_eq!(parsed.engine, EngineConfig::default());
        assert!(parsed.databases.is_empty());

        Ok(())
    }

    #[test]
    fn databases_are_only_the_listed_ones() -> Result<(), Error> {
        let parsed: Config =
            toml::from_str("[databases.staging]\npsql_url = \"postgres://staging/flashcards\"\n")?;

        assert_eq!(parsed.databases.len(), 1);
        assert!(parsed.databases.contains_key("staging"));
        assert_eq!(parsed.limiter, LimiterConfig::default());

        Ok(())
    }

    #[test]
    fn default_points_to_local_database() {
        let cfg = Config::default();

        assert_eq!(cfg.limiter.fallback_daily_limit, DEFAULT_DAILY_LIMIT);
        assert!(cfg.databases.contains_key("flashcards"));
    }
}
