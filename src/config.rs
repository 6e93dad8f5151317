//! Process-wide configuration loaded once from the environment (§6's
//! Environment surface) and never mutated afterward (§9 "Global state").
//!
//! Follows the teacher's `rate_limit::RateLimitConfig::from_env()` shape:
//! read each `env::var`, parse, fall back to the documented default.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub log_level: String,
    pub max_message_bytes: usize,
    pub hot_messages_limit: usize,
    pub hot_atoms_limit: usize,
    pub seen_limit: usize,
    pub dedup_limit: usize,
    pub keepalive_interval_ms: u64,
    pub history_default_limit: i64,
    pub history_max_limit: i64,
    pub allowed_origins: Vec<String>,
    pub platform_domains: Vec<String>,
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            max_message_bytes: 8_000,
            hot_messages_limit: 500,
            hot_atoms_limit: 2_000,
            seen_limit: 2_000,
            dedup_limit: 5_000,
            keepalive_interval_ms: 15_000,
            history_default_limit: 50,
            history_max_limit: 200,
            allowed_origins: Vec::new(),
            platform_domains: vec!["ubl_core.internal".to_string()],
            database_path: "data/ubl_core.db".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = env::var("ENVIRONMENT") {
            config.environment = v;
        }
        if let Ok(v) = env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(n) = parse_env("MAX_MESSAGE_BYTES") {
            config.max_message_bytes = n;
        }
        if let Some(n) = parse_env("HOT_MESSAGES_LIMIT") {
            config.hot_messages_limit = n;
        }
        if let Some(n) = parse_env("HOT_ATOMS_LIMIT") {
            config.hot_atoms_limit = n;
        }
        if let Some(n) = parse_env("SEEN_LIMIT") {
            config.seen_limit = n;
        }
        if let Some(n) = parse_env("DEDUP_LIMIT") {
            config.dedup_limit = n;
        }
        if let Some(n) = parse_env("KEEPALIVE_INTERVAL_MS") {
            config.keepalive_interval_ms = n;
        }
        if let Ok(v) = env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = split_csv(&v);
        }
        if let Ok(v) = env::var("PLATFORM_DOMAINS") {
            config.platform_domains = split_csv(&v);
        }
        if let Ok(v) = env::var("DATABASE_PATH") {
            config.database_path = v;
        }

        config
    }

    pub fn is_platform_domain(&self, domain: &str) -> bool {
        self.platform_domains.iter().any(|d| d == domain)
    }

    pub fn clamp_history_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            None | Some(0) => self.history_default_limit,
            Some(n) if n < 0 => self.history_default_limit,
            Some(n) => n.min(self.history_max_limit),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_clamps_to_max() {
        let c = Config::default();
        assert_eq!(c.clamp_history_limit(Some(201)), 200);
    }

    #[test]
    fn history_limit_defaults_when_zero_or_absent() {
        let c = Config::default();
        assert_eq!(c.clamp_history_limit(None), 50);
        assert_eq!(c.clamp_history_limit(Some(0)), 50);
    }

    #[test]
    fn platform_domain_check() {
        let c = Config::default();
        assert!(c.is_platform_domain("ubl_core.internal"));
        assert!(!c.is_platform_domain("example.com"));
    }
}
