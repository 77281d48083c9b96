use crate::{batch::BatchConfig, types::Chain};
use std::{collections::HashMap, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKENS_FILE: &str = "tokens.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable `{var}` has invalid value `{value}`: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    rpc_urls: HashMap<Chain, String>,
    batch: BatchConfig,
    batch_size: Option<usize>,
    batch_sizes: HashMap<Chain, usize>,
    fallback_concurrency: usize,
    tokens_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_urls: HashMap::new(),
            batch: BatchConfig {
                call_timeout_ms: DEFAULT_RPC_TIMEOUT_SECS * 1000,
                ..Default::default()
            },
            batch_size: None,
            batch_sizes: HashMap::new(),
            fallback_concurrency: 1,
            tokens_file: DEFAULT_TOKENS_FILE.into(),
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var: var.to_string(),
                value,
                reason: e.to_string(),
            }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from any variable source; unset variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for chain in Chain::all() {
            if let Some(url) = lookup(chain.spec().rpc_env).filter(|url| !url.trim().is_empty()) {
                config.rpc_urls.insert(*chain, url.trim().to_string());
            }

            if let Some(size) = parse::<usize>(&lookup, &format!("{chain}_BATCH_SIZE"))? {
                config.batch_sizes.insert(*chain, size);
            }
        }

        config.batch_size = parse(&lookup, "BATCH_SIZE")?;
        if let Some(delay) = parse(&lookup, "BATCH_DELAY_MS")? {
            config.batch.delay_ms = delay;
        }
        if let Some(retries) = parse(&lookup, "BATCH_MAX_RETRIES")? {
            config.batch.max_retries = retries;
        }
        if let Some(secs) = parse::<u64>(&lookup, "RPC_TIMEOUT_SECS")? {
            config.batch.call_timeout_ms =
                secs.checked_mul(1000).ok_or_else(|| ConfigError::Invalid {
                    var: "RPC_TIMEOUT_SECS".into(),
                    value: secs.to_string(),
                    reason: "timeout too large".into(),
                })?;
        }
        if let Some(concurrency) = parse::<usize>(&lookup, "FALLBACK_CONCURRENCY")? {
            config.fallback_concurrency = concurrency.max(1);
        }
        if let Some(path) = lookup("TOKENS_FILE") {
            config.tokens_file = path.into();
        }

        Ok(config)
    }

    pub fn with_rpc_url(mut self, chain: Chain, url: impl Into<String>) -> Self {
        self.rpc_urls.insert(chain, url.into());
        self
    }

    /// The configured endpoint, or the public default from the chain table.
    pub fn rpc_url(&self, chain: Chain) -> &str {
        self.rpc_urls
            .get(&chain)
            .map(String::as_str)
            .unwrap_or(chain.spec().default_rpc)
    }

    /// Batch settings for `chain`. A `{CHAIN}_BATCH_SIZE` override wins over
    /// `BATCH_SIZE`, which wins over the chain table.
    pub fn batch_config(&self, chain: Chain) -> BatchConfig {
        BatchConfig {
            batch_size: self
                .batch_sizes
                .get(&chain)
                .copied()
                .or(self.batch_size)
                .unwrap_or(chain.spec().batch_size),
            ..self.batch
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.batch.call_timeout()
    }

    pub fn fallback_concurrency(&self) -> usize {
        self.fallback_concurrency
    }

    pub fn tokens_file(&self) -> &PathBuf {
        &self.tokens_file
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.rpc_url(Chain::Vitruveo), Chain::Vitruveo.spec().default_rpc);
        assert_eq!(config.batch_config(Chain::Ethereum).batch_size, 30);
        assert_eq!(config.batch_config(Chain::Vitruveo).batch_size, 20);
        assert_eq!(config.batch_config(Chain::Solana).batch_size, 10);
        assert_eq!(config.batch_config(Chain::Ethereum).delay_ms, 30);
        assert_eq!(config.batch_config(Chain::Ethereum).max_retries, 10);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(30));
        assert_eq!(config.fallback_concurrency(), 1);
        assert_eq!(config.tokens_file(), &PathBuf::from("tokens.json"));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("VITRUVEO_RPC", "http://localhost:8545"),
            ("BATCH_SIZE", "50"),
            ("POLYGON_BATCH_SIZE", "12"),
            ("BATCH_DELAY_MS", "100"),
            ("BATCH_MAX_RETRIES", "4"),
            ("RPC_TIMEOUT_SECS", "5"),
            ("FALLBACK_CONCURRENCY", "0"),
            ("TOKENS_FILE", "/etc/vault/tokens.json"),
        ])
        .unwrap();

        assert_eq!(config.rpc_url(Chain::Vitruveo), "http://localhost:8545");
        assert_eq!(config.batch_config(Chain::Vitruveo).batch_size, 50);
        assert_eq!(
            config.batch_config(Chain::Polygon),
            BatchConfig {
                batch_size: 12,
                delay_ms: 100,
                max_retries: 4,
                call_timeout_ms: 5_000,
            }
        );
        assert_eq!(config.fallback_concurrency(), 1);
        assert_eq!(config.tokens_file(), &PathBuf::from("/etc/vault/tokens.json"));
    }

    #[test]
    fn invalid_numbers_are_errors() {
        assert!(matches!(
            config(&[("BATCH_MAX_RETRIES", "lots")]),
            Err(ConfigError::Invalid { var, .. }) if var == "BATCH_MAX_RETRIES"
        ));
        assert!(config(&[("BASE_BATCH_SIZE", "-1")]).is_err());
    }

    #[test]
    fn oversized_timeouts_are_errors() {
        assert!(matches!(
            config(&[("RPC_TIMEOUT_SECS", "18446744073709551615")]),
            Err(ConfigError::Invalid { var, .. }) if var == "RPC_TIMEOUT_SECS"
        ));
        assert_eq!(
            config(&[("RPC_TIMEOUT_SECS", "18446744073709551")])
                .unwrap()
                .rpc_timeout(),
            Duration::from_millis(18_446_744_073_709_551_000)
        );
    }
}
