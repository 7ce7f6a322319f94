use anyhow::{anyhow, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default number of seed nodes per retrieval
pub const DEFAULT_TOP_K: usize = 30;

/// Default number of expansion hops per retrieval
pub const DEFAULT_MAX_HOPS: usize = 2;

/// Default budget for the keyword augmentation call
pub const DEFAULT_AUGMENT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_GRAPH_DB: &str = "schemarag.db";
pub const DEFAULT_DATA_DB: &str = "data.db";

/// Per-call retrieval parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOptions {
    /// Maximum number of seed nodes, at least 1
    pub top_k: usize,
    /// Maximum number of expansion rounds; 0 returns the seeds alone
    pub max_hops: usize,
    /// Overall budget; expansion stops before the next hop once it is spent
    pub timeout: Option<Duration>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_hops: DEFAULT_MAX_HOPS,
            timeout: None,
        }
    }
}

impl RetrievalOptions {
    /// Apply per-request overrides on top of these defaults
    pub fn resolve(&self, top_k: Option<usize>, max_hops: Option<usize>) -> Self {
        Self {
            top_k: top_k.unwrap_or(self.top_k),
            max_hops: max_hops.unwrap_or(self.max_hops),
            timeout: self.timeout,
        }
    }
}

/// Application settings gathered from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file holding the schema graph
    pub graph_db: String,
    /// SQLite file the generated SQL runs against
    pub data_db: String,
    pub retrieval: RetrievalOptions,
    pub augment_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graph_db: DEFAULT_GRAPH_DB.to_string(),
            data_db: DEFAULT_DATA_DB.to_string(),
            retrieval: RetrievalOptions::default(),
            augment_timeout: DEFAULT_AUGMENT_TIMEOUT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_ms: Option<u64> = parse_var(&lookup, "SCHEMARAG_TIMEOUT_MS")?;
        let augment_ms: Option<u64> = parse_var(&lookup, "SCHEMARAG_AUGMENT_TIMEOUT_MS")?;

        let retrieval = RetrievalOptions {
            top_k: parse_var(&lookup, "SCHEMARAG_TOP_K")?.unwrap_or(defaults.retrieval.top_k),
            max_hops: parse_var(&lookup, "SCHEMARAG_MAX_HOPS")?
                .unwrap_or(defaults.retrieval.max_hops),
            timeout: timeout_ms.map(Duration::from_millis),
        };
        if retrieval.top_k == 0 {
            return Err(anyhow!("SCHEMARAG_TOP_K must be at least 1"));
        }

        Ok(Self {
            graph_db: lookup("SCHEMARAG_GRAPH_DB").unwrap_or(defaults.graph_db),
            data_db: lookup("SCHEMARAG_DATA_DB").unwrap_or(defaults.data_db),
            retrieval,
            augment_timeout: augment_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.augment_timeout),
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, key, e)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retrieval.top_k, 30);
        assert_eq!(config.retrieval.max_hops, 2);
        assert!(config.retrieval.timeout.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SCHEMARAG_GRAPH_DB", "/tmp/g.db"),
            ("SCHEMARAG_TOP_K", "5"),
            ("SCHEMARAG_MAX_HOPS", "0"),
            ("SCHEMARAG_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.graph_db, "/tmp/g.db");
        assert_eq!(config.data_db, DEFAULT_DATA_DB);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_hops, 0);
        assert_eq!(config.retrieval.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEMARAG_TOP_K", "many")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEMARAG_TOP_K", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEMARAG_MAX_HOPS", "-1")])).is_err());
    }

    #[test]
    fn test_resolve_overrides() {
        let defaults = RetrievalOptions::default();
        let resolved = defaults.resolve(Some(3), None);
        assert_eq!(resolved.top_k, 3);
        assert_eq!(resolved.max_hops, DEFAULT_MAX_HOPS);
    }
}
