//! Engine configuration.

use chrono::Duration;
use nerkh_common::{constants, supported_currencies, CurrencyCode, SourceFamily};

use crate::error::ConfigError;

/// Configuration for the resolution engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache lifetime of black-market quotes.
    pub black_market_ttl: Duration,
    /// Cache lifetime of general API quotes.
    pub general_ttl: Duration,
    /// Longest a request waits on one upstream fetch.
    pub fetch_timeout: Duration,
    /// Budget of each source inside a fallback chain. Kept below
    /// `fetch_timeout` so a hung source leaves time for the next one.
    pub provider_timeout: Duration,
    /// Intermediate currencies for IRT bridge conversions, in order.
    pub bridge_currencies: Vec<CurrencyCode>,
    /// Serve expired cached quotes when every live step fails.
    pub allow_stale: bool,
    /// Currencies accepted in requests, in display order.
    pub supported: Vec<CurrencyCode>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            black_market_ttl: constants::black_market_ttl(),
            general_ttl: constants::general_ttl(),
            fetch_timeout: constants::fetch_timeout(),
            provider_timeout: constants::provider_timeout(),
            bridge_currencies: vec![CurrencyCode::eur(), CurrencyCode::usd()],
            allow_stale: true,
            supported: supported_currencies(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = seconds(&lookup, "NERKH_BLACK_MARKET_TTL_SECS")? {
            config.black_market_ttl = secs;
        }

        if let Some(secs) = seconds(&lookup, "NERKH_GENERAL_TTL_SECS")? {
            config.general_ttl = secs;
        }

        if let Some(secs) = seconds(&lookup, "NERKH_FETCH_TIMEOUT_SECS")? {
            config.fetch_timeout = secs;
        }

        if let Some(secs) = seconds(&lookup, "NERKH_PROVIDER_TIMEOUT_SECS")? {
            config.provider_timeout = secs;
        }

        if let Some(list) = lookup("NERKH_BRIDGES") {
            config.bridge_currencies = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    CurrencyCode::new(s).map_err(|_| ConfigError::InvalidEnv {
                        name: "NERKH_BRIDGES",
                        value: list.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(flag) = lookup("NERKH_ALLOW_STALE") {
            config.allow_stale = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: "NERKH_ALLOW_STALE",
                        value: flag,
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.black_market_ttl <= Duration::zero() {
            return Err(ConfigError::ZeroDuration("black_market_ttl"));
        }

        if self.general_ttl <= Duration::zero() {
            return Err(ConfigError::ZeroDuration("general_ttl"));
        }

        if self.fetch_timeout <= Duration::zero() {
            return Err(ConfigError::ZeroDuration("fetch_timeout"));
        }

        if self.provider_timeout <= Duration::zero() {
            return Err(ConfigError::ZeroDuration("provider_timeout"));
        }

        if self.provider_timeout >= self.fetch_timeout {
            return Err(ConfigError::ProviderTimeoutTooLong);
        }

        if self.bridge_currencies.is_empty() {
            return Err(ConfigError::NoBridges);
        }

        if let Some(irt) = self.bridge_currencies.iter().find(|c| c.is_irt()) {
            return Err(ConfigError::InvalidBridge(irt.to_string()));
        }

        if self.supported.is_empty() {
            return Err(ConfigError::NoSupportedCurrencies);
        }

        Ok(())
    }

    /// Cache lifetime for a source family.
    pub fn ttl_for(&self, family: SourceFamily) -> Duration {
        match family {
            SourceFamily::BlackMarket => self.black_market_ttl,
            SourceFamily::General => self.general_ttl,
        }
    }
}

fn seconds<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(Duration::try_seconds)
            .map(Some)
            .ok_or(ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.bridge_currencies,
            vec![CurrencyCode::eur(), CurrencyCode::usd()]
        );
        assert!(config.ttl_for(SourceFamily::BlackMarket) < config.ttl_for(SourceFamily::General));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("NERKH_FETCH_TIMEOUT_SECS", "5"),
            ("NERKH_BRIDGES", "usd, eur"),
            ("NERKH_ALLOW_STALE", "false"),
        ]))
        .unwrap();

        assert_eq!(config.fetch_timeout, Duration::seconds(5));
        assert_eq!(
            config.bridge_currencies,
            vec![CurrencyCode::usd(), CurrencyCode::eur()]
        );
        assert!(!config.allow_stale);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("NERKH_GENERAL_TTL_SECS", "soon")])),
            Err(ConfigError::InvalidEnv { .. })
        ));
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[("NERKH_FETCH_TIMEOUT_SECS", "0")])).unwrap_err(),
            ConfigError::ZeroDuration("fetch_timeout")
        );
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[("NERKH_BRIDGES", "EUR,IRT")])).unwrap_err(),
            ConfigError::InvalidBridge("IRT".into())
        );

        let mut config = EngineConfig::default();
        config.bridge_currencies.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoBridges));
    }

    #[test]
    fn test_provider_budget_below_fetch_timeout() {
        let config =
            EngineConfig::from_lookup(lookup(&[("NERKH_PROVIDER_TIMEOUT_SECS", "2")])).unwrap();
        assert_eq!(config.provider_timeout, Duration::seconds(2));
        assert!(EngineConfig::default().provider_timeout < EngineConfig::default().fetch_timeout);

        assert_eq!(
            EngineConfig::from_lookup(lookup(&[
                ("NERKH_FETCH_TIMEOUT_SECS", "3"),
                ("NERKH_PROVIDER_TIMEOUT_SECS", "3"),
            ]))
            .unwrap_err(),
            ConfigError::ProviderTimeoutTooLong
        );
    }
}
