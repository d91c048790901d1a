use serde::Deserialize;
use skyfare_catalog::{DemandWeights, PricingConfig, SeedConfig};
use skyfare_core::BookingRules;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub booking: BookingRules,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Without a `url` the service runs on the in-memory ledger.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_seconds: 3,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    /// Chance that a flight's demand level is re-sampled on each pass.
    pub shift_probability: f64,
    pub weights: DemandWeights,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            shift_probability: 0.1,
            weights: DemandWeights::default(),
        }
    }
}

impl MarketConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PaymentConfig {
    /// Share of charges the simulated provider approves.
    pub approval_rate: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            approval_rate: 0.95,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Layers `{dir}/default`, `{dir}/{RUN_MODE}`, `{dir}/local`, then `SKYFARE__*`
    /// environment variables, and validates the result.
    pub fn load_from(dir: &str) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", dir)))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            // Eg. `SKYFARE__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("SKYFARE").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.booking.validate().map_err(config::ConfigError::Message)?;
        self.pricing
            .validate()
            .map_err(|e| config::ConfigError::Message(format!("pricing: {}", e)))?;
        if !(0.0..=1.0).contains(&self.market.shift_probability) {
            return Err(config::ConfigError::Message(
                "market.shift_probability must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.payment.approval_rate) {
            return Err(config::ConfigError::Message(
                "payment.approval_rate must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("skyfare-config-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("default.toml"), body).unwrap();
        dir
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let dir = write_config("minimal", "[server]\nport = 8080\n");
        let config = Config::load_from(dir.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.database.url.is_none());
        assert!(config.booking.reprice_on_cancel);
        assert_eq!(config.pricing, PricingConfig::default());
        assert_eq!(config.market.shift_probability, 0.1);
    }

    #[test]
    fn test_file_overrides_sections() {
        let dir = write_config(
            "overrides",
            r#"
[server]
port = 9090

[booking]
lock_timeout_ms = 250
reprice_on_cancel = false

[booking.pnr]
primary_attempts = 3

[pricing]
max_multiplier = 2.5

[market]
interval_seconds = 5
"#,
        );
        let config = Config::load_from(dir.to_str().unwrap()).unwrap();

        assert_eq!(config.booking.lock_timeout_ms, 250);
        assert!(!config.booking.reprice_on_cancel);
        assert_eq!(config.booking.pnr.primary_attempts, 3);
        assert_eq!(config.booking.pnr.primary_length, 6);
        assert_eq!(config.pricing.max_multiplier, 2.5);
        assert_eq!(config.pricing.seat_weight, 0.4);
        assert_eq!(config.market.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = write_config(
            "invalid",
            "[server]\nport = 8080\n\n[payment]\napproval_rate = 1.5\n",
        );
        assert!(Config::load_from(dir.to_str().unwrap()).is_err());
    }
}
