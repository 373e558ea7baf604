use serde::Deserialize;
use std::{fs, path::PathBuf};

pub const DEFAULT_DAY_RATE: f64 = 1.5;
pub const DEFAULT_NIGHT_RATE: f64 = 0.9;
pub const DEFAULT_ROLLOVER_DAY: f64 = 100.0;
pub const DEFAULT_ROLLOVER_NIGHT: f64 = 80.0;

pub const DEFAULT_CONFIG_PATH: &str = "billing-config.toml";
pub const DEFAULT_DATA_FILE: &str = "counters_data.json";

/// Prices per unit for each band and the display maximum at which each band wraps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    pub day_rate: f64,
    pub night_rate: f64,
    pub rollover_day: f64,
    pub rollover_night: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            day_rate: DEFAULT_DAY_RATE,
            night_rate: DEFAULT_NIGHT_RATE,
            rollover_day: DEFAULT_ROLLOVER_DAY,
            rollover_night: DEFAULT_ROLLOVER_NIGHT,
        }
    }
}

impl TariffConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, rate) in [("day_rate", self.day_rate), ("night_rate", self.night_rate)] {
            if !rate.is_finite() || rate < 0.0 {
                anyhow::bail!("tariff.{name} must be a finite non-negative number, got {rate}");
            }
        }
        for (name, max) in [("rollover_day", self.rollover_day), ("rollover_night", self.rollover_night)] {
            if !max.is_finite() || max <= 0.0 {
                anyhow::bail!("tariff.{name} must be a finite positive number, got {max}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tariff: TariffConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `BILLING_CONFIG`, or `billing-config.toml` when that variable is unset.
    ///
    /// A missing default file means built-in defaults; a missing file that was
    /// named explicitly is an error.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let (path, explicit) = match env::var("BILLING_CONFIG") {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.tariff.validate()?;
        Ok(cfg)
    }
}
