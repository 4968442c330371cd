use crate::{
    catalog::{Catalog, Framework, Playbook},
    types::Lag,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 2025-01-01T00:00:00Z
const DEFAULT_ORIGIN_SECS: i64 = 1_735_689_600;

pub const DEFAULT_CAMPAIGNS: [&str; 5] = [
    "March Subscription",
    "Installment 3/6",
    "Annual Plan",
    "Summer Promo",
    "Q1 Upsell",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterConfig {
    pub initial_size: usize,
    /// Initial lags are drawn from [initial_lag_min, initial_lag_max).
    pub initial_lag_min: Lag,
    pub initial_lag_max: Lag,
    pub ticket_months: u32,
    pub campaigns: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            initial_size: 30,
            initial_lag_min: -20,
            initial_lag_max: 20,
            ticket_months: 6,
            campaigns: DEFAULT_CAMPAIGNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MovementConfig {
    /// A roll strictly above this advances the customer one day.
    pub advance_threshold: f64,
    /// A roll strictly below this pays, when the customer is due or overdue.
    pub payment_threshold: f64,
    /// Lag a paying customer restarts its cycle at.
    pub reset_lag: Lag,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            advance_threshold: 0.85,
            payment_threshold: 0.05,
            reset_lag: -30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockConfig {
    pub tick_interval_ms: u64,
    /// Simulated date of tick 0.
    #[serde(default = "default_origin")]
    pub origin: DateTime<Utc>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            origin: default_origin(),
        }
    }
}

fn default_origin() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_ORIGIN_SECS, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Maximum paid snapshots kept per session. `None` keeps everything.
    #[serde(default)]
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(skip)]
    pub catalog: Catalog,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    frameworks: Vec<Framework>,
    #[serde(default)]
    playbooks: Vec<Playbook>,
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/sim.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        // The catalog file is optional; fall back to the seeded catalog.
        let catalog_path = format!("{data_dir}/catalog.json");
        config.catalog = if Path::new(&catalog_path).exists() {
            let catalog_content = std::fs::read_to_string(&catalog_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
            let file: CatalogFile = serde_json::from_str(&catalog_content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {catalog_path}: {e}"))?;
            Catalog::from_parts(file.frameworks, file.playbooks)?
        } else {
            log::warn!("{catalog_path} not found, using the seeded catalog");
            Catalog::seeded(config.clock.origin)
        };

        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let clock = ClockConfig {
            tick_interval_ms: 0,
            origin: default_origin(),
        };
        Self {
            roster: RosterConfig {
                initial_size: 50,
                ..RosterConfig::default()
            },
            movement: MovementConfig::default(),
            catalog: Catalog::seeded(clock.origin),
            clock,
            ledger: LedgerConfig::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.movement;
        if !(0.0..=1.0).contains(&m.advance_threshold)
            || !(0.0..=1.0).contains(&m.payment_threshold)
        {
            anyhow::bail!("movement thresholds must lie in [0, 1]");
        }
        if self.roster.campaigns.is_empty() {
            anyhow::bail!("roster.campaigns must not be empty");
        }
        if self.roster.initial_lag_max < self.roster.initial_lag_min {
            anyhow::bail!("roster initial lag range is inverted");
        }
        Ok(())
    }
}
