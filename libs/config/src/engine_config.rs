//! Engine Configuration Module
//!
//! Provides configuration loading for the Ballast engines.
//! Supports loading from TOML files with environment-specific overrides and
//! `BALLAST__`-prefixed environment variables.

use crate::protocol;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::{parse_address, Roles};

/// Main engine configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EngineConfig {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// Privileged accounts shared by every engine
    #[serde(default)]
    pub roles: RoleConfig,

    /// Share vault parameters
    #[serde(default)]
    pub vault: VaultSettings,

    /// StableSwap pools by name
    #[serde(default)]
    pub pools: BTreeMap<String, PoolSettings>,

    /// Vote-escrow and gauge voting parameters
    #[serde(default)]
    pub voting: VotingSettings,
}

/// Global configuration settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlobalConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Role addresses as hex strings; `${VAR}` references are expanded
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoleConfig {
    pub owner: String,
    pub admin: String,
    pub treasury: String,
    pub operator: String,
}

/// Vault fee parameters (basis points, seconds)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VaultSettings {
    pub performance_fee: u64,
    pub call_fee: u64,
    pub withdraw_fee: u64,
    pub withdraw_fee_period: u64,
}

/// Parameters of one StableSwap pool
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Token decimals per coin; the length sets the coin count
    pub coin_decimals: Vec<u32>,
    /// Index of the coin paid in the native asset, if any
    #[serde(default)]
    pub native_coin: Option<usize>,
    /// Amplification coefficient
    pub a: u64,
    /// Trading fee, 1e10 precision
    pub fee: u64,
    /// Share of fees kept as admin fees, 1e10 precision
    pub admin_fee: u64,
}

/// Gauge type created at startup
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GaugeTypeSettings {
    pub name: String,
    pub weight: u64,
}

/// Gauge controller parameters (seconds)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VotingSettings {
    pub weight_vote_delay: u64,
    pub admin_only_period: u64,
    pub gauge_types: Vec<GaugeTypeSettings>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        let zero = format!("0x{}", "0".repeat(40));
        Self {
            owner: zero.clone(),
            admin: zero.clone(),
            treasury: zero.clone(),
            operator: zero,
        }
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            performance_fee: protocol::vault::DEFAULT_PERFORMANCE_FEE,
            call_fee: protocol::vault::DEFAULT_CALL_FEE,
            withdraw_fee: protocol::vault::DEFAULT_WITHDRAW_FEE,
            withdraw_fee_period: protocol::vault::DEFAULT_WITHDRAW_FEE_PERIOD,
        }
    }
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self {
            weight_vote_delay: protocol::gauge::DEFAULT_WEIGHT_VOTE_DELAY,
            admin_only_period: protocol::gauge::DEFAULT_ADMIN_ONLY_PERIOD,
            gauge_types: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new("config/ballast.toml"));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("config"))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (BALLAST__ prefix)
        builder = builder.add_source(
            Environment::with_prefix("BALLAST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Expand environment variables in role addresses
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let roles = &mut self.roles;
        for (name, value) in [
            ("owner", &mut roles.owner),
            ("admin", &mut roles.admin),
            ("treasury", &mut roles.treasury),
            ("operator", &mut roles.operator),
        ] {
            let expanded = shellexpand::env(value.as_str())
                .with_context(|| format!("Failed to expand {} address", name))?
                .to_string();
            *value = expanded;
        }
        Ok(())
    }

    /// Parse role addresses
    pub fn resolve_roles(&self) -> Result<Roles> {
        let parse = |name: &str, value: &str| {
            parse_address(value).with_context(|| format!("Invalid {} address", name))
        };
        Ok(Roles {
            owner: parse("owner", &self.roles.owner)?,
            admin: parse("admin", &self.roles.admin)?,
            treasury: parse("treasury", &self.roles.treasury)?,
            operator: parse("operator", &self.roles.operator)?,
        })
    }

    /// Check every parameter against the protocol caps
    pub fn validate(&self) -> Result<()> {
        use protocol::{stableswap, vault};

        let v = &self.vault;
        if v.performance_fee > vault::MAX_PERFORMANCE_FEE {
            bail!("vault.performance_fee {} exceeds {}", v.performance_fee, vault::MAX_PERFORMANCE_FEE);
        }
        if v.call_fee > vault::MAX_CALL_FEE {
            bail!("vault.call_fee {} exceeds {}", v.call_fee, vault::MAX_CALL_FEE);
        }
        if v.withdraw_fee > vault::MAX_WITHDRAW_FEE {
            bail!("vault.withdraw_fee {} exceeds {}", v.withdraw_fee, vault::MAX_WITHDRAW_FEE);
        }
        if v.withdraw_fee_period > vault::MAX_WITHDRAW_FEE_PERIOD {
            bail!(
                "vault.withdraw_fee_period {} exceeds {}",
                v.withdraw_fee_period,
                vault::MAX_WITHDRAW_FEE_PERIOD
            );
        }

        for (name, pool) in &self.pools {
            let n = pool.coin_decimals.len();
            if !(stableswap::MIN_COINS..=stableswap::MAX_COINS).contains(&n) {
                bail!("pool {}: {} coins, expected 2 or 3", name, n);
            }
            if let Some(d) = pool
                .coin_decimals
                .iter()
                .find(|d| **d > stableswap::PRECISION_DECIMALS)
            {
                bail!("pool {}: {} decimals exceeds 18", name, d);
            }
            if matches!(pool.native_coin, Some(i) if i >= n) {
                bail!("pool {}: native coin index out of range", name);
            }
            if pool.a == 0 || pool.a >= stableswap::MAX_A {
                bail!("pool {}: A must be in 1..{}", name, stableswap::MAX_A);
            }
            if pool.fee > stableswap::MAX_FEE {
                bail!("pool {}: fee {} exceeds {}", name, pool.fee, stableswap::MAX_FEE);
            }
            if pool.admin_fee > stableswap::MAX_ADMIN_FEE {
                bail!("pool {}: admin fee {} exceeds {}", name, pool.admin_fee, stableswap::MAX_ADMIN_FEE);
            }
        }

        if self.voting.weight_vote_delay < protocol::escrow::WEEK {
            bail!("voting.weight_vote_delay must be at least one week");
        }
        if self.voting.admin_only_period >= protocol::escrow::WEEK {
            bail!("voting.admin_only_period must be shorter than one week");
        }

        debug!("Configuration validated: {} pools", self.pools.len());
        Ok(())
    }

    /// Render the effective configuration, overlays and expansions applied
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Get settings for a specific pool
    pub fn get_pool(&self, name: &str) -> Option<&PoolSettings> {
        self.pools.get(name)
    }
}

/// Convenience function: load, expand and validate
pub fn load_config(path: Option<&Path>, environment: Option<&str>) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(path, environment)?;
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}

/// Default location of the environment overlay directory for a base file
pub fn environments_dir(base: &Path) -> PathBuf {
    base.parent().unwrap_or(Path::new("config")).join("environments")
}
