//! Run configuration loaded from a TOML file.
//!
//! ```toml
//! [settings]
//! nft_worker_url = "https://holders.example.workers.dev"
//! nft_collection_id = "my-collection"
//! rpc_url = "https://api.mainnet-beta.solana.com"
//! private_key = "<base58 secret key>"
//! total_usdc_amount = 100.0
//! min_usdc_amount = 0.5
//! dry_run = true
//! ```

use std::path::Path;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_TX_SLEEP_SECS, USDC_DECIMALS, USDC_MINT, USDC_SYMBOL,
};
use crate::error::{AirdropError, Result};
use crate::ops::{DispatchConfig, PlanParams};
use crate::utils::address::parse_pubkey;
use crate::utils::amount::units_to_base;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub nft_worker_url: String,
    pub nft_collection_id: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Query token accounts during a dry run.
    #[serde(default)]
    pub dry_run_account_check: bool,

    /// Base58 secret key of the sender.
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub rpc_url: String,

    pub total_usdc_amount: f64,
    pub min_usdc_amount: f64,

    /// Seconds between transfers.
    #[serde(default = "default_tx_sleep")]
    pub tx_sleep_time: f64,
    #[serde(default = "default_max_retries")]
    pub tx_max_retries: u32,

    #[serde(default)]
    pub address_mapping_file: String,

    /// 1.0 uses cut-the-line; below 1 gives larger variance, above 1 tends
    /// toward equal shares.
    #[serde(default = "default_alpha")]
    pub distribution_alpha: f64,
    /// Fixed seed for a reproducible plan.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_mint")]
    pub mint: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

fn default_true() -> bool {
    true
}

fn default_tx_sleep() -> f64 {
    DEFAULT_TX_SLEEP_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_alpha() -> f64 {
    1.0
}

fn default_mint() -> String {
    USDC_MINT.to_string()
}

fn default_decimals() -> u8 {
    USDC_DECIMALS
}

fn default_symbol() -> String {
    USDC_SYMBOL.to_string()
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AirdropError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| AirdropError::InvalidConfig(e.to_string()))?;
        file.settings.validate()?;
        Ok(file.settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.distribution_alpha.is_finite() || self.distribution_alpha <= 0.0 {
            return Err(AirdropError::InvalidConfig(format!(
                "distribution_alpha must be > 0, got {}",
                self.distribution_alpha
            )));
        }
        self.tx_delay()?;
        if self.tx_max_retries == 0 {
            return Err(AirdropError::InvalidConfig(
                "tx_max_retries must be at least 1".to_string(),
            ));
        }
        if self.total_budget()? == 0 {
            return Err(AirdropError::InvalidConfig(
                "total_usdc_amount must be positive".to_string(),
            ));
        }
        self.min_floor()?;
        self.mint_pubkey()?;
        Ok(())
    }

    pub fn total_budget(&self) -> Result<u64> {
        units_to_base(self.total_usdc_amount, self.decimals)
    }

    pub fn min_floor(&self) -> Result<u64> {
        units_to_base(self.min_usdc_amount, self.decimals)
    }

    pub fn mint_pubkey(&self) -> Result<Pubkey> {
        parse_pubkey(&self.mint)
    }

    pub fn plan_params(&self) -> Result<PlanParams> {
        Ok(PlanParams {
            total_budget: self.total_budget()?,
            min_floor: self.min_floor()?,
            alpha: self.distribution_alpha,
        })
    }

    /// `tx_sleep_time` as a duration; rejects negative, non-finite and
    /// out-of-range values.
    pub fn tx_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.tx_sleep_time).map_err(|e| {
            AirdropError::InvalidConfig(format!(
                "tx_sleep_time must be a non-negative number of seconds, got {}: {e}",
                self.tx_sleep_time
            ))
        })
    }

    pub fn dispatch_config(&self) -> Result<DispatchConfig> {
        Ok(DispatchConfig {
            max_retries: self.tx_max_retries,
            tx_delay: self.tx_delay()?,
            dry_run: self.dry_run,
            dry_run_account_check: self.dry_run_account_check,
            decimals: self.decimals,
            symbol: self.symbol.clone(),
        })
    }
}
