//! Crate-wide constants.

/// USDC mint on Solana mainnet.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// USDC has 6 decimals.
pub const USDC_DECIMALS: u8 = 6;

pub const USDC_SYMBOL: &str = "USDC";

/// Fixed wait after a stale-blockhash rejection.
pub const STALE_REFERENCE_WAIT_SECS: u64 = 2;

/// Rate-limit backoff is this many seconds times the failed attempt number.
pub const RATE_LIMIT_BACKOFF_STEP_SECS: u64 = 3;

/// Upper bound, in whole asset units, for the fixed-amount test mode.
pub const FIXED_AMOUNT_CEILING_UNITS: u64 = 1_000_000;

/// Lower clamp for the Dirichlet concentration parameter.
pub const MIN_ALPHA: f64 = 0.001;

pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Seconds between consecutive transfers.
pub const DEFAULT_TX_SLEEP_SECS: f64 = 1.0;

pub const HOLDER_FETCH_TIMEOUT_SECS: u64 = 30;

/// Characters kept on each side of a truncated address.
pub const ADDRESS_DISPLAY_CHARS: usize = 4;

/// Length in bytes of a decoded ledger public key.
pub const PUBKEY_BYTES: usize = 32;

/// Interval between signature status polls after a transaction is accepted.
pub const CONFIRM_POLL_INTERVAL_MS: u64 = 500;

/// Give up waiting on an accepted signature after this long. Comfortably
/// longer than a blockhash stays valid.
pub const CONFIRM_TIMEOUT_SECS: u64 = 120;
