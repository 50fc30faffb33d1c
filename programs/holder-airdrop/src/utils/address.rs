//! Ledger address parsing and display helpers.

use std::str::FromStr;

use anchor_lang::prelude::Pubkey;

use crate::constants::{ADDRESS_DISPLAY_CHARS, PUBKEY_BYTES};
use crate::error::{AirdropError, Result};

/// Parse a base58 string into a 32-byte public key.
pub fn parse_pubkey(raw: &str) -> Result<Pubkey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AirdropError::InvalidPubkey("empty address".to_string()));
    }
    let decoded = bs58::decode(trimmed)
        .into_vec()
        .map_err(|_| AirdropError::InvalidPubkey(trimmed.to_string()))?;
    if decoded.len() != PUBKEY_BYTES {
        return Err(AirdropError::InvalidPubkey(trimmed.to_string()));
    }
    Pubkey::from_str(trimmed).map_err(|_| AirdropError::InvalidPubkey(trimmed.to_string()))
}

/// `AbCd...WxYz` for operator-facing listings.
pub fn short_address(key: &Pubkey) -> String {
    let full = key.to_string();
    if full.len() <= ADDRESS_DISPLAY_CHARS * 2 + 3 {
        return full;
    }
    format!(
        "{}...{}",
        &full[..ADDRESS_DISPLAY_CHARS],
        &full[full.len() - ADDRESS_DISPLAY_CHARS..]
    )
}
