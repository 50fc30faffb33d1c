//! Holder discovery from the collection indexing worker.

use std::collections::HashSet;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::HOLDER_FETCH_TIMEOUT_SECS;
use crate::error::{AirdropError, Result};
use crate::ops::guard::check_address;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HoldersRequest<'a> {
    collection_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct HoldersResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub holders: Vec<String>,
}

impl HoldersResponse {
    pub fn into_holders(self) -> Result<Vec<String>> {
        if !self.success {
            return Err(AirdropError::HolderDiscovery(
                "API returned success=false".to_string(),
            ));
        }
        Ok(self.holders)
    }
}

/// POST `{"collectionId": ...}` to the worker and return the raw addresses.
pub fn fetch_holders(worker_url: &str, collection_id: &str) -> Result<Vec<String>> {
    info!(collection_id, "fetching holders");
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(HOLDER_FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| AirdropError::HolderDiscovery(e.to_string()))?;
    let response: HoldersResponse = client
        .post(worker_url)
        .json(&HoldersRequest { collection_id })
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| AirdropError::HolderDiscovery(e.to_string()))?
        .json()
        .map_err(|e| AirdropError::HolderDiscovery(format!("invalid response body: {e}")))?;
    let holders = response.into_holders()?;
    info!("got {} holders", holders.len());
    Ok(holders)
}

/// Deduplicate (first occurrence wins) and parse holder addresses.
pub fn parse_holders(raw: &[String]) -> Result<Vec<Pubkey>> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut holders = Vec::with_capacity(raw.len());
    for address in raw {
        let key = check_address(address)?;
        if seen.insert(key) {
            holders.push(key);
        }
    }
    if holders.is_empty() {
        return Err(AirdropError::NoHolders);
    }
    Ok(holders)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const B: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn response_requires_success_flag() {
        let ok: HoldersResponse =
            serde_json::from_value(serde_json::json!({ "success": true, "holders": [A, B] })).unwrap();
        assert_eq!(ok.into_holders().unwrap().len(), 2);

        let failed: HoldersResponse =
            serde_json::from_value(serde_json::json!({ "success": false, "error": "boom" })).unwrap();
        assert!(matches!(
            failed.into_holders(),
            Err(AirdropError::HolderDiscovery(_))
        ));
    }

    #[test]
    fn request_uses_camel_case() {
        let body = serde_json::to_value(HoldersRequest { collection_id: "abc" }).unwrap();
        assert_eq!(body, serde_json::json!({ "collectionId": "abc" }));
    }

    #[test]
    fn dedups_in_first_seen_order() {
        let raw = vec![B.to_string(), A.to_string(), B.to_string()];
        let holders = parse_holders(&raw).unwrap();
        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0].to_string(), B);
        assert_eq!(holders[1].to_string(), A);
    }

    #[test]
    fn malformed_or_empty_input_is_rejected() {
        assert!(parse_holders(&["nope".to_string()]).unwrap_err().is_configuration());
        assert!(matches!(parse_holders(&[]), Err(AirdropError::NoHolders)));
    }
}
