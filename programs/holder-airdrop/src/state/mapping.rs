//! Holder → recipient address remapping.

use std::collections::BTreeMap;
use std::path::Path;

use anchor_lang::prelude::Pubkey;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AirdropError, Result};
use crate::utils::address::parse_pubkey;

/// Validated source → destination map. Never holds a self-mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipientMapping {
    entries: BTreeMap<Pubkey, Pubkey>,
}

impl RecipientMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-parsed pairs, dropping self-mappings.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Pubkey, Pubkey)>) -> Self {
        let mut entries = BTreeMap::new();
        for (source, destination) in pairs {
            if source == destination {
                warn!(%source, "address mapping has identical source and destination, skipping");
                continue;
            }
            entries.insert(source, destination);
        }
        Self { entries }
    }

    /// Parse a JSON object of `"source": "destination"` strings.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AirdropError::InvalidMapping(format!("invalid JSON: {e}")))?;
        let object = value.as_object().ok_or_else(|| {
            AirdropError::InvalidMapping("mapping file must contain a JSON object".to_string())
        })?;

        let mut pairs = Vec::with_capacity(object.len());
        for (source, destination) in object {
            let destination = destination.as_str().ok_or_else(|| {
                AirdropError::InvalidMapping(format!("destination for {source} is not a string"))
            })?;
            let (source, destination) = (source.trim(), destination.trim());
            if source.is_empty() || destination.is_empty() {
                return Err(AirdropError::InvalidMapping(format!(
                    "mapping contains empty address: '{source}' -> '{destination}'"
                )));
            }
            if source == destination {
                warn!(source, "address mapping has identical source and destination, skipping");
                continue;
            }
            let src = parse_pubkey(source).map_err(|_| {
                AirdropError::InvalidMapping(format!("invalid source address: {source}"))
            })?;
            let dst = parse_pubkey(destination).map_err(|_| {
                AirdropError::InvalidMapping(format!("invalid destination address: {destination}"))
            })?;
            pairs.push((src, dst));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Load the optional mapping file. An empty path means no mapping.
    pub fn load(path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(Path::new(path.trim())).map_err(|e| {
            AirdropError::InvalidMapping(format!("cannot read mapping file {path}: {e}"))
        })?;
        let mapping = Self::from_json_str(&raw)?;
        info!(count = mapping.len(), path, "loaded address mapping");
        for (source, destination) in mapping.iter() {
            info!("  mapping: {source} -> {destination}");
        }
        Ok(mapping)
    }

    pub fn get(&self, source: &Pubkey) -> Option<&Pubkey> {
        self.entries.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pubkey, &Pubkey)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert without the self-mapping filter, to exercise downstream re-checks.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, source: Pubkey, destination: Pubkey) {
        self.entries.insert(source, destination);
    }
}
