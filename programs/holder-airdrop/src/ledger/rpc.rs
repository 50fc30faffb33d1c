//! Solana JSON-RPC implementation of [`Ledger`].
//!
//! A signed transaction is submitted once. After the node accepts it, only
//! that signature is polled; a fresh transaction is built only when the
//! blockhash has expired and the signature is absent from status history.

use std::time::{Duration, Instant};

use anchor_lang::prelude::Pubkey;
use anchor_spl::associated_token::spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use anchor_spl::token::spl_token::instruction::transfer_checked;
use serde_json::json;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::{RpcError, RpcRequest};
use solana_client::rpc_response::Response;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};
use tracing::{debug, warn};

use super::{associated_token_address, Ledger, LedgerError, LedgerErrorKind, TransferReceipt};
use crate::constants::{CONFIRM_POLL_INTERVAL_MS, CONFIRM_TIMEOUT_SECS};
use crate::error::{AirdropError, Result};

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

pub struct RpcLedger {
    client: RpcClient,
    payer: Option<Keypair>,
    decimals: u8,
    poll_interval: Duration,
    confirm_timeout: Duration,
}

impl RpcLedger {
    pub fn new(rpc_url: &str, payer: Keypair, decimals: u8) -> Self {
        Self::build(rpc_url, Some(payer), decimals)
    }

    /// Client without a signing key; only `account_exists` succeeds.
    pub fn read_only(rpc_url: &str, decimals: u8) -> Self {
        Self::build(rpc_url, None, decimals)
    }

    fn build(rpc_url: &str, payer: Option<Keypair>, decimals: u8) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed()),
            payer,
            decimals,
            poll_interval: Duration::from_millis(CONFIRM_POLL_INTERVAL_MS),
            confirm_timeout: Duration::from_secs(CONFIRM_TIMEOUT_SECS),
        }
    }

    /// Override how often an accepted signature is polled and how long to
    /// wait for it.
    pub fn with_confirm_timing(mut self, poll_interval: Duration, confirm_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirm_timeout = confirm_timeout;
        self
    }

    fn payer(&self) -> std::result::Result<&Keypair, LedgerError> {
        self.payer
            .as_ref()
            .ok_or_else(|| LedgerError::other("no signing key configured"))
    }

    fn sign(&self, instructions: &[Instruction], blockhash: Hash) -> std::result::Result<Transaction, LedgerError> {
        let payer = self.payer()?;
        Ok(Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        ))
    }

    fn transfer_instruction(
        &self,
        to: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> std::result::Result<Instruction, LedgerError> {
        let payer = self.payer()?.pubkey();
        transfer_checked(
            &anchor_spl::token::ID,
            &associated_token_address(&payer, asset),
            asset,
            &associated_token_address(to, asset),
            &payer,
            &[],
            amount,
            self.decimals,
        )
        .map_err(|e| LedgerError::other(format!("failed to build transfer: {e}")))
    }

    /// Sign with a fresh blockhash, submit once and wait for the outcome.
    fn send(&self, instructions: &[Instruction]) -> std::result::Result<String, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.client.commitment())
            .map_err(classify)?;
        let tx = self.sign(instructions, blockhash)?;
        let signature = tx.signatures[0];

        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(self.client.commitment().commitment),
            ..RpcSendTransactionConfig::default()
        };
        match self.client.send_transaction_with_config(&tx, config) {
            Ok(_) => {}
            Err(err) if possibly_delivered(&err) => {
                warn!(%signature, "submission outcome unknown ({err}), checking status");
            }
            Err(err) => return Err(classify(err)),
        }

        self.await_signature(&signature, last_valid_block_height)?;
        Ok(signature.to_string())
    }

    /// Poll `signature` until it confirms, fails on-chain, or provably never
    /// landed. Poll errors are logged and polling continues.
    fn await_signature(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> std::result::Result<(), LedgerError> {
        let commitment = self.client.commitment();
        let started = Instant::now();
        loop {
            match self.client.get_signature_statuses(&[*signature]) {
                Ok(resp) => {
                    if let Some(Some(status)) = resp.value.first() {
                        if let Some(err) = &status.err {
                            return Err(LedgerError::other(format!(
                                "transaction {signature} failed: {err}"
                            )));
                        }
                        if status.satisfies_commitment(commitment) {
                            return Ok(());
                        }
                    }
                }
                Err(err) => debug!(%signature, "status poll failed: {err}"),
            }

            if self.blockhash_expired(last_valid_block_height) && self.never_landed(signature) {
                return Err(LedgerError::new(
                    LedgerErrorKind::StaleReference,
                    format!("blockhash expired before {signature} landed"),
                ));
            }
            if started.elapsed() >= self.confirm_timeout {
                return Err(LedgerError::new(
                    LedgerErrorKind::Unconfirmed,
                    format!(
                        "no confirmation for {signature} after {}s",
                        self.confirm_timeout.as_secs_f64()
                    ),
                ));
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    fn blockhash_expired(&self, last_valid_block_height: u64) -> bool {
        match self
            .client
            .get_block_height_with_commitment(self.client.commitment())
        {
            Ok(height) => height > last_valid_block_height,
            Err(err) => {
                debug!("block height poll failed: {err}");
                false
            }
        }
    }

    /// Only a successful lookup that searched history and found nothing counts.
    fn never_landed(&self, signature: &Signature) -> bool {
        match self.client.get_signature_statuses_with_history(&[*signature]) {
            Ok(resp) => matches!(resp.value.first(), Some(None)),
            Err(err) => {
                debug!(%signature, "history lookup failed: {err}");
                false
            }
        }
    }
}

impl Ledger for RpcLedger {
    fn sender(&self) -> Pubkey {
        self.payer
            .as_ref()
            .map(|p| p.pubkey())
            .unwrap_or_default()
    }

    fn account_exists(&mut self, owner: &Pubkey, asset: &Pubkey) -> std::result::Result<bool, LedgerError> {
        let ata = associated_token_address(owner, asset);
        // Raw request so transport errors keep their kind.
        let params = json!([
            ata.to_string(),
            { "encoding": "base64", "commitment": self.client.commitment().commitment }
        ]);
        let resp: Response<Option<serde_json::Value>> = self
            .client
            .send(RpcRequest::GetAccountInfo, params)
            .map_err(classify)?;
        Ok(resp.value.is_some())
    }

    fn create_account(&mut self, owner: &Pubkey, asset: &Pubkey) -> std::result::Result<Pubkey, LedgerError> {
        let payer = self.payer()?.pubkey();
        let ix = create_associated_token_account_idempotent(
            &payer,
            owner,
            asset,
            &anchor_spl::token::ID,
        );
        let signature = self.send(&[ix])?;
        debug!(%owner, %signature, "token account created");
        Ok(associated_token_address(owner, asset))
    }

    fn submit_transfer(
        &mut self,
        to: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> std::result::Result<TransferReceipt, LedgerError> {
        let ix = self.transfer_instruction(to, asset, amount)?;
        let signature = self.send(&[ix])?;
        Ok(TransferReceipt { signature })
    }
}

/// Transport failures after which the request may still have reached the node.
fn possibly_delivered(err: &ClientError) -> bool {
    match err.kind() {
        ClientErrorKind::Io(_) => true,
        ClientErrorKind::Reqwest(e) => {
            e.is_timeout() || (e.status().is_none() && !e.is_connect() && !e.is_builder())
        }
        _ => false,
    }
}

/// Map a client error onto the closed failure classification.
fn classify(err: ClientError) -> LedgerError {
    let kind = if matches!(
        err.get_transaction_error(),
        Some(TransactionError::BlockhashNotFound)
    ) {
        LedgerErrorKind::StaleReference
    } else {
        match err.kind() {
            ClientErrorKind::Reqwest(e)
                if e.status().map(|s| s.as_u16()) == Some(HTTP_TOO_MANY_REQUESTS) =>
            {
                LedgerErrorKind::RateLimited
            }
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. })
                if *code == HTTP_TOO_MANY_REQUESTS as i64 =>
            {
                LedgerErrorKind::RateLimited
            }
            _ => LedgerErrorKind::Other,
        }
    };
    LedgerError::new(kind, err.to_string())
}

/// Decode a base58-encoded 64-byte secret key.
pub fn keypair_from_base58(secret: &str) -> Result<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|_| AirdropError::InvalidConfig("private_key is not valid base58".to_string()))?;
    #[allow(deprecated)]
    Keypair::from_bytes(&bytes)
        .map_err(|_| AirdropError::InvalidConfig("private_key is not a valid keypair".to_string()))
}
