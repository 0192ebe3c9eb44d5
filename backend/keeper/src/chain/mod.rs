//! Chain Client Facade (component B): the bot's only point of contact with
//! the RPC node. Wraps `solana_client::rpc_client::RpcClient` with batching,
//! memcmp-filtered program scans, and a poll-based confirmation wait so the
//! rest of the bot never touches `solana_client` error types directly.

use std::time::Duration;

use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::errors::{BotError, BotResult};

/// How long `wait_for_confirmation` polls before giving up and logging
/// rather than failing the caller (spec.md §6: "a timeout is logged, not
/// treated as a liquidation failure").
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct ChainClient {
    rpc: RpcClient,
}

impl ChainClient {
    pub fn new(url: String) -> Self {
        ChainClient {
            rpc: RpcClient::new_with_commitment(url, CommitmentConfig::confirmed()),
        }
    }

    pub fn get_account_data(&self, address: &Pubkey) -> BotResult<Vec<u8>> {
        let account = self.rpc.get_account(address).map_err(BotError::from)?;
        Ok(account.data)
    }

    /// Batched multi-account fetch. The RPC node caps batch size; callers
    /// that need more than that chunk this themselves (spec.md §4.D: group
    /// oracle fetches are chunked at the RPC layer's limit).
    pub fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> BotResult<Vec<Option<Vec<u8>>>> {
        let accounts: Vec<Option<Account>> = self
            .rpc
            .get_multiple_accounts(addresses)
            .map_err(BotError::from)?;
        Ok(accounts.into_iter().map(|a| a.map(|acc| acc.data)).collect())
    }

    /// Server-side `memcmp`-filtered program scan, used to discover every
    /// `MarginAccount` belonging to a group without downloading the whole
    /// program's account set (spec.md §4.G "account discovery").
    pub fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> BotResult<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                offset, &bytes,
            ))]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(CommitmentConfig::confirmed()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(program_id, config)
            .map_err(BotError::from)?;
        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }

    pub fn get_balance(&self, address: &Pubkey) -> BotResult<u64> {
        self.rpc.get_balance(address).map_err(BotError::from)
    }

    pub fn send_transaction(&self, transaction: &Transaction) -> BotResult<Signature> {
        self.rpc
            .send_transaction(transaction)
            .map_err(BotError::from)
    }

    /// Polls at 1Hz for up to 60s. A timed-out confirmation is NOT an error:
    /// the caller logs it and moves on, since the transaction may still land
    /// (spec.md §4.F "liquidation outcome is advisory, not authoritative").
    pub fn wait_for_confirmation(&self, signature: &Signature) -> BotResult<bool> {
        let deadline = std::time::Instant::now() + CONFIRMATION_TIMEOUT;
        loop {
            if self.rpc.confirm_transaction(signature).unwrap_or(false) {
                return Ok(true);
            }
            if std::time::Instant::now() >= deadline {
                return Err(BotError::ConfirmationTimeout { sig: *signature });
            }
            std::thread::sleep(CONFIRMATION_POLL_INTERVAL);
        }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Picks the SPL token account with the largest balance among a
    /// wallet's (possibly several) accounts for `mint`, matching
    /// `original_source/baseCli.py`'s `fetch_largest_for_owner_and_token`
    /// — a wallet can hold the same token across more than one account,
    /// and the liquidator should source from whichever has the most.
    pub fn find_largest_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> BotResult<Pubkey> {
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(
                owner,
                solana_client::rpc_request::TokenAccountsFilter::Mint(*mint),
            )
            .map_err(BotError::from)?;

        let mut best: Option<(Pubkey, u64)> = None;
        for keyed_account in accounts {
            let address: Pubkey = keyed_account.pubkey.parse().map_err(|_| BotError::MalformedAccountData {
                expected_len: 44,
                actual_len: keyed_account.pubkey.len(),
            })?;
            let data = self.get_account_data(&address)?;
            let parsed = crate::layout::TokenAccountLayout::parse(&data)?;
            if best.map(|(_, amount)| parsed.amount > amount).unwrap_or(true) {
                best = Some((address, parsed.amount));
            }
        }

        best.map(|(address, _)| address).ok_or_else(|| BotError::NoSourceTokenAccount {
            token: mint.to_string(),
        })
    }

    /// The canonical associated token account address for `owner`/`mint`,
    /// used when no explicit source account is configured and the wallet
    /// is expected to hold tokens at the standard derived address.
    pub fn associated_token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        spl_associated_token_account::get_associated_token_address(owner, mint)
    }
}
