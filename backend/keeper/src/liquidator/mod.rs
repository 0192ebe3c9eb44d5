//! Account Liquidator (component F): the four interchangeable liquidation
//! strategies from `original_source/AccountLiquidator.py` — a no-op for
//! scouting/dry-run, the real on-chain liquidation, a force-cancel-first
//! decorator for accounts with resting orders, and a reporting decorator
//! that notifies on every attempt.

use rust_decimal::Decimal;
use solana_sdk::{pubkey::Pubkey, signature::Signature, signer::Signer, transaction::Transaction};
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::errors::{BotError, BotResult};
use crate::instructions::{ForceCancelOrdersInstructionBuilder, LiquidateInstructionBuilder};
use crate::layout::open_orders::is_absent;
use crate::layout::TokenAccountLayout;
use crate::model::{Group, MarginAccount};
use crate::observability::events::LiquidationEvent;
use crate::observability::notification::NotificationTarget;
use crate::observability::EventBus;
use crate::wallet::Wallet;

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub account: Pubkey,
    pub signature: Option<Signature>,
    pub confirmed: bool,
}

pub trait AccountLiquidator: Send + Sync {
    fn liquidate(
        &self,
        chain: &ChainClient,
        group: &Group,
        account: &MarginAccount,
        prices: &[Decimal],
    ) -> BotResult<LiquidationOutcome>;
}

/// Used in dry-run and scout modes: identifies liquidation candidates
/// without ever sending a transaction (spec.md §6: "`--scout` performs no
/// writes").
pub struct NullAccountLiquidator;

impl AccountLiquidator for NullAccountLiquidator {
    fn liquidate(
        &self,
        _chain: &ChainClient,
        _group: &Group,
        account: &MarginAccount,
        _prices: &[Decimal],
    ) -> BotResult<LiquidationOutcome> {
        info!(account = %account.address, "dry run: would liquidate");
        Ok(LiquidationOutcome {
            account: account.address,
            signature: None,
            confirmed: false,
        })
    }
}

/// Sends a real `Liquidate` instruction, depositing enough of each
/// negative-net token to cover the account's shortfall.
pub struct ActualAccountLiquidator<'a> {
    pub program_id: Pubkey,
    pub wallet: &'a Wallet,
    pub liquidator_margin_account: Pubkey,
}

impl<'a> AccountLiquidator for ActualAccountLiquidator<'a> {
    fn liquidate(
        &self,
        chain: &ChainClient,
        group: &Group,
        account: &MarginAccount,
        prices: &[Decimal],
    ) -> BotResult<LiquidationOutcome> {
        let wallet_balances = wallet_token_balances(chain, &self.wallet.address(), group);

        let Some(instruction) = LiquidateInstructionBuilder::build(
            &self.program_id,
            group,
            account,
            &self.liquidator_margin_account,
            &self.wallet.address(),
            &wallet_balances,
            prices,
        ) else {
            info!(account = %account.address, "no wallet token qualifies to cover the liquidation deposit, skipping");
            return Ok(LiquidationOutcome {
                account: account.address,
                signature: None,
                confirmed: false,
            });
        };

        let recent_blockhash = chain.rpc().get_latest_blockhash().map_err(BotError::from)?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.wallet.address()),
            &[self.wallet.keypair()],
            recent_blockhash,
        );

        let signature = chain.send_transaction(&transaction).map_err(|e| {
            BotError::LiquidationFailed {
                account: account.address,
                cause: Box::new(e),
            }
        })?;

        let confirmed = match chain.wait_for_confirmation(&signature) {
            Ok(confirmed) => confirmed,
            Err(BotError::ConfirmationTimeout { .. }) => {
                warn!(account = %account.address, %signature, "confirmation timed out, not treated as failure");
                false
            }
            Err(e) => return Err(e),
        };

        Ok(LiquidationOutcome {
            account: account.address,
            signature: Some(signature),
            confirmed,
        })
    }
}

/// One balance per basket token, at the wallet's associated token account
/// for that token's mint; an account that doesn't exist yet contributes
/// zero rather than erroring the whole snapshot. Shared by the liquidation
/// deposit-token selection and the reporting decorator's before/after
/// snapshots.
fn wallet_token_balances(chain: &ChainClient, wallet: &Pubkey, group: &Group) -> Vec<Decimal> {
    group
        .basket_tokens
        .iter()
        .map(|bt| {
            let ata = ChainClient::associated_token_account(wallet, &bt.token.mint);
            chain
                .get_account_data(&ata)
                .ok()
                .and_then(|data| TokenAccountLayout::parse(&data).ok())
                .map(|parsed| bt.token.raw_to_decimal(parsed.amount))
                .unwrap_or(Decimal::ZERO)
        })
        .collect()
}

/// Cancels every resting order on every market the account participates
/// in, then delegates to `inner` (original_source/AccountLiquidator.py's
/// `ForceCancelOrdersAccountLiquidator`, which must clear open orders
/// before a liquidation can settle outstanding unsettled funds).
pub struct ForceCancelOrdersAccountLiquidator<'a> {
    pub program_id: Pubkey,
    pub wallet: &'a Wallet,
    pub inner: Box<dyn AccountLiquidator + 'a>,
}

impl<'a> AccountLiquidator for ForceCancelOrdersAccountLiquidator<'a> {
    fn liquidate(
        &self,
        chain: &ChainClient,
        group: &Group,
        account: &MarginAccount,
        prices: &[Decimal],
    ) -> BotResult<LiquidationOutcome> {
        for (market_index, open_orders_address) in account.open_orders.iter().enumerate() {
            if is_absent(open_orders_address) {
                continue;
            }
            let data = chain.get_account_data(open_orders_address)?;
            let open_orders = crate::layout::OpenOrdersLayout::parse(&data)?;
            if open_orders.order_count() == 0 {
                continue;
            }

            let instructions = ForceCancelOrdersInstructionBuilder::build_batch(
                &self.program_id,
                group,
                account,
                market_index,
                open_orders_address,
                open_orders.order_count(),
            );

            for instruction in instructions {
                let recent_blockhash = chain.rpc().get_latest_blockhash().map_err(BotError::from)?;
                let transaction = Transaction::new_signed_with_payer(
                    &[instruction],
                    Some(&self.wallet.address()),
                    &[self.wallet.keypair()],
                    recent_blockhash,
                );
                let signature = chain.send_transaction(&transaction)?;
                let _ = chain.wait_for_confirmation(&signature);
            }
        }

        self.inner.liquidate(chain, group, account, prices)
    }
}

/// Wraps any liquidator, pushes a notification on every attempt, and — on a
/// confirmed attempt — snapshots the liquidator wallet's balance vector
/// before and after, publishing a `LiquidationEvent` on the shared event
/// bus (spec.md §4.F variant 4, original_source/AccountLiquidator.py's
/// `ReportingAccountLiquidator`).
pub struct ReportingAccountLiquidator<'a> {
    pub inner: Box<dyn AccountLiquidator + 'a>,
    pub targets: &'a [Box<dyn NotificationTarget>],
    pub wallet: &'a Wallet,
    pub events: &'a EventBus,
}

impl<'a> ReportingAccountLiquidator<'a> {
    fn snapshot_wallet_balances(&self, chain: &ChainClient, group: &Group) -> Vec<Decimal> {
        wallet_token_balances(chain, &self.wallet.address(), group)
    }
}

impl<'a> AccountLiquidator for ReportingAccountLiquidator<'a> {
    fn liquidate(
        &self,
        chain: &ChainClient,
        group: &Group,
        account: &MarginAccount,
        prices: &[Decimal],
    ) -> BotResult<LiquidationOutcome> {
        let wallet_before = self.snapshot_wallet_balances(chain, group);
        let result = self.inner.liquidate(chain, group, account, prices);

        let message = match &result {
            Ok(outcome) => format!(
                "liquidated {} (confirmed={}, sig={:?})",
                outcome.account, outcome.confirmed, outcome.signature
            ),
            Err(e) => format!("liquidation of {} failed: {e}", account.address),
        };
        for target in self.targets {
            target.notify(&message);
        }

        if let Ok(outcome) = &result {
            let wallet_after = self.snapshot_wallet_balances(chain, group);
            self.events.publish(LiquidationEvent {
                timestamp: std::time::SystemTime::now(),
                wallet: self.wallet.address(),
                margin_account: account.address,
                signature: outcome.signature.map(|sig| sig.to_string()),
                confirmed: outcome.confirmed,
                wallet_before,
                wallet_after,
            });
        }

        result
    }
}
