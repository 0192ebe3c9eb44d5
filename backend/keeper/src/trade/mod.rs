//! Trade Executor (component H): places and settles the immediate-or-cancel
//! trades the wallet balancer needs to rebalance after a liquidation,
//! grounded in `original_source/TradeExecutor.py`'s `ImmediateTradeExecutor`.

use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::errors::{BotError, BotResult};
use crate::model::group::MarketMetadata;
use crate::observability::retry;
use crate::wallet::Wallet;

const PLACE_ORDER_ATTEMPTS: u32 = 5;
const SETTLEMENT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
const SETTLEMENT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A fresh client order id per placement, masked to 63 bits so it never
/// collides with the DEX's own sign-bit convention for bookkeeping order
/// ids (`original_source/TradeExecutor.py`'s `random.getrandbits(63)`).
fn client_order_id() -> u64 {
    rand::random::<u64>() & 0x7fff_ffff_ffff_ffff
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

pub trait TradeExecutor {
    fn place_order(
        &self,
        chain: &ChainClient,
        market: &MarketMetadata,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> BotResult<()>;

    fn settle(&self, chain: &ChainClient, market: &MarketMetadata) -> BotResult<()>;
}

/// Places immediate-or-cancel orders against the DEX directly (no resting
/// orders survive a balancer pass), retrying the placement itself up to
/// `PLACE_ORDER_ATTEMPTS` times before giving up, then polling the open
/// orders account for the fill to settle. Serum open-orders accounts are
/// per-(market, owner) and must already exist on-chain, so this executor is
/// handed one per market rather than deriving them.
pub struct SerumImmediateTradeExecutor<'a> {
    pub program_id: Pubkey,
    pub dex_program_id: Pubkey,
    pub wallet: &'a Wallet,
    pub open_orders_by_market: HashMap<String, Pubkey>,
}

impl<'a> SerumImmediateTradeExecutor<'a> {
    fn open_orders_for(&self, market: &MarketMetadata) -> BotResult<Pubkey> {
        self.open_orders_by_market
            .get(&market.name)
            .copied()
            .ok_or_else(|| BotError::NoSourceTokenAccount { token: market.name.clone() })
    }

    fn build_place_order_instruction(
        &self,
        market: &MarketMetadata,
        open_orders: Pubkey,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> solana_sdk::instruction::Instruction {
        let mut data = 9u32.to_le_bytes().to_vec(); // PlaceOrder discriminator
        data.push(match side {
            Side::Buy => 0,
            Side::Sell => 1,
        });
        data.extend_from_slice(&crate::layout::primitives::write_fixed_point(quantity, 8));
        data.extend_from_slice(&crate::layout::primitives::write_fixed_point(limit_price, 8));
        data.extend_from_slice(&client_order_id().to_le_bytes());

        solana_sdk::instruction::Instruction {
            program_id: self.program_id,
            accounts: vec![
                solana_sdk::instruction::AccountMeta::new_readonly(market.market_pk, false),
                solana_sdk::instruction::AccountMeta::new(open_orders, false),
                solana_sdk::instruction::AccountMeta::new_readonly(self.wallet.address(), true),
                solana_sdk::instruction::AccountMeta::new_readonly(self.dex_program_id, false),
            ],
            data,
        }
    }

    fn submit(&self, chain: &ChainClient, instruction: solana_sdk::instruction::Instruction) -> BotResult<()> {
        let recent_blockhash = chain.rpc().get_latest_blockhash().map_err(crate::errors::BotError::from)?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.wallet.address()),
            &[self.wallet.keypair()],
            recent_blockhash,
        );
        let signature = chain.send_transaction(&transaction)?;
        let _ = chain.wait_for_confirmation(&signature);
        Ok(())
    }

    /// Polls the open orders account at 1Hz for up to 60s waiting for the
    /// unsettled balances to reflect a completed fill
    /// (`original_source/TradeExecutor.py`'s `wait_for_settlement_completion`).
    pub fn wait_for_settlement_completion(&self, chain: &ChainClient, open_orders: Pubkey) -> BotResult<()> {
        let deadline = std::time::Instant::now() + SETTLEMENT_POLL_TIMEOUT;
        loop {
            let data = chain.get_account_data(&open_orders)?;
            let parsed = crate::layout::OpenOrdersLayout::parse(&data)?;
            if parsed.order_count() == 0 {
                return Ok(());
            }
            if std::time::Instant::now() >= deadline {
                warn!(%open_orders, "settlement did not complete within timeout");
                return Ok(());
            }
            std::thread::sleep(SETTLEMENT_POLL_INTERVAL);
        }
    }
}

impl<'a> TradeExecutor for SerumImmediateTradeExecutor<'a> {
    fn place_order(
        &self,
        chain: &ChainClient,
        market: &MarketMetadata,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> BotResult<()> {
        let open_orders = self.open_orders_for(market)?;
        retry(PLACE_ORDER_ATTEMPTS, Duration::from_millis(500), || {
            let instruction = self.build_place_order_instruction(market, open_orders, side, quantity, limit_price);
            self.submit(chain, instruction)
        })?;
        self.wait_for_settlement_completion(chain, open_orders)
    }

    fn settle(&self, chain: &ChainClient, market: &MarketMetadata) -> BotResult<()> {
        let open_orders = self.open_orders_for(market)?;
        let data = 10u32.to_le_bytes().to_vec(); // SettleFunds discriminator
        let instruction = solana_sdk::instruction::Instruction {
            program_id: self.program_id,
            accounts: vec![
                solana_sdk::instruction::AccountMeta::new_readonly(market.market_pk, false),
                solana_sdk::instruction::AccountMeta::new(open_orders, false),
                solana_sdk::instruction::AccountMeta::new_readonly(self.wallet.address(), true),
            ],
            data,
        };
        self.submit(chain, instruction)
    }
}
