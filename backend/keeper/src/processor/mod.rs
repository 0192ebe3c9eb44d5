//! Liquidation Processor (component G): discovers a group's margin
//! accounts, prices them, and drives the liquidate-rebalance-reload loop,
//! grounded in `original_source/LiquidationProcessor.py`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use crate::balancer::WalletBalancer;
use crate::chain::ChainClient;
use crate::errors::BotResult;
use crate::layout::{open_orders, OpenOrdersLayout};
use crate::liquidator::{AccountLiquidator, LiquidationOutcome};
use crate::model::{Group, MarginAccount};
use crate::observability::events::MarginAccountMetadata;
use crate::observability::ScoutReport;
use crate::pricing;

/// Offset of `MarginAccountLayout::group` within the account's raw bytes
/// (8-byte flags word, then the group pubkey) — the `memcmp` filter used to
/// discover a group's margin accounts server-side without a full program
/// account scan.
const GROUP_FIELD_OFFSET: usize = 8;

/// The most recently loaded margin-account snapshot, mirroring spec.md
/// §4.G's `ripe_accounts: Option<Vec<MarginAccount>>` — `None` until the
/// first accounts tick completes, so `update_prices`/`liquidate_all` can
/// recognize "no snapshot yet" and skip rather than act on an empty set.
pub struct LiquidationProcessor<'a> {
    chain: &'a ChainClient,
    pub program_id: Pubkey,
    pub group: Group,
    pub ripe_accounts: Option<Vec<MarginAccount>>,
    pub open_orders: HashMap<Pubkey, OpenOrdersLayout>,
    pub prices: Vec<Decimal>,
    pub worthwhile_threshold: Decimal,
}

impl<'a> LiquidationProcessor<'a> {
    pub fn new(chain: &'a ChainClient, program_id: Pubkey, group: Group, worthwhile_threshold: Decimal) -> Self {
        LiquidationProcessor {
            chain,
            program_id,
            group,
            ripe_accounts: None,
            open_orders: HashMap::new(),
            prices: Vec::new(),
            worthwhile_threshold,
        }
    }

    /// Refetches every `MarginAccount` belonging to this group, plus every
    /// open-orders account the group's signer authority owns, replacing
    /// both wholesale. Run on the 60s accounts tick (spec.md §5).
    pub fn update_margin_accounts(&mut self) -> BotResult<()> {
        let raw_accounts = self.chain.get_program_accounts_with_memcmp(
            &self.program_id,
            GROUP_FIELD_OFFSET,
            self.group.address.to_bytes().to_vec(),
        )?;

        let num_tokens = self.group.basket_tokens.len();
        let num_markets = self.group.markets.len();

        let mut accounts = Vec::with_capacity(raw_accounts.len());
        for (address, data) in raw_accounts {
            match crate::layout::MarginAccountLayout::parse(&data, num_tokens, num_markets) {
                Ok(raw) => {
                    let deposits = raw
                        .deposits
                        .iter()
                        .zip(&self.group.indexes)
                        .map(|(share, index)| share * index.deposit)
                        .collect();
                    let borrows = raw
                        .borrows
                        .iter()
                        .zip(&self.group.indexes)
                        .map(|(share, index)| share * index.borrow)
                        .collect();
                    accounts.push(MarginAccount {
                        address,
                        group: raw.group,
                        owner: raw.owner,
                        deposits,
                        borrows,
                        open_orders: raw.open_orders,
                    });
                }
                Err(e) => warn!(%address, error = %e, "skipping malformed margin account"),
            }
        }

        // Second server-side scan (spec.md §4.K / §6): every open-orders
        // account owned by this group's signer authority, attached
        // in-process rather than re-fetched per account per market.
        let raw_open_orders = self.chain.get_program_accounts_with_memcmp(
            &self.group.dex_program_id,
            open_orders::GROUP_SIGNER_OFFSET,
            self.group.signer_key.to_bytes().to_vec(),
        )?;
        let mut open_orders_map = HashMap::with_capacity(raw_open_orders.len());
        for (address, data) in raw_open_orders {
            match OpenOrdersLayout::parse(&data) {
                Ok(parsed) => {
                    open_orders_map.insert(address, parsed);
                }
                Err(e) => warn!(%address, error = %e, "skipping malformed open orders account"),
            }
        }

        info!(count = accounts.len(), open_orders = open_orders_map.len(), "refreshed margin accounts");
        self.ripe_accounts = Some(accounts);
        self.open_orders = open_orders_map;
        Ok(())
    }

    /// Refetches every oracle price for this group. Run on the 2s prices
    /// tick (spec.md §5) — far more frequently than the accounts tick,
    /// since prices move continuously while account membership does not.
    pub fn update_prices(&mut self) -> BotResult<()> {
        self.prices = pricing::get_prices(self.chain, &self.group)?;
        Ok(())
    }

    /// Classifies one account through the liquidation funnel: priced net
    /// worth, collateral ratio, and the three funnel booleans from
    /// spec.md §4.G steps 4-6.
    pub fn classify(&self, account: &MarginAccount) -> MarginAccountMetadata {
        let sheet = pricing::priced_balance_sheet(account, &self.group, &self.prices, &self.open_orders);
        let collateral_ratio = sheet.collateral_ratio();
        let net_value = sheet.value();

        let liquidatable = collateral_ratio <= self.group.maint_coll_ratio;
        let above_water = liquidatable && collateral_ratio > Decimal::ONE;
        let worthwhile = above_water && net_value > self.worthwhile_threshold;

        MarginAccountMetadata {
            address: account.address,
            owner: account.owner,
            net_value,
            collateral_ratio,
            liquidatable,
            above_water,
            worthwhile,
        }
    }

    /// A read-only pass over every known margin account, used by `--scout`
    /// and dry-run mode: runs the exact same classification
    /// `liquidate_all` would, but never calls an `AccountLiquidator`
    /// (`original_source/AccountScout.py`).
    pub fn scout(&self) -> ScoutReport {
        let accounts = self
            .ripe_accounts
            .as_ref()
            .map(|accounts| accounts.iter().map(|a| self.classify(a)).collect())
            .unwrap_or_default();
        ScoutReport { accounts }
    }

    /// Sort-pick-liquidate-rebalance-reload-reenqueue-remove: repeatedly
    /// picks the largest remaining worthwhile account, liquidates it,
    /// rebalances the wallet, reloads the account from chain, and
    /// re-enqueues it if it is still worthwhile (a partial liquidation
    /// didn't fully clear it) or drops it otherwise.
    ///
    /// Returns immediately (no-op) when no accounts snapshot has ever been
    /// loaded, matching spec.md §4.G step 1: "if ripe_accounts is None,
    /// return."
    pub fn liquidate_all(
        &mut self,
        liquidator: &dyn AccountLiquidator,
        balancer: &dyn WalletBalancer,
    ) -> BotResult<Vec<LiquidationOutcome>> {
        let Some(ripe_accounts) = self.ripe_accounts.clone() else {
            return Ok(Vec::new());
        };

        // Sequential funnel per spec.md §4.G steps 4-6: liquidatable ⊇
        // above_water ⊇ worthwhile, each a strict filter of the last, not
        // three independent reclassifications of the full input.
        let liquidatable: Vec<_> = ripe_accounts.iter().filter(|a| self.classify(a).liquidatable).collect();
        let above_water: Vec<_> = liquidatable.iter().filter(|a| self.classify(a).above_water).collect();
        let worthwhile: Vec<MarginAccount> = above_water
            .iter()
            .filter(|a| self.classify(a).worthwhile)
            .map(|a| (*a).clone())
            .collect();

        info!(
            ripe = ripe_accounts.len(),
            liquidatable = liquidatable.len(),
            above_water = above_water.len(),
            worthwhile = worthwhile.len(),
            "liquidation funnel"
        );

        // Ascending by net value so `.pop()` (which removes the last
        // element) always yields the largest remaining net-value account —
        // the "highest net-value first" tie-break rule in spec.md §4.G.
        let mut queue = worthwhile;
        queue.sort_by(|a, b| self.classify(a).net_value.cmp(&self.classify(b).net_value));

        let mut outcomes = Vec::new();
        while let Some(account) = queue.pop() {
            let outcome = match liquidator.liquidate(self.chain, &self.group, &account, &self.prices) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(account = %account.address, error = %e, "liquidation attempt failed");
                    continue;
                }
            };

            // Rebalancing acts on the liquidator's own wallet holdings, not
            // on the liquidated account; the balancer recomputes its own
            // deltas from current balances, configured targets, and this
            // tick's prices (spec.md §4.G: "call wallet_balancer.balance(prices)").
            balancer.balance(self.chain, &self.group, &self.prices)?;

            match MarginAccount::load(self.chain, account.address, &self.group) {
                Ok(reloaded) => {
                    let reloaded_open_orders = self.fetch_open_orders_for(&reloaded).unwrap_or_default();
                    let sheet = pricing::priced_balance_sheet(&reloaded, &self.group, &self.prices, &reloaded_open_orders);
                    let collateral_ratio = sheet.collateral_ratio();
                    let net_value = sheet.value();
                    let still_worthwhile = collateral_ratio <= self.group.maint_coll_ratio
                        && collateral_ratio > Decimal::ONE
                        && net_value > self.worthwhile_threshold;
                    if still_worthwhile {
                        info!(account = %reloaded.address, %net_value, "still worthwhile after partial liquidation, re-enqueuing");
                        queue.push(reloaded);
                        queue.sort_by(|a, b| self.classify(a).net_value.cmp(&self.classify(b).net_value));
                    }
                }
                Err(e) => warn!(account = %account.address, error = %e, "failed to reload after liquidation"),
            }

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Fetches and parses the subset of `self.open_orders` relevant to a
    /// single reloaded account directly, rather than re-running the
    /// group-wide scan, for the post-liquidation reload step.
    fn fetch_open_orders_for(&self, account: &MarginAccount) -> BotResult<HashMap<Pubkey, OpenOrdersLayout>> {
        let mut map = HashMap::new();
        for address in &account.open_orders {
            if open_orders::is_absent(address) {
                continue;
            }
            let data = self.chain.get_account_data(address)?;
            map.insert(*address, OpenOrdersLayout::parse(&data)?);
        }
        Ok(map)
    }
}
