//! Pricing (component D): turns a `Group`'s oracle accounts into a price
//! per basket token, and turns a `MarginAccount` into intrinsic (raw token
//! units) and priced (quote-currency value) balance sheets.

use std::collections::HashMap;

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::chain::ChainClient;
use crate::errors::BotResult;
use crate::layout::{open_orders, AggregatorLayout, OpenOrdersLayout};
use crate::model::{BalanceSheet, Group, MarginAccount, TokenValue};

/// One price per basket token, in the same order as `Group::basket_tokens`.
/// The quote currency itself has no oracle and is always priced at 1.0
/// (spec.md §4.D: "the quote token's price is definitionally one"). Loads
/// every oracle in a single batched RPC call, never one call per oracle
/// (spec.md §4.D performance invariant).
pub fn get_prices(chain: &ChainClient, group: &Group) -> BotResult<Vec<Decimal>> {
    let oracle_addresses: Vec<_> = group.markets.iter().map(|m| m.oracle).collect();
    let raw_accounts = chain.get_multiple_account_data(&oracle_addresses)?;

    let mut prices = Vec::with_capacity(group.basket_tokens.len());
    for maybe_data in raw_accounts {
        let data = maybe_data.ok_or_else(|| crate::errors::BotError::LookupMiss {
            what: "oracle account",
            key: "missing from getMultipleAccounts response".to_string(),
        })?;
        let aggregator = AggregatorLayout::parse(&data)?;
        prices.push(aggregator.price());
    }
    // Open Question (spec.md §9): the oracle vector and the basket-token
    // vector are never explicitly asserted co-indexed on the quote side by
    // the source; we assert it here rather than silently mis-pricing a
    // basket token against the wrong oracle.
    assert_eq!(
        prices.len() + 1,
        group.basket_tokens.len(),
        "oracle price vector must be co-indexed with basket_tokens, quote token excepted"
    );
    prices.push(Decimal::ONE); // quote currency
    Ok(prices)
}

/// The account's raw token-unit balance sheet, unscaled by price. Folds in
/// each market's unsettled open-orders residuals per spec.md §4.D: a
/// market's `base_token_total` adds to its basket token's
/// `unsettled_assets`, and every market's `quote_token_total` adds to the
/// shared quote token's `unsettled_assets`. Open-orders accounts absent
/// from `open_orders` (not yet created, or the sentinel address) contribute
/// zero.
pub fn intrinsic_balance_sheet(
    account: &MarginAccount,
    group: &Group,
    open_orders: &HashMap<Pubkey, OpenOrdersLayout>,
) -> BalanceSheet {
    let quote_index = group.quote_index();
    let mut unsettled = vec![Decimal::ZERO; group.basket_tokens.len()];

    for (market_index, address) in account.open_orders.iter().enumerate() {
        if open_orders::is_absent(address) {
            continue;
        }
        let Some(oo) = open_orders.get(address) else { continue };
        let base_token = &group.basket_tokens[market_index].token;
        let quote_token = &group.basket_tokens[quote_index].token;
        unsettled[market_index] += base_token.raw_to_decimal(oo.base_token_total);
        unsettled[quote_index] += quote_token.raw_to_decimal(oo.quote_token_total);
    }

    let tokens = group
        .basket_tokens
        .iter()
        .map(|bt| TokenValue {
            name: bt.token.name.clone(),
            liabilities: account.borrows[bt.index],
            settled_assets: account.deposits[bt.index],
            unsettled_assets: unsettled[bt.index],
        })
        .collect();
    BalanceSheet { tokens }
}

/// The account's balance sheet in quote-currency value: every field
/// multiplied by its token's oracle price and rounded to that token's
/// decimal precision (spec.md §4.D `priced_balance_sheets`).
pub fn priced_balance_sheet(
    account: &MarginAccount,
    group: &Group,
    prices: &[Decimal],
    open_orders: &HashMap<Pubkey, OpenOrdersLayout>,
) -> BalanceSheet {
    let intrinsic = intrinsic_balance_sheet(account, group, open_orders);
    let tokens = intrinsic
        .tokens
        .into_iter()
        .zip(&group.basket_tokens)
        .zip(prices)
        .map(|((token_value, bt), price)| {
            let scale = bt.token.decimals as u32;
            TokenValue {
                name: token_value.name,
                liabilities: (token_value.liabilities * price).round_dp(scale),
                settled_assets: (token_value.settled_assets * price).round_dp(scale),
                unsettled_assets: (token_value.unsettled_assets * price).round_dp(scale),
            }
        })
        .collect();
    BalanceSheet { tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use solana_sdk::pubkey::Pubkey;

    use crate::model::{BasketToken, Token};

    fn fixture_group() -> Group {
        Group {
            address: Pubkey::new_unique(),
            basket_tokens: vec![
                BasketToken {
                    index: 0,
                    token: Token { name: "BTC".into(), mint: Pubkey::new_unique(), decimals: 6 },
                    vault: Pubkey::new_unique(),
                },
                BasketToken {
                    index: 1,
                    token: Token { name: "USDT".into(), mint: Pubkey::new_unique(), decimals: 6 },
                    vault: Pubkey::new_unique(),
                },
            ],
            markets: vec![],
            indexes: vec![],
            signer_key: Pubkey::new_unique(),
            dex_program_id: Pubkey::new_unique(),
            total_deposits: vec![],
            total_borrows: vec![],
            maint_coll_ratio: Decimal::ONE,
            init_coll_ratio: Decimal::ONE,
            admin: Pubkey::new_unique(),
            borrow_limits: vec![],
        }
    }

    #[test]
    fn priced_balance_sheet_scales_by_price() {
        let group = fixture_group();
        let account = MarginAccount {
            address: Pubkey::new_unique(),
            group: group.address,
            owner: Pubkey::new_unique(),
            deposits: vec![Decimal::new(2, 0), Decimal::new(100, 0)],
            borrows: vec![Decimal::ZERO, Decimal::new(10, 0)],
            open_orders: vec![],
        };
        let prices = vec![Decimal::new(30000, 0), Decimal::ONE];
        let sheet = priced_balance_sheet(&account, &group, &prices, &HashMap::new());
        assert_eq!(sheet.tokens[0].settled_assets, Decimal::new(60000, 0));
        assert_eq!(sheet.tokens[1].settled_assets, Decimal::new(100, 0));
        assert_eq!(sheet.value(), Decimal::new(60090, 0));
    }

    #[test]
    fn unsettled_open_orders_feed_base_and_quote_slots() {
        let group = fixture_group();
        let open_orders_address = Pubkey::new_unique();
        let account = MarginAccount {
            address: Pubkey::new_unique(),
            group: group.address,
            owner: Pubkey::new_unique(),
            deposits: vec![Decimal::ZERO, Decimal::ZERO],
            borrows: vec![Decimal::ZERO, Decimal::ZERO],
            open_orders: vec![open_orders_address],
        };
        let mut open_orders = HashMap::new();
        open_orders.insert(
            open_orders_address,
            OpenOrdersLayout {
                market: Pubkey::new_unique(),
                owner: group.signer_key,
                base_token_free: 0,
                base_token_total: 1_000_000, // 1.0 BTC at 6 decimals
                quote_token_free: 0,
                quote_token_total: 5_000_000, // 5.0 USDT at 6 decimals
                order_ids: vec![],
                client_ids: vec![],
            },
        );

        let prices = vec![Decimal::new(30000, 0), Decimal::ONE];
        let sheet = priced_balance_sheet(&account, &group, &prices, &open_orders);
        assert_eq!(sheet.tokens[0].unsettled_assets, Decimal::new(30000, 0));
        assert_eq!(sheet.tokens[1].unsettled_assets, Decimal::new(5, 0));
    }
}
