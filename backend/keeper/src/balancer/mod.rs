//! Wallet Balancer (component I): keeps the liquidator's own wallet near a
//! configured target mix of tokens after a liquidation changes its
//! holdings, grounded in `original_source/WalletBalancer.py`.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::info;

use crate::chain::ChainClient;
use crate::errors::{BotError, BotResult};
use crate::layout::TokenAccountLayout;
use crate::model::{Group, Token};
use crate::trade::{Side, TradeExecutor};
use crate::wallet::Wallet;

/// A configured target for one token: either a fixed quantity to hold, or
/// a percentage of the wallet's total quote-denominated value
/// (`original_source/WalletBalancer.py`'s `Target` dataclass).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetBalance {
    Fixed(Decimal),
    Percentage(Decimal),
}

impl TargetBalance {
    pub fn resolve(self, total_wallet_value: Decimal) -> Decimal {
        match self {
            TargetBalance::Fixed(amount) => amount,
            TargetBalance::Percentage(pct) => total_wallet_value * pct / Decimal::from(100),
        }
    }
}

/// Parses the `TOKEN:NUMBER` / `TOKEN:NUMBER%` balancer CLI grammar.
#[derive(Debug, Clone)]
pub struct ParsedTargetBalance {
    pub token_name: String,
    pub target: TargetBalance,
}

impl FromStr for ParsedTargetBalance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (token_name, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed target balance '{s}', expected TOKEN:NUMBER[%]"))?;

        let target = if let Some(pct) = rest.strip_suffix('%') {
            let value: Decimal = pct
                .parse()
                .map_err(|_| format!("invalid percentage in target balance '{s}'"))?;
            TargetBalance::Percentage(value)
        } else {
            let value: Decimal = rest
                .parse()
                .map_err(|_| format!("invalid quantity in target balance '{s}'"))?;
            TargetBalance::Fixed(value)
        };

        Ok(ParsedTargetBalance {
            token_name: token_name.to_string(),
            target,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub token: Token,
    /// Positive means the wallet needs to acquire more of this token
    /// (a buy); negative means it holds too much (a sell).
    pub change: Decimal,
}

/// Below this fraction of the wallet's total quote-currency value a change
/// isn't worth a trade's fees and slippage
/// (`original_source/WalletBalancer.py`'s `FilterSmallChanges`). `prices` is
/// one `(Token, price)` pair per token that might appear in `changes`; a
/// token missing from `prices` is treated as worthless rather than
/// defaulting to "always act on it".
pub fn filter_small_changes(
    changes: Vec<BalanceChange>,
    prices: &[(Token, Decimal)],
    total_wallet_value: Decimal,
    action_threshold: Decimal,
) -> Vec<BalanceChange> {
    let floor = action_threshold * total_wallet_value;
    changes
        .into_iter()
        .filter(|c| {
            let price = prices
                .iter()
                .find(|(t, _)| t.mint == c.token.mint)
                .map(|(_, p)| *p)
                .unwrap_or(Decimal::ZERO);
            (c.change * price).abs() > floor
        })
        .collect()
}

pub fn calculate_required_balance_changes(
    current_balances: &[(Token, Decimal)],
    targets: &[(Token, TargetBalance)],
    total_wallet_value: Decimal,
) -> Vec<BalanceChange> {
    targets
        .iter()
        .filter_map(|(token, target)| {
            let current = current_balances
                .iter()
                .find(|(t, _)| t.mint == token.mint)
                .map(|(_, qty)| *qty)
                .unwrap_or(Decimal::ZERO);
            let desired = target.resolve(total_wallet_value);
            let change = desired - current;
            if change.is_zero() {
                None
            } else {
                Some(BalanceChange {
                    token: token.clone(),
                    change,
                })
            }
        })
        .collect()
}

/// Sells before buys: selling first raises the quote-currency balance the
/// subsequent buys draw from (`original_source/WalletBalancer.py`'s
/// `sort_changes_for_trades`).
pub fn sort_changes_for_trades(mut changes: Vec<BalanceChange>) -> Vec<BalanceChange> {
    changes.sort_by(|a, b| a.change.cmp(&b.change));
    changes
}

/// Component I's top-level contract (spec.md §4.I): given the freshly
/// observed oracle prices, restore the wallet to its configured target
/// mix. Each implementation is responsible for fetching its own current
/// balances and configured targets — the processor only supplies prices,
/// matching `original_source/LiquidationProcessor.py`'s
/// `wallet_balancer.balance(prices)` call after a successful liquidation.
pub trait WalletBalancer: Send + Sync {
    fn balance(&self, chain: &ChainClient, group: &Group, prices: &[Decimal]) -> BotResult<()>;
}

pub struct NullWalletBalancer;

impl WalletBalancer for NullWalletBalancer {
    fn balance(&self, _chain: &ChainClient, _group: &Group, _prices: &[Decimal]) -> BotResult<()> {
        info!("dry run: wallet balancer disabled, skipping rebalance");
        Ok(())
    }
}

/// Reads the liquidator wallet's current holdings of every basket token,
/// the native-currency token via its SOL balance, and SPL tokens via their
/// associated token account (`original_source/WalletBalancer.py`'s
/// `get_balances`).
fn fetch_wallet_balances(chain: &ChainClient, wallet: &Wallet, group: &Group) -> Vec<(Token, Decimal)> {
    group
        .basket_tokens
        .iter()
        .map(|bt| {
            let token = bt.token.clone();
            if token.mint == spl_token::native_mint::id() {
                let lamports = chain.get_balance(&wallet.address()).unwrap_or(0);
                return (token.clone(), token.raw_to_decimal(lamports));
            }
            let ata = ChainClient::associated_token_account(&wallet.address(), &token.mint);
            let amount = chain
                .get_account_data(&ata)
                .ok()
                .and_then(|data| TokenAccountLayout::parse(&data).ok())
                .map(|parsed| token.raw_to_decimal(parsed.amount))
                .unwrap_or(Decimal::ZERO);
            (token.clone(), amount)
        })
        .collect()
}

/// Drives component H to actually restore the configured target mix
/// (spec.md §4.I steps 1-7): fetch balances, total the portfolio value in
/// quote terms, resolve targets against that total, filter dust, sort
/// sells-before-buys, and dispatch one trade per surviving delta.
pub struct LiveWalletBalancer<'a, E: TradeExecutor> {
    pub wallet: &'a Wallet,
    pub executor: &'a E,
    pub targets: Vec<(Token, TargetBalance)>,
    pub action_threshold: Decimal,
    pub market_for_token: &'a dyn Fn(&Token) -> BotResult<crate::model::group::MarketMetadata>,
}

impl<'a, E: TradeExecutor> WalletBalancer for LiveWalletBalancer<'a, E> {
    fn balance(&self, chain: &ChainClient, group: &Group, prices: &[Decimal]) -> BotResult<()> {
        let current_balances = fetch_wallet_balances(chain, self.wallet, group);
        let priced: Vec<(Token, Decimal)> = group
            .basket_tokens
            .iter()
            .zip(prices)
            .map(|(bt, price)| (bt.token.clone(), *price))
            .collect();

        let total_wallet_value: Decimal = current_balances
            .iter()
            .map(|(token, balance)| {
                let price = priced
                    .iter()
                    .find(|(t, _)| t.mint == token.mint)
                    .map(|(_, p)| *p)
                    .unwrap_or(Decimal::ZERO);
                balance * price
            })
            .sum();

        let changes = calculate_required_balance_changes(&current_balances, &self.targets, total_wallet_value);
        let changes = filter_small_changes(changes, &priced, total_wallet_value, self.action_threshold);

        for change in sort_changes_for_trades(changes) {
            let market = (self.market_for_token)(&change.token).map_err(|_| BotError::MarketNotInGroup {
                base: change.token.name.clone(),
                quote: "quote".to_string(),
            })?;
            let side = if change.change < Decimal::ZERO { Side::Sell } else { Side::Buy };
            info!(token = %change.token.name, change = %change.change, ?side, "rebalancing wallet");
            self.executor.place_order(chain, &market, side, change.change.abs(), Decimal::ZERO)?;
            self.executor.settle(chain, &market)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn token(name: &str) -> Token {
        Token { name: name.to_string(), mint: Pubkey::new_unique(), decimals: 6 }
    }

    #[test]
    fn parses_fixed_target() {
        let parsed: ParsedTargetBalance = "BTC:1.5".parse().unwrap();
        assert_eq!(parsed.token_name, "BTC");
        assert_eq!(parsed.target, TargetBalance::Fixed(Decimal::new(15, 1)));
    }

    #[test]
    fn parses_percentage_target() {
        let parsed: ParsedTargetBalance = "USDT:50%".parse().unwrap();
        assert_eq!(parsed.target, TargetBalance::Percentage(Decimal::new(50, 0)));
    }

    #[test]
    fn rejects_malformed_grammar() {
        assert!("BTC".parse::<ParsedTargetBalance>().is_err());
    }

    #[test]
    fn filters_changes_below_action_threshold_quote_value() {
        let btc = token("BTC");
        let eth = token("ETH");
        let changes = vec![
            BalanceChange { token: btc.clone(), change: Decimal::new(1, 2) }, // 0.01 BTC * 30000 = 300
            BalanceChange { token: eth.clone(), change: Decimal::new(5, 0) }, // 5 ETH * 2000 = 10000
        ];
        let prices = vec![(btc, Decimal::new(30000, 0)), (eth, Decimal::new(2000, 0))];
        // total wallet value 100_000, action_threshold 1% => floor = 1000
        let filtered = filter_small_changes(changes, &prices, Decimal::new(100_000, 0), Decimal::new(1, 2));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].token.name, "ETH");
    }

    #[test]
    fn missing_price_treats_change_as_dust() {
        let sol = token("SOL");
        let changes = vec![BalanceChange { token: sol, change: Decimal::new(1000, 0) }];
        let filtered = filter_small_changes(changes, &[], Decimal::new(100_000, 0), Decimal::new(1, 2));
        assert!(filtered.is_empty());
    }

    #[test]
    fn sells_sort_before_buys() {
        let changes = vec![
            BalanceChange { token: token("BTC"), change: Decimal::new(5, 0) },
            BalanceChange { token: token("ETH"), change: Decimal::new(-3, 0) },
        ];
        let sorted = sort_changes_for_trades(changes);
        assert_eq!(sorted[0].token.name, "ETH");
    }
}
