//! `BalanceSheet`: the per-token liabilities/settled/unsettled view used
//! both in raw token units (the "intrinsic" balance sheet) and in
//! quote-currency value (the "priced" balance sheet) — the shape is
//! identical in both cases, per spec.md §3's `BalanceSheet` definition and
//! `original_source/Liquidation.py`'s `BalanceSheet`/`TokenValue`.

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenValue {
    pub name: String,
    pub liabilities: Decimal,
    pub settled_assets: Decimal,
    pub unsettled_assets: Decimal,
}

impl TokenValue {
    pub fn assets(&self) -> Decimal {
        self.settled_assets + self.unsettled_assets
    }

    pub fn value(&self) -> Decimal {
        self.assets() - self.liabilities
    }

    /// `assets / liabilities`, or 0 when there are no liabilities (spec.md
    /// §3: "collateral_ratio = assets / liabilities (or 0 if liabilities
    /// are 0)").
    pub fn collateral_ratio(&self) -> Decimal {
        if self.liabilities.is_zero() {
            Decimal::ZERO
        } else {
            self.assets() / self.liabilities
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    pub tokens: Vec<TokenValue>,
}

impl BalanceSheet {
    pub fn assets(&self) -> Decimal {
        self.tokens.iter().map(TokenValue::assets).sum()
    }

    pub fn liabilities(&self) -> Decimal {
        self.tokens.iter().map(|t| t.liabilities).sum()
    }

    pub fn value(&self) -> Decimal {
        self.assets() - self.liabilities()
    }

    pub fn collateral_ratio(&self) -> Decimal {
        let liabilities = self.liabilities();
        if liabilities.is_zero() {
            Decimal::ZERO
        } else {
            self.assets() / liabilities
        }
    }

    /// A single synthetic totals row whose name concatenates every
    /// constituent token's name, per spec.md §4.D `balance_sheet_totals`.
    pub fn totals(&self) -> TokenValue {
        let name = self.tokens.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join("");
        TokenValue {
            name,
            liabilities: self.liabilities(),
            settled_assets: self.tokens.iter().map(|t| t.settled_assets).sum(),
            unsettled_assets: self.tokens.iter().map(|t| t.unsettled_assets).sum(),
        }
    }
}

/// Per-token `value` deltas between two balance-sheet snapshots, matched by
/// token name — the "balance-changes law" testable property in spec.md
/// §8: `changes(before, after)[i].value == after[i].value - before[i].value`
/// for every token present in both.
pub fn changes(before: &[TokenValue], after: &[TokenValue]) -> Vec<(String, Decimal)> {
    after
        .iter()
        .filter_map(|a| {
            before
                .iter()
                .find(|b| b.name == a.name)
                .map(|b| (a.name.clone(), a.value() - b.value()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: &str, liabilities: i64, settled: i64, unsettled: i64) -> TokenValue {
        TokenValue {
            name: name.to_string(),
            liabilities: Decimal::new(liabilities, 0),
            settled_assets: Decimal::new(settled, 0),
            unsettled_assets: Decimal::new(unsettled, 0),
        }
    }

    #[test]
    fn value_is_assets_minus_liabilities() {
        let t = token("BTC", 50, 150, 50);
        assert_eq!(t.assets(), Decimal::new(200, 0));
        assert_eq!(t.value(), Decimal::new(150, 0));
    }

    #[test]
    fn collateral_ratio_is_zero_with_no_liabilities() {
        let t = token("BTC", 0, 150, 50);
        assert_eq!(t.collateral_ratio(), Decimal::ZERO);
    }

    #[test]
    fn collateral_ratio_divides_assets_by_liabilities() {
        let t = token("BTC", 100, 150, 50);
        assert_eq!(t.collateral_ratio(), Decimal::new(2, 0));
    }

    #[test]
    fn sheet_totals_sum_every_token() {
        let sheet = BalanceSheet {
            tokens: vec![token("BTC", 50, 200, 0), token("USDT", 30, 10, 0)],
        };
        assert_eq!(sheet.assets(), Decimal::new(210, 0));
        assert_eq!(sheet.liabilities(), Decimal::new(80, 0));
        assert_eq!(sheet.value(), Decimal::new(130, 0));
        assert_eq!(sheet.totals().name, "BTCUSDT");
    }

    #[test]
    fn changes_law_matches_value_delta() {
        let before = vec![token("BTC", 100, 200, 0)]; // value 100
        let after = vec![token("BTC", 50, 200, 0)]; // value 150
        let deltas = changes(&before, &after);
        assert_eq!(deltas, vec![("BTC".to_string(), Decimal::new(50, 0))]);
    }
}
