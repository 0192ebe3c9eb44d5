//! `Token`/`BasketToken`: the name+mint+decimals metadata Mango's on-chain
//! layouts don't carry themselves, joined in from `ids.json`
//! (`original_source/Context.py`'s `Token` dataclass).

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone)]
pub struct Token {
    pub name: String,
    pub mint: Pubkey,
    pub decimals: u8,
}

/// Equality is by mint alone (spec.md §3: "Equality is by mint"), not by
/// name or decimals — two `Token`s describing the same on-chain mint under
/// different display names (or decoded with different precision) are
/// still the same token.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.mint == other.mint
    }
}

impl Eq for Token {}

impl Token {
    /// Converts a raw on-chain integer quantity (lamports-equivalent) to a
    /// human quantity, dividing by `10^decimals`.
    pub fn raw_to_decimal(&self, raw: u64) -> Decimal {
        Decimal::from(raw) / Decimal::from(10u64.pow(self.decimals as u32))
    }
}

/// A token plus its slot index within a `Group`'s basket arrays (spec.md
/// §3: "basket index `i` indexes `tokens`, `vaults`, `indexes`,
/// `total_deposits`, `total_borrows`, `borrow_limits`, `mint_decimals` in
/// lockstep").
#[derive(Debug, Clone)]
pub struct BasketToken {
    pub index: usize,
    pub token: Token,
    pub vault: Pubkey,
}
