//! `MarginAccount`: a joined view of a `MarginAccountLayout` against its
//! owning `Group`, with raw deposit/borrow shares converted to actual token
//! amounts via the group's deposit/borrow indexes (spec.md §3: "a deposit
//! share is multiplied by `indexes[i].deposit` to get the actual token
//! amount currently owed to the depositor").

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::chain::ChainClient;
use crate::errors::BotResult;
use crate::layout::MarginAccountLayout;

use super::group::Group;

#[derive(Debug, Clone)]
pub struct MarginAccount {
    pub address: Pubkey,
    pub group: Pubkey,
    pub owner: Pubkey,
    /// Actual token amounts, one per basket slot, after index scaling.
    pub deposits: Vec<Decimal>,
    pub borrows: Vec<Decimal>,
    /// One open-orders address per market slot; `Pubkey::default()` means
    /// no open-orders account has been created for that market yet.
    pub open_orders: Vec<Pubkey>,
}

impl MarginAccount {
    pub fn load(chain: &ChainClient, address: Pubkey, group: &Group) -> BotResult<Self> {
        let data = chain.get_account_data(&address)?;
        let num_tokens = group.basket_tokens.len();
        let num_markets = group.markets.len();
        let raw = MarginAccountLayout::parse(&data, num_tokens, num_markets)?;

        let deposits = raw
            .deposits
            .iter()
            .zip(&group.indexes)
            .map(|(share, index)| share * index.deposit)
            .collect();
        let borrows = raw
            .borrows
            .iter()
            .zip(&group.indexes)
            .map(|(share, index)| share * index.borrow)
            .collect();

        Ok(MarginAccount {
            address,
            group: raw.group,
            owner: raw.owner,
            deposits,
            borrows,
            open_orders: raw.open_orders,
        })
    }
}
