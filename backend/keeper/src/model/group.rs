//! `Group`: the joined, named view of a `GroupLayout` plus the token/market
//! metadata from `ids.json` that the raw account doesn't carry.

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::chain::ChainClient;
use crate::config::GroupIds;
use crate::errors::{BotError, BotResult};
use crate::layout::{group::Index, GroupLayout};

use super::token::{BasketToken, Token};

#[derive(Debug, Clone)]
pub struct MarketMetadata {
    pub name: String,
    /// Index into `Group::basket_tokens` for the quote-denominated base
    /// asset this market trades (the last basket token is always the
    /// shared quote currency and never has a market of its own).
    pub base_token_index: usize,
    pub market_pk: Pubkey,
    pub oracle: Pubkey,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub address: Pubkey,
    pub basket_tokens: Vec<BasketToken>,
    pub markets: Vec<MarketMetadata>,
    pub indexes: Vec<Index>,
    pub signer_key: Pubkey,
    pub dex_program_id: Pubkey,
    pub total_deposits: Vec<Decimal>,
    pub total_borrows: Vec<Decimal>,
    pub maint_coll_ratio: Decimal,
    pub init_coll_ratio: Decimal,
    pub admin: Pubkey,
    pub borrow_limits: Vec<Decimal>,
}

impl Group {
    /// `len(markets) == len(basket_tokens) - 1` always holds: every basket
    /// token but the quote currency trades against quote on its own market
    /// (spec.md §3 invariant I-BASKET).
    pub fn load(chain: &ChainClient, address: Pubkey, ids: &GroupIds) -> BotResult<Self> {
        // `ids.json` keys `symbols` by basket index as a string ("0", "1",
        // ...); sort numerically to recover the on-chain lockstep order.
        let mut ordered_symbols: Vec<(usize, &String)> = ids
            .symbols
            .iter()
            .map(|(k, v)| {
                k.parse::<usize>()
                    .map(|idx| (idx, v))
                    .map_err(|_| BotError::Config(format!("non-numeric symbol index '{k}' in ids.json")))
            })
            .collect::<BotResult<Vec<_>>>()?;
        ordered_symbols.sort_by_key(|(idx, _)| *idx);
        let symbol_names: Vec<String> = ordered_symbols.into_iter().map(|(_, name)| name.clone()).collect();

        let num_tokens = symbol_names.len();
        let num_markets = ids.spot_markets.len();
        if num_markets + 1 != num_tokens {
            return Err(BotError::Config(format!(
                "group {}: expected {} markets for {} basket tokens, ids.json has {}",
                address,
                num_tokens - 1,
                num_tokens,
                num_markets
            )));
        }

        let data = chain.get_account_data(&address)?;
        let raw = GroupLayout::parse(&data, num_tokens, num_markets)?;

        let basket_tokens = symbol_names
            .iter()
            .enumerate()
            .map(|(i, symbol)| BasketToken {
                index: i,
                token: Token {
                    name: symbol.clone(),
                    mint: raw.tokens[i],
                    decimals: raw.mint_decimals[i],
                },
                vault: raw.vaults[i],
            })
            .collect();

        let markets = ids
            .spot_markets
            .iter()
            .enumerate()
            .map(|(i, market_ids)| MarketMetadata {
                name: market_ids.name.clone(),
                base_token_index: i,
                market_pk: raw.spot_markets[i],
                oracle: raw.oracles[i],
            })
            .collect();

        Ok(Group {
            address,
            basket_tokens,
            markets,
            indexes: raw.indexes,
            signer_key: raw.signer_key,
            dex_program_id: raw.dex_program_id,
            total_deposits: raw.total_deposits,
            total_borrows: raw.total_borrows,
            maint_coll_ratio: raw.maint_coll_ratio,
            init_coll_ratio: raw.init_coll_ratio,
            admin: raw.admin,
            borrow_limits: raw.borrow_limits,
        })
    }

    pub fn find_token_by_name(&self, name: &str) -> BotResult<&BasketToken> {
        super::find_unique(
            &self.basket_tokens,
            &name.to_string(),
            |bt| bt.token.name.clone(),
            "basket token",
            name,
        )
    }

    pub fn find_token_by_mint(&self, mint: &Pubkey) -> BotResult<&BasketToken> {
        super::find_unique(&self.basket_tokens, mint, |bt| bt.token.mint, "basket token", &mint.to_string())
    }

    /// Index of the shared quote currency: always the last basket slot
    /// (spec.md §3: "the final basket token is the margin account's
    /// denominating currency").
    pub fn quote_index(&self) -> usize {
        self.basket_tokens.len() - 1
    }
}
