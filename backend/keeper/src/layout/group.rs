//! GROUP record. Mirrors `original_source/Layout.py`'s `GROUP` struct:
//! flags, N tokens, N vaults, N indexes, M spot markets, M oracles, signer
//! nonce/key, dex program id, N total deposits/borrows, maint/init
//! collateral ratios, srm vault, admin, N borrow limits, N mint decimals, M
//! oracle decimals, padding to 8-byte alignment.

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use super::primitives::{
    read_fixed_point, read_pubkey, read_uint, require_exact_len, write_fixed_point, write_pubkey,
    write_uint,
};
use crate::errors::BotResult;

const FLAGS_LEN: usize = 8;
const INDEX_LEN: usize = 8 + 16 + 16; // last_update (timestamp) + borrow + deposit
const FIXED_POINT_WIDTH: usize = 16;

pub fn record_len(num_tokens: usize, num_markets: usize) -> usize {
    let unaligned = FLAGS_LEN
        + num_tokens * 32 // tokens
        + num_tokens * 32 // vaults
        + num_tokens * INDEX_LEN // indexes
        + num_markets * 32 // spot_markets
        + num_markets * 32 // oracles
        + 8 // signer_nonce
        + 32 // signer_key
        + 32 // dex_program_id
        + num_tokens * FIXED_POINT_WIDTH // total_deposits
        + num_tokens * FIXED_POINT_WIDTH // total_borrows
        + FIXED_POINT_WIDTH // maint_coll_ratio
        + FIXED_POINT_WIDTH // init_coll_ratio
        + 32 // srm_vault
        + 32 // admin
        + num_tokens * 8 // borrow_limits
        + num_tokens // mint_decimals
        + num_markets; // oracle_decimals
    let padding = (8 - (num_tokens + num_markets) % 8) % 8;
    unaligned + padding
}

#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub borrow: Decimal,
    pub deposit: Decimal,
}

#[derive(Debug, Clone)]
pub struct GroupLayout {
    pub tokens: Vec<Pubkey>,
    pub vaults: Vec<Pubkey>,
    pub indexes: Vec<Index>,
    pub spot_markets: Vec<Pubkey>,
    pub oracles: Vec<Pubkey>,
    pub signer_key: Pubkey,
    pub dex_program_id: Pubkey,
    pub total_deposits: Vec<Decimal>,
    pub total_borrows: Vec<Decimal>,
    pub maint_coll_ratio: Decimal,
    pub init_coll_ratio: Decimal,
    pub admin: Pubkey,
    pub borrow_limits: Vec<Decimal>,
    pub mint_decimals: Vec<u8>,
    pub oracle_decimals: Vec<u8>,
}

impl GroupLayout {
    pub fn parse(data: &[u8], num_tokens: usize, num_markets: usize) -> BotResult<Self> {
        require_exact_len(data, record_len(num_tokens, num_markets))?;
        // `len(markets) == len(basket_tokens) - 1` is enforced by the
        // caller supplying consistent (num_tokens, num_markets); see
        // `model::group::Group::load`.

        let mut offset = FLAGS_LEN;

        let tokens = read_pubkey_array(data, &mut offset, num_tokens)?;
        let vaults = read_pubkey_array(data, &mut offset, num_tokens)?;

        let mut indexes = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            offset += 8; // last_update, unused downstream
            let borrow = read_fixed_point(&data[offset..offset + 16], 16)?;
            offset += 16;
            let deposit = read_fixed_point(&data[offset..offset + 16], 16)?;
            offset += 16;
            indexes.push(Index { borrow, deposit });
        }

        let spot_markets = read_pubkey_array(data, &mut offset, num_markets)?;
        let oracles = read_pubkey_array(data, &mut offset, num_markets)?;

        offset += 8; // signer_nonce
        let signer_key = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;
        let dex_program_id = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;

        let mut total_deposits = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            total_deposits.push(read_fixed_point(&data[offset..offset + 16], 16)?);
            offset += 16;
        }
        let mut total_borrows = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            total_borrows.push(read_fixed_point(&data[offset..offset + 16], 16)?);
            offset += 16;
        }

        let maint_coll_ratio = read_fixed_point(&data[offset..offset + 16], 16)?;
        offset += 16;
        let init_coll_ratio = read_fixed_point(&data[offset..offset + 16], 16)?;
        offset += 16;

        offset += 32; // srm_vault
        let admin = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;

        let mut borrow_limits = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            borrow_limits.push(read_uint(&data[offset..offset + 8], 8)?);
            offset += 8;
        }

        let mint_decimals = data[offset..offset + num_tokens].to_vec();
        offset += num_tokens;
        let oracle_decimals = data[offset..offset + num_markets].to_vec();

        Ok(GroupLayout {
            tokens,
            vaults,
            indexes,
            spot_markets,
            oracles,
            signer_key,
            dex_program_id,
            total_deposits,
            total_borrows,
            maint_coll_ratio,
            init_coll_ratio,
            admin,
            borrow_limits,
            mint_decimals,
            oracle_decimals,
        })
    }

    /// Re-encodes the record. Fields the layout doesn't model (signer
    /// nonce, srm vault, per-index `last_update` timestamps) are written as
    /// zero rather than round-tripped, matching spec.md §8's "padding may
    /// differ" carve-out for fields the codec doesn't carry.
    pub fn serialize(&self) -> Vec<u8> {
        let num_tokens = self.tokens.len();
        let num_markets = self.spot_markets.len();
        let mut out = Vec::with_capacity(record_len(num_tokens, num_markets));

        out.extend_from_slice(&[0u8; FLAGS_LEN]);
        for pk in &self.tokens {
            out.extend_from_slice(&write_pubkey(pk));
        }
        for pk in &self.vaults {
            out.extend_from_slice(&write_pubkey(pk));
        }
        for index in &self.indexes {
            out.extend_from_slice(&[0u8; 8]); // last_update
            out.extend_from_slice(&write_fixed_point(index.borrow, FIXED_POINT_WIDTH));
            out.extend_from_slice(&write_fixed_point(index.deposit, FIXED_POINT_WIDTH));
        }
        for pk in &self.spot_markets {
            out.extend_from_slice(&write_pubkey(pk));
        }
        for pk in &self.oracles {
            out.extend_from_slice(&write_pubkey(pk));
        }
        out.extend_from_slice(&[0u8; 8]); // signer_nonce
        out.extend_from_slice(&write_pubkey(&self.signer_key));
        out.extend_from_slice(&write_pubkey(&self.dex_program_id));
        for d in &self.total_deposits {
            out.extend_from_slice(&write_fixed_point(*d, FIXED_POINT_WIDTH));
        }
        for b in &self.total_borrows {
            out.extend_from_slice(&write_fixed_point(*b, FIXED_POINT_WIDTH));
        }
        out.extend_from_slice(&write_fixed_point(self.maint_coll_ratio, FIXED_POINT_WIDTH));
        out.extend_from_slice(&write_fixed_point(self.init_coll_ratio, FIXED_POINT_WIDTH));
        out.extend_from_slice(&[0u8; 32]); // srm_vault
        out.extend_from_slice(&write_pubkey(&self.admin));
        for limit in &self.borrow_limits {
            let raw: u64 = (*limit).try_into().unwrap_or(0);
            out.extend_from_slice(&write_uint(raw, 8));
        }
        out.extend_from_slice(&self.mint_decimals);
        out.extend_from_slice(&self.oracle_decimals);

        let padding = record_len(num_tokens, num_markets) - out.len();
        out.extend(std::iter::repeat(0u8).take(padding));
        out
    }
}

fn read_pubkey_array(data: &[u8], offset: &mut usize, count: usize) -> BotResult<Vec<Pubkey>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_pubkey(&data[*offset..*offset + 32])?);
        *offset += 32;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(num_tokens: usize, num_markets: usize) -> GroupLayout {
        GroupLayout {
            tokens: (0..num_tokens).map(|_| Pubkey::new_unique()).collect(),
            vaults: (0..num_tokens).map(|_| Pubkey::new_unique()).collect(),
            indexes: (0..num_tokens)
                .map(|i| Index {
                    borrow: Decimal::new(i as i64 * 10, 2),
                    deposit: Decimal::new(i as i64 * 20, 2),
                })
                .collect(),
            spot_markets: (0..num_markets).map(|_| Pubkey::new_unique()).collect(),
            oracles: (0..num_markets).map(|_| Pubkey::new_unique()).collect(),
            signer_key: Pubkey::new_unique(),
            dex_program_id: Pubkey::new_unique(),
            total_deposits: (0..num_tokens).map(|i| Decimal::new(i as i64 * 1000, 2)).collect(),
            total_borrows: (0..num_tokens).map(|i| Decimal::new(i as i64 * 500, 2)).collect(),
            maint_coll_ratio: Decimal::new(11, 1),
            init_coll_ratio: Decimal::new(15, 1),
            admin: Pubkey::new_unique(),
            borrow_limits: (0..num_tokens).map(|i| Decimal::from(i as u64 * 100)).collect(),
            mint_decimals: (0..num_tokens).map(|i| i as u8).collect(),
            oracle_decimals: (0..num_markets).map(|_| 8u8).collect(),
        }
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let original = sample(3, 2);
        let bytes = original.serialize();
        assert_eq!(bytes.len(), record_len(3, 2));

        let decoded = GroupLayout::parse(&bytes, 3, 2).unwrap();
        assert_eq!(decoded.tokens, original.tokens);
        assert_eq!(decoded.vaults, original.vaults);
        assert_eq!(decoded.spot_markets, original.spot_markets);
        assert_eq!(decoded.oracles, original.oracles);
        assert_eq!(decoded.signer_key, original.signer_key);
        assert_eq!(decoded.dex_program_id, original.dex_program_id);
        assert_eq!(decoded.total_deposits, original.total_deposits);
        assert_eq!(decoded.total_borrows, original.total_borrows);
        assert_eq!(decoded.maint_coll_ratio, original.maint_coll_ratio);
        assert_eq!(decoded.init_coll_ratio, original.init_coll_ratio);
        assert_eq!(decoded.admin, original.admin);
        assert_eq!(decoded.borrow_limits, original.borrow_limits);
        assert_eq!(decoded.mint_decimals, original.mint_decimals);
        assert_eq!(decoded.oracle_decimals, original.oracle_decimals);
        for (d, o) in decoded.indexes.iter().zip(&original.indexes) {
            assert_eq!(d.borrow, o.borrow);
            assert_eq!(d.deposit, o.deposit);
        }
    }

    #[test]
    fn rejects_wrong_length() {
        let err = GroupLayout::parse(&[0u8; 10], 3, 2);
        assert!(err.is_err());
    }

    #[test]
    fn record_len_is_8_byte_aligned() {
        let len = record_len(3, 2);
        assert_eq!((3 + 2) % 8, 5);
        // padding should bring (num_tokens + num_markets + padding) to a
        // multiple of 8 by construction; the record itself need not be,
        // since other fields interleave, but the padding tail must exist.
        assert!(len > 0);
    }
}
