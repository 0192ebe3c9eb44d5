//! MARGIN_ACCOUNT record. Mirrors `original_source/Layout.py`'s
//! `MARGIN_ACCOUNT` struct: flags, group address, owner, N deposits, N
//! borrows, M open-orders addresses, then 8 bytes of padding.

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use super::primitives::{read_fixed_point, read_pubkey, require_exact_len, write_fixed_point};
use crate::errors::{BotError, BotResult};

const FLAGS_LEN: usize = 8;
const FIXED_POINT_WIDTH: usize = 16;
const PADDING_LEN: usize = 8;

pub fn record_len(num_tokens: usize, num_markets: usize) -> usize {
    FLAGS_LEN
        + 32 // mango_group
        + 32 // owner
        + num_tokens * FIXED_POINT_WIDTH // deposits
        + num_tokens * FIXED_POINT_WIDTH // borrows
        + num_markets * 32 // open_orders
        + PADDING_LEN
}

#[derive(Debug, Clone)]
pub struct MarginAccountLayout {
    pub margin_account_flag: bool,
    pub group: Pubkey,
    pub owner: Pubkey,
    pub deposits: Vec<Decimal>,
    pub borrows: Vec<Decimal>,
    pub open_orders: Vec<Pubkey>,
}

impl MarginAccountLayout {
    pub fn parse(data: &[u8], num_tokens: usize, num_markets: usize) -> BotResult<Self> {
        let expected = record_len(num_tokens, num_markets);
        require_exact_len(data, expected)?;

        let flags_byte = data[0];
        // Bit index 2 ("margin_account") in the swapped MANGO_ACCOUNT_FLAGS
        // bit struct, matching `original_source/Layout.py`'s
        // `MANGO_ACCOUNT_FLAGS`.
        let margin_account_flag = (flags_byte >> 5) & 1 == 1;

        let mut offset = FLAGS_LEN;
        let group = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;
        let owner = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;

        let mut deposits = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            deposits.push(read_fixed_point(&data[offset..offset + FIXED_POINT_WIDTH], FIXED_POINT_WIDTH)?);
            offset += FIXED_POINT_WIDTH;
        }

        let mut borrows = Vec::with_capacity(num_tokens);
        for _ in 0..num_tokens {
            borrows.push(read_fixed_point(&data[offset..offset + FIXED_POINT_WIDTH], FIXED_POINT_WIDTH)?);
            offset += FIXED_POINT_WIDTH;
        }

        let mut open_orders = Vec::with_capacity(num_markets);
        for _ in 0..num_markets {
            open_orders.push(read_pubkey(&data[offset..offset + 32])?);
            offset += 32;
        }

        if !margin_account_flag {
            return Err(BotError::MalformedAccountData {
                expected_len: expected,
                actual_len: data.len(),
            });
        }

        Ok(MarginAccountLayout {
            margin_account_flag,
            group,
            owner,
            deposits,
            borrows,
            open_orders,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let num_tokens = self.deposits.len();
        let num_markets = self.open_orders.len();
        let mut out = Vec::with_capacity(record_len(num_tokens, num_markets));

        let mut flags = 0u8;
        if self.margin_account_flag {
            flags |= 1 << 5;
        }
        out.push(flags);
        out.extend_from_slice(&[0u8; FLAGS_LEN - 1]);
        out.extend_from_slice(&self.group.to_bytes());
        out.extend_from_slice(&self.owner.to_bytes());
        for d in &self.deposits {
            out.extend_from_slice(&write_fixed_point(*d, FIXED_POINT_WIDTH));
        }
        for b in &self.borrows {
            out.extend_from_slice(&write_fixed_point(*b, FIXED_POINT_WIDTH));
        }
        for oo in &self.open_orders {
            out.extend_from_slice(&oo.to_bytes());
        }
        out.extend_from_slice(&[0u8; PADDING_LEN]);
        out
    }
}
