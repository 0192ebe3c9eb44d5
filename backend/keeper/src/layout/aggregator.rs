//! AGGREGATOR record — the Chainlink-style on-chain median price oracle
//! used by mango groups. Mirrors `original_source/Layout.py`'s
//! `AGGREGATOR_CONFIG` / `ROUND` / `ANSWER` / `AGGREGATOR` structs.

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use super::primitives::{read_pubkey, read_uint, require_exact_len, write_pubkey, write_uint};
use crate::errors::BotResult;

const DESCRIPTION_LEN: usize = 32;

pub const AGGREGATOR_CONFIG_LEN: usize = DESCRIPTION_LEN + 1 + 1 + 1 + 1 + 8 + 32;
pub const ROUND_LEN: usize = 8 + 8 + 8;
pub const ANSWER_LEN: usize = 8 + 8 + 8 + 8;
pub const AGGREGATOR_LEN: usize =
    AGGREGATOR_CONFIG_LEN + 1 + 32 + ROUND_LEN + 32 + ANSWER_LEN + 32;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub description: String,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub round_id: u64,
    pub median: Decimal,
}

/// A decoded Aggregator (oracle) account. `price()` applies the declared
/// decimal exponent per spec.md §3: `price = median / 10^decimals`.
#[derive(Debug, Clone)]
pub struct AggregatorLayout {
    pub config: AggregatorConfig,
    pub owner: Pubkey,
    pub answer: Answer,
}

impl AggregatorLayout {
    pub fn parse(data: &[u8]) -> BotResult<Self> {
        require_exact_len(data, AGGREGATOR_LEN)?;

        let description_bytes = &data[0..DESCRIPTION_LEN];
        let description = String::from_utf8_lossy(description_bytes)
            .trim_end_matches('\0')
            .to_string();
        let mut offset = DESCRIPTION_LEN;

        let decimals = data[offset];
        offset += 1 + 1 + 1 + 1; // decimals, restart_delay, max_submissions, min_submissions
        offset += 8; // reward_amount
        offset += 32; // reward_token_account

        offset += 1; // initialized
        let owner = read_pubkey(&data[offset..offset + 32])?;
        offset += 32;

        offset += ROUND_LEN; // round
        offset += 32; // round_submissions

        let round_id: u64 = read_uint(&data[offset..offset + 8], 8)?
            .try_into()
            .unwrap_or(0);
        offset += 8;
        let median = read_uint(&data[offset..offset + 8], 8)?;
        offset += 8;
        // created_at, updated_at timestamps follow; not needed downstream.

        Ok(AggregatorLayout {
            config: AggregatorConfig {
                description,
                decimals,
            },
            owner,
            answer: Answer { round_id, median },
        })
    }

    /// `price = median / 10^decimals`, per spec.md §3.
    pub fn price(&self) -> Decimal {
        let scale = self.config.decimals as u32;
        self.answer.median / Decimal::from(10u64.pow(scale.min(18)))
    }

    /// Re-encodes the record. Fields this layout doesn't model (round
    /// submission counts, reward account, round/created/updated
    /// timestamps) are written as zero, matching spec.md §8's "padding may
    /// differ" carve-out.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0u8; AGGREGATOR_LEN];

        let description_bytes = self.config.description.as_bytes();
        let copy_len = description_bytes.len().min(DESCRIPTION_LEN);
        out[0..copy_len].copy_from_slice(&description_bytes[0..copy_len]);

        let mut offset = DESCRIPTION_LEN;
        out[offset] = self.config.decimals;
        offset += 1 + 1 + 1 + 1;
        offset += 8; // reward_amount
        offset += 32; // reward_token_account

        offset += 1; // initialized
        out[offset..offset + 32].copy_from_slice(&write_pubkey(&self.owner));
        offset += 32;

        offset += ROUND_LEN;
        offset += 32; // round_submissions

        out[offset..offset + 8].copy_from_slice(&write_uint(self.answer.round_id, 8));
        offset += 8;
        let median: u64 = self.answer.median.try_into().unwrap_or(0);
        out[offset..offset + 8].copy_from_slice(&write_uint(median, 8));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes(median: u64, decimals: u8) -> Vec<u8> {
        let mut buf = vec![0u8; AGGREGATOR_LEN];
        buf[DESCRIPTION_LEN] = decimals;
        let owner_offset = DESCRIPTION_LEN + 4 + 8 + 32 + 1;
        buf[owner_offset..owner_offset + 32].copy_from_slice(&[3u8; 32]);
        let round_id_offset = owner_offset + 32 + ROUND_LEN + 32;
        buf[round_id_offset..round_id_offset + 8].copy_from_slice(&7u64.to_le_bytes());
        let median_offset = round_id_offset + 8;
        buf[median_offset..median_offset + 8].copy_from_slice(&median.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_price_with_declared_exponent() {
        let bytes = sample_bytes(60_000_00, 2); // $60,000.00
        let aggregator = AggregatorLayout::parse(&bytes).unwrap();
        assert_eq!(aggregator.answer.round_id, 7);
        assert_eq!(aggregator.price(), Decimal::new(6_000_000, 2));
    }

    #[test]
    fn rejects_wrong_length() {
        let err = AggregatorLayout::parse(&[0u8; 10]);
        assert!(err.is_err());
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let original = AggregatorLayout {
            config: AggregatorConfig {
                description: "BTC/USDT".to_string(),
                decimals: 6,
            },
            owner: Pubkey::new_unique(),
            answer: Answer {
                round_id: 11,
                // The on-chain field is a plain integer; `price()` applies
                // the declared decimal exponent on read, so the raw median
                // stored here must itself be integer-valued to round-trip.
                median: Decimal::from(60_123_456u64),
            },
        };
        let bytes = original.serialize();
        assert_eq!(bytes.len(), AGGREGATOR_LEN);

        let decoded = AggregatorLayout::parse(&bytes).unwrap();
        assert_eq!(decoded.config.description, original.config.description);
        assert_eq!(decoded.config.decimals, original.config.decimals);
        assert_eq!(decoded.owner, original.owner);
        assert_eq!(decoded.answer.round_id, original.answer.round_id);
        assert_eq!(decoded.answer.median, original.answer.median);
    }
}
