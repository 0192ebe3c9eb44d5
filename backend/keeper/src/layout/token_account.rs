//! TOKEN_ACCOUNT record — the standard SPL token account layout (165
//! bytes): mint, owner, amount, delegate (COption<Pubkey>), state,
//! is_native (COption<u64>), delegated_amount, close_authority
//! (COption<Pubkey>). Used by `TokenAccount.fetch_largest_for_owner_and_
//! token` in `original_source/baseCli.py` to pick the SPL token account
//! with the largest balance when a wallet holds several for the same mint.

use solana_sdk::pubkey::Pubkey;

use super::primitives::{read_pubkey, require_exact_len, write_pubkey};
use crate::errors::BotResult;

pub const TOKEN_ACCOUNT_LEN: usize = 165;

#[derive(Debug, Clone)]
pub struct TokenAccountLayout {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub state: u8,
}

impl TokenAccountLayout {
    pub fn parse(data: &[u8]) -> BotResult<Self> {
        require_exact_len(data, TOKEN_ACCOUNT_LEN)?;

        let mint = read_pubkey(&data[0..32])?;
        let owner = read_pubkey(&data[32..64])?;
        let amount = u64::from_le_bytes(data[64..72].try_into().unwrap());
        // delegate COption<Pubkey> occupies 4 + 32 bytes at offset 72.
        let state = data[108];

        Ok(TokenAccountLayout {
            mint,
            owner,
            amount,
            state,
        })
    }

    /// Re-encodes the record. The delegate/is_native/delegated_amount/
    /// close_authority `COption` fields aren't modeled by this type and are
    /// written as zero (all options absent), matching spec.md §8's
    /// "padding may differ" carve-out.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![0u8; TOKEN_ACCOUNT_LEN];
        out[0..32].copy_from_slice(&write_pubkey(&self.mint));
        out[32..64].copy_from_slice(&write_pubkey(&self.owner));
        out[64..72].copy_from_slice(&self.amount.to_le_bytes());
        out[108] = self.state;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
        let mut buf = vec![0u8; TOKEN_ACCOUNT_LEN];
        buf[0..32].copy_from_slice(&mint.to_bytes());
        buf[32..64].copy_from_slice(&owner.to_bytes());
        buf[64..72].copy_from_slice(&amount.to_le_bytes());
        buf[108] = 1; // initialized
        buf
    }

    #[test]
    fn decodes_mint_owner_and_amount() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let bytes = sample(mint, owner, 123_456);
        let decoded = TokenAccountLayout::parse(&bytes).unwrap();
        assert_eq!(decoded.mint, mint);
        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.amount, 123_456);
        assert_eq!(decoded.state, 1);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(TokenAccountLayout::parse(&[0u8; 50]).is_err());
    }

    #[test]
    fn round_trips_through_serialize_and_parse() {
        let original = TokenAccountLayout {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 987_654,
            state: 1,
        };
        let bytes = original.serialize();
        assert_eq!(bytes.len(), TOKEN_ACCOUNT_LEN);

        let decoded = TokenAccountLayout::parse(&bytes).unwrap();
        assert_eq!(decoded.mint, original.mint);
        assert_eq!(decoded.owner, original.owner);
        assert_eq!(decoded.amount, original.amount);
        assert_eq!(decoded.state, original.state);
    }
}
