use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::errors::{BotError, BotResult};

/// Operator wallet: a keypair loaded from a JSON array of 32 or 64 bytes.
/// Only the first 32 bytes (the secret key seed) are used, matching
/// `original_source/Wallet.py`.
pub struct Wallet {
    pub keypair: Keypair,
}

impl Wallet {
    pub fn load(path: &str) -> BotResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Wallet(format!("reading '{path}': {e}")))?;
        let bytes: Vec<u8> = serde_json::from_str(&raw)
            .map_err(|e| BotError::Wallet(format!("parsing '{path}': {e}")))?;

        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(BotError::Wallet(format!(
                "wallet file '{path}' must contain 32 or 64 bytes, found {}",
                bytes.len()
            )));
        }

        let seed = &bytes[0..32];
        let keypair = solana_sdk::signer::keypair::keypair_from_seed(seed)
            .map_err(|e| BotError::Wallet(format!("invalid keypair seed: {e}")))?;

        Ok(Wallet { keypair })
    }

    pub fn address(&self) -> solana_sdk::pubkey::Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let mut path = std::env::temp_dir();
        path.push(format!("wallet_test_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&vec![1u8; 10]).unwrap()).unwrap();

        let result = Wallet::load(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);

        assert!(result.is_err());
    }

    #[test]
    fn loads_32_byte_seed() {
        let mut path = std::env::temp_dir();
        path.push(format!("wallet_test_seed_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&vec![7u8; 32]).unwrap()).unwrap();

        let result = Wallet::load(path.to_str().unwrap());
        let _ = std::fs::remove_file(&path);

        assert!(result.is_ok());
    }
}
