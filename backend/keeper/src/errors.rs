use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Every fallible outcome the bot can produce, from chain I/O down to
/// malformed account data. Kept as one enum (rather than per-module errors)
/// so `_liquidate_all` and the supervisor ticks can log-and-continue on any
/// of them without matching a dozen types.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("rpc error {code}: {message}")]
    Rpc { message: String, code: i64 },

    #[error("malformed account data: expected {expected_len} bytes, got {actual_len}")]
    MalformedAccountData {
        expected_len: usize,
        actual_len: usize,
    },

    #[error("{what} lookup miss for key '{key}'")]
    LookupMiss { what: &'static str, key: String },

    #[error("{what} lookup ambiguous for key '{key}': {count} matches")]
    LookupAmbiguous {
        what: &'static str,
        key: String,
        count: usize,
    },

    #[error("wallet has no token account for {token}")]
    NoSourceTokenAccount { token: String },

    #[error("market for {base}/{quote} not in group")]
    MarketNotInGroup { base: String, quote: String },

    #[error("confirmation of {sig} timed out")]
    ConfirmationTimeout { sig: Signature },

    #[error("liquidation of {account} failed: {cause}")]
    LiquidationFailed {
        account: Pubkey,
        #[source]
        cause: Box<BotError>,
    },

    #[error("wallet file error: {0}")]
    Wallet(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type BotResult<T> = Result<T, BotError>;

impl From<solana_client::client_error::ClientError> for BotError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        use solana_client::client_error::ClientErrorKind;
        match err.kind() {
            ClientErrorKind::RpcError(solana_client::rpc_request::RpcError::RpcResponseError {
                code,
                message,
                ..
            }) => BotError::Rpc {
                message: message.clone(),
                code: *code,
            },
            _ => BotError::Rpc {
                message: err.to_string(),
                code: -1,
            },
        }
    }
}
