//! Component A — Binary Layout Codec.
//!
//! Decodes the chain's fixed-size account blobs into the typed records
//! consumed by the rest of the bot, and encodes instruction payloads back
//! into bytes. Every parser here rejects input of the wrong length before
//! touching a single field (`primitives::require_exact_len`), matching
//! spec.md §4.A and the round-trip/length-gate properties in §8.

pub mod aggregator;
pub mod group;
pub mod instruction_codec;
pub mod margin_account;
pub mod open_orders;
pub mod primitives;
pub mod token_account;

pub use aggregator::AggregatorLayout;
pub use group::GroupLayout;
pub use margin_account::MarginAccountLayout;
pub use open_orders::OpenOrdersLayout;
pub use token_account::TokenAccountLayout;
