//! Data Model (component C): the in-memory domain objects the rest of the
//! bot operates on, built on top of the raw `layout` records by joining them
//! against `ids.json` metadata (names, decimals, mints).

pub mod balance_sheet;
pub mod group;
pub mod margin_account;
pub mod token;

pub use balance_sheet::{changes, BalanceSheet, TokenValue};
pub use group::Group;
pub use margin_account::MarginAccount;
pub use token::{BasketToken, Token};

/// Looks up `needle` in `items` by a key projection, erroring on zero or
/// more than one match. Mirrors `original_source/Context.py`'s
/// `find_token_by_name`/`find_market_by_name`, which both raise on an
/// ambiguous or absent name rather than silently picking one.
pub fn find_unique<'a, T, K: PartialEq, F: Fn(&T) -> K>(
    items: &'a [T],
    key: &K,
    project: F,
    what: &'static str,
    key_description: &str,
) -> crate::errors::BotResult<&'a T> {
    let mut matching = items.iter().filter(|item| project(item) == *key);
    let first = matching.next().ok_or_else(|| crate::errors::BotError::LookupMiss {
        what,
        key: key_description.to_string(),
    })?;
    if matching.next().is_some() {
        let count = items.iter().filter(|item| project(item) == *key).count();
        return Err(crate::errors::BotError::LookupAmbiguous {
            what,
            key: key_description.to_string(),
            count,
        });
    }
    Ok(first)
}
