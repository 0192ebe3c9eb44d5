//! Instruction Builders (component E): assembles the `AccountMeta` lists
//! and encoded payloads for the two instructions the bot ever submits,
//! `Liquidate` and `ForceCancelOrders`, grounded in
//! `original_source/Liquidation.py`'s `execute` account ordering.

use rust_decimal::Decimal;
use solana_sdk::{instruction::{AccountMeta, Instruction}, pubkey::Pubkey};

use crate::layout::instruction_codec::{encode_force_cancel_orders, encode_liquidate};
use crate::model::{Group, MarginAccount};

/// A liquidator's cap on how many resting orders a single
/// `ForceCancelOrders` instruction touches, named in spec.md §4.E. Larger
/// batches risk exceeding the transaction's compute budget.
pub const LIMIT_PER_INSTRUCTION: u8 = 5;

pub struct LiquidateInstructionBuilder;

impl LiquidateInstructionBuilder {
    /// Emits at most one instruction (spec.md §4.E): among the margin
    /// account's positive-balance (asset) tokens, picks the single token
    /// whose "required deposit" — the account's total liabilities value
    /// converted into that token's units at the current oracle price — the
    /// liquidator's `wallet_balances` can actually cover, and deposits
    /// exactly that much of that one token. Candidate tokens are tried in
    /// basket order; returns `None` if no candidate qualifies, matching
    /// "if none qualifies, the builder returns empty."
    pub fn build(
        program_id: &Pubkey,
        group: &Group,
        liquidated: &MarginAccount,
        liquidator_margin_account: &Pubkey,
        liquidator: &Pubkey,
        wallet_balances: &[Decimal],
        prices: &[Decimal],
    ) -> Option<Instruction> {
        let total_liabilities_value: Decimal = liquidated
            .borrows
            .iter()
            .zip(prices)
            .map(|(borrow, price)| borrow.max(Decimal::ZERO) * price)
            .sum();

        let (deposit_index, required) = liquidated
            .deposits
            .iter()
            .enumerate()
            .filter(|(_, deposit)| **deposit > Decimal::ZERO)
            .find_map(|(i, _)| {
                let price = *prices.get(i)?;
                if price.is_zero() {
                    return None;
                }
                let required = total_liabilities_value / price;
                let available = *wallet_balances.get(i)?;
                (available >= required).then_some((i, required))
            })?;

        let mut deposit_quantities = vec![Decimal::ZERO; group.basket_tokens.len()];
        deposit_quantities[deposit_index] = required;
        let data = encode_liquidate(&deposit_quantities);

        let mut accounts = vec![
            AccountMeta::new_readonly(group.address, false),
            AccountMeta::new(liquidated.address, false),
            AccountMeta::new(*liquidator_margin_account, false),
            AccountMeta::new_readonly(*liquidator, true),
            AccountMeta::new_readonly(group.signer_key, false),
        ];
        for basket_token in &group.basket_tokens {
            accounts.push(AccountMeta::new(basket_token.vault, false));
        }
        for oracle in group.markets.iter().map(|m| m.oracle) {
            accounts.push(AccountMeta::new_readonly(oracle, false));
        }

        Some(Instruction {
            program_id: *program_id,
            accounts,
            data,
        })
    }
}

pub struct ForceCancelOrdersInstructionBuilder;

impl ForceCancelOrdersInstructionBuilder {
    /// One instruction per `LIMIT_PER_INSTRUCTION`-sized chunk of resting
    /// orders on `market`, so a fully-loaded order book doesn't overrun a
    /// transaction's instruction or compute-unit ceiling.
    pub fn build_batch(
        program_id: &Pubkey,
        group: &Group,
        account: &MarginAccount,
        market_index: usize,
        open_orders: &Pubkey,
        order_count: usize,
    ) -> Vec<Instruction> {
        let num_instructions = (order_count + LIMIT_PER_INSTRUCTION as usize - 1)
            / LIMIT_PER_INSTRUCTION as usize;

        (0..num_instructions.max(1))
            .map(|i| {
                let remaining = order_count.saturating_sub(i * LIMIT_PER_INSTRUCTION as usize);
                let limit = remaining.min(LIMIT_PER_INSTRUCTION as usize) as u8;
                let data = encode_force_cancel_orders(limit);
                let accounts = vec![
                    AccountMeta::new_readonly(group.address, false),
                    AccountMeta::new_readonly(group.markets[market_index].market_pk, false),
                    AccountMeta::new(*open_orders, false),
                    AccountMeta::new_readonly(account.address, false),
                    AccountMeta::new_readonly(group.dex_program_id, false),
                ];
                Instruction {
                    program_id: *program_id,
                    accounts,
                    data,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::group::MarketMetadata;

    fn fixture_group_with_one_market() -> Group {
        Group {
            address: Pubkey::new_unique(),
            basket_tokens: vec![],
            markets: vec![MarketMetadata {
                name: "BTC/USDT".into(),
                base_token_index: 0,
                market_pk: Pubkey::new_unique(),
                oracle: Pubkey::new_unique(),
            }],
            indexes: vec![],
            signer_key: Pubkey::new_unique(),
            dex_program_id: Pubkey::new_unique(),
            total_deposits: vec![],
            total_borrows: vec![],
            maint_coll_ratio: Decimal::ONE,
            init_coll_ratio: Decimal::ONE,
            admin: Pubkey::new_unique(),
            borrow_limits: vec![],
        }
    }

    fn fixture_group_with_two_tokens() -> Group {
        use crate::model::token::{BasketToken, Token};
        let eth = Token { name: "ETH".into(), mint: Pubkey::new_unique(), decimals: 9 };
        let usdt = Token { name: "USDT".into(), mint: Pubkey::new_unique(), decimals: 6 };
        Group {
            address: Pubkey::new_unique(),
            basket_tokens: vec![
                BasketToken { index: 0, token: eth, vault: Pubkey::new_unique() },
                BasketToken { index: 1, token: usdt, vault: Pubkey::new_unique() },
            ],
            markets: vec![MarketMetadata {
                name: "ETH/USDT".into(),
                base_token_index: 0,
                market_pk: Pubkey::new_unique(),
                oracle: Pubkey::new_unique(),
            }],
            indexes: vec![],
            signer_key: Pubkey::new_unique(),
            dex_program_id: Pubkey::new_unique(),
            total_deposits: vec![],
            total_borrows: vec![],
            maint_coll_ratio: Decimal::new(11, 1),
            init_coll_ratio: Decimal::new(15, 1),
            admin: Pubkey::new_unique(),
            borrow_limits: vec![],
        }
    }

    #[test]
    fn liquidate_builder_selects_qualifying_token() {
        let program_id = Pubkey::new_unique();
        let group = fixture_group_with_two_tokens();
        let account = crate::model::MarginAccount {
            address: Pubkey::new_unique(),
            group: group.address,
            owner: Pubkey::new_unique(),
            deposits: vec![Decimal::new(1, 1), Decimal::ZERO], // 0.1 ETH, asset token
            borrows: vec![Decimal::ZERO, Decimal::new(1000, 0)], // 1000 USDT liability
            open_orders: vec![],
        };
        let prices = vec![Decimal::new(2000, 0), Decimal::ONE]; // ETH=2000, USDT=1
        let liquidator_margin_account = Pubkey::new_unique();
        let liquidator = Pubkey::new_unique();

        // Wallet holds 0.4 ETH: required = 1000 liability value / 2000 price = 0.5 ETH, not enough.
        let insufficient = LiquidateInstructionBuilder::build(
            &program_id,
            &group,
            &account,
            &liquidator_margin_account,
            &liquidator,
            &[Decimal::new(4, 1), Decimal::ZERO],
            &prices,
        );
        assert!(insufficient.is_none());

        // Wallet holds 0.6 ETH: enough to cover the 0.5 ETH requirement.
        let sufficient = LiquidateInstructionBuilder::build(
            &program_id,
            &group,
            &account,
            &liquidator_margin_account,
            &liquidator,
            &[Decimal::new(6, 1), Decimal::ZERO],
            &prices,
        );
        assert!(sufficient.is_some());
        let instruction = sufficient.unwrap();
        assert_eq!(&instruction.data[0..4], &6u32.to_le_bytes()); // Liquidate discriminator
    }

    #[test]
    fn force_cancel_batches_split_on_limit() {
        let program_id = Pubkey::new_unique();
        let group = fixture_group_with_one_market();
        let account = crate::model::MarginAccount {
            address: Pubkey::new_unique(),
            group: group.address,
            owner: Pubkey::new_unique(),
            deposits: vec![],
            borrows: vec![],
            open_orders: vec![],
        };
        let open_orders = Pubkey::new_unique();

        let batch = ForceCancelOrdersInstructionBuilder::build_batch(
            &program_id,
            &group,
            &account,
            0,
            &open_orders,
            12,
        );
        assert_eq!(batch.len(), 3); // ceil(12/5)
        assert_eq!(batch[0].data[4], 5);
        assert_eq!(batch[1].data[4], 5);
        assert_eq!(batch[2].data[4], 2); // trailing partial chunk
    }

    #[test]
    fn force_cancel_single_instruction_carries_actual_order_count() {
        let program_id = Pubkey::new_unique();
        let group = fixture_group_with_one_market();
        let account = crate::model::MarginAccount {
            address: Pubkey::new_unique(),
            group: group.address,
            owner: Pubkey::new_unique(),
            deposits: vec![],
            borrows: vec![],
            open_orders: vec![],
        };
        let open_orders = Pubkey::new_unique();

        let batch = ForceCancelOrdersInstructionBuilder::build_batch(
            &program_id,
            &group,
            &account,
            0,
            &open_orders,
            3,
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].data[4], 3);
    }
}
