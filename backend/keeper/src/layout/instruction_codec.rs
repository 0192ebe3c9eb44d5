//! Instruction encoding: a 4-byte little-endian discriminator followed by
//! variant-specific fields, over the closed set of 17 variants named in
//! spec.md §4.A. The bot only ever *constructs* `Liquidate` and
//! `ForceCancelOrders` payloads (component E); the rest of the set is
//! modeled so the discriminator table stays exhaustive and future variants
//! don't silently collide.

use rust_decimal::Decimal;

use super::primitives::write_fixed_point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionVariant {
    InitGroup = 0,
    InitMarginAccount = 1,
    Deposit = 2,
    Withdraw = 3,
    Borrow = 4,
    SettleBorrow = 5,
    Liquidate = 6,
    DepositSrm = 7,
    WithdrawSrm = 8,
    PlaceOrder = 9,
    SettleFunds = 10,
    CancelOrder = 11,
    CancelOrderByClientId = 12,
    ChangeBorrowLimit = 13,
    PlaceAndSettle = 14,
    ForceCancelOrders = 15,
    PartialLiquidate = 16,
}

impl InstructionVariant {
    pub fn discriminator(self) -> u32 {
        self as u32
    }

    pub fn from_discriminator(value: u32) -> Option<Self> {
        use InstructionVariant::*;
        Some(match value {
            0 => InitGroup,
            1 => InitMarginAccount,
            2 => Deposit,
            3 => Withdraw,
            4 => Borrow,
            5 => SettleBorrow,
            6 => Liquidate,
            7 => DepositSrm,
            8 => WithdrawSrm,
            9 => PlaceOrder,
            10 => SettleFunds,
            11 => CancelOrder,
            12 => CancelOrderByClientId,
            13 => ChangeBorrowLimit,
            14 => PlaceAndSettle,
            15 => ForceCancelOrders,
            16 => PartialLiquidate,
            _ => return None,
        })
    }
}

fn with_discriminator(variant: InstructionVariant, mut body: Vec<u8>) -> Vec<u8> {
    let mut out = variant.discriminator().to_le_bytes().to_vec();
    out.append(&mut body);
    out
}

/// Variant 6: `deposit_quantities` is one entry per basket token, the
/// amount of that token the liquidator is depositing to cover the
/// protocol's required transfer.
pub fn encode_liquidate(deposit_quantities: &[Decimal]) -> Vec<u8> {
    let mut body = Vec::with_capacity(deposit_quantities.len() * 8);
    for qty in deposit_quantities {
        body.extend_from_slice(&write_fixed_point(*qty, 8));
    }
    with_discriminator(InstructionVariant::Liquidate, body)
}

/// Variant 15: a one-byte `limit` field capping how many resting orders
/// this instruction cancels.
pub fn encode_force_cancel_orders(limit: u8) -> Vec<u8> {
    with_discriminator(InstructionVariant::ForceCancelOrders, vec![limit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_round_trips_over_closed_set() {
        for raw in 0..=16u32 {
            let variant = InstructionVariant::from_discriminator(raw).unwrap();
            assert_eq!(variant.discriminator(), raw);
        }
        assert!(InstructionVariant::from_discriminator(17).is_none());
    }

    #[test]
    fn force_cancel_orders_encodes_discriminator_and_limit() {
        let bytes = encode_force_cancel_orders(5);
        assert_eq!(&bytes[0..4], &15u32.to_le_bytes());
        assert_eq!(bytes[4], 5);
        assert_eq!(bytes.len(), 5);
    }

    #[test]
    fn liquidate_encodes_one_entry_per_token() {
        let bytes = encode_liquidate(&[Decimal::ONE, Decimal::ZERO, Decimal::new(5, 1)]);
        assert_eq!(&bytes[0..4], &6u32.to_le_bytes());
        assert_eq!(bytes.len(), 4 + 3 * 8);
    }
}
