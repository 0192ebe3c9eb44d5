//! The liquidation event bus and the read-only scout report, grounded in
//! `original_source/Observables.py` (an rx.js-style `Subject` the Python
//! client fans liquidation events out to) and `AccountScout.py` (a report
//! generator that runs the same funnel as `LiquidationProcessor` but never
//! submits a transaction).

use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::broadcast;

/// Published by the Reporting liquidator decorator after a confirmed
/// liquidation attempt (spec.md §4.F variant 4): before/after wallet and
/// margin-account balances plus the submitted signature.
#[derive(Debug, Clone)]
pub struct LiquidationEvent {
    pub timestamp: std::time::SystemTime,
    pub wallet: Pubkey,
    pub margin_account: Pubkey,
    pub signature: Option<String>,
    pub confirmed: bool,
    pub wallet_before: Vec<Decimal>,
    pub wallet_after: Vec<Decimal>,
}

/// A single margin account's funnel classification, as produced by
/// `LiquidationProcessor::classify`/`scout` — the same funnel
/// `liquidate_all` applies (spec.md §4.G steps 4-6).
#[derive(Debug, Clone)]
pub struct MarginAccountMetadata {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub net_value: Decimal,
    pub collateral_ratio: Decimal,
    pub liquidatable: bool,
    pub above_water: bool,
    pub worthwhile: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScoutReport {
    pub accounts: Vec<MarginAccountMetadata>,
}

impl ScoutReport {
    pub fn liquidatable(&self) -> impl Iterator<Item = &MarginAccountMetadata> {
        self.accounts.iter().filter(|a| a.liquidatable)
    }

    pub fn above_water(&self) -> impl Iterator<Item = &MarginAccountMetadata> {
        self.accounts.iter().filter(|a| a.above_water)
    }

    pub fn worthwhile(&self) -> impl Iterator<Item = &MarginAccountMetadata> {
        self.accounts.iter().filter(|a| a.worthwhile)
    }
}

/// Multi-subscriber broadcast of liquidation outcomes; any number of
/// observers (logging, notification, future dashboards) can subscribe
/// independently, matching the one-to-many fan-out `Observables.py` gives
/// the Python client via RxPY.
pub struct EventBus {
    sender: broadcast::Sender<LiquidationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiquidationEvent> {
        self.sender.subscribe()
    }

    /// Drops the event on the floor if there are no subscribers; a
    /// liquidation must never fail because nobody happened to be
    /// listening.
    pub fn publish(&self, event: LiquidationEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(confirmed: bool, signature: Option<&str>) -> LiquidationEvent {
        LiquidationEvent {
            timestamp: std::time::SystemTime::UNIX_EPOCH,
            wallet: Pubkey::new_unique(),
            margin_account: Pubkey::new_unique(),
            signature: signature.map(str::to_string),
            confirmed,
            wallet_before: vec![Decimal::new(100, 0)],
            wallet_after: vec![Decimal::new(110, 0)],
        }
    }

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();
        bus.publish(sample_event(true, Some("sig")));
        let received = receiver.try_recv().unwrap();
        assert!(received.confirmed);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.publish(sample_event(false, None));
    }

    #[test]
    fn scout_report_filters_to_liquidatable() {
        let report = ScoutReport {
            accounts: vec![
                MarginAccountMetadata {
                    address: Pubkey::new_unique(),
                    owner: Pubkey::new_unique(),
                    net_value: Decimal::new(-5, 0),
                    collateral_ratio: Decimal::new(5, 1),
                    liquidatable: true,
                    above_water: false,
                    worthwhile: false,
                },
                MarginAccountMetadata {
                    address: Pubkey::new_unique(),
                    owner: Pubkey::new_unique(),
                    net_value: Decimal::new(100, 0),
                    collateral_ratio: Decimal::new(4, 0),
                    liquidatable: false,
                    above_water: false,
                    worthwhile: false,
                },
            ],
        };
        assert_eq!(report.liquidatable().count(), 1);
        assert_eq!(report.worthwhile().count(), 0);
    }
}
