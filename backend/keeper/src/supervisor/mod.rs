//! Supervisor (component K): the two periodic ticks — a 60s margin-account
//! refresh and a 2s price refresh — feeding the processor through a
//! latest-wins `watch` channel, plus ordered shutdown on Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use crate::balancer::WalletBalancer;
use crate::liquidator::AccountLiquidator;
use crate::processor::LiquidationProcessor;

/// Emitted on the accounts tick: `tick` distinguishes real refresh cycles
/// from the synthetic `-1` first tick the supervisor emits immediately on
/// startup, so subscribers can tell "freshly started" from "no news since
/// boot" (spec.md §5: "the first accounts refresh fires immediately,
/// before the first 60s interval elapses").
#[derive(Debug, Clone, Copy)]
pub struct AccountsTick {
    pub tick: i64,
}

/// Emitted on the prices tick — the tick that drives the liquidation
/// pipeline (spec.md §4.G/§5: "only update_prices may fire the full
/// pipeline"). Margin-account membership changes slowly; prices move on
/// every tick, so a fresh snapshot of who's ripe is only as good as its
/// last price refresh.
#[derive(Debug, Clone, Copy)]
pub struct PricesTick {
    pub tick: i64,
}

pub struct Supervisor<'a> {
    processor: Arc<Mutex<LiquidationProcessor<'a>>>,
    accounts_poll: Duration,
    prices_poll: Duration,
}

impl<'a> Supervisor<'a> {
    pub fn new(processor: LiquidationProcessor<'a>, accounts_poll: Duration, prices_poll: Duration) -> Self {
        Supervisor {
            processor: Arc::new(Mutex::new(processor)),
            accounts_poll,
            prices_poll,
        }
    }

    /// Runs both periodic ticks and the liquidation loop until Ctrl-C,
    /// then lets in-flight work finish before returning.
    pub async fn run(
        &self,
        liquidator: &dyn AccountLiquidator,
        balancer: &dyn WalletBalancer,
    ) {
        let (accounts_tx, _accounts_rx) = watch::channel(AccountsTick { tick: -1 });
        let (prices_tx, prices_rx) = watch::channel(PricesTick { tick: -1 });

        let accounts_task = self.run_accounts_tick(accounts_tx);
        let prices_task = self.run_prices_tick(prices_tx);
        let liquidation_task = self.run_liquidation_loop(prices_rx, liquidator, balancer);

        tokio::select! {
            _ = accounts_task => {}
            _ = prices_task => {}
            _ = liquidation_task => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping ticks");
            }
        }
    }

    async fn run_accounts_tick(&self, sender: watch::Sender<AccountsTick>) {
        let mut interval = tokio::time::interval(self.accounts_poll);
        let mut tick = 0i64;
        loop {
            interval.tick().await;
            let mut processor = self.processor.lock().await;
            if let Err(e) = processor.update_margin_accounts() {
                error!(error = %e, "failed to refresh margin accounts");
                continue;
            }
            drop(processor);
            let _ = sender.send(AccountsTick { tick });
            tick += 1;
        }
    }

    async fn run_prices_tick(&self, sender: watch::Sender<PricesTick>) {
        let mut interval = tokio::time::interval(self.prices_poll);
        let mut tick = 0i64;
        loop {
            interval.tick().await;
            let mut processor = self.processor.lock().await;
            if let Err(e) = processor.update_prices() {
                error!(error = %e, "failed to refresh prices");
                continue;
            }
            drop(processor);
            let _ = sender.send(PricesTick { tick });
            tick += 1;
        }
    }

    /// Watches for a fresh prices tick (latest-wins: a tick that arrives
    /// while a liquidation pass is still running is coalesced, not
    /// queued) and runs one liquidation pass per tick — the prices tick,
    /// not the accounts tick, is what drives the pipeline (spec.md §4.G/§5),
    /// since `liquidate_all` reclassifies the last-known account snapshot
    /// against the freshest prices on every call.
    async fn run_liquidation_loop(
        &self,
        mut prices_rx: watch::Receiver<PricesTick>,
        liquidator: &dyn AccountLiquidator,
        balancer: &dyn WalletBalancer,
    ) {
        loop {
            if prices_rx.changed().await.is_err() {
                return;
            }
            let tick = *prices_rx.borrow_and_update();
            info!(tick = tick.tick, "running liquidation pass");

            let mut processor = self.processor.lock().await;
            match processor.liquidate_all(liquidator, balancer) {
                Ok(outcomes) => info!(count = outcomes.len(), "liquidation pass complete"),
                Err(e) => error!(error = %e, "liquidation pass failed"),
            }
        }
    }
}
