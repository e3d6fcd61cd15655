use {
    super::{core::TradingDesk, messages::AccountEvent},
    crate::{config::TRADING, data::LedgerChange, domain::TradeStatus},
    anyhow::Result,
    serde::Serialize,
    std::{sync::Arc, time::Duration},
    tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior},
};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccrualReport {
    /// Trades whose profit moved this tick
    pub updated: usize,
    /// Trades that reached their end time this tick
    pub completed: usize,
    /// Sum credited to balances
    pub credited: f64,
}

/// Pro-rata profit crediting for active trades.
///
/// Profit is recomputed from each trade's creation time, so a missed tick or a restart
/// catches up on the next one instead of losing yield.
pub struct ProfitAccrual {
    desk: Arc<TradingDesk>,
    // One tick at a time so a trade is never credited twice for the same delta
    tick_lock: Mutex<()>,
}

impl ProfitAccrual {
    pub fn new(desk: Arc<TradingDesk>) -> Self {
        Self {
            desk,
            tick_lock: Mutex::new(()),
        }
    }

    pub async fn tick(&self, now_ms: i64) -> Result<AccrualReport> {
        let _guard = self.tick_lock.lock().await;
        let mut report = AccrualReport::default();

        for trade in self.desk.store.active_trades().await? {
            match self.accrue_one(&trade.id, now_ms).await {
                Ok(Some((credited, completed))) => {
                    report.updated += 1;
                    report.credited += credited;
                    if completed {
                        report.completed += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("Accrual skipped trade {}: {:#}", trade.id, e),
            }
        }

        #[cfg(debug_assertions)]
        if DF.log_accrual {
            log::info!(
                "Accrual tick: {} updated, {} completed, {:.2} credited",
                report.updated,
                report.completed,
                report.credited
            );
        }

        Ok(report)
    }

    /// Some((credited, completed)) when the trade changed
    async fn accrue_one(&self, trade_id: &str, now_ms: i64) -> Result<Option<(f64, bool)>> {
        for _ in 0..TRADING.cas_retries {
            // 1. Fresh copies of both sides of the CAS
            let Some(mut trade) = self.desk.store.get_trade(trade_id).await? else {
                return Ok(None);
            };
            if !trade.is_active() {
                return Ok(None);
            }
            let Some(user) = self.desk.store.get_user(&trade.user_id).await? else {
                anyhow::bail!("owner {} missing", trade.user_id);
            };

            // 2. Target profit for this instant
            let fraction = trade.elapsed_fraction(now_ms);
            let target = trade.accrued_profit(now_ms);
            let delta = (target - trade.profit).max(0.0);
            let completes = fraction >= 1.0;
            if delta <= 0.0 && !completes {
                return Ok(None);
            }

            trade.profit += delta;
            if completes {
                trade.status = TradeStatus::Completed;
                trade.close_price = Some(trade.open_price);
            }

            // 3. Credit and persist together
            let balance = user.balance + delta;
            if self
                .desk
                .store
                .commit(&user.id, user.balance, balance, LedgerChange::TradeUpdate(&trade))
                .await?
            {
                if completes {
                    log::info!(
                        "Trade {} completed with {:.2} profit for {}",
                        trade.id,
                        trade.profit,
                        user.id
                    );
                }
                self.desk.publish(AccountEvent::TradeUpdated(trade));
                if delta > 0.0 {
                    self.desk.publish(AccountEvent::BalanceChanged {
                        user_id: user.id,
                        balance,
                    });
                }
                return Ok(Some((delta, completes)));
            }
        }
        anyhow::bail!("balance kept changing, retry next tick")
    }

    /// Run `tick` every `interval` until the handle is stopped or dropped.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> AccrualHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.tick(self.desk.now_ms()).await {
                    log::warn!("Accrual tick failed: {:#}", e);
                }
            }
        });
        AccrualHandle { task }
    }
}

pub struct AccrualHandle {
    task: JoinHandle<()>,
}

impl AccrualHandle {
    pub fn stop(self) {}

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AccrualHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::MemoryAccountStore,
        domain::{Timeframe, TradeDirection, TradeRequest},
        utils::{ManualClock, TimeUtils},
    };

    const T0: i64 = 1_700_000_000_000;

    async fn setup(amount: f64, timeframe: Timeframe) -> (Arc<TradingDesk>, Arc<ManualClock>, String) {
        let clock = Arc::new(ManualClock::new(T0));
        let desk = Arc::new(TradingDesk::new(Arc::new(MemoryAccountStore::new()), clock.clone()));
        let user = desk.create_user("0xaccrue").await.unwrap();
        desk.update_user_balance(&user.id, 2_000_000.0).await.unwrap();
        let req = TradeRequest {
            symbol: "XAUUSD".into(),
            amount,
            timeframe,
            direction: TradeDirection::Sell,
            open_price: 2_345.6,
        };
        desk.validate_balance_and_create_trade(&user.id, &req).await.unwrap();
        (desk, clock, user.id)
    }

    #[tokio::test]
    async fn half_day_accrues_half_the_daily_return() {
        let (desk, _, user_id) = setup(4_000.0, Timeframe::OneDay).await;
        let accrual = ProfitAccrual::new(desk.clone());

        let report = accrual.tick(T0 + 12 * TimeUtils::MS_IN_H).await.unwrap();

        let expected = 4_000.0 * 0.5 * 0.05;
        assert!((report.credited - expected).abs() < 1e-9);
        let trade = &desk.get_user_trades(&user_id).await.unwrap()[0];
        assert!((trade.profit - expected).abs() < 1e-9);
        assert!(trade.is_active());
        let balance = desk.get_user(&user_id).await.unwrap().unwrap().balance;
        assert!((balance - (2_000_000.0 - 4_000.0 + expected)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn repeated_ticks_credit_only_the_delta() {
        let (desk, _, user_id) = setup(10_000.0, Timeframe::SevenDays).await;
        let accrual = ProfitAccrual::new(desk.clone());

        let mut total = 0.0;
        for hours in [6, 6, 24, 48] {
            total += accrual.tick(T0 + hours * TimeUtils::MS_IN_H).await.unwrap().credited;
        }
        // Same instant twice: nothing new to credit
        let again = accrual.tick(T0 + 48 * TimeUtils::MS_IN_H).await.unwrap();
        assert_eq!(again.updated, 0);

        let expected = 10_000.0 * 0.35 * (48.0 / (7.0 * 24.0));
        assert!((total - expected).abs() < 1e-6);
        let trade = &desk.get_user_trades(&user_id).await.unwrap()[0];
        assert!((trade.profit - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn trade_completes_at_end_time() {
        let (desk, _, user_id) = setup(2_000.0, Timeframe::OneDay).await;
        let accrual = ProfitAccrual::new(desk.clone());
        let mut rx = desk.subscribe();

        let report = accrual.tick(T0 + 2 * TimeUtils::MS_IN_D).await.unwrap();
        assert_eq!(report.completed, 1);

        let trade = desk.get_user_trades(&user_id).await.unwrap().remove(0);
        assert_eq!(trade.status, TradeStatus::Completed);
        assert_eq!(trade.close_price, Some(trade.open_price));
        assert!((trade.profit - 100.0).abs() < 1e-9);
        assert_eq!(rx.recv().await.unwrap(), AccountEvent::TradeUpdated(trade));

        // Completed trades are left alone
        let later = accrual.tick(T0 + 3 * TimeUtils::MS_IN_D).await.unwrap();
        assert_eq!(later, AccrualReport::default());
        let summary = desk.portfolio(&user_id).await.unwrap();
        assert_eq!(summary.completed_trades, 1);
        assert_eq!(summary.invested, 0.0);
    }

    #[tokio::test]
    async fn restart_recovers_the_same_profit() {
        let (desk, _, user_id) = setup(1_000.0, Timeframe::OneDay).await;
        ProfitAccrual::new(desk.clone())
            .tick(T0 + 6 * TimeUtils::MS_IN_H)
            .await
            .unwrap();

        // A fresh accrual instance picks up from the stored profit
        let fresh = ProfitAccrual::new(desk.clone());
        fresh.tick(T0 + 12 * TimeUtils::MS_IN_H).await.unwrap();

        let trade = &desk.get_user_trades(&user_id).await.unwrap()[0];
        assert!((trade.profit - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn spawned_loop_ticks_until_stopped() {
        let (desk, clock, user_id) = setup(1_000.0, Timeframe::OneDay).await;
        let handle = Arc::new(ProfitAccrual::new(desk.clone())).spawn(Duration::from_millis(20));

        clock.advance_ms(TimeUtils::MS_IN_H);
        tokio::time::sleep(Duration::from_millis(120)).await;

        let profit = desk.get_user_trades(&user_id).await.unwrap()[0].profit;
        assert!((profit - 1_000.0 * 0.05 / 24.0).abs() < 1e-9);

        handle.stop();
        clock.advance_ms(TimeUtils::MS_IN_H);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(desk.get_user_trades(&user_id).await.unwrap()[0].profit, profit);
    }
}
