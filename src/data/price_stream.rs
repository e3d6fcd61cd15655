use {
    crate::{
        config::MARKET,
        data::MarketData,
        domain::{AssetClass, QuoteSnapshot, symbols_key},
    },
    std::{
        collections::HashMap,
        sync::{
            Arc, Mutex, PoisonError, Weak,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    },
    tokio::{
        sync::broadcast::{self, error::RecvError},
        task::JoinHandle,
        time::MissedTickBehavior,
    },
};

#[cfg(debug_assertions)]
use crate::config::DF;

type FeedKey = (AssetClass, String);
type Latest = Arc<Mutex<Option<Arc<QuoteSnapshot>>>>;

/// One polling task, shared by every subscriber of the same (class, symbol set)
struct Poller {
    tx: broadcast::Sender<Arc<QuoteSnapshot>>,
    latest: Latest,
    subscribers: usize,
    task: JoinHandle<()>,
}

struct StreamShared {
    market: Arc<MarketData>,
    interval: Duration,
    pollers: Mutex<HashMap<FeedKey, Poller>>,
    // Suspension flag - when true, pollers keep fetching but publish nothing
    suspended: Arc<AtomicBool>,
}

impl StreamShared {
    fn release(&self, key: &FeedKey) {
        let mut pollers = self.pollers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(poller) = pollers.get_mut(key) else {
            return;
        };
        poller.subscribers = poller.subscribers.saturating_sub(1);
        if poller.subscribers == 0 {
            if let Some(poller) = pollers.remove(key) {
                poller.task.abort();
                #[cfg(debug_assertions)]
                if DF.log_price_stream_updates {
                    log::info!("PriceStream: stopped poller {} [{}]", key.0, key.1);
                }
            }
        }
    }
}

impl Drop for StreamShared {
    fn drop(&mut self) {
        let pollers = self.pollers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for poller in pollers.values() {
            poller.task.abort();
        }
    }
}

/// Polls fetchers on an interval and fans snapshots out to subscribers.
///
/// Pollers are deduplicated by symbol set: two views watching the same list share one timer.
/// A poller stops as soon as its last subscription is closed or dropped.
#[derive(Clone)]
pub struct PriceStreamManager {
    shared: Arc<StreamShared>,
}

impl PriceStreamManager {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self::with_interval(market, MARKET.poll_interval)
    }

    pub fn with_interval(market: Arc<MarketData>, interval: Duration) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                market,
                interval,
                pollers: Mutex::new(HashMap::new()),
                suspended: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn market(&self) -> &Arc<MarketData> {
        &self.shared.market
    }

    /// Join (or start) the poller for this symbol set. Must be called inside a tokio runtime.
    pub fn subscribe<S: AsRef<str>>(&self, class: AssetClass, symbols: &[S]) -> PriceSubscription {
        let key: FeedKey = (class, symbols_key(symbols));
        let mut pollers = self
            .shared
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (rx, pending) = match pollers.get_mut(&key) {
            Some(poller) => {
                poller.subscribers += 1;
                let latest = poller
                    .latest
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                (poller.tx.subscribe(), latest)
            }
            None => {
                let (tx, rx) = broadcast::channel(MARKET.channel_capacity);
                let latest: Latest = Arc::new(Mutex::new(None));
                let task = tokio::spawn(run_poller(
                    self.shared.market.clone(),
                    key.clone(),
                    self.shared.interval,
                    tx.clone(),
                    latest.clone(),
                    self.shared.suspended.clone(),
                ));

                #[cfg(debug_assertions)]
                if DF.log_price_stream_updates {
                    log::info!("PriceStream: started poller {} [{}]", key.0, key.1);
                }

                pollers.insert(
                    key.clone(),
                    Poller {
                        tx,
                        latest,
                        subscribers: 1,
                        task,
                    },
                );
                (rx, None)
            }
        };

        PriceSubscription {
            key,
            rx,
            pending,
            replayed: None,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Callback flavor. Updates stop when the handle is closed or dropped.
    pub fn on_update<S, F>(&self, class: AssetClass, symbols: &[S], mut callback: F) -> FeedHandle
    where
        S: AsRef<str>,
        F: FnMut(Arc<QuoteSnapshot>) + Send + 'static,
    {
        let mut subscription = self.subscribe(class, symbols);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.recv().await {
                callback(snapshot);
            }
        });
        FeedHandle { task }
    }

    /// Suspend publishing (e.g. while a simulation overrides prices)
    pub fn suspend(&self) {
        self.shared.suspended.store(true, Ordering::SeqCst);
        #[cfg(debug_assertions)]
        if DF.log_price_stream_updates {
            log::info!("🔇 Price updates suspended");
        }
    }

    pub fn resume(&self) {
        self.shared.suspended.store(false, Ordering::SeqCst);
        #[cfg(debug_assertions)]
        if DF.log_price_stream_updates {
            log::info!("🔊 Price updates resumed");
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::SeqCst)
    }

    pub fn active_pollers(&self) -> usize {
        self.shared
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn subscriber_count<S: AsRef<str>>(&self, class: AssetClass, symbols: &[S]) -> usize {
        let key = (class, symbols_key(symbols));
        self.shared
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|p| p.subscribers)
            .unwrap_or(0)
    }

    /// Last snapshot published for this symbol set, if its poller is running
    pub fn latest<S: AsRef<str>>(&self, class: AssetClass, symbols: &[S]) -> Option<Arc<QuoteSnapshot>> {
        let key = (class, symbols_key(symbols));
        let pollers = self
            .shared
            .pollers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let poller = pollers.get(&key)?;
        let latest = poller
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        latest
    }
}

async fn run_poller(
    market: Arc<MarketData>,
    key: FeedKey,
    interval: Duration,
    tx: broadcast::Sender<Arc<QuoteSnapshot>>,
    latest: Latest,
    suspended: Arc<AtomicBool>,
) {
    let (class, joined) = key;
    let symbols: Vec<&str> = joined.split(',').filter(|s| !s.is_empty()).collect();

    // First tick fires immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let snapshot = Arc::new(market.fetch(class, &symbols).await);

        if suspended.load(Ordering::SeqCst) {
            continue;
        }

        *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());

        #[cfg(debug_assertions)]
        if DF.log_price_stream_updates {
            log::info!(
                "[poll-tick] {} [{}] -> {} quotes ({})",
                class,
                joined,
                snapshot.quotes.len(),
                snapshot.origin
            );
        }

        // Err only means nobody is listening this instant
        let _ = tx.send(snapshot);
    }
}

/// A live view onto one poller. Closing or dropping it unregisters the subscriber.
pub struct PriceSubscription {
    key: FeedKey,
    rx: broadcast::Receiver<Arc<QuoteSnapshot>>,
    // Snapshot already published before this subscriber joined
    pending: Option<Arc<QuoteSnapshot>>,
    // Joining between the poller's store and its send queues `pending` on `rx` too
    replayed: Option<Arc<QuoteSnapshot>>,
    shared: Weak<StreamShared>,
}

impl PriceSubscription {
    pub fn class(&self) -> AssetClass {
        self.key.0
    }

    pub fn symbols_key(&self) -> &str {
        &self.key.1
    }

    /// Next snapshot. `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<Arc<QuoteSnapshot>> {
        if let Some(snapshot) = self.pending.take() {
            self.replayed = Some(snapshot.clone());
            return Some(snapshot);
        }
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => {
                    if let Some(replayed) = self.replayed.take() {
                        if Arc::ptr_eq(&replayed, &snapshot) {
                            continue;
                        }
                    }
                    return Some(snapshot);
                }
                Err(RecvError::Lagged(skipped)) => {
                    self.replayed = None;
                    log::warn!(
                        "PriceStream: subscriber to {} [{}] lagged, skipped {} snapshots",
                        self.key.0,
                        self.key.1,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn close(self) {}
}

impl Drop for PriceSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.release(&self.key);
        }
    }
}

/// Handle for a callback feed. Mirrors the `.close()` of a socket-style API.
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn close(self) {}

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
