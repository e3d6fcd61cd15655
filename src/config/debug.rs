//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Emit verbose logging for poller lifecycle and published snapshots.
    pub log_price_stream_updates: bool,

    /// Log cache hits/misses per fetch
    pub log_cache: bool,

    /// Log when a fetch falls back to stale cache or the hardcoded table
    pub log_fallbacks: bool,

    /// Log trade creation accept/reject decisions
    pub log_trades: bool,

    /// Log every accrual tick
    pub log_accrual: bool,
}

pub const DF: LogFlags = LogFlags {
    log_fallbacks: true,
    log_trades: true,

    log_price_stream_updates: false,
    log_cache: false,
    log_accrual: false,
};
