mod maths_utils;
pub(crate) mod time_utils;

pub use time_utils::{
    Clock, ManualClock, SystemClock, TimeUtils, day_fraction, epoch_ms_to_utc, format_duration,
    now_timestamp_ms,
};

pub(crate) use maths_utils::{percent_change, price_decimals, round_to};
