//! 本地时区（WIB，UTC+7）的日历换算。
//!
//! 服务器固定运行在 UTC+7；汇总行的 `date` 字段存本地日历日在
//! UTC 的零点，按日期串查询时恰好对应本地日。

use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// 本地时区偏移（秒）
const TZ_OFFSET_SECONDS: i32 = 7 * 3600;
/// 一天的毫秒数
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// 服务器本地时区。
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(TZ_OFFSET_SECONDS).expect("UTC+7 is a valid fixed offset")
}

/// 本地日历日对应的查询窗口 `[00:00:00.000, 23:59:59.999]`（毫秒 epoch）。
pub fn day_window(date: NaiveDate) -> (i64, i64) {
    let start = local_offset()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|datetime| datetime.timestamp_millis())
        .unwrap_or_default();
    (start, start + DAY_MS - 1)
}

/// `now_ms` 所在本地日的前一天。
pub fn previous_local_day(now_ms: i64) -> NaiveDate {
    let today = Utc
        .timestamp_millis_opt(now_ms)
        .single()
        .map(|datetime| datetime.with_timezone(&local_offset()).date_naive())
        .unwrap_or_default();
    today.pred_opt().unwrap_or(today)
}

/// 汇总行 `date` 字段：本地日历日在 UTC 的零点（毫秒 epoch）。
pub fn date_ms_utc_midnight(date: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .timestamp_millis()
}
