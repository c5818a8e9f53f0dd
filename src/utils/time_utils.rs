use chrono::{DateTime, NaiveDate, NaiveTime};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_3_MIN: i64 = Self::MS_IN_S * 60 * 3;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_S * 60 * 5;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_S * 60 * 15;
    pub const MS_IN_30_MIN: i64 = Self::MS_IN_S * 60 * 30;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_2_H: i64 = Self::MS_IN_MIN * 60 * 2;
    pub const MS_IN_4_H: i64 = Self::MS_IN_MIN * 60 * 4;
    pub const MS_IN_6_H: i64 = Self::MS_IN_MIN * 60 * 6;
    pub const MS_IN_8_H: i64 = Self::MS_IN_MIN * 60 * 8;
    pub const MS_IN_12_H: i64 = Self::MS_IN_MIN * 60 * 12;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_3_D: i64 = Self::MS_IN_H * 24 * 3;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const MS_IN_1_M: i64 = Self::MS_IN_D * 30;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d";
    /// Day-month-year format used on the command line, e.g. `01 Jan 2024`.
    pub const RANGE_DATE_FORMAT: &str = "%d %b %Y";

    const INTERVALS: [(i64, &'static str); 16] = [
        (Self::MS_IN_S, "1s"),
        (Self::MS_IN_MIN, "1m"),
        (Self::MS_IN_3_MIN, "3m"),
        (Self::MS_IN_5_MIN, "5m"),
        (Self::MS_IN_15_MIN, "15m"),
        (Self::MS_IN_30_MIN, "30m"),
        (Self::MS_IN_H, "1h"),
        (Self::MS_IN_2_H, "2h"),
        (Self::MS_IN_4_H, "4h"),
        (Self::MS_IN_6_H, "6h"),
        (Self::MS_IN_8_H, "8h"),
        (Self::MS_IN_12_H, "12h"),
        (Self::MS_IN_D, "1d"),
        (Self::MS_IN_3_D, "3d"),
        (Self::MS_IN_W, "1w"),
        (Self::MS_IN_1_M, "1M"),
    ];

    /// Convert interval in milliseconds to a Binance-style shorthand (e.g. `30m`, `1h`).
    pub fn interval_to_string(interval_ms: i64) -> &'static str {
        Self::INTERVALS
            .iter()
            .find(|(ms, _)| *ms == interval_ms)
            .map(|(_, s)| *s)
            .unwrap_or("unknown")
    }

    /// Inverse of `interval_to_string`. Case matters: `1m` is a minute, `1M` a month.
    pub fn interval_from_string(text: &str) -> Option<i64> {
        Self::INTERVALS
            .iter()
            .find(|(_, s)| *s == text)
            .map(|(ms, _)| *ms)
    }

    /// Midnight UTC of `date` as epoch milliseconds.
    pub fn date_to_epoch_ms(date: NaiveDate) -> i64 {
        date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
    }
}

// Time Helper functions

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT)),
        None => format!("invalid({})", epoch_ms),
    }
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }
    let months = days / 30;
    if months < 12 {
        return format!("{}M", months);
    }
    let years = months / 12;
    let rem_months = months % 12;
    format!("{}Y {}M", years, rem_months)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_shorthand_round_trips_for_binance_intervals() {
        assert_eq!(TimeUtils::interval_from_string("1m"), Some(TimeUtils::MS_IN_MIN));
        assert_eq!(TimeUtils::interval_from_string("1M"), Some(TimeUtils::MS_IN_1_M));
        assert_eq!(TimeUtils::interval_from_string("7m"), None);
        assert_eq!(TimeUtils::interval_to_string(TimeUtils::MS_IN_4_H), "4h");
        assert_eq!(TimeUtils::interval_to_string(42), "unknown");
    }

    #[test]
    fn date_converts_to_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(TimeUtils::date_to_epoch_ms(date), 1_704_153_600_000);
        assert_eq!(epoch_ms_to_utc(1_704_153_600_000), "2024-01-02");
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(59_000), "59s");
        assert_eq!(format_duration(TimeUtils::MS_IN_H * 3), "3h");
        assert_eq!(format_duration(TimeUtils::MS_IN_D * 400), "1Y 1M");
    }
}
