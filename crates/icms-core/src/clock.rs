//! 時鐘與日期解析

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 時鐘（注入到引擎上下文，方便測試）
pub trait Clock: Send + Sync {
    /// 目前 UTC 時間
    fn now(&self) -> DateTime<Utc>;
}

/// 系統時鐘
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時鐘
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// 從日期建立（當日 00:00 UTC）
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Self::new(dt.and_utc()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// 兩個時間點之間的整天數（向下取整，`to` 早於 `from` 時為負）
pub fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// 解析 ISO-8601 時間字串
///
/// 接受 RFC 3339、無時區的日期時間（視為 UTC）以及純日期
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// 寬鬆解析：無法解析時回傳 `fallback`（通常是「現在」）
pub fn parse_timestamp_or(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    match parse_timestamp(raw) {
        Some(dt) => dt,
        None => {
            tracing::warn!("無法解析日期 {:?}，改用 {}", raw, fallback);
            fallback
        }
    }
}

/// 寬鬆的時間欄位反序列化，搭配 `#[serde(deserialize_with = ...)]`
///
/// 儲存或傳入的日期可能只有日期部分，也可能是無法解析的字串；
/// 這些情況只記錄警告，不讓整筆資料反序列化失敗。
pub mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::parse_timestamp;

    fn read(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(raw) => parse_timestamp(raw),
            _ => None,
        }
    }

    /// 必填時間：無法解析時改用目前時間
    pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(read(&value).unwrap_or_else(|| {
            let now = Utc::now();
            tracing::warn!("無法解析日期 {}，改用 {}", value, now);
            now
        }))
    }

    /// 選填時間：null 或空字串為 `None`，無法解析時記錄警告並視為未提供
    pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(None),
            Value::String(raw) if raw.trim().is_empty() => Ok(None),
            _ => {
                let parsed = read(&value);
                if parsed.is_none() {
                    tracing::warn!("無法解析日期 {}，視為未提供", value);
                }
                Ok(parsed)
            }
        }
    }
}
