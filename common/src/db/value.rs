use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use serde::Serialize;
use std::fmt;

/// days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A single result cell, reduced to what a caller can render or serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Boolean(v) => write!(f, "{}", v),
            ScalarValue::Integer(v) => write!(f, "{}", v),
            ScalarValue::Unsigned(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Text(v) => write!(f, "{}", v),
        }
    }
}

fn to_micros(unit: &TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn date_text(days: i32) -> String {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.to_string())
        .unwrap_or_else(|| days.to_string())
}

fn timestamp_text(unit: &TimeUnit, value: i64) -> String {
    DateTime::from_timestamp_micros(to_micros(unit, value))
        .map(|ts| ts.naive_utc().to_string())
        .unwrap_or_else(|| value.to_string())
}

fn time_text(unit: &TimeUnit, value: i64) -> String {
    let micros = to_micros(unit, value);
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();

    secs.zip(nanos)
        .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
        .map(|t| t.to_string())
        .unwrap_or_else(|| value.to_string())
}

impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ScalarValue::Null,
            Value::Boolean(v) => ScalarValue::Boolean(v),
            Value::TinyInt(v) => ScalarValue::Integer(v.into()),
            Value::SmallInt(v) => ScalarValue::Integer(v.into()),
            Value::Int(v) => ScalarValue::Integer(v.into()),
            Value::BigInt(v) => ScalarValue::Integer(v),
            Value::HugeInt(v) => i64::try_from(v)
                .map(ScalarValue::Integer)
                .unwrap_or_else(|_| ScalarValue::Text(v.to_string())),
            Value::UTinyInt(v) => ScalarValue::Integer(v.into()),
            Value::USmallInt(v) => ScalarValue::Integer(v.into()),
            Value::UInt(v) => ScalarValue::Integer(v.into()),
            Value::UBigInt(v) => ScalarValue::Unsigned(v),
            Value::Float(v) => ScalarValue::Float(v.into()),
            Value::Double(v) => ScalarValue::Float(v),
            Value::Decimal(d) => {
                let text = d.to_string();
                text.parse::<f64>()
                    .map(ScalarValue::Float)
                    .unwrap_or(ScalarValue::Text(text))
            }
            Value::Text(v) => ScalarValue::Text(v),
            Value::Enum(v) => ScalarValue::Text(v),
            Value::Blob(v) => ScalarValue::Text(format!("<blob {} bytes>", v.len())),
            Value::Date32(days) => ScalarValue::Text(date_text(days)),
            Value::Timestamp(unit, v) => ScalarValue::Text(timestamp_text(&unit, v)),
            Value::Time64(unit, v) => ScalarValue::Text(time_text(&unit, v)),
            Value::Interval {
                months,
                days,
                nanos,
            } => ScalarValue::Text(format!("{} months {} days {} ns", months, days, nanos)),
            other => ScalarValue::Text(format!("{:?}", other)),
        }
    }
}
