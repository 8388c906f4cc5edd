use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

pub fn serialize_system_time<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let datetime: DateTime<Utc> = DateTime::<Utc>::from(*time);
    serializer.serialize_str(&datetime.to_rfc3339())
}

pub fn serialize_system_time_option<S>(
    time: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match time {
        Some(time) => serialize_system_time(time, serializer),
        None => serializer.serialize_none(),
    }
}

/// Accepts a quantity sent either as a (hex or decimal) string or as a bare JSON number,
/// keeping it as the string the validator parses later. Missing or null becomes empty.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(de::Error::custom(format!("expected quantity, found {}", other))),
    }
}
