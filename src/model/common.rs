use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type Id = String;

/// Shape of a JSON value as checked by structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    StringList,
    /// ISO-8601 string
    Timestamp,
}

impl DataType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            DataType::String => value.is_string(),
            DataType::Number => value.is_number(),
            DataType::Boolean => value.is_boolean(),
            DataType::Object => value.is_object(),
            DataType::Array => value.is_array(),
            DataType::StringList => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            DataType::Timestamp => value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
        }
    }

    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Current time at the millisecond resolution documents are stored with.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

/// Serde adapter writing timestamps as `2022-03-02T00:00:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(timestamp))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_data_type_matching() {
        assert!(DataType::StringList.matches(&json!(["a", "b"])));
        assert!(DataType::StringList.matches(&json!([])));
        assert!(!DataType::StringList.matches(&json!(["a", 1])));
        assert!(DataType::Timestamp.matches(&json!("2022-03-01T00:00:00.000Z")));
        assert!(!DataType::Timestamp.matches(&json!("yesterday")));
        assert!(!DataType::Object.matches(&json!([])));
    }

    #[test]
    fn test_iso_millis_format() {
        let ts = Utc.with_ymd_and_hms(2022, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(iso_millis::format(&ts), "2022-03-02T00:00:00.000Z");
        assert_eq!(iso_millis::parse("2022-03-02T00:00:00.000Z").unwrap(), ts);
    }

    #[test]
    fn test_now_has_millisecond_resolution() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
