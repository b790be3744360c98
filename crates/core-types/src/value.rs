use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// A single scalar decoded from a result column.
///
/// The database driver hands back loosely-typed values; they are decoded into
/// this tagged union at the column-type boundary so everything downstream
/// works with a closed set of variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

/// Serialises to the natural JSON scalar. Dates render as `YYYY-MM-DD`,
/// timestamps as RFC 3339. Non-finite floats have no JSON form and become `null`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn scalars_serialize_to_plain_json() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let ts = Utc.with_ymd_and_hms(2020, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Value::Int(42)).unwrap(), json!(42));
        assert_eq!(serde_json::to_value(Value::Float(14.7)).unwrap(), json!(14.7));
        assert_eq!(serde_json::to_value(Value::Text("x".to_string())).unwrap(), json!("x"));
        assert_eq!(serde_json::to_value(Value::Date(date)).unwrap(), json!("2020-03-01"));
        assert_eq!(
            serde_json::to_value(Value::Timestamp(ts)).unwrap(),
            json!("2020-03-01T12:30:00+00:00")
        );
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        assert_eq!(serde_json::to_value(Value::Float(f64::NAN)).unwrap(), json!(null));
    }
}
