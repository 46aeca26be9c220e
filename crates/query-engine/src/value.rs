//! 规则值类型

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// 标量值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// 字段转换产生的 UTC 时间，绑定为 timestamptz
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// 从 JSON 值转换，非标量返回 None
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::String(s.clone()),
            Self::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// 简单规则携带的值
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// 未传值或显式 null
    #[default]
    Absent,
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl RuleValue {
    /// 从 JSON 值转换
    ///
    /// 只接受 null、标量或标量数组；失败时返回实际类型名。
    pub fn from_json(value: &Value) -> std::result::Result<Self, &'static str> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Array(items) => items
                .iter()
                .map(|item| Scalar::from_json(item).ok_or("array of non-scalars"))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(_) => Err("object"),
            other => Scalar::from_json(other).map(Self::Scalar).ok_or("unsupported"),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "null",
            Self::Scalar(s) => s.type_name(),
            Self::List(_) => "array",
        }
    }
}

impl From<Scalar> for RuleValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for RuleValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<i64> for RuleValue {
    fn from(i: i64) -> Self {
        Self::Scalar(i.into())
    }
}

impl From<i32> for RuleValue {
    fn from(i: i32) -> Self {
        Self::Scalar(i.into())
    }
}

impl From<f64> for RuleValue {
    fn from(f: f64) -> Self {
        Self::Scalar(f.into())
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        Self::Scalar(b.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_json(&json!(30)), Some(Scalar::Int(30)));
        assert_eq!(Scalar::from_json(&json!(1.5)), Some(Scalar::Float(1.5)));
        assert_eq!(Scalar::from_json(&json!("pippo")), Some("pippo".into()));
        assert_eq!(Scalar::from_json(&json!(true)), Some(Scalar::Bool(true)));
        assert_eq!(Scalar::from_json(&json!(null)), None);
        assert_eq!(Scalar::from_json(&json!([1])), None);
    }

    #[test]
    fn test_rule_value_from_json() {
        assert_eq!(RuleValue::from_json(&json!(null)), Ok(RuleValue::Absent));
        assert_eq!(
            RuleValue::from_json(&json!([1, "a"])),
            Ok(RuleValue::List(vec![Scalar::Int(1), "a".into()]))
        );
        assert_eq!(RuleValue::from_json(&json!({"a": 1})), Err("object"));
        assert_eq!(
            RuleValue::from_json(&json!([[1]])),
            Err("array of non-scalars")
        );
    }

    #[test]
    fn test_rule_value_serializes_to_wire_form() {
        assert_eq!(serde_json::to_value(RuleValue::from(30)).unwrap(), json!(30));
        assert_eq!(
            serde_json::to_value(RuleValue::from(vec!["a", "b"])).unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(serde_json::to_value(RuleValue::Absent).unwrap(), json!(null));
    }
}
