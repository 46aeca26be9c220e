//! 规则语法：简单规则、复合规则和排序规则
//!
//! 规则树是封闭的和类型，反序列化统一走 `discriminator` 模块，
//! 序列化输出与线上格式一致，因此解析 → 序列化 → 再解析得到结构相同的树。

use crate::discriminator;
use crate::operators::{Direction, LogicalOperator, Operator};
use crate::value::RuleValue;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 过滤规则节点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WhereRule {
    Simple(SimpleRule),
    Complex(ComplexRule),
}

impl WhereRule {
    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        discriminator::parse_where_rule(&value)
    }

    pub fn simple(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self::Simple(SimpleRule::new(field, operator, value))
    }

    pub fn equal(field: impl Into<String>, value: impl Into<RuleValue>) -> Self {
        Self::simple(field, Operator::Equal, value)
    }

    pub fn and(rules: Vec<WhereRule>) -> Self {
        Self::Complex(ComplexRule::new(LogicalOperator::And, rules))
    }

    pub fn or(rules: Vec<WhereRule>) -> Self {
        Self::Complex(ComplexRule::new(LogicalOperator::Or, rules))
    }

    pub fn not(rule: WhereRule) -> Self {
        Self::Complex(ComplexRule::new(LogicalOperator::Not, vec![rule]))
    }

    /// 以当前节点为根的节点总数
    pub fn node_count(&self) -> usize {
        match self {
            Self::Simple(_) => 1,
            Self::Complex(c) => 1 + c.rules.iter().map(Self::node_count).sum::<usize>(),
        }
    }
}

impl<'de> Deserialize<'de> for WhereRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        discriminator::parse_where_rule(&value).map_err(serde::de::Error::custom)
    }
}

/// 简单规则：单个字段与值的比较
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleRule {
    pub field: String,
    pub operator: Operator,
    #[serde(skip_serializing_if = "RuleValue::is_absent")]
    pub value: RuleValue,
}

impl SimpleRule {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<RuleValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// 不带值的规则，如 isnull
    pub fn unary(field: impl Into<String>, operator: Operator) -> Self {
        Self::new(field, operator, RuleValue::Absent)
    }
}

/// 复合规则：用逻辑条件组合子规则
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexRule {
    pub condition: LogicalOperator,
    pub rules: Vec<WhereRule>,
}

impl ComplexRule {
    pub fn new(condition: LogicalOperator, rules: Vec<WhereRule>) -> Self {
        Self { condition, rules }
    }
}

/// 排序规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderByRule {
    pub field: String,
    pub direction: Direction,
}

impl OrderByRule {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }

    /// 从 JSON 字符串解析排序列表
    pub fn list_from_json(json: &str) -> crate::Result<Vec<Self>> {
        let value: Value = serde_json::from_str(json)?;
        discriminator::parse_order_by(&value)
    }
}

impl<'de> Deserialize<'de> for OrderByRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        discriminator::parse_order_by_rule(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_serialization() {
        let rule = WhereRule::and(vec![
            WhereRule::equal("name", "pippo"),
            WhereRule::simple("age", Operator::LessThanOrEqual, 30),
            WhereRule::Simple(SimpleRule::unary("email", Operator::IsNull)),
        ]);

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "condition": "and",
                "rules": [
                    {"field": "name", "operator": "equal", "value": "pippo"},
                    {"field": "age", "operator": "lessthanorequal", "value": 30},
                    {"field": "email", "operator": "isnull"}
                ]
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let rule = WhereRule::or(vec![
            WhereRule::not(WhereRule::simple("id", Operator::In, vec![1, 2, 3])),
            WhereRule::and(vec![
                WhereRule::simple("email", Operator::IContains, "ACME"),
                WhereRule::simple("score", Operator::GreaterThan, 1.5),
            ]),
        ]);

        let json = serde_json::to_string(&rule).unwrap();
        let parsed: WhereRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_node_count() {
        let rule = WhereRule::and(vec![
            WhereRule::equal("a", 1),
            WhereRule::not(WhereRule::equal("b", 2)),
        ]);
        assert_eq!(rule.node_count(), 4);
    }

    #[test]
    fn test_order_by_deserialization() {
        let rules: Vec<OrderByRule> =
            serde_json::from_value(json!([{"field": "name"}, {"field": "age", "direction": "desc"}]))
                .unwrap();
        assert_eq!(rules, vec![OrderByRule::asc("name"), OrderByRule::desc("age")]);
    }

    #[test]
    fn test_deserialize_error_is_reported() {
        let result: Result<WhereRule, _> =
            serde_json::from_value(json!({"field": "a", "operator": "between", "value": 1}));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("between"));
    }
}
