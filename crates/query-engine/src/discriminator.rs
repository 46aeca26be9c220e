//! 变体判别
//!
//! 两阶段解析未类型化的 JSON 节点：先按结构判断是简单规则还是复合规则，
//! 再按 operator / condition / direction 的字面值查表确定具体变体。
//! 判别是全函数：任何输入要么得到唯一的已知变体，要么得到 `Tag::Unknown`，
//! 后者在构造任何规则对象之前就被转换为结构化的校验错误。

use crate::error::{QueryError, Result};
use crate::models::{ComplexRule, OrderByRule, SimpleRule, WhereRule};
use crate::operators::{Direction, LogicalOperator, Operator, ValueShape};
use crate::value::RuleValue;
use serde_json::{Map, Value};

const MISSING: &str = "<missing>";

/// 节点结构
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    Simple,
    Complex,
}

/// 判别标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag<T> {
    Known(T),
    /// 无法识别的原始值，缺失时为 `<missing>`
    Unknown(String),
}

/// 按结构分类：带 `rules` 或 `condition` 键的是复合规则
pub fn classify_shape(node: &Map<String, Value>) -> RuleShape {
    if node.contains_key("rules") || node.contains_key("condition") {
        RuleShape::Complex
    } else {
        RuleShape::Simple
    }
}

pub fn classify_operator(node: &Map<String, Value>) -> Tag<Operator> {
    classify_tag(node.get("operator"), Operator::from_wire)
}

pub fn classify_condition(node: &Map<String, Value>) -> Tag<LogicalOperator> {
    classify_tag(node.get("condition"), LogicalOperator::from_wire)
}

/// 排序方向，缺省为 asc
pub fn classify_direction(node: &Map<String, Value>) -> Tag<Direction> {
    match node.get("direction") {
        None => Tag::Known(Direction::Asc),
        raw => classify_tag(raw, Direction::from_wire),
    }
}

fn classify_tag<T>(raw: Option<&Value>, lookup: impl Fn(&str) -> Option<T>) -> Tag<T> {
    match raw {
        None => Tag::Unknown(MISSING.to_string()),
        Some(Value::String(s)) => lookup(s).map_or_else(|| Tag::Unknown(s.clone()), Tag::Known),
        Some(other) => Tag::Unknown(other.to_string()),
    }
}

/// 解析过滤规则树
pub fn parse_where_rule(value: &Value) -> Result<WhereRule> {
    let node = as_object(value, "过滤规则")?;
    match classify_shape(node) {
        RuleShape::Complex => parse_complex(node).map(WhereRule::Complex),
        RuleShape::Simple => parse_simple(node).map(WhereRule::Simple),
    }
}

fn parse_simple(node: &Map<String, Value>) -> Result<SimpleRule> {
    let operator = match classify_operator(node) {
        Tag::Known(op) => op,
        Tag::Unknown(raw) => return Err(QueryError::UnknownOperator(raw)),
    };

    let field = required_str(node, "field", "简单规则")?;

    let value = match node.get("value") {
        None => RuleValue::Absent,
        Some(raw) => RuleValue::from_json(raw).map_err(|actual| QueryError::InvalidValue {
            target: format!("操作符 {}", operator),
            expected: operator.value_shape().to_string(),
            actual: actual.to_string(),
        })?,
    };
    validate_value(operator, &value)?;

    Ok(SimpleRule {
        field,
        operator,
        value,
    })
}

fn parse_complex(node: &Map<String, Value>) -> Result<ComplexRule> {
    let condition = match classify_condition(node) {
        Tag::Known(c) => c,
        Tag::Unknown(raw) => return Err(QueryError::UnknownCondition(raw)),
    };

    let children = match node.get("rules") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(QueryError::Malformed(format!(
                "复合规则的 rules 必须是数组, 实际为 {}",
                json_type_name(other)
            )));
        }
        None => {
            return Err(QueryError::Malformed(format!(
                "复合规则 {} 缺少 rules",
                condition
            )));
        }
    };

    check_arity(condition, children.len())?;

    let rules = children
        .iter()
        .map(parse_where_rule)
        .collect::<Result<Vec<_>>>()?;

    Ok(ComplexRule { condition, rules })
}

/// 子规则数量校验
///
/// 线上输入的任何复合规则都不能为空，not 必须恰好一条。
fn check_arity(condition: LogicalOperator, count: usize) -> Result<()> {
    if count == 0 {
        return Err(QueryError::Structural(format!(
            "{} 至少需要一条子规则",
            condition
        )));
    }
    if condition == LogicalOperator::Not && count != 1 {
        return Err(QueryError::Structural(format!(
            "not 必须恰好包含一条子规则, 实际 {} 条",
            count
        )));
    }
    Ok(())
}

/// 解析排序规则列表
pub fn parse_order_by(value: &Value) -> Result<Vec<OrderByRule>> {
    let Value::Array(items) = value else {
        return Err(QueryError::Malformed(format!(
            "排序规则必须是数组, 实际为 {}",
            json_type_name(value)
        )));
    };

    items.iter().map(parse_order_by_rule).collect()
}

/// 解析单条排序规则
pub fn parse_order_by_rule(value: &Value) -> Result<OrderByRule> {
    let node = as_object(value, "排序规则")?;

    let direction = match classify_direction(node) {
        Tag::Known(d) => d,
        Tag::Unknown(raw) => return Err(QueryError::UnknownDirection(raw)),
    };
    let field = required_str(node, "field", "排序规则")?;

    Ok(OrderByRule { field, direction })
}

/// 校验值形状是否符合操作符要求
pub fn validate_value(operator: Operator, value: &RuleValue) -> Result<()> {
    let shape = operator.value_shape();
    let ok = match (shape, value) {
        (ValueShape::Scalar, RuleValue::Scalar(_)) => true,
        (ValueShape::Text | ValueShape::Ignored, RuleValue::Scalar(s)) => s.as_str().is_some(),
        (ValueShape::List, RuleValue::List(items)) => !items.is_empty(),
        (ValueShape::Absent | ValueShape::Ignored, RuleValue::Absent) => true,
        _ => false,
    };

    if ok {
        return Ok(());
    }

    let actual = match value {
        RuleValue::List(items) if items.is_empty() => "empty array",
        other => other.type_name(),
    };
    Err(QueryError::InvalidValue {
        target: format!("操作符 {}", operator),
        expected: shape.to_string(),
        actual: actual.to_string(),
    })
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        QueryError::Malformed(format!(
            "{}必须是对象, 实际为 {}",
            what,
            json_type_name(value)
        ))
    })
}

fn required_str(node: &Map<String, Value>, key: &str, what: &str) -> Result<String> {
    match node.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(QueryError::Malformed(format!(
            "{}的 {} 必须是字符串, 实际为 {}",
            what,
            key,
            json_type_name(other)
        ))),
        None => Err(QueryError::Malformed(format!("{}缺少 {}", what, key))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
