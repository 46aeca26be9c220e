//! 规则操作符定义
//!
//! 线上协议中的字符串与枚举之间通过静态查找表互转，未知字符串不会构造出任何规则对象。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    // 相等比较
    Equal,
    IEqual,
    NotEqual,
    INotEqual,

    // 模式匹配
    Like,
    ILike,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,

    // 集合
    In,
    NotIn,

    // 大小比较
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,

    // 空值检查
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

/// 操作符对值形状的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// 单个标量
    Scalar,
    /// 单个字符串
    Text,
    /// 非空标量列表
    List,
    /// 不允许传值
    Absent,
    /// 可不传；传了也不参与编译
    Ignored,
}

impl Operator {
    pub const ALL: [Operator; 22] = [
        Self::Equal,
        Self::IEqual,
        Self::Like,
        Self::ILike,
        Self::NotEqual,
        Self::INotEqual,
        Self::Contains,
        Self::IContains,
        Self::In,
        Self::NotIn,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::IsNull,
        Self::IsNotNull,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
    ];

    /// 线上协议中的名称
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::IEqual => "iequal",
            Self::NotEqual => "notequal",
            Self::INotEqual => "inotequal",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::GreaterThan => "greaterthan",
            Self::GreaterThanOrEqual => "greaterthanorequal",
            Self::LessThan => "lessthan",
            Self::LessThanOrEqual => "lessthanorequal",
            Self::IsNull => "isnull",
            Self::IsNotNull => "isnotnull",
            Self::IsEmpty => "isempty",
            Self::IsNotEmpty => "isnotempty",
        }
    }

    /// 按线上名称查找
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    pub const fn value_shape(&self) -> ValueShape {
        match self {
            Self::Equal
            | Self::IEqual
            | Self::NotEqual
            | Self::INotEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => ValueShape::Scalar,
            Self::Like
            | Self::ILike
            | Self::Contains
            | Self::IContains
            | Self::StartsWith
            | Self::IStartsWith
            | Self::EndsWith
            | Self::IEndsWith => ValueShape::Text,
            Self::In | Self::NotIn => ValueShape::List,
            Self::IsNull | Self::IsNotNull => ValueShape::Absent,
            Self::IsEmpty | Self::IsNotEmpty => ValueShape::Ignored,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scalar => "scalar",
            Self::Text => "string",
            Self::List => "non-empty list of scalars",
            Self::Absent => "no value",
            Self::Ignored => "no value or string",
        };
        f.write_str(s)
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        [Self::And, Self::Or, Self::Not]
            .into_iter()
            .find(|c| c.as_str() == s)
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
