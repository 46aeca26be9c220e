//! 编译产物：与后端无关的谓词树
//!
//! 谓词中只出现列引用、命名参数和字面量，由 `render` 模块按方言转换为参数化 SQL。

use crate::operators::Direction;
use crate::value::Scalar;

/// 列引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// 表名或别名，如 `customers.email` 中的 `customers`
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// 值表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    /// 命名参数，值保存在编译上下文的参数表中
    Param(String),
    /// 编译器生成的常量，渲染时直接内联为 SQL 字面量
    Literal(Scalar),
    Lower(Box<Expr>),
    Trim(Box<Expr>),
}

impl Expr {
    pub fn lower(expr: Expr) -> Self {
        Self::Lower(Box::new(expr))
    }

    pub fn trim(expr: Expr) -> Self {
        Self::Trim(Box::new(expr))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
}

/// 谓词树
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        left: Expr,
        op: CompareOp,
        right: Expr,
    },
    Like {
        expr: Expr,
        pattern: Expr,
        case_insensitive: bool,
    },
    /// 集合成员检查，列表直接内嵌而不进入参数表
    InList {
        expr: Expr,
        values: Vec<Scalar>,
        negated: bool,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
    And(Vec<Predicate>),
    /// 空 OR 恒为假
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Self::Compare { left, op, right }
    }

    pub fn like(expr: Expr, pattern: Expr, case_insensitive: bool) -> Self {
        Self::Like {
            expr,
            pattern,
            case_insensitive,
        }
    }

    pub fn not(inner: Predicate) -> Self {
        Self::Not(Box::new(inner))
    }

    /// 与另一个谓词合取，已是 AND 时直接追加
    pub fn and_with(self, other: Predicate) -> Self {
        match self {
            Self::And(mut children) if !children.is_empty() => {
                children.push(other);
                Self::And(children)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// 按出现顺序收集命名参数
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_params(&mut names);
        names
    }

    fn collect_params<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Compare { left, right, .. } => {
                left.collect_params(names);
                right.collect_params(names);
            }
            Self::Like { expr, pattern, .. } => {
                expr.collect_params(names);
                pattern.collect_params(names);
            }
            Self::InList { expr, .. } | Self::IsNull { expr, .. } => expr.collect_params(names),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_params(names);
                }
            }
            Self::Not(inner) => inner.collect_params(names),
        }
    }
}

impl Expr {
    fn collect_params<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Param(name) => names.push(name),
            Self::Lower(inner) | Self::Trim(inner) => inner.collect_params(names),
            Self::Column(_) | Self::Literal(_) => {}
        }
    }
}

/// 排序表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderExpr {
    pub column: Column,
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_with_flattens() {
        let a = Predicate::IsNull {
            expr: Expr::Column("a".into()),
            negated: false,
        };
        let b = Predicate::compare(
            Expr::Column("b".into()),
            CompareOp::Eq,
            Expr::Param("b_0".into()),
        );
        let c = Predicate::IsNull {
            expr: Expr::Column("c".into()),
            negated: true,
        };

        let combined = a.and_with(b).and_with(c);
        match combined {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_param_names_in_order() {
        let predicate = Predicate::Or(vec![
            Predicate::compare(
                Expr::lower(Expr::Column("name".into())),
                CompareOp::Eq,
                Expr::lower(Expr::Param("name_0".into())),
            ),
            Predicate::not(Predicate::like(
                Expr::Column("name".into()),
                Expr::Param("name_1".into()),
                true,
            )),
        ]);
        assert_eq!(predicate.param_names(), vec!["name_0", "name_1"]);
    }
}
