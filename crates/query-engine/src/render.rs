//! SQL 渲染
//!
//! 把 [`SelectQuery`] 渲染为带位置占位符的 SQL 文本和按序排列的参数。
//! 命名参数通过参数表解析，集合字面量同样以匿名占位符绑定，
//! 用户输入永远不会出现在 SQL 文本中。

use crate::error::{QueryError, Result};
use crate::operators::Direction;
use crate::predicate::{Column, CompareOp, Expr, OrderExpr, Predicate};
use crate::query::{Projection, SelectQuery};
use crate::value::Scalar;
use serde::Serialize;
use chrono::SecondsFormat;
use sqlx::postgres::{PgArguments, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Type, TypeInfo};
use std::collections::BTreeMap;

/// SQL 方言
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, ident: &str) -> String;

    /// 第 `index` 个占位符，从 1 开始
    fn placeholder(&self, index: usize) -> String;

    fn supports_ilike(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn supports_ilike(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_ilike(&self) -> bool {
        false
    }
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub args: Vec<Scalar>,
}

impl RenderedQuery {
    /// 绑定为 sqlx 的 Postgres 查询
    pub fn to_sqlx(&self) -> Query<'_, sqlx::Postgres, PgArguments> {
        let mut query = sqlx::query(&self.sql);
        for arg in &self.args {
            query = match arg {
                Scalar::Bool(b) => query.bind(*b),
                Scalar::Int(i) => query.bind(*i),
                Scalar::Float(f) => query.bind(*f),
                Scalar::String(s) => query.bind(s.as_str()),
                Scalar::Timestamp(t) => query.bind(*t),
            };
        }
        query
    }

    /// `to_sqlx` 为每个参数声明的 Postgres 类型
    pub fn pg_arg_types(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| pg_type_info(arg).name().to_string())
            .collect()
    }
}

fn pg_type_info(arg: &Scalar) -> PgTypeInfo {
    match arg {
        Scalar::Bool(_) => <bool as Type<sqlx::Postgres>>::type_info(),
        Scalar::Int(_) => <i64 as Type<sqlx::Postgres>>::type_info(),
        Scalar::Float(_) => <f64 as Type<sqlx::Postgres>>::type_info(),
        Scalar::String(_) => <&str as Type<sqlx::Postgres>>::type_info(),
        Scalar::Timestamp(_) => {
            <chrono::DateTime<chrono::Utc> as Type<sqlx::Postgres>>::type_info()
        }
    }
}

impl SelectQuery {
    /// 按方言渲染
    pub fn render(&self, dialect: &dyn Dialect) -> Result<RenderedQuery> {
        let mut renderer = Renderer {
            dialect,
            params: &self.params,
            args: Vec::new(),
        };

        let mut sql = format!(
            "SELECT {} FROM {}",
            renderer.projection(&self.projection),
            dialect.quote_identifier(&self.table)
        );

        if let Some(predicate) = &self.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&renderer.predicate(predicate)?);
        }

        if !self.order_by.is_empty() {
            let items: Vec<_> = self.order_by.iter().map(|o| renderer.order(o)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        if let Some(limit) = self.limit {
            let placeholder = renderer.bind(Scalar::Int(to_i64(limit, "limit")?));
            sql.push_str(" LIMIT ");
            sql.push_str(&placeholder);
        }

        if let Some(offset) = self.offset {
            let placeholder = renderer.bind(Scalar::Int(to_i64(offset, "offset")?));
            sql.push_str(" OFFSET ");
            sql.push_str(&placeholder);
        }

        Ok(RenderedQuery {
            sql,
            args: renderer.args,
        })
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| QueryError::InvalidPagination(format!("{} 超出范围: {}", what, value)))
}

struct Renderer<'q> {
    dialect: &'q dyn Dialect,
    params: &'q BTreeMap<String, Scalar>,
    args: Vec<Scalar>,
}

impl Renderer<'_> {
    fn bind(&mut self, value: Scalar) -> String {
        self.args.push(value);
        self.dialect.placeholder(self.args.len())
    }

    fn column(&self, column: &Column) -> String {
        match &column.table {
            Some(table) => format!(
                "{}.{}",
                self.dialect.quote_identifier(table),
                self.dialect.quote_identifier(&column.name)
            ),
            None => self.dialect.quote_identifier(&column.name),
        }
    }

    fn projection(&self, projection: &Projection) -> String {
        match projection {
            Projection::All => "*".to_string(),
            Projection::Count => "COUNT(*)".to_string(),
            Projection::Columns(columns) if columns.is_empty() => "*".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(|c| self.column(c))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn order(&self, order: &OrderExpr) -> String {
        let direction = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        format!("{} {}", self.column(&order.column), direction)
    }

    fn expr(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Column(column) => Ok(self.column(column)),
            Expr::Param(name) => {
                let value = self.params.get(name).cloned().ok_or_else(|| {
                    QueryError::Internal(format!("参数 {} 未绑定", name))
                })?;
                Ok(self.bind(value))
            }
            Expr::Literal(value) => Ok(literal(value)),
            Expr::Lower(inner) => Ok(format!("LOWER({})", self.expr(inner)?)),
            Expr::Trim(inner) => Ok(format!("TRIM({})", self.expr(inner)?)),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String> {
        match predicate {
            Predicate::Compare { left, op, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                Ok(format!("{} {} {}", left, compare_op(*op), right))
            }
            Predicate::Like {
                expr,
                pattern,
                case_insensitive,
            } => {
                let expr = self.expr(expr)?;
                let pattern = self.expr(pattern)?;
                Ok(match (*case_insensitive, self.dialect.supports_ilike()) {
                    (false, _) => format!("{} LIKE {}", expr, pattern),
                    (true, true) => format!("{} ILIKE {}", expr, pattern),
                    (true, false) => format!("LOWER({}) LIKE LOWER({})", expr, pattern),
                })
            }
            Predicate::InList {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Ok(if *negated { "(1 = 1)" } else { "(1 = 0)" }.to_string());
                }
                let expr = self.expr(expr)?;
                let placeholders: Vec<_> = values.iter().map(|v| self.bind(v.clone())).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", expr, keyword, placeholders.join(", ")))
            }
            Predicate::IsNull { expr, negated } => {
                let expr = self.expr(expr)?;
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                Ok(format!("{} {}", expr, keyword))
            }
            Predicate::And(children) => self.junction(children, " AND ", "(1 = 1)"),
            Predicate::Or(children) => self.junction(children, " OR ", "(1 = 0)"),
            Predicate::Not(inner) => Ok(format!("NOT ({})", self.predicate(inner)?)),
        }
    }

    /// 空合取恒真，空析取恒假
    fn junction(&mut self, children: &[Predicate], separator: &str, empty: &str) -> Result<String> {
        if children.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = children
            .iter()
            .map(|child| self.predicate(child))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("({})", parts.join(separator)))
    }
}

fn compare_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
    }
}

/// 编译器生成的常量，不来自用户输入
fn literal(value: &Scalar) -> String {
    match value {
        Scalar::Bool(true) => "TRUE".to_string(),
        Scalar::Bool(false) => "FALSE".to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::String(s) => format!("'{}'", s.replace('\'', "''")),
        Scalar::Timestamp(t) => format!("'{}'", t.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}
