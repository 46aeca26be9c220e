//! 过滤/排序表达式引擎
//!
//! 把来自查询串的不可信规则树安全地编译为参数化谓词：
//! - JSON 规则解析与变体判别
//! - 字段白名单与值转换
//! - 参数命名与绑定
//! - 分页、排序与 SQL 渲染

pub mod compiler;
pub mod context;
pub mod discriminator;
pub mod entities;
pub mod error;
pub mod field;
pub mod models;
pub mod operators;
pub mod params;
pub mod predicate;
pub mod query;
pub mod render;
pub mod value;

pub use compiler::{QueryLimits, RuleCompiler};
pub use context::EngineContext;
pub use error::{QueryError, Result};
pub use field::{Field, FieldRegistry, RegistryCatalog};
pub use models::{ComplexRule, OrderByRule, SimpleRule, WhereRule};
pub use operators::{Direction, LogicalOperator, Operator};
pub use params::{
    ListQuery, ListQueryParams, Pagination, PaginationPolicies, PaginationPolicy,
    join_where_rules,
};
pub use predicate::{Column, Expr, OrderExpr, Predicate};
pub use query::{Projection, QueryAssembler, SelectQuery, build_query};
pub use render::{Dialect, MySql, Postgres, RenderedQuery};
pub use value::{RuleValue, Scalar};
