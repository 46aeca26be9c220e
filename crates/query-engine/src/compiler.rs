//! 规则编译器
//!
//! 把已解析的规则树编译为谓词 AST，同时在 [`EngineContext`] 中绑定命名参数。
//! 用户提供的值只会以参数或占位符形式出现，永远不会拼进 SQL 文本。

use crate::context::EngineContext;
use crate::discriminator::validate_value;
use crate::error::{QueryError, Result};
use crate::field::Field;
use crate::models::{ComplexRule, OrderByRule, SimpleRule, WhereRule};
use crate::operators::{LogicalOperator, Operator};
use crate::predicate::{CompareOp, Expr, OrderExpr, Predicate};
use crate::value::{RuleValue, Scalar};
use query_shared::config::QueryConfig;
use tracing::debug;

/// 规则树规模限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_depth: usize,
    pub max_rules: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for QueryLimits {
    fn from(config: &QueryConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_rules: config.max_rules,
        }
    }
}

impl QueryLimits {
    /// 检查规则树深度与节点总数
    ///
    /// 使用显式栈遍历，任意深度的输入都不会耗尽调用栈。
    pub fn check(&self, rule: &WhereRule) -> Result<()> {
        let mut stack = vec![(rule, 1usize)];
        let mut count = 0usize;

        while let Some((node, depth)) = stack.pop() {
            count += 1;
            if count > self.max_rules {
                return Err(QueryError::TooComplex(format!(
                    "规则节点数超过上限 {}",
                    self.max_rules
                )));
            }
            if depth > self.max_depth {
                return Err(QueryError::TooComplex(format!(
                    "规则嵌套深度超过上限 {}",
                    self.max_depth
                )));
            }
            if let WhereRule::Complex(complex) = node {
                stack.extend(complex.rules.iter().map(|child| (child, depth + 1)));
            }
        }

        Ok(())
    }
}

/// 规则编译器
#[derive(Debug, Clone, Default)]
pub struct RuleCompiler {
    limits: QueryLimits,
}

impl RuleCompiler {
    pub fn new(limits: QueryLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// 编译过滤规则树
    ///
    /// 第一个失败的节点会中止整个编译；此时上下文中可能留有部分参数，调用方应丢弃它。
    pub fn compile_where(&self, rule: &WhereRule, ctx: &mut EngineContext<'_>) -> Result<Predicate> {
        self.limits.check(rule)?;
        self.compile_node(rule, ctx)
    }

    /// 编译排序规则，保持输入顺序
    pub fn compile_order_by(
        &self,
        rules: &[OrderByRule],
        ctx: &EngineContext<'_>,
    ) -> Result<Vec<OrderExpr>> {
        rules
            .iter()
            .map(|rule| {
                let field = ctx.field(&rule.field)?;
                Ok(OrderExpr {
                    column: field.column().clone(),
                    direction: rule.direction,
                })
            })
            .collect()
    }

    fn compile_node(&self, rule: &WhereRule, ctx: &mut EngineContext<'_>) -> Result<Predicate> {
        match rule {
            WhereRule::Simple(simple) => self.compile_simple(simple, ctx),
            WhereRule::Complex(complex) => self.compile_complex(complex, ctx),
        }
    }

    fn compile_complex(
        &self,
        rule: &ComplexRule,
        ctx: &mut EngineContext<'_>,
    ) -> Result<Predicate> {
        match rule.condition {
            LogicalOperator::And => {
                if rule.rules.is_empty() {
                    return Err(QueryError::Structural("and 至少需要一条子规则".into()));
                }
                Ok(Predicate::And(self.compile_children(&rule.rules, ctx)?))
            }
            // 空 or 恒为假，渲染为 (1 = 0)
            LogicalOperator::Or => Ok(Predicate::Or(self.compile_children(&rule.rules, ctx)?)),
            LogicalOperator::Not => match rule.rules.as_slice() {
                [only] => Ok(Predicate::not(self.compile_node(only, ctx)?)),
                other => Err(QueryError::Structural(format!(
                    "not 必须恰好包含一条子规则, 实际 {} 条",
                    other.len()
                ))),
            },
        }
    }

    fn compile_children(
        &self,
        rules: &[WhereRule],
        ctx: &mut EngineContext<'_>,
    ) -> Result<Vec<Predicate>> {
        rules
            .iter()
            .map(|child| self.compile_node(child, ctx))
            .collect()
    }

    fn compile_simple(&self, rule: &SimpleRule, ctx: &mut EngineContext<'_>) -> Result<Predicate> {
        let field = ctx.field(&rule.field)?;
        validate_value(rule.operator, &rule.value)?;
        let value = field.transform(&rule.value)?;
        let column = Expr::Column(field.column().clone());

        debug!(field = %rule.field, operator = %rule.operator, "编译简单规则");

        let predicate = match rule.operator {
            Operator::Equal => compare(ctx, field, column, rule.operator, CompareOp::Eq, value)?,
            Operator::NotEqual => {
                compare(ctx, field, column, rule.operator, CompareOp::NotEq, value)?
            }
            Operator::GreaterThan => {
                compare(ctx, field, column, rule.operator, CompareOp::Gt, value)?
            }
            Operator::GreaterThanOrEqual => {
                compare(ctx, field, column, rule.operator, CompareOp::GtEq, value)?
            }
            Operator::LessThan => compare(ctx, field, column, rule.operator, CompareOp::Lt, value)?,
            Operator::LessThanOrEqual => {
                compare(ctx, field, column, rule.operator, CompareOp::LtEq, value)?
            }

            Operator::IEqual | Operator::INotEqual => {
                let op = if rule.operator == Operator::IEqual {
                    CompareOp::Eq
                } else {
                    CompareOp::NotEq
                };
                let param = Expr::Param(ctx.add_param(field, scalar(rule.operator, value)?));
                Predicate::compare(Expr::lower(column), op, Expr::lower(param))
            }

            Operator::Like => like(ctx, field, column, value, rule.operator, Pattern::AsIs, false)?,
            Operator::ILike => like(ctx, field, column, value, rule.operator, Pattern::AsIs, true)?,
            Operator::Contains => {
                like(ctx, field, column, value, rule.operator, Pattern::Contains, false)?
            }
            Operator::IContains => {
                like(ctx, field, column, value, rule.operator, Pattern::Contains, true)?
            }
            Operator::StartsWith => {
                like(ctx, field, column, value, rule.operator, Pattern::Prefix, false)?
            }
            Operator::IStartsWith => {
                like(ctx, field, column, value, rule.operator, Pattern::Prefix, true)?
            }
            Operator::EndsWith => {
                like(ctx, field, column, value, rule.operator, Pattern::Suffix, false)?
            }
            Operator::IEndsWith => {
                like(ctx, field, column, value, rule.operator, Pattern::Suffix, true)?
            }

            Operator::In | Operator::NotIn => match value {
                RuleValue::List(values) => Predicate::InList {
                    expr: column,
                    values,
                    negated: rule.operator == Operator::NotIn,
                },
                other => return Err(shape_error(rule.operator, &other)),
            },

            Operator::IsNull => Predicate::IsNull {
                expr: column,
                negated: false,
            },
            Operator::IsNotNull => Predicate::IsNull {
                expr: column,
                negated: true,
            },

            Operator::IsEmpty => Predicate::compare(
                Expr::trim(column),
                CompareOp::Eq,
                Expr::Literal(Scalar::from("")),
            ),
            Operator::IsNotEmpty => Predicate::compare(
                Expr::trim(column),
                CompareOp::NotEq,
                Expr::Literal(Scalar::from("")),
            ),
        };

        Ok(predicate)
    }
}

/// 模式包装方式
#[derive(Debug, Clone, Copy)]
enum Pattern {
    AsIs,
    Contains,
    Prefix,
    Suffix,
}

impl Pattern {
    fn wrap(self, text: &str) -> String {
        match self {
            Self::AsIs => text.to_string(),
            Self::Contains => format!("%{}%", text),
            Self::Prefix => format!("{}%", text),
            Self::Suffix => format!("%{}", text),
        }
    }
}

fn compare(
    ctx: &mut EngineContext<'_>,
    field: &Field,
    column: Expr,
    operator: Operator,
    op: CompareOp,
    value: RuleValue,
) -> Result<Predicate> {
    let param = ctx.add_param(field, scalar(operator, value)?);
    Ok(Predicate::compare(column, op, Expr::Param(param)))
}

fn like(
    ctx: &mut EngineContext<'_>,
    field: &Field,
    column: Expr,
    value: RuleValue,
    operator: Operator,
    pattern: Pattern,
    case_insensitive: bool,
) -> Result<Predicate> {
    let text = match &value {
        RuleValue::Scalar(Scalar::String(s)) => pattern.wrap(s),
        other => return Err(shape_error(operator, other)),
    };
    let param = ctx.add_param(field, Scalar::String(text));
    Ok(Predicate::like(column, Expr::Param(param), case_insensitive))
}

fn scalar(operator: Operator, value: RuleValue) -> Result<Scalar> {
    match value {
        RuleValue::Scalar(s) => Ok(s),
        other => Err(shape_error(operator, &other)),
    }
}

/// 转换函数改变了值形状时使用
fn shape_error(operator: Operator, value: &RuleValue) -> QueryError {
    QueryError::InvalidValue {
        target: format!("操作符 {}", operator),
        expected: operator.value_shape().to_string(),
        actual: value.type_name().to_string(),
    }
}
