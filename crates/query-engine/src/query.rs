//! 查询组装
//!
//! [`SelectQuery`] 是组装器操作的基础查询；[`QueryAssembler`] 按固定顺序把分页、
//! 过滤谓词、排序和绑定参数应用到基础查询上。组装不产生副作用，
//! 同一条规则可以分别作用于数据查询和计数查询，两次结果互相独立且一致。

use crate::compiler::{QueryLimits, RuleCompiler};
use crate::context::EngineContext;
use crate::error::Result;
use crate::field::FieldRegistry;
use crate::models::{OrderByRule, WhereRule};
use crate::predicate::{Column, OrderExpr, Predicate};
use crate::value::Scalar;
use query_shared::observability::metrics as query_metrics;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

/// 查询投影
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    Columns(Vec<Column>),
    /// `COUNT(*)`
    Count,
}

/// 基础查询
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub projection: Projection,
    pub predicate: Option<Predicate>,
    pub order_by: Vec<OrderExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub params: BTreeMap<String, Scalar>,
}

impl SelectQuery {
    fn new(table: impl Into<String>, projection: Projection) -> Self {
        Self {
            table: table.into(),
            projection,
            predicate: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            params: BTreeMap::new(),
        }
    }

    pub fn select_all(table: impl Into<String>) -> Self {
        Self::new(table, Projection::All)
    }

    pub fn select(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self::new(table, Projection::Columns(columns))
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(table, Projection::Count)
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 追加过滤谓词，与已有谓词做合取
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and_with(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, exprs: impl IntoIterator<Item = OrderExpr>) -> Self {
        self.order_by.extend(exprs);
        self
    }

    pub fn bind_params(mut self, params: BTreeMap<String, Scalar>) -> Self {
        self.params.extend(params);
        self
    }
}

/// 查询组装器
///
/// 持有实体的字段注册表和编译器配置，本身不可变，可在并发请求间共享。
#[derive(Debug, Clone)]
pub struct QueryAssembler<'a> {
    fields: &'a FieldRegistry,
    compiler: RuleCompiler,
    metrics_enabled: bool,
}

impl<'a> QueryAssembler<'a> {
    pub fn new(fields: &'a FieldRegistry) -> Self {
        Self::with_limits(fields, QueryLimits::default())
    }

    pub fn with_limits(fields: &'a FieldRegistry, limits: QueryLimits) -> Self {
        Self {
            fields,
            compiler: RuleCompiler::new(limits),
            metrics_enabled: true,
        }
    }

    /// 是否记录编译指标，对应 `observability.metrics_enabled`
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    pub fn fields(&self) -> &'a FieldRegistry {
        self.fields
    }

    /// 组装查询
    ///
    /// 依次应用：offset（仅当 skip 非零）、limit（仅当给出）、过滤谓词、排序，
    /// 最后绑定编译过程中累积的参数。每次调用使用独立的编译上下文。
    #[instrument(skip_all, fields(table = %base.table))]
    pub fn assemble(
        &self,
        base: SelectQuery,
        skip: Option<u64>,
        limit: Option<u64>,
        where_rule: Option<&WhereRule>,
        order_by: Option<&[OrderByRule]>,
    ) -> Result<SelectQuery> {
        let started = Instant::now();
        let rule_count = where_rule.map_or(0, WhereRule::node_count);

        let result = self.apply(base, skip, limit, where_rule, order_by);
        let elapsed = started.elapsed().as_secs_f64();

        let outcome = match &result {
            Ok(query) => {
                debug!(
                    rules = rule_count,
                    params = query.params.len(),
                    "查询组装完成"
                );
                "ok"
            }
            Err(e) if e.is_validation() => {
                warn!(code = e.code(), error = %e, "拒绝查询规则");
                "rejected"
            }
            Err(e) => {
                error!(error = %e, "查询组装失败");
                "error"
            }
        };

        if self.metrics_enabled {
            let compiled = if result.is_ok() { rule_count } else { 0 };
            query_metrics::record_query_compilation(outcome, compiled, elapsed);
        }

        result
    }

    fn apply(
        &self,
        mut query: SelectQuery,
        skip: Option<u64>,
        limit: Option<u64>,
        where_rule: Option<&WhereRule>,
        order_by: Option<&[OrderByRule]>,
    ) -> Result<SelectQuery> {
        let mut ctx = EngineContext::new(self.fields);

        if let Some(skip) = skip.filter(|s| *s != 0) {
            query = query.offset(skip);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(rule) = where_rule {
            let predicate = self.compiler.compile_where(rule, &mut ctx)?;
            query = query.filter(predicate);
        }
        if let Some(rules) = order_by.filter(|r| !r.is_empty()) {
            let exprs = self.compiler.compile_order_by(rules, &ctx)?;
            query = query.order_by(exprs);
        }

        Ok(query.bind_params(ctx.into_params()))
    }
}

/// 使用默认限制组装查询
pub fn build_query(
    fields: &FieldRegistry,
    base: SelectQuery,
    skip: Option<u64>,
    limit: Option<u64>,
    where_rule: Option<&WhereRule>,
    order_by: Option<&[OrderByRule]>,
) -> Result<SelectQuery> {
    QueryAssembler::new(fields).assemble(base, skip, limit, where_rule, order_by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::field::Field;
    use crate::operators::{Direction, Operator};
    use crate::predicate::{CompareOp, Expr};
    use ::metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, SharedString, Unit};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> FieldRegistry {
        FieldRegistry::register(vec![Field::new("name", "name"), Field::new("age", "age")]).unwrap()
    }

    #[test]
    fn test_pagination_only() {
        let registry = registry();
        let query = build_query(
            &registry,
            SelectQuery::select_all("people"),
            Some(100),
            Some(300),
            None,
            None,
        )
        .unwrap();

        assert_eq!(query.offset, Some(100));
        assert_eq!(query.limit, Some(300));
        assert!(query.predicate.is_none());
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_zero_skip_not_applied() {
        let registry = registry();
        let query = build_query(
            &registry,
            SelectQuery::select_all("people"),
            Some(0),
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(query.offset, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_filter_conjoins_existing_predicate() {
        let registry = registry();
        let existing = Predicate::IsNull {
            expr: Expr::Column("deleted_at".into()),
            negated: false,
        };
        let base = SelectQuery::select_all("people").filter(existing.clone());

        let query = build_query(
            &registry,
            base,
            None,
            None,
            Some(&WhereRule::equal("name", "pippo")),
            None,
        )
        .unwrap();

        assert_eq!(
            query.predicate,
            Some(Predicate::And(vec![
                existing,
                Predicate::compare(
                    Expr::Column("name".into()),
                    CompareOp::Eq,
                    Expr::Param("name_0".into())
                ),
            ]))
        );
        assert_eq!(query.params.get("name_0"), Some(&Scalar::from("pippo")));
    }

    #[test]
    fn test_data_and_count_queries_are_independent() {
        let registry = registry();
        let assembler = QueryAssembler::new(&registry);
        let rule = WhereRule::and(vec![
            WhereRule::equal("name", "pippo"),
            WhereRule::simple("age", Operator::LessThanOrEqual, 30),
        ]);
        let order = [OrderByRule::desc("age")];

        let data = assembler
            .assemble(
                SelectQuery::select_all("people"),
                Some(10),
                Some(5),
                Some(&rule),
                Some(&order[..]),
            )
            .unwrap();
        let count = assembler
            .assemble(SelectQuery::count("people"), None, None, Some(&rule), None)
            .unwrap();

        assert_eq!(data.predicate, count.predicate);
        assert_eq!(data.params, count.params);
        assert_eq!(data.order_by[0].direction, Direction::Desc);
        assert!(count.order_by.is_empty());
        assert_eq!(count.limit, None);
    }

    /// 统计 counter 注册次数的 recorder
    #[derive(Default)]
    struct CountingRecorder {
        counters: AtomicUsize,
    }

    impl ::metrics::Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            self.counters.fetch_add(1, Ordering::SeqCst);
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_metrics_flag_gates_recording() {
        let registry = registry();
        let rule = WhereRule::equal("name", "pippo");
        let assemble = |enabled: bool| {
            QueryAssembler::new(&registry)
                .with_metrics(enabled)
                .assemble(SelectQuery::select_all("people"), None, None, Some(&rule), None)
                .unwrap();
        };

        let disabled = CountingRecorder::default();
        ::metrics::with_local_recorder(&disabled, || assemble(false));
        assert_eq!(disabled.counters.load(Ordering::SeqCst), 0);

        let enabled = CountingRecorder::default();
        ::metrics::with_local_recorder(&enabled, || assemble(true));
        assert!(enabled.counters.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_assemble_propagates_errors() {
        let registry = registry();
        let err = build_query(
            &registry,
            SelectQuery::select_all("people"),
            None,
            None,
            None,
            Some(&[OrderByRule::asc("salary")][..]),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField(ref f) if f == "salary"));
    }
}
