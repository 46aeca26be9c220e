//! 列表接口的查询参数
//!
//! 原始查询串中的 where / orderBy 是 JSON 文本，分页参数是数字文本。
//! 这里负责别名处理、JSON 解码和分页规则校验，产出可直接交给组装器的 [`ListQuery`]。

use crate::error::{QueryError, Result};
use crate::models::{ComplexRule, OrderByRule, WhereRule};
use crate::operators::LogicalOperator;
use crate::query::{QueryAssembler, SelectQuery};
use query_shared::config::QueryConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// 原始列表查询参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQueryParams {
    #[serde(default, alias = "filters")]
    pub r#where: Option<String>,

    #[serde(default, rename = "orderBy", alias = "sort")]
    pub order_by: Option<String>,

    #[serde(default, alias = "offset")]
    pub skip: Option<String>,

    #[serde(default, alias = "take")]
    pub limit: Option<String>,
}

impl ListQueryParams {
    /// 从键值对构建，未知键被忽略，同一参数的两个别名同时出现视为格式错误
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// 解析过滤规则
    pub fn where_rule(&self) -> Result<Option<WhereRule>> {
        self.r#where
            .as_deref()
            .map(WhereRule::from_json)
            .transpose()
    }

    /// 解析排序规则，未提供时为空
    pub fn order_by_rules(&self) -> Result<Vec<OrderByRule>> {
        match self.order_by.as_deref() {
            Some(json) => OrderByRule::list_from_json(json),
            None => Ok(Vec::new()),
        }
    }

    /// 按分页策略解析 skip / limit
    pub fn pagination(&self, policy: &PaginationPolicy) -> Result<Pagination> {
        let skip = parse_count("skip", self.skip.as_deref())?.unwrap_or(0);
        let limit = policy.resolve(parse_count("limit", self.limit.as_deref())?)?;
        Ok(Pagination { skip, limit })
    }

    /// 一次性解析全部参数
    pub fn resolve(&self, policy: &PaginationPolicy) -> Result<ListQuery> {
        Ok(ListQuery {
            where_rule: self.where_rule()?,
            order_by: self.order_by_rules()?,
            pagination: self.pagination(policy)?,
        })
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<u64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: i64 = raw.trim().parse().map_err(|_| {
        QueryError::InvalidPagination(format!("{} 必须是整数, 实际为 {:?}", name, raw))
    })?;
    u64::try_from(value)
        .map(Some)
        .map_err(|_| QueryError::InvalidPagination(format!("{} 不能为负数: {}", name, value)))
}

/// 已校验的分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub skip: u64,
    pub limit: u64,
}

/// 分页策略
///
/// - 同时有默认值和上限：缺省取默认值，给出的 limit 必须在 `1..=max`
/// - 只有默认值：缺省取默认值，不设上限
/// - 只有上限：limit 必填且不超过上限
/// - 都没有：limit 必填
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaginationPolicy {
    default_limit: Option<u64>,
    max_limit: Option<u64>,
}

impl PaginationPolicy {
    pub fn new(default_limit: Option<u64>, max_limit: Option<u64>) -> Result<Self> {
        if let (Some(default), Some(max)) = (default_limit, max_limit) {
            if default > max {
                return Err(QueryError::Internal(format!(
                    "默认分页大小 {} 超过上限 {}",
                    default, max
                )));
            }
        }
        Ok(Self {
            default_limit,
            max_limit,
        })
    }

    pub fn from_config(config: &QueryConfig) -> Result<Self> {
        Self::new(Some(config.default_limit), Some(config.max_limit))
    }

    pub fn default_limit(&self) -> Option<u64> {
        self.default_limit
    }

    pub fn max_limit(&self) -> Option<u64> {
        self.max_limit
    }

    /// 计算最终 limit
    pub fn resolve(&self, requested: Option<u64>) -> Result<u64> {
        let limit = match (requested, self.default_limit) {
            (Some(limit), _) => limit,
            (None, Some(default)) => return Ok(default),
            (None, None) => {
                return Err(QueryError::InvalidPagination("limit 为必填参数".into()));
            }
        };

        if let Some(max) = self.max_limit {
            if limit > max {
                return Err(QueryError::InvalidPagination(format!(
                    "limit 不能超过 {}, 实际为 {}",
                    max, limit
                )));
            }
            if self.default_limit.is_some() && limit < 1 {
                return Err(QueryError::InvalidPagination("limit 至少为 1".into()));
            }
        }

        Ok(limit)
    }
}

/// 分页策略缓存
///
/// 在启动时按 (默认值, 上限) 注册，之后以只读引用在请求间共享。
#[derive(Debug, Clone, Default)]
pub struct PaginationPolicies {
    policies: HashMap<(Option<u64>, Option<u64>), Arc<PaginationPolicy>>,
}

impl PaginationPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册策略，已存在时返回同一实例
    pub fn register(
        &mut self,
        default_limit: Option<u64>,
        max_limit: Option<u64>,
    ) -> Result<Arc<PaginationPolicy>> {
        let key = (default_limit, max_limit);
        if let Some(existing) = self.policies.get(&key) {
            return Ok(existing.clone());
        }

        let policy = Arc::new(PaginationPolicy::new(default_limit, max_limit)?);
        self.policies.insert(key, policy.clone());
        Ok(policy)
    }

    pub fn get(
        &self,
        default_limit: Option<u64>,
        max_limit: Option<u64>,
    ) -> Option<Arc<PaginationPolicy>> {
        self.policies.get(&(default_limit, max_limit)).cloned()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// 解析完成的列表查询
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub where_rule: Option<WhereRule>,
    pub order_by: Vec<OrderByRule>,
    pub pagination: Pagination,
}

impl ListQuery {
    /// 分页数据查询
    pub fn data_query(&self, assembler: &QueryAssembler<'_>, base: SelectQuery) -> Result<SelectQuery> {
        assembler.assemble(
            base,
            Some(self.pagination.skip),
            Some(self.pagination.limit),
            self.where_rule.as_ref(),
            Some(self.order_by.as_slice()),
        )
    }

    /// 计数查询：同一过滤规则，不分页不排序
    pub fn count_query(&self, assembler: &QueryAssembler<'_>, base: SelectQuery) -> Result<SelectQuery> {
        assembler.assemble(base, None, None, self.where_rule.as_ref(), None)
    }
}

/// 用同一逻辑条件组合多条可选规则
///
/// 没有任何规则时返回 `None`。and / or 只有一条时原样返回；
/// not 始终包裹一层取反，多条规则先做合取再取反。
pub fn join_where_rules<I>(rules: I, condition: LogicalOperator) -> Option<WhereRule>
where
    I: IntoIterator<Item = Option<WhereRule>>,
{
    let mut present: Vec<WhereRule> = rules.into_iter().flatten().collect();
    let combined = match present.len() {
        0 => return None,
        1 => present.pop()?,
        _ if condition == LogicalOperator::Not => WhereRule::and(present),
        _ => WhereRule::Complex(ComplexRule::new(condition, present)),
    };

    if condition == LogicalOperator::Not {
        Some(WhereRule::not(combined))
    } else {
        Some(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Direction;

    #[test]
    fn test_from_pairs_with_aliases() {
        let params = ListQueryParams::from_pairs([
            ("filters", r#"{"field":"name","operator":"equal","value":"pippo"}"#),
            ("sort", r#"[{"field":"name","direction":"desc"}]"#),
            ("offset", "10"),
            ("take", "20"),
            ("unrelated", "x"),
        ])
        .unwrap();

        assert!(params.r#where.is_some());
        assert_eq!(params.skip.as_deref(), Some("10"));
        assert_eq!(params.limit.as_deref(), Some("20"));

        let query = params.resolve(&PaginationPolicy::new(Some(50), Some(200)).unwrap()).unwrap();
        assert_eq!(query.where_rule, Some(WhereRule::equal("name", "pippo")));
        assert_eq!(query.order_by, vec![OrderByRule::new("name", Direction::Desc)]);
        assert_eq!(query.pagination, Pagination { skip: 10, limit: 20 });
    }

    #[test]
    fn test_both_aliases_is_malformed() {
        let err = ListQueryParams::from_pairs([("skip", "1"), ("offset", "2")]).unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let params = ListQueryParams::from_pairs([("where", "{not json")]).unwrap();
        assert!(matches!(params.where_rule().unwrap_err(), QueryError::Malformed(_)));

        let params = ListQueryParams::from_pairs([("orderBy", r#"{"field":"name"}"#)]).unwrap();
        assert!(matches!(params.order_by_rules().unwrap_err(), QueryError::Malformed(_)));
    }

    #[test]
    fn test_policy_default_and_max() {
        let policy = PaginationPolicy::new(Some(100), Some(300)).unwrap();
        assert_eq!(policy.resolve(None).unwrap(), 100);
        assert_eq!(policy.resolve(Some(300)).unwrap(), 300);
        assert!(matches!(policy.resolve(Some(301)), Err(QueryError::InvalidPagination(_))));
        assert!(matches!(policy.resolve(Some(0)), Err(QueryError::InvalidPagination(_))));
    }

    #[test]
    fn test_policy_partial() {
        let default_only = PaginationPolicy::new(Some(50), None).unwrap();
        assert_eq!(default_only.resolve(None).unwrap(), 50);
        assert_eq!(default_only.resolve(Some(10_000)).unwrap(), 10_000);

        let max_only = PaginationPolicy::new(None, Some(20)).unwrap();
        assert!(max_only.resolve(None).is_err());
        assert_eq!(max_only.resolve(Some(20)).unwrap(), 20);
        assert!(max_only.resolve(Some(21)).is_err());

        let unbounded = PaginationPolicy::new(None, None).unwrap();
        assert!(unbounded.resolve(None).is_err());
        assert_eq!(unbounded.resolve(Some(7)).unwrap(), 7);
    }

    #[test]
    fn test_policy_rejects_default_above_max() {
        let err = PaginationPolicy::new(Some(500), Some(100)).unwrap_err();
        assert!(!err.is_validation());
    }

    #[test]
    fn test_negative_or_garbage_skip() {
        let policy = PaginationPolicy::new(Some(50), Some(200)).unwrap();

        let params = ListQueryParams::from_pairs([("skip", "-1")]).unwrap();
        assert!(matches!(params.pagination(&policy), Err(QueryError::InvalidPagination(_))));

        let params = ListQueryParams::from_pairs([("limit", "ten")]).unwrap();
        assert!(matches!(params.pagination(&policy), Err(QueryError::InvalidPagination(_))));

        let params = ListQueryParams::default();
        assert_eq!(params.pagination(&policy).unwrap(), Pagination { skip: 0, limit: 50 });
    }

    #[test]
    fn test_policies_cache() {
        let mut policies = PaginationPolicies::new();
        let a = policies.register(Some(100), Some(300)).unwrap();
        let b = policies.register(Some(100), Some(300)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(policies.len(), 1);

        policies.register(None, Some(10)).unwrap();
        assert_eq!(policies.len(), 2);
        assert!(policies.get(Some(1), Some(2)).is_none());
        assert!(policies.register(Some(3), Some(2)).is_err());
    }

    #[test]
    fn test_join_where_rules() {
        assert_eq!(join_where_rules([None, None], LogicalOperator::And), None);

        let single = join_where_rules(
            [None, Some(WhereRule::equal("a", 1))],
            LogicalOperator::And,
        );
        assert_eq!(single, Some(WhereRule::equal("a", 1)));

        let joined = join_where_rules(
            [Some(WhereRule::equal("a", 1)), Some(WhereRule::equal("b", 2))],
            LogicalOperator::Or,
        );
        assert_eq!(
            joined,
            Some(WhereRule::or(vec![WhereRule::equal("a", 1), WhereRule::equal("b", 2)]))
        );
    }

    #[test]
    fn test_join_where_rules_not_keeps_negation() {
        let single = join_where_rules([Some(WhereRule::equal("a", 1))], LogicalOperator::Not);
        assert_eq!(single, Some(WhereRule::not(WhereRule::equal("a", 1))));

        let several = join_where_rules(
            [Some(WhereRule::equal("a", 1)), None, Some(WhereRule::equal("b", 2))],
            LogicalOperator::Not,
        );
        assert_eq!(
            several,
            Some(WhereRule::not(WhereRule::and(vec![
                WhereRule::equal("a", 1),
                WhereRule::equal("b", 2)
            ])))
        );

        assert_eq!(join_where_rules([None], LogicalOperator::Not), None);
    }
}
