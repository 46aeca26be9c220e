//! 查询编译指标
//!
//! 基于 metrics crate 的 facade 记录，未安装 recorder 时所有调用都是空操作。

/// 查询编译总次数（按结果区分）
pub const QUERY_COMPILATIONS_TOTAL: &str = "query_compilations_total";
/// 编译的规则节点总数
pub const QUERY_RULES_COMPILED_TOTAL: &str = "query_rules_compiled_total";
/// 查询编译耗时
pub const QUERY_COMPILE_DURATION_SECONDS: &str = "query_compile_duration_seconds";

/// 注册指标描述
pub fn describe(service_name: &str) {
    metrics::describe_counter!(
        QUERY_COMPILATIONS_TOTAL,
        "Total number of filter/sort query compilations"
    );
    metrics::describe_counter!(
        QUERY_RULES_COMPILED_TOTAL,
        "Total number of rule nodes compiled into predicates"
    );
    metrics::describe_histogram!(
        QUERY_COMPILE_DURATION_SECONDS,
        "Filter/sort query compilation duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 记录一次查询编译
#[inline]
pub fn record_query_compilation(outcome: &str, rule_count: usize, duration_secs: f64) {
    metrics::counter!(
        QUERY_COMPILATIONS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::counter!(QUERY_RULES_COMPILED_TOTAL).increment(rule_count as u64);

    metrics::histogram!(
        QUERY_COMPILE_DURATION_SECONDS,
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}
