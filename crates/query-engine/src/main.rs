//! 查询解释工具
//!
//! 用法：`query-explain where='{"field":"name","operator":"equal","value":"pippo"}' limit=10`
//!
//! 按客户实体的字段注册表解析参数，输出渲染后的数据查询和计数查询。

use anyhow::Result;
use query_engine::entities::{CUSTOMER_ENTITY, CUSTOMER_TABLE, default_catalog};
use query_engine::{
    ListQueryParams, PaginationPolicy, Postgres, QueryAssembler, QueryError, QueryLimits,
    RenderedQuery, SelectQuery,
};
use query_shared::config::AppConfig;
use query_shared::error::ApiError;
use query_shared::observability;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct Explain {
    data: ExplainedQuery,
    count: ExplainedQuery,
}

#[derive(Debug, Serialize)]
struct ExplainedQuery {
    #[serde(flatten)]
    query: RenderedQuery,
    arg_types: Vec<String>,
}

impl From<RenderedQuery> for ExplainedQuery {
    fn from(query: RenderedQuery) -> Self {
        let arg_types = query.pg_arg_types();
        Self { query, arg_types }
    }
}

fn main() -> Result<()> {
    let config = AppConfig::load("query-explain").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    observability::init(&config.observability)?;

    let pairs = std::env::args().skip(1).filter_map(|arg| {
        arg.split_once('=')
            .map(|(k, v)| (k.to_string(), v.to_string()))
    });

    match explain(&config, pairs) {
        Ok(explain) => {
            println!("{}", serde_json::to_string_pretty(&explain)?);
            Ok(())
        }
        Err(e) => {
            let body = ApiError::from(e).to_response_body();
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

fn explain(
    config: &AppConfig,
    pairs: impl IntoIterator<Item = (String, String)>,
) -> std::result::Result<Explain, QueryError> {
    let catalog = default_catalog()?;
    let fields = catalog
        .get(CUSTOMER_ENTITY)
        .ok_or_else(|| QueryError::Internal(format!("实体未注册: {}", CUSTOMER_ENTITY)))?;
    let policy = PaginationPolicy::from_config(&config.query)?;
    let assembler = QueryAssembler::with_limits(&fields, QueryLimits::from(&config.query))
        .with_metrics(config.observability.metrics_enabled);

    let params = ListQueryParams::from_pairs(pairs)?;
    debug!(?params, "解析查询参数");
    let query = params.resolve(&policy)?;

    let data = query
        .data_query(&assembler, SelectQuery::select_all(CUSTOMER_TABLE))?
        .render(&Postgres)?;
    let count = query
        .count_query(&assembler, SelectQuery::count(CUSTOMER_TABLE))?
        .render(&Postgres)?;

    info!(args = data.args.len(), "查询渲染完成");
    Ok(Explain {
        data: data.into(),
        count: count.into(),
    })
}
