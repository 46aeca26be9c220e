//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 查询引擎配置
///
/// 限制单次请求可提交的规则树规模，以及列表接口的默认分页大小。
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// 规则树最大嵌套深度
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// 单棵规则树允许的最大节点数
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
    /// 未传 limit 时的默认条数
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// limit 上限
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_max_depth() -> usize {
    16
}

fn default_max_rules() -> usize {
    128
}

fn default_limit() -> u64 {
    50
}

fn default_max_limit() -> u64 {
    200
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_rules: default_max_rules(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（QUERY_ 前缀，如 QUERY_QUERY__MAX_DEPTH -> query.max_depth）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("QUERY_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 字段名本身带下划线，层级分隔使用双下划线
            .add_source(
                Environment::with_prefix("QUERY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.observability = config.observability.with_service_name(service_name);

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
