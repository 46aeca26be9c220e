//! 共享库
//!
//! 包含查询服务共用的配置加载、对外错误响应和可观测性初始化代码。

pub mod config;
pub mod error;
pub mod observability;
