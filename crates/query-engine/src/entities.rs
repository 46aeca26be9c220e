//! 实体字段定义

use crate::error::{QueryError, Result};
use crate::field::{Field, FieldRegistry, RegistryCatalog};
use crate::predicate::Column;
use crate::value::Scalar;
use chrono::{DateTime, NaiveDate, Utc};

pub const CUSTOMER_ENTITY: &str = "customer";
pub const CUSTOMER_TABLE: &str = "customers";

/// 客户实体可查询字段
pub fn customer_fields() -> Vec<Field> {
    let column = |name: &str| Column::qualified(CUSTOMER_TABLE, name);
    vec![
        Field::new("id", column("id")),
        Field::new("name", column("name")),
        Field::new("email", column("email")),
        Field::new("phone", column("phone")),
        Field::new("address", column("address")),
        Field::new("created_at", column("created_at")).with_transform(normalize_timestamp),
    ]
}

pub fn customer_registry() -> Result<FieldRegistry> {
    FieldRegistry::register(customer_fields())
}

/// 启动时构建的注册表目录
pub fn default_catalog() -> Result<RegistryCatalog> {
    let mut catalog = RegistryCatalog::new();
    catalog.register(CUSTOMER_ENTITY, customer_fields())?;
    Ok(catalog)
}

/// 把 RFC 3339 或 `YYYY-MM-DD` 解析为 UTC 时间戳，绑定时按 timestamptz 传递
pub fn normalize_timestamp(value: &Scalar) -> Result<Scalar> {
    let invalid = |actual: &str| QueryError::InvalidValue {
        target: "字段 created_at".to_string(),
        expected: "RFC 3339 timestamp or YYYY-MM-DD".to_string(),
        actual: actual.to_string(),
    };

    let raw = value.as_str().ok_or_else(|| invalid(value.type_name()))?;

    let timestamp = if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        parsed.with_timezone(&Utc)
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid(raw))?
            .and_utc()
    } else {
        return Err(invalid(raw));
    };

    Ok(Scalar::Timestamp(timestamp))
}
