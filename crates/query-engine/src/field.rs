//! 字段注册表
//!
//! 把对外暴露的字段名映射到内部列引用，是防止任意列注入的白名单边界。
//! 注册表构建后不可变，可在多个请求之间只读共享。

use crate::error::{QueryError, Result};
use crate::predicate::Column;
use crate::value::{RuleValue, Scalar};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 值转换函数，如 ID 反混淆、时间格式归一化
pub type TransformFn = dyn Fn(&Scalar) -> Result<Scalar> + Send + Sync;

/// 可查询字段
#[derive(Clone)]
pub struct Field {
    name: String,
    column: Column,
    transform: Option<Arc<TransformFn>>,
}

impl Field {
    pub fn new(name: impl Into<String>, column: impl Into<Column>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            transform: None,
        }
    }

    /// 附加值转换函数
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Scalar) -> Result<Scalar> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    /// 对规则值应用转换，列表逐个元素转换
    pub fn transform(&self, value: &RuleValue) -> Result<RuleValue> {
        let Some(transform) = &self.transform else {
            return Ok(value.clone());
        };

        match value {
            RuleValue::Absent => Ok(RuleValue::Absent),
            RuleValue::Scalar(s) => transform(s).map(RuleValue::Scalar),
            RuleValue::List(items) => items
                .iter()
                .map(|item| transform(item))
                .collect::<Result<Vec<_>>>()
                .map(RuleValue::List),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// 字段注册表
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, Field>,
}

impl FieldRegistry {
    /// 从字段列表构建注册表
    ///
    /// 重名字段属于配置错误，返回 `Internal` 而不是校验错误。
    pub fn register(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let mut map = HashMap::new();
        for field in fields {
            let name = field.name.clone();
            if map.insert(name.clone(), field).is_some() {
                return Err(QueryError::Internal(format!("字段重复注册: {}", name)));
            }
        }
        Ok(Self { fields: map })
    }

    /// 按名称查找字段
    pub fn lookup(&self, name: &str) -> Result<&Field> {
        self.fields
            .get(name)
            .ok_or_else(|| QueryError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 已注册的字段名（排序后返回）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 按实体缓存的注册表目录
///
/// 在启动时构建一次，之后只读。
#[derive(Debug, Clone, Default)]
pub struct RegistryCatalog {
    registries: HashMap<String, Arc<FieldRegistry>>,
}

impl RegistryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册实体的字段列表
    pub fn register(
        &mut self,
        entity: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<Arc<FieldRegistry>> {
        let entity = entity.into();
        if self.registries.contains_key(&entity) {
            return Err(QueryError::Internal(format!("实体重复注册: {}", entity)));
        }

        let registry = Arc::new(FieldRegistry::register(fields)?);
        self.registries.insert(entity, Arc::clone(&registry));
        Ok(registry)
    }

    pub fn get(&self, entity: &str) -> Option<Arc<FieldRegistry>> {
        self.registries.get(entity).cloned()
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
