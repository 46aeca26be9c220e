//! 编译上下文
//!
//! 每次编译独立创建，累积命名参数并为重复引用的字段生成不冲突的参数名。
//! 上下文只在单次编译的调用链上显式传递，不跨请求共享。

use crate::error::Result;
use crate::field::{Field, FieldRegistry};
use crate::value::Scalar;
use std::collections::{BTreeMap, HashMap};

/// 编译上下文
#[derive(Debug)]
pub struct EngineContext<'a> {
    params: BTreeMap<String, Scalar>,
    param_counters: HashMap<String, usize>,
    fields: &'a FieldRegistry,
}

impl<'a> EngineContext<'a> {
    pub fn new(fields: &'a FieldRegistry) -> Self {
        Self {
            params: BTreeMap::new(),
            param_counters: HashMap::new(),
            fields,
        }
    }

    pub fn fields(&self) -> &'a FieldRegistry {
        self.fields
    }

    /// 解析字段，未注册时返回 `UnknownField`
    pub fn field(&self, name: &str) -> Result<&'a Field> {
        self.fields.lookup(name)
    }

    /// 绑定参数并返回参数名
    ///
    /// 参数名为 `{字段名}_{序号}`，序号按字段单调递增。
    pub fn add_param(&mut self, field: &Field, value: Scalar) -> String {
        let counter = self
            .param_counters
            .entry(field.name().to_string())
            .or_insert(0);
        let param_name = format!("{}_{}", field.name(), counter);
        *counter += 1;

        self.params.insert(param_name.clone(), value);
        param_name
    }

    pub fn params(&self) -> &BTreeMap<String, Scalar> {
        &self.params
    }

    pub fn into_params(self) -> BTreeMap<String, Scalar> {
        self.params
    }
}
