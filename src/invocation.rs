//! Intercepted call description / 被拦截调用的描述

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::declaration::MethodId;
use crate::request::RequestContext;

/// One intercepted call: which method, on which receiver type, with which
/// named arguments, while serving which request.
#[derive(Debug, Clone)]
pub struct Invocation {
    method: MethodId,
    receiver: Arc<str>,
    args: IndexMap<String, Value>,
    request: Option<Arc<RequestContext>>,
}

impl Invocation {
    /// Captures the current request context if one is installed / 自动捕获当前请求
    pub fn new(method: MethodId, receiver: &str) -> Self {
        Self {
            method,
            receiver: Arc::from(receiver),
            args: IndexMap::new(),
            request: RequestContext::current(),
        }
    }

    /// Add a named argument; values that fail to serialize become `null`.
    pub fn arg<T: Serialize>(mut self, name: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.args.insert(name.to_string(), value);
        self
    }

    pub fn with_request(mut self, request: Arc<RequestContext>) -> Self {
        self.request = Some(request);
        self
    }

    pub fn method(&self) -> &MethodId {
        &self.method
    }

    /// Concrete runtime type name of the receiver / 接收者的具体类型
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Positional argument lookup / 按位置获取参数
    pub fn argument_at(&self, index: usize) -> Option<&Value> {
        self.args.get_index(index).map(|(_, v)| v)
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_deref()
    }
}
