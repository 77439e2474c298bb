//! Expression resolver chain / 动态标记解析链
//!
//! A marker not starting with [`DYNAMIC_PREFIX`] is a literal and returned
//! unchanged. Dynamic markers are offered to the resolvers in ascending order;
//! the first resolver that claims the marker and yields a value wins, a
//! resolver yielding nothing lets the scan continue.

mod expression;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StorageError};
use crate::invocation::Invocation;

pub use expression::evaluate as evaluate_expression;

pub const DYNAMIC_PREFIX: &str = "#";
pub const HEADER_PREFIX: &str = "#header:";
pub const SESSION_PREFIX: &str = "#session:";

pub const HEADER_ORDER: i32 = 100;
pub const SESSION_ORDER: i32 = 200;
/// The expression resolver claims every other dynamic marker, so it runs last.
pub const EXPRESSION_ORDER: i32 = i32::MAX;

/// Whether `marker` must go through the chain / 是否为动态标记
pub fn is_dynamic(marker: &str) -> bool {
    marker.starts_with(DYNAMIC_PREFIX)
}

/// User supplied resolver / 自定义解析器
pub trait MarkerResolver: Send + Sync {
    fn matches(&self, marker: &str) -> bool;

    /// `Ok(None)` when the marker cannot be evaluated in this call,
    /// `Err` only when the marker itself is malformed.
    fn resolve(&self, invocation: &Invocation, marker: &str) -> Result<Option<String>>;
}

/// Resolver variants / 解析器种类
#[derive(Clone)]
pub enum ResolverKind {
    /// `#header:<name>`: inbound request header
    Header,
    /// `#session:<name>`: server-side session attribute
    Session,
    /// `#path.to.value`: evaluated against the call's arguments
    Expression,
    Custom(Arc<dyn MarkerResolver>),
}

impl fmt::Debug for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Header => f.write_str("Header"),
            ResolverKind::Session => f.write_str("Session"),
            ResolverKind::Expression => f.write_str("Expression"),
            ResolverKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl ResolverKind {
    pub fn matches(&self, marker: &str) -> bool {
        match self {
            ResolverKind::Header => marker.starts_with(HEADER_PREFIX),
            ResolverKind::Session => marker.starts_with(SESSION_PREFIX),
            ResolverKind::Expression => {
                is_dynamic(marker) && !marker.starts_with(HEADER_PREFIX) && !marker.starts_with(SESSION_PREFIX)
            }
            ResolverKind::Custom(resolver) => resolver.matches(marker),
        }
    }

    pub fn resolve(&self, invocation: &Invocation, marker: &str) -> Result<Option<String>> {
        match self {
            ResolverKind::Header => {
                let name = marker_argument(marker, HEADER_PREFIX)?;
                Ok(invocation.request().and_then(|r| r.header(name)))
            }
            ResolverKind::Session => {
                let name = marker_argument(marker, SESSION_PREFIX)?;
                Ok(invocation.request().and_then(|r| r.session_attribute(name)))
            }
            ResolverKind::Expression => expression::evaluate(invocation, marker),
            ResolverKind::Custom(resolver) => resolver.resolve(invocation, marker),
        }
    }
}

fn marker_argument<'a>(marker: &'a str, prefix: &str) -> Result<&'a str> {
    let name = marker
        .strip_prefix(prefix)
        .map(str::trim)
        .ok_or_else(|| StorageError::malformed(marker, format!("expected prefix {}", prefix)))?;
    if name.is_empty() {
        return Err(StorageError::malformed(marker, "empty name"));
    }
    Ok(name)
}

#[derive(Debug, Clone)]
pub struct Resolver {
    pub kind: ResolverKind,
    pub order: i32,
}

/// Ordered resolver chain / 有序解析链
#[derive(Debug, Clone, Default)]
pub struct ResolverChain {
    resolvers: Vec<Resolver>,
    named: HashMap<String, ResolverKind>,
}

impl ResolverChain {
    /// Empty chain, every dynamic marker resolves to nothing / 空解析链
    pub fn new() -> Self {
        Self::default()
    }

    /// Header, session and expression resolvers / 默认解析链
    pub fn with_orders(header_order: i32, session_order: i32) -> Self {
        let mut chain = Self::new();
        chain.add(ResolverKind::Header, header_order);
        chain.add(ResolverKind::Session, session_order);
        chain.add(ResolverKind::Expression, EXPRESSION_ORDER);
        chain
    }

    /// Insert keeping ascending order; ties keep insertion order / 按 order 插入
    pub fn add(&mut self, kind: ResolverKind, order: i32) {
        let at = self.resolvers.partition_point(|r| r.order <= order);
        self.resolvers.insert(at, Resolver { kind, order });
    }

    /// Register a resolver that declarations may name as their override
    /// 注册可被声明直接引用的解析器
    pub fn register_named(&mut self, name: &str, kind: ResolverKind) {
        self.named.insert(name.to_string(), kind);
    }

    pub fn named(&self, name: &str) -> Option<&ResolverKind> {
        self.named.get(name)
    }

    pub fn resolvers(&self) -> &[Resolver] {
        &self.resolvers
    }

    /// Expand a marker / 解析标记
    pub fn determine(&self, invocation: &Invocation, marker: &str) -> Result<Option<String>> {
        if !is_dynamic(marker) {
            return Ok(Some(marker.to_string()));
        }
        for resolver in self.resolvers.iter().filter(|r| r.kind.matches(marker)) {
            if let Some(value) = resolver.kind.resolve(invocation, marker)? {
                tracing::debug!("Marker {} resolved by {:?} to {}", marker, resolver.kind, value);
                return Ok(Some(value));
            }
        }
        tracing::debug!("Marker {} resolved to nothing", marker);
        Ok(None)
    }

    /// Expand a marker with one specific resolver, bypassing the chain
    /// 使用指定解析器解析
    pub fn determine_with(
        &self,
        kind: &ResolverKind,
        invocation: &Invocation,
        marker: &str,
    ) -> Result<Option<String>> {
        if !is_dynamic(marker) {
            return Ok(Some(marker.to_string()));
        }
        kind.resolve(invocation, marker)
    }
}
