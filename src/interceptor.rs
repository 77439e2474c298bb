//! Interception layer / 拦截层
//!
//! Wraps a call: resolve the routing attribute for the call site, push it,
//! run the call, pop on every exit path (return, error, panic, cancellation).

use std::future::Future;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::context::{self, AttributeGuard};
use crate::declaration::DeclarationResolver;
use crate::invocation::Invocation;
use crate::storage::StorageManager;

#[derive(Clone)]
pub struct Interceptor {
    declarations: Arc<DeclarationResolver>,
    manager: Arc<StorageManager>,
}

impl Interceptor {
    pub fn new(declarations: Arc<DeclarationResolver>, manager: Arc<StorageManager>) -> Self {
        Self { declarations, manager }
    }

    pub fn declarations(&self) -> &Arc<DeclarationResolver> {
        &self.declarations
    }

    /// Attribute to push for `invocation` / 计算调用的路由属性
    ///
    /// An undeclared call does not push the empty attribute: it re-pushes the
    /// enclosing routing decision (the current top, or the empty attribute when
    /// nothing is active), so a nested undeclared call keeps its caller's client.
    /// The push/pop pairing per call is unchanged.
    pub fn determine(&self, invocation: &Invocation) -> Attribute {
        match self.declarations.resolve(invocation.method(), invocation.receiver()) {
            Some(declaration) => self.manager.resolve_attribute(invocation, &declaration),
            None => {
                tracing::debug!("No routing declaration on {}", invocation.method());
                context::peek().unwrap_or_else(Attribute::empty)
            }
        }
    }

    /// Run a synchronous call under the resolved attribute / 同步调用
    pub fn invoke<R>(&self, invocation: &Invocation, call: impl FnOnce() -> R) -> R {
        let _guard = AttributeGuard::push(Some(self.determine(invocation)));
        call()
    }

    /// Run a future under the resolved attribute / 异步调用
    ///
    /// Opens a task-local stack scope when the caller has none, so the pushed
    /// attribute follows the future across worker threads.
    pub async fn invoke_async<F: Future>(&self, invocation: Invocation, fut: F) -> F::Output {
        context::ensure_scope(async move {
            let _guard = AttributeGuard::push(Some(self.determine(&invocation)));
            fut.await
        })
        .await
    }
}
