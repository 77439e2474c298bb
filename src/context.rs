//! Call-scoped attribute stack / 调用作用域的路由属性栈
//!
//! Every logical execution context owns a private LIFO stack of
//! [`Attribute`]s so that nested intercepted calls can override the routing
//! decision and restore it when they return.
//!
//! Scope boundary / 作用域边界:
//! - inside [`scope`] / [`ensure_scope`] (and inside every request handled by
//!   [`crate::request::request_context_layer`]) the stack is a tokio
//!   task-local. It follows the task across worker threads and is dropped
//!   with the task.
//! - outside any task scope a thread-local stack serves synchronous callers.
//!   Never hold an [`AttributeGuard`] from that stack across an `.await`.

use std::cell::RefCell;
use std::future::Future;

use crate::attribute::Attribute;

/// LIFO stack of routing attributes / 路由属性栈
#[derive(Debug, Default)]
pub struct AttributeStack {
    entries: Vec<Attribute>,
}

impl AttributeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack whose bottom entry is inherited from a parent context / 继承父上下文的栈
    pub fn seeded(seed: Option<Attribute>) -> Self {
        let mut stack = Self::new();
        if let Some(attr) = seed {
            stack.push(Some(attr));
        }
        stack
    }

    /// Push an attribute; `None` pushes the empty sentinel / 压栈，None 压入空属性
    pub fn push(&mut self, attr: Option<Attribute>) {
        self.entries.push(attr.unwrap_or_default());
    }

    pub fn peek(&self) -> Option<&Attribute> {
        self.entries.last()
    }

    /// Pop exactly one entry, releasing the buffer once empty / 出栈，栈空时释放内存
    pub fn pop(&mut self) -> Option<Attribute> {
        let attr = self.entries.pop();
        if self.entries.is_empty() {
            self.entries = Vec::new();
        }
        attr
    }

    pub fn clear(&mut self) {
        self.entries = Vec::new();
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

tokio::task_local! {
    /// Task-local attribute stack, follows the task across worker threads.
    static TASK_STACK: RefCell<AttributeStack>;
}

thread_local! {
    static THREAD_STACK: RefCell<AttributeStack> = RefCell::new(AttributeStack::new());
}

/// Whether a task-local stack is active for the current task / 是否处于任务作用域
pub fn in_scope() -> bool {
    TASK_STACK.try_with(|_| ()).is_ok()
}

fn with_stack<R>(f: impl FnOnce(&RefCell<AttributeStack>) -> R) -> R {
    if in_scope() {
        TASK_STACK.with(f)
    } else {
        THREAD_STACK.with(f)
    }
}

/// Push onto the current context's stack / 当前上下文压栈
pub fn push(attr: Option<Attribute>) {
    with_stack(|stack| stack.borrow_mut().push(attr));
}

/// Top of the current context's stack / 当前上下文栈顶
pub fn peek() -> Option<Attribute> {
    with_stack(|stack| stack.borrow().peek().cloned())
}

/// Pop the current context's stack / 当前上下文出栈
pub fn pop() -> Option<Attribute> {
    with_stack(|stack| stack.borrow_mut().pop())
}

/// Force release of the current context's stack / 强制清空当前上下文
///
/// Only needed after a manual [`push`] that could not be paired with [`pop`].
pub fn clear() {
    with_stack(|stack| stack.borrow_mut().clear());
}

pub fn depth() -> usize {
    with_stack(|stack| stack.borrow().depth())
}

/// Client name of the current top attribute / 当前客户端名称
pub fn current_client() -> Option<String> {
    with_stack(|stack| {
        stack
            .borrow()
            .peek()
            .and_then(|attr| attr.client().map(str::to_string))
    })
}

/// Bucket name of the current top attribute / 当前存储桶名称
pub fn current_bucket() -> Option<String> {
    with_stack(|stack| {
        stack
            .borrow()
            .peek()
            .and_then(|attr| attr.bucket().map(str::to_string))
    })
}

/// Run `fut` with a fresh, isolated task-local stack / 在独立的栈作用域内执行
pub async fn scope<F: Future>(fut: F) -> F::Output {
    TASK_STACK.scope(RefCell::new(AttributeStack::new()), fut).await
}

/// Reuse the active task scope, or open one when there is none / 复用或新建作用域
pub async fn ensure_scope<F: Future>(fut: F) -> F::Output {
    if in_scope() {
        fut.await
    } else {
        scope(fut).await
    }
}

/// Spawn a task whose stack starts from the spawner's current attribute
/// 派生任务，并继承当前路由属性
pub fn spawn_inherit<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let stack = AttributeStack::seeded(peek());
    tokio::spawn(TASK_STACK.scope(RefCell::new(stack), fut))
}

/// Pushes on creation and pops on drop / 创建时压栈，析构时出栈
///
/// Dropping runs on normal return, early `?` return, panic unwinding and
/// future cancellation alike, so the stack never leaks an entry.
#[must_use = "the attribute is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct AttributeGuard {
    depth: usize,
}

impl AttributeGuard {
    pub fn push(attr: Option<Attribute>) -> Self {
        let depth = with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(attr);
            stack.depth()
        });
        Self { depth }
    }

    /// Stack depth right after this guard's push / 压栈后的深度
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for AttributeGuard {
    fn drop(&mut self) {
        let remaining = with_stack(|stack| {
            let mut stack = stack.borrow_mut();
            stack.pop();
            stack.depth()
        });
        if remaining + 1 != self.depth {
            tracing::warn!(
                "Attribute stack out of balance: guard pushed at depth {}, popped leaving {}",
                self.depth,
                remaining
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_none_pushes_empty_sentinel() {
        let mut stack = AttributeStack::new();
        stack.push(None);
        assert_eq!(stack.peek(), Some(&Attribute::empty()));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_lifo_restores_previous_top() {
        let mut stack = AttributeStack::new();
        stack.push(Some(Attribute::new("X", "")));
        for depth in 1..=8 {
            for i in 0..depth {
                stack.push(Some(Attribute::new(format!("C{}", i), "")));
            }
            for _ in 0..depth {
                stack.pop();
            }
            assert_eq!(stack.peek().and_then(|a| a.client()), Some("X"));
        }
        stack.pop();
        assert!(stack.peek().is_none());
    }

    #[test]
    fn test_pop_to_empty_releases_buffer() {
        let mut stack = AttributeStack::new();
        for i in 0..32 {
            stack.push(Some(Attribute::new(format!("C{}", i), "")));
        }
        for _ in 0..32 {
            stack.pop();
        }
        assert!(stack.is_empty());
        assert_eq!(stack.capacity(), 0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_thread_local_guards_nest() {
        clear();
        {
            let _a = AttributeGuard::push(Some(Attribute::new("X", "")));
            {
                let _b = AttributeGuard::push(Some(Attribute::new("Y", "")));
                let _c = AttributeGuard::push(None);
                assert_eq!(current_client(), None);
                assert_eq!(depth(), 3);
            }
            assert_eq!(current_client().as_deref(), Some("X"));
        }
        assert!(peek().is_none());
    }

    #[test]
    fn test_guard_pops_on_panic() {
        clear();
        let result = std::panic::catch_unwind(|| {
            let _guard = AttributeGuard::push(Some(Attribute::new("X", "")));
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }

    #[tokio::test]
    async fn test_task_scopes_are_isolated() {
        let a = tokio::spawn(scope(async {
            push(Some(Attribute::new("A", "")));
            tokio::task::yield_now().await;
            let seen = current_client();
            pop();
            seen
        }));
        let b = tokio::spawn(scope(async {
            push(Some(Attribute::new("B", "")));
            tokio::task::yield_now().await;
            let seen = current_client();
            pop();
            seen
        }));
        assert_eq!(a.await.unwrap().as_deref(), Some("A"));
        assert_eq!(b.await.unwrap().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_spawn_inherit_seeds_child() {
        let child = scope(async {
            let _guard = AttributeGuard::push(Some(Attribute::new("PARENT", "docs")));
            spawn_inherit(async { (current_client(), current_bucket(), depth()) })
        })
        .await;
        let (client, bucket, depth) = child.await.unwrap();
        assert_eq!(client.as_deref(), Some("PARENT"));
        assert_eq!(bucket.as_deref(), Some("docs"));
        assert_eq!(depth, 1);
    }

    #[tokio::test]
    async fn test_ensure_scope_reuses_active_scope() {
        scope(async {
            push(Some(Attribute::new("OUTER", "")));
            let inner = ensure_scope(async { current_client() }).await;
            assert_eq!(inner.as_deref(), Some("OUTER"));
            pop();
        })
        .await;
        assert!(!in_scope());
    }
}
