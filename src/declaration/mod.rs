//! Routing declarations and their lookup / 路由声明及其查找
//!
//! A [`Declaration`] is the raw routing intent attached to a type or a
//! method. [`DeclarationResolver::resolve`] finds the declaration that applies
//! to a call, walking the same precedence the call site would see:
//!
//! 1. methods of [`OBJECT_TYPE`] are never decorated;
//! 2. unwrap proxies and resolve the most specific (non-bridge) implementation;
//! 3. declaration on that method;
//! 4. declaration on its declaring type, only if the called method is user level;
//! 5. if a bridge was involved, steps 3-4 against the original method;
//! 6. type-level declarations along the concrete (non-proxy) receiver's
//!    superclass chain, first hit wins.

mod meta;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

pub use meta::{MethodId, MethodMeta, TypeMeta, TypeRegistry, OBJECT_TYPE};

/// Named resolver a declaration uses instead of the chain / 指定解析器引用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolverRef(Arc<str>);

impl ResolverRef {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Raw routing intent / 原始路由声明
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    client: String,
    bucket: String,
    resolver: Option<ResolverRef>,
}

impl Declaration {
    /// Combined client + bucket marker / 客户端与存储桶
    pub fn new(client: &str, bucket: &str) -> Self {
        Self {
            client: client.to_string(),
            bucket: bucket.to_string(),
            resolver: None,
        }
    }

    /// Bare client selector / 仅选择客户端
    pub fn selector(client: &str) -> Self {
        Self::new(client, "")
    }

    pub fn with_resolver(mut self, name: &str) -> Self {
        self.resolver = Some(ResolverRef::new(name));
        self
    }

    pub fn client_marker(&self) -> &str {
        &self.client
    }

    pub fn bucket_marker(&self) -> &str {
        &self.bucket
    }

    pub fn resolver(&self) -> Option<&ResolverRef> {
        self.resolver.as_ref()
    }
}

type CacheKey = (MethodId, Arc<str>);

/// Memoized declaration lookup / 带缓存的声明查找
#[derive(Debug)]
pub struct DeclarationResolver {
    registry: RwLock<TypeRegistry>,
    cache: RwLock<HashMap<CacheKey, Option<Arc<Declaration>>>>,
    allowed_public_only: bool,
}

impl Default for DeclarationResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DeclarationResolver {
    pub fn new(allowed_public_only: bool) -> Self {
        Self {
            registry: RwLock::new(TypeRegistry::new()),
            cache: RwLock::new(HashMap::new()),
            allowed_public_only,
        }
    }

    /// Register type metadata; invalidates memoized lookups / 注册类型元数据
    pub fn register(&self, meta: TypeMeta) {
        tracing::debug!("Type metadata registered: {}", meta.name());
        let mut registry = self.registry.write();
        registry.register(meta);
        self.cache.write().clear();
    }

    /// Declaration applying to `method` called on a `receiver` instance
    /// 获取调用适用的声明
    pub fn resolve(&self, method: &MethodId, receiver: &str) -> Option<Arc<Declaration>> {
        if method.owner() == OBJECT_TYPE {
            return None;
        }

        let key: CacheKey = (method.clone(), Arc::from(receiver));
        if let Some(hit) = self.cache.read().get(&key) {
            return hit.clone();
        }

        // Registry stays read-locked until the insert, so a concurrent register
        // cannot clear the cache between compute and insert.
        let registry = self.registry.read();
        let computed = self.compute(&registry, method, receiver);
        self.cache.write().entry(key).or_insert(computed).clone()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }

    fn compute(&self, registry: &TypeRegistry, method: &MethodId, receiver: &str) -> Option<Arc<Declaration>> {
        if self.allowed_public_only && !registry.is_public(method) {
            return None;
        }

        let user_type = registry.user_type(receiver);
        let specific = registry.bridged_method(&registry.most_specific_method(method, &user_type));
        let user_level = registry.is_user_level(method);

        if let Some(found) = registry.method_declaration(&specific) {
            return Some(found);
        }
        if let Some(found) = registry.type_declaration(specific.owner()) {
            if user_level {
                return Some(found);
            }
        }

        if specific != *method {
            if let Some(found) = registry.method_declaration(method) {
                return Some(found);
            }
            if let Some(found) = registry.type_declaration(method.owner()) {
                if user_level {
                    return Some(found);
                }
            }
        }

        if registry.is_proxy(receiver) {
            return None;
        }
        registry
            .ancestors(receiver)
            .into_iter()
            .find_map(|t| registry.type_declaration(t.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DeclarationResolver {
        let resolver = DeclarationResolver::new(true);
        resolver.register(TypeMeta::new(OBJECT_TYPE).method(MethodMeta::new("to_string")));
        resolver.register(
            TypeMeta::new("BaseService")
                .declare(Declaration::selector("BASE"))
                .method(MethodMeta::new("inherited")),
        );
        resolver.register(
            TypeMeta::new("FileService")
                .extends("BaseService")
                .declare(Declaration::new("TYPE", "type-bucket"))
                .method(MethodMeta::new("upload").declare(Declaration::new("METHOD", "m-bucket")))
                .method(MethodMeta::new("download"))
                .method(MethodMeta::new("internal").private().declare(Declaration::selector("HIDDEN"))),
        );
        resolver.register(TypeMeta::new("FileService$Proxy").proxy_of("FileService"));
        resolver
    }

    fn client_of(found: Option<Arc<Declaration>>) -> Option<String> {
        found.map(|d| d.client_marker().to_string())
    }

    #[test]
    fn test_object_methods_never_decorated() {
        let resolver = resolver();
        let method = MethodId::new(OBJECT_TYPE, "to_string");
        assert!(resolver.resolve(&method, "FileService").is_none());
        assert_eq!(resolver.cached_entries(), 0);
    }

    #[test]
    fn test_method_declaration_overrides_type() {
        let resolver = resolver();
        let upload = MethodId::new("FileService", "upload");
        let download = MethodId::new("FileService", "download");
        assert_eq!(client_of(resolver.resolve(&upload, "FileService")).as_deref(), Some("METHOD"));
        assert_eq!(client_of(resolver.resolve(&download, "FileService")).as_deref(), Some("TYPE"));
    }

    #[test]
    fn test_proxy_receiver_resolves_target_method() {
        let resolver = resolver();
        let upload = MethodId::new("FileService", "upload");
        assert_eq!(
            client_of(resolver.resolve(&upload, "FileService$Proxy")).as_deref(),
            Some("METHOD")
        );
    }

    #[test]
    fn test_inherited_method_uses_declaring_type() {
        let resolver = resolver();
        let inherited = MethodId::new("BaseService", "inherited");
        assert_eq!(client_of(resolver.resolve(&inherited, "FileService")).as_deref(), Some("BASE"));
    }

    #[test]
    fn test_superclass_walk_when_nothing_direct() {
        let resolver = resolver();
        resolver.register(TypeMeta::new("Plain").method(MethodMeta::new("run")));
        resolver.register(TypeMeta::new("PlainChild").extends("Plain").method(MethodMeta::new("run")));
        resolver.register(TypeMeta::new("Leaf").extends("PlainChild").declare(Declaration::selector("LEAF")));
        let run = MethodId::new("Plain", "run");
        assert_eq!(client_of(resolver.resolve(&run, "Leaf")).as_deref(), Some("LEAF"));
        assert!(resolver.resolve(&run, "PlainChild").is_none());
    }

    #[test]
    fn test_proxy_skips_superclass_walk() {
        let resolver = resolver();
        resolver.register(TypeMeta::new("Annotated").declare(Declaration::selector("ANN")));
        resolver.register(TypeMeta::new("Bare").extends("Annotated"));
        resolver.register(TypeMeta::new("Bare$Proxy").proxy_of("Bare").extends("Annotated"));
        let call = MethodId::new("Api", "call");
        assert_eq!(client_of(resolver.resolve(&call, "Bare")).as_deref(), Some("ANN"));
        assert!(resolver.resolve(&call, "Bare$Proxy").is_none());
    }

    #[test]
    fn test_bridge_method_precedence() {
        let resolver = DeclarationResolver::new(true);
        resolver.register(
            TypeMeta::new("Repo")
                .declare(Declaration::selector("REPO"))
                .method(MethodMeta::new("save(T)")),
        );
        resolver.register(
            TypeMeta::new("UserRepo")
                .extends("Repo")
                .declare(Declaration::selector("USER_REPO"))
                .method(MethodMeta::new("save(User)"))
                .method(MethodMeta::new("save(T)").bridge_of("save(User)")),
        );
        // Called through the bridge: the type-level declaration is skipped in
        // steps 4-5 and found again by the superclass walk.
        let bridged = MethodId::new("UserRepo", "save(T)");
        assert_eq!(client_of(resolver.resolve(&bridged, "UserRepo")).as_deref(), Some("USER_REPO"));

        resolver.register(
            TypeMeta::new("OrderRepo")
                .extends("Repo")
                .method(MethodMeta::new("save(Order)").declare(Declaration::selector("ORDER")))
                .method(MethodMeta::new("save(T)").bridge_of("save(Order)")),
        );
        let via_interface = MethodId::new("Repo", "save(T)");
        assert_eq!(client_of(resolver.resolve(&via_interface, "OrderRepo")).as_deref(), Some("ORDER"));
    }

    #[test]
    fn test_non_public_methods_ignored_when_public_only() {
        let internal = MethodId::new("FileService", "internal");
        assert!(resolver().resolve(&internal, "FileService").is_none());

        let permissive = DeclarationResolver::new(false);
        permissive.register(
            TypeMeta::new("FileService")
                .method(MethodMeta::new("internal").private().declare(Declaration::selector("HIDDEN"))),
        );
        assert_eq!(client_of(permissive.resolve(&internal, "FileService")).as_deref(), Some("HIDDEN"));
    }

    #[test]
    fn test_resolution_is_memoized() {
        let resolver = resolver();
        let upload = MethodId::new("FileService", "upload");
        let first = resolver.resolve(&upload, "FileService").unwrap();
        let second = resolver.resolve(&upload, "FileService").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_entries(), 1);

        let none = MethodId::new("Unknown", "call");
        assert!(resolver.resolve(&none, "Unknown").is_none());
        assert!(resolver.resolve(&none, "Unknown").is_none());
        assert_eq!(resolver.cached_entries(), 2);

        resolver.register(TypeMeta::new("Other"));
        assert_eq!(resolver.cached_entries(), 0);
    }

    #[test]
    fn test_concurrent_register_never_leaves_stale_entry() {
        let resolver = Arc::new(DeclarationResolver::new(true));
        let save = MethodId::new("Versioned", "save");
        let version = |n: usize| {
            TypeMeta::new("Versioned")
                .declare(Declaration::selector(&format!("V{}", n)))
                .method(MethodMeta::new("save"))
        };
        resolver.register(version(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                let save = save.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        resolver.resolve(&save, "Versioned");
                    }
                })
            })
            .collect();
        for n in 1..=200 {
            resolver.register(version(n));
        }
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(client_of(resolver.resolve(&save, "Versioned")).as_deref(), Some("V200"));
    }

    #[test]
    fn test_declaration_builders() {
        let decl = Declaration::new("#header:X-Client", "#session:bucket").with_resolver("tenant");
        assert_eq!(decl.client_marker(), "#header:X-Client");
        assert_eq!(decl.bucket_marker(), "#session:bucket");
        assert_eq!(decl.resolver().map(ResolverRef::name), Some("tenant"));
        assert_eq!(Declaration::selector("A").bucket_marker(), "");
    }
}
