//! Call-site metadata table / 调用点元数据表
//!
//! Rust has no runtime reflection, so the shape the declaration resolver
//! walks (inheritance, proxies, bridge methods) is registered explicitly once
//! at startup. A method is identified by its owner type and a signature key;
//! a synthetic bridge method uses its own key and points at the method it
//! bridges to.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::Declaration;

/// Universal base type, never decorated / 顶层基类
pub const OBJECT_TYPE: &str = "Object";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    owner: Arc<str>,
    name: Arc<str>,
}

impl MethodId {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn with_owner(&self, owner: &Arc<str>) -> Self {
        Self {
            owner: owner.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct MethodMeta {
    name: Arc<str>,
    public: bool,
    bridge_of: Option<Arc<str>>,
    declaration: Option<Arc<Declaration>>,
}

impl MethodMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            public: true,
            bridge_of: None,
            declaration: None,
        }
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Mark as a synthetic bridge to `target` on the same type / 标记为桥接方法
    pub fn bridge_of(mut self, target: &str) -> Self {
        self.bridge_of = Some(Arc::from(target));
        self
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(Arc::new(declaration));
        self
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_bridge(&self) -> bool {
        self.bridge_of.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TypeMeta {
    name: Arc<str>,
    parent: Option<Arc<str>>,
    proxy_of: Option<Arc<str>>,
    declaration: Option<Arc<Declaration>>,
    methods: HashMap<Arc<str>, MethodMeta>,
}

impl TypeMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            parent: None,
            proxy_of: None,
            declaration: None,
            methods: HashMap::new(),
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(Arc::from(parent));
        self
    }

    /// Dynamic proxy standing in for `target` / 代理类型
    pub fn proxy_of(mut self, target: &str) -> Self {
        self.proxy_of = Some(Arc::from(target));
        self
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(Arc::new(declaration));
        self
    }

    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy_of.is_some()
    }
}

/// Registered types by name / 已注册的类型
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<Arc<str>, TypeMeta>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meta: TypeMeta) {
        self.types.insert(meta.name.clone(), meta);
    }

    pub fn get(&self, name: &str) -> Option<&TypeMeta> {
        self.types.get(name)
    }

    pub fn method(&self, id: &MethodId) -> Option<&MethodMeta> {
        self.get(id.owner()).and_then(|t| t.methods.get(id.name()))
    }

    pub fn is_proxy(&self, name: &str) -> bool {
        self.get(name).map(TypeMeta::is_proxy).unwrap_or(false)
    }

    /// Undo proxy indirection / 去掉代理得到用户类型
    pub fn user_type(&self, name: &str) -> Arc<str> {
        let mut current: Arc<str> = Arc::from(name);
        let mut seen = HashSet::new();
        while let Some(target) = self.get(&current).and_then(|t| t.proxy_of.clone()) {
            if !seen.insert(current.clone()) {
                break;
            }
            current = target;
        }
        current
    }

    /// `name` and its superclasses up to (excluding) [`OBJECT_TYPE`] / 类型及其父类链
    pub fn ancestors(&self, name: &str) -> Vec<&TypeMeta> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(name);
        while let Some(meta) = current {
            if meta.name.as_ref() == OBJECT_TYPE || !seen.insert(meta.name.clone()) {
                break;
            }
            chain.push(meta);
            current = meta.parent.as_deref().and_then(|p| self.get(p));
        }
        chain
    }

    /// Implementation of `method` closest to `user_type` / 最具体的方法实现
    pub fn most_specific_method(&self, method: &MethodId, user_type: &str) -> MethodId {
        self.ancestors(user_type)
            .into_iter()
            .find(|t| t.methods.contains_key(method.name()))
            .map(|t| method.with_owner(&t.name))
            .unwrap_or_else(|| method.clone())
    }

    /// Target of a bridge method, or the method itself / 桥接方法的目标
    pub fn bridged_method(&self, method: &MethodId) -> MethodId {
        match self.method(method).and_then(|m| m.bridge_of.clone()) {
            Some(target) => MethodId {
                owner: method.owner.clone(),
                name: target,
            },
            None => method.clone(),
        }
    }

    /// Unknown methods count as user level / 非桥接方法
    pub fn is_user_level(&self, method: &MethodId) -> bool {
        !self.method(method).map(MethodMeta::is_bridge).unwrap_or(false)
    }

    pub fn is_public(&self, method: &MethodId) -> bool {
        self.method(method).map(MethodMeta::is_public).unwrap_or(true)
    }

    pub fn method_declaration(&self, method: &MethodId) -> Option<Arc<Declaration>> {
        self.method(method).and_then(|m| m.declaration.clone())
    }

    pub fn type_declaration(&self, name: &str) -> Option<Arc<Declaration>> {
        self.get(name).and_then(|t| t.declaration.clone())
    }
}
