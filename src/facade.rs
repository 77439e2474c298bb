//! Client facade / 客户端门面
//!
//! Business code asks the facade for a client; which backend it gets depends
//! on the attribute on top of the current stack.

use std::sync::Arc;

use bytes::Bytes;

use crate::context;
use crate::declaration::DeclarationResolver;
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::storage::{ClientMap, DriverBox, ObjectInfo, StorageManager};

#[derive(Clone)]
pub struct DynamicStorage {
    manager: Arc<StorageManager>,
    interceptor: Interceptor,
}

impl DynamicStorage {
    pub fn new(manager: Arc<StorageManager>, declarations: Arc<DeclarationResolver>) -> Self {
        let interceptor = Interceptor::new(declarations, manager.clone());
        Self { manager, interceptor }
    }

    pub fn manager(&self) -> &Arc<StorageManager> {
        &self.manager
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Client for the current routing decision / 当前路由对应的客户端
    pub fn op(&self) -> Result<DriverBox> {
        self.manager.get_client(context::current_client().as_deref())
    }

    /// Client by explicit name / 按名称获取客户端
    pub fn op_named(&self, name: &str) -> Result<DriverBox> {
        self.manager.get_client(Some(name))
    }

    /// Bucket of the current routing decision, else the client's default
    /// 当前存储桶
    pub fn current_bucket(&self) -> Option<String> {
        if let Some(bucket) = context::current_bucket() {
            return Some(bucket);
        }
        self.op()
            .ok()
            .and_then(|client| client.default_bucket().map(str::to_string))
    }

    pub fn add_client(&self, name: &str, client: DriverBox) -> bool {
        self.manager.add_client(name, client)
    }

    pub fn remove_client(&self, name: &str) -> Result<()> {
        self.manager.remove_client(name)
    }

    pub fn current_clients(&self) -> Arc<ClientMap> {
        self.manager.current_clients()
    }

    fn target(&self) -> Result<(DriverBox, String)> {
        let client = self.op()?;
        let bucket = context::current_bucket()
            .or_else(|| client.default_bucket().map(str::to_string))
            .unwrap_or_default();
        Ok((client, bucket))
    }

    pub async fn upload(&self, key: &str, data: Bytes) -> Result<ObjectInfo> {
        let (client, bucket) = self.target()?;
        tracing::debug!("Upload {} to {}/{}", key, client.name(), bucket);
        Ok(client.put_object(&bucket, key, data).await?)
    }

    pub async fn download(&self, key: &str) -> Result<Bytes> {
        let (client, bucket) = self.target()?;
        Ok(client.get_object(&bucket, key).await?)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let (client, bucket) = self.target()?;
        tracing::debug!("Delete {} from {}/{}", key, client.name(), bucket);
        Ok(client.delete_object(&bucket, key).await?)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let (client, bucket) = self.target()?;
        Ok(client.object_exists(&bucket, key).await?)
    }

    pub async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        let (client, bucket) = self.target()?;
        Ok(client.list_objects(&bucket, prefix, recursive).await?)
    }

    pub async fn create_folder(&self, path: &str) -> Result<()> {
        let (client, bucket) = self.target()?;
        Ok(client.create_folder(&bucket, path).await?)
    }

    pub async fn presign(&self, key: &str, expire_secs: u32) -> Result<Option<String>> {
        let (client, bucket) = self.target()?;
        Ok(client.presigned_url(&bucket, key, expire_secs).await?)
    }
}
