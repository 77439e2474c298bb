pub mod attribute;
pub mod config;
pub mod context;
pub mod declaration;
pub mod error;
pub mod facade;
pub mod interceptor;
pub mod invocation;
pub mod request;
pub mod resolver;
pub mod storage;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

// Register all storage drivers (call unified registration function from drivers module) / 注册所有存储驱动
pub fn register_storage_drivers(creator: &storage::DriverCreator) {
    drivers::register_all(creator)
}
