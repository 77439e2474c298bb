//! Local disk driver / 本地存储驱动

mod driver;

pub use driver::LocalDriver;
