//! Error types / 错误类型
//!
//! Only configuration-shaped problems surface as errors. Routing ambiguity
//! (unknown client, absent bucket, unresolvable marker) degrades to the
//! primary client instead, see [`crate::storage::StorageManager`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured primary client is not registered / 主客户端不存在
    #[error("no primary client: [{primary}] is not registered")]
    NoPrimaryClient { primary: String },

    /// Attempt to remove the primary client / 不允许移除主客户端
    #[error("could not remove the primary client [{name}]")]
    RemovePrimaryClient { name: String },

    /// Blank client name passed to remove / 移除参数不能为空
    #[error("client name could not be empty")]
    BlankClientName,

    /// Dynamic marker that cannot be parsed / 无法解析的动态标记
    #[error("malformed marker [{marker}]: {reason}")]
    MalformedMarker { marker: String, reason: String },

    /// Driver property bag misses required fields / 驱动参数不完整
    #[error("init storage client [{name}] error: incomplete param, missing {missing:?}")]
    IncompleteProperty { name: String, missing: Vec<&'static str> },

    #[error("no driver factory registered for kind [{0}]")]
    UnknownDriverKind(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}

impl StorageError {
    pub fn malformed(marker: &str, reason: impl Into<String>) -> Self {
        StorageError::MalformedMarker {
            marker: marker.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this is one of the fatal configuration errors / 是否为配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorageError::NoPrimaryClient { .. }
                | StorageError::RemovePrimaryClient { .. }
                | StorageError::BlankClientName
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(StorageError::BlankClientName.is_configuration());
        assert!(StorageError::RemovePrimaryClient { name: "A".into() }.is_configuration());
        assert!(!StorageError::malformed("#header:", "empty header name").is_configuration());
    }

    #[test]
    fn test_error_messages() {
        let err = StorageError::NoPrimaryClient { primary: "MINIO".into() };
        assert_eq!(err.to_string(), "no primary client: [MINIO] is not registered");
        let err = StorageError::malformed("#a..b", "empty path segment");
        assert_eq!(err.to_string(), "malformed marker [#a..b]: empty path segment");
    }
}
