use crate::geo::GeoError;
use thiserror::Error;

// =========================================================
// 客户端错误类型
// =========================================================

/// 客户端错误
///
/// - `AuthExpired`: 已认证接口返回 401，会话已被清除
/// - `Request`: 服务端返回非 2xx，携带服务端消息
/// - `Network`: 传输层失败（断网、DNS、超时）
/// - `Decode`: 2xx 响应体与接口类型不符
/// - `Validation`: 本地前置条件不满足，请求未发出
/// - `Location`: 定位失败
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired, please log in again")]
    AuthExpired,

    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Location(#[from] GeoError),
}

impl ClientError {
    /// 由非 2xx 响应构造，缺少服务端消息时使用通用描述
    pub fn request(status: u16, message: Option<String>) -> Self {
        ClientError::Request {
            status,
            message: message.unwrap_or_else(|| format!("HTTP error! status: {}", status)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }

    /// 对应的 HTTP 状态码（本地错误没有状态码）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::AuthExpired => Some(401),
            ClientError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 机器可读的错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::AuthExpired => "AUTH_EXPIRED",
            ClientError::Request { .. } => "REQUEST_FAILED",
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::Validation(_) => "VALIDATION_ERROR",
            ClientError::Location(_) => "LOCATION_ERROR",
        }
    }

    /// 展示给用户的消息
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Location(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
