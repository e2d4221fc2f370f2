//! 时间类型模块
//!
//! 后端以 `%Y-%m-%d %H:%M` 格式返回时间（例如行程请求的创建时间），
//! 这里提供一个可序列化的包装类型。

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 后端使用的时间格式
pub const BACKEND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// =========================================================
// RequestedAt - 后端时间戳
// =========================================================

/// 分钟精度的后端时间
///
/// 序列化为 `"2024-03-01 08:15"` 形式的字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestedAt(NaiveDateTime);

impl RequestedAt {
    #[inline]
    pub const fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// 从后端字符串解析
    ///
    /// 返回 None 如果格式不符
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s.trim(), BACKEND_TIME_FORMAT)
            .ok()
            .map(Self)
    }

    #[inline]
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for RequestedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BACKEND_TIME_FORMAT))
    }
}

impl From<NaiveDateTime> for RequestedAt {
    fn from(at: NaiveDateTime) -> Self {
        Self(at)
    }
}

impl Serialize for RequestedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid timestamp '{}', expected {}",
                raw, BACKEND_TIME_FORMAT
            ))
        })
    }
}
