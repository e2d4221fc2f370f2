use campuspool_shared::{Coordinates, Place};
use std::str::FromStr;
use std::time::Duration;

// =========================================================
// 默认配置 (Defaults)
// =========================================================

/// 这些是默认值，环境变量中没有定义时使用
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_STATUS_POLL_SECS: u64 = 5;
const DEFAULT_REQUESTS_POLL_SECS: u64 = 10;
const DEFAULT_LOCATION_POLL_SECS: u64 = 10;
const DEFAULT_SEARCH_RADIUS_KM: f64 = 15.0;
const DEFAULT_NOTICE_SECS: u64 = 7;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const CAMPUS_ADDRESS: &str =
    "Kristu Jayanti College, K Narayanapura, Kothanur, Bengaluru, Karnataka 560077, India";
const CAMPUS_COORDS: Coordinates = Coordinates::new(77.7334, 12.8627);

/// 客户端运行时配置
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// 后端 API 根地址（不带结尾斜杠）
    pub api_base_url: String,
    /// 乘客端请求状态轮询间隔
    pub status_poll_interval: Duration,
    /// 司机端请求列表轮询间隔
    pub requests_poll_interval: Duration,
    /// 位置跟踪/上报间隔
    pub location_poll_interval: Duration,
    pub search_radius_km: f64,
    /// 成功/提示类通知的自动隐藏时间
    pub notice_dismiss_after: Duration,
    pub request_timeout: Duration,
    /// 一键设置的校园目的地
    pub campus: Place,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            status_poll_interval: Duration::from_secs(DEFAULT_STATUS_POLL_SECS),
            requests_poll_interval: Duration::from_secs(DEFAULT_REQUESTS_POLL_SECS),
            location_poll_interval: Duration::from_secs(DEFAULT_LOCATION_POLL_SECS),
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            notice_dismiss_after: Duration::from_secs(DEFAULT_NOTICE_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            campus: Place::new(CAMPUS_ADDRESS, CAMPUS_COORDS),
        }
    }
}

impl ClientConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取，读不到或解析失败就用默认值
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parse_or(&lookup, key, default.as_secs()).map_or(default, Duration::from_secs)
        };

        Self {
            api_base_url: lookup("CAMPUSPOOL_API_URL")
                .filter(|v| !v.trim().is_empty())
                .map(|v| normalize_base_url(&v))
                .unwrap_or(defaults.api_base_url),
            status_poll_interval: secs("CAMPUSPOOL_STATUS_POLL_SECS", defaults.status_poll_interval),
            requests_poll_interval: secs(
                "CAMPUSPOOL_REQUESTS_POLL_SECS",
                defaults.requests_poll_interval,
            ),
            location_poll_interval: secs(
                "CAMPUSPOOL_LOCATION_POLL_SECS",
                defaults.location_poll_interval,
            ),
            search_radius_km: parse_or(&lookup, "CAMPUSPOOL_SEARCH_RADIUS_KM", defaults.search_radius_km)
                .unwrap_or(defaults.search_radius_km),
            notice_dismiss_after: secs("CAMPUSPOOL_NOTICE_SECS", defaults.notice_dismiss_after),
            request_timeout: secs("CAMPUSPOOL_TIMEOUT_SECS", defaults.request_timeout),
            campus: defaults.campus,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.api_base_url = normalize_base_url(url);
        self
    }
}

/// 解析数值型变量；零间隔视为无效
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = lookup(key) else {
        return Some(default);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => {
            tracing::warn!(key, value = %raw, "invalid config value, using default");
            None
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
