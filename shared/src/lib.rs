use serde::{Deserialize, Serialize};
use std::fmt;

pub mod date;
pub mod protocol;

pub use date::RequestedAt;

// =========================================================
// 常量定义 (Constants)
// =========================================================

/// 会话令牌在 TokenStore 中的键名
pub const TOKEN_STORAGE_KEY: &str = "campuspool_token";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

// =========================================================
// 地理坐标 (Geo)
// =========================================================

/// 经纬度坐标对
///
/// 线上格式为 `[longitude, latitude]` 两元素数组（GeoJSON 顺序）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// 反向地理编码失败时显示的地址文本
    pub fn format_fallback(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self::new(longitude, latitude)
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.longitude, c.latitude]
    }
}

/// 带地址文本的地点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub coordinates: Coordinates,
}

impl Place {
    pub fn new(address: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            address: address.into(),
            coordinates,
        }
    }
}

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 行程请求状态，状态迁移完全由服务端决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    Started,
    Completed,
    Rejected,
    Cancelled,
}

impl RideStatus {
    /// 终态：到达后停止所有与该行程相关的轮询
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Rejected | RideStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::Started => "started",
            RideStatus::Completed => "completed",
            RideStatus::Rejected => "rejected",
            RideStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
    #[serde(other)]
    Unknown,
}

/// 登录响应中的用户摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// `/auth/profile` 返回的完整用户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "homeAddress", default)]
    pub home_address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(rename = "averageRating", default)]
    pub average_rating: f64,
    #[serde(rename = "driverStatus", default)]
    pub driver_status: Option<String>,
}

/// verify-token 返回的令牌声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

/// 司机或乘客的联系方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub phone: String,
}

/// 附近可搭乘的行程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyRide {
    pub ride_id: String,
    pub driver: Contact,
    pub pickup_address: String,
    pub destination_address: String,
    pub distance_km: f64,
    pub smart_score: u32,
    pub suggested_fare: f64,
    #[serde(default = "default_seats")]
    pub seats_available: u32,
    #[serde(default)]
    pub driver_pickup_coords: Option<Coordinates>,
}

fn default_seats() -> u32 {
    1
}

/// 司机端看到的待处理请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: String,
    pub rider: Contact,
    pub pickup_address: String,
    pub destination_address: String,
    pub requested_at: RequestedAt,
}

/// 请求状态快照
///
/// `driver`/`otp` 只在 accepted 之后出现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub request_id: Option<String>,
    pub status: RideStatus,
    #[serde(default)]
    pub driver: Option<Contact>,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub estimated_fare: Option<f64>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
}

impl StatusSnapshot {
    pub fn new(status: RideStatus) -> Self {
        Self {
            request_id: None,
            status,
            driver: None,
            otp: None,
            estimated_fare: None,
            pickup_address: None,
            destination_address: None,
        }
    }
}

/// 司机响应请求的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub total_distance: f64,
}
