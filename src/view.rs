//! 视图层接口
//!
//! 控制器只产生 `ViewUpdate` 和 `Notice`，怎么画由宿主决定。

use campuspool_shared::protocol::FareEstimate;
use campuspool_shared::{Contact, Coordinates, NearbyRide, PendingRequest, Place, Role};
use std::time::Duration;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// 状态横幅
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn new(message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Error)
    }

    /// 自动隐藏时间；警告和错误一直显示直到被替换
    pub fn auto_dismiss(&self, after: Duration) -> Option<Duration> {
        match self.level {
            NoticeLevel::Success | NoticeLevel::Info => Some(after),
            NoticeLevel::Warning | NoticeLevel::Error => None,
        }
    }
}

/// 控制器产生的全部界面状态
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    // --- 登录页 ---
    LoginForm,
    RegisterForm,
    SignedIn { name: String, role: Role },
    HomeLocationSet(Place),

    // --- 公共 ---
    Welcome { name: Option<String> },
    ProfileForm { missing_fields: Vec<String> },
    ProfileFormHidden,
    PickupSet(Place),
    DestinationSet(Place),

    // --- 乘客 ---
    RideList(Vec<NearbyRide>),
    NoRidesFound,
    RideSelected(NearbyRide),
    FareEstimated(FareEstimate),
    SearchReset,
    DriverPosition {
        location: Coordinates,
        updated_at: Option<String>,
    },

    // --- 请求状态 ---
    AwaitingDriver {
        request_id: String,
        estimated_fare: Option<f64>,
    },
    DriverAssigned {
        request_id: String,
        driver: Option<Contact>,
        otp: Option<String>,
    },
    TripStarted { request_id: String },
    TripCompleted {
        request_id: String,
        fare: Option<f64>,
    },
    RequestDeclined { request_id: String },
    RequestCancelled { request_id: String },

    // --- 司机 ---
    Offline,
    RouteSetup,
    Live { ride_id: String, seats: u32 },
    PendingRequests(Vec<PendingRequest>),
    OtpIssued { request_id: String, otp: String },
}

/// 宿主实现的渲染接口
pub trait View {
    fn render(&self, update: ViewUpdate);
    fn notify(&self, notice: Notice);
}

// =========================================================
// 测试工具: RecordingView
// =========================================================

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingView {
    pub updates: std::cell::RefCell<Vec<ViewUpdate>>,
    pub notices: std::cell::RefCell<Vec<Notice>>,
}

#[cfg(test)]
impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ViewUpdate> {
        self.updates.borrow().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn last_notice(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    pub fn count(&self, pred: impl Fn(&ViewUpdate) -> bool) -> usize {
        self.updates.borrow().iter().filter(|u| pred(u)).count()
    }

    pub fn clear(&self) {
        self.updates.borrow_mut().clear();
        self.notices.borrow_mut().clear();
    }
}

#[cfg(test)]
impl View for RecordingView {
    fn render(&self, update: ViewUpdate) {
        self.updates.borrow_mut().push(update);
    }

    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}
