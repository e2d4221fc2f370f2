//! CampusPool 客户端核心
//!
//! 乘客面板、司机面板和登录页的控制逻辑，与宿主环境解耦：
//! 渲染、导航、令牌存储和定位都通过 trait 注入。
//!
//! 控制器在当前线程上运行轮询任务，宿主需要在
//! `tokio::task::LocalSet` 中驱动它们。

pub mod api;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod poller;
pub mod request;
pub mod route;
pub mod session;
pub mod storage;
pub mod view;

pub use api::{ApiGateway, CampusPoolApi};
pub use config::ClientConfig;
pub use controller::auth::{AuthController, RegistrationForm};
pub use controller::driver::DriverController;
pub use controller::rider::RiderController;
pub use controller::{Context, RoutePoints};
pub use dispatch::{DispatchOutcome, StatusDispatcher, Transition};
pub use error::{ClientError, ClientResult};
pub use geo::{FixedLocation, GeoError, LocationProvider};
pub use poller::Poller;
pub use request::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use route::{AppRoute, MemoryRouter, Navigator};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, TokenStore};
pub use view::{Notice, NoticeLevel, View, ViewUpdate};

pub use campuspool_shared as shared;
