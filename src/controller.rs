//! 视图控制器
//!
//! 每个页面一个控制器实例，页面初始化时创建，离开页面时 `teardown`。
//! 控制器持有该页面的全部内存状态（坐标、当前请求、在线状态）。

pub mod auth;
pub mod driver;
pub mod rider;

use crate::api::CampusPoolApi;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::geo::LocationProvider;
use crate::request::{HttpClient, ReqwestHttpClient};
use crate::route::{AppRoute, Navigator};
use crate::session::Session;
use crate::storage::TokenStore;
use crate::view::{Notice, View, ViewUpdate};
use campuspool_shared::Place;
use campuspool_shared::protocol::{ProfileCheckResponse, ProfileResponse};
use std::rc::Rc;

// =========================================================
// 控制器上下文
// =========================================================

/// 所有控制器共用的依赖
#[derive(Clone)]
pub struct Context<C: HttpClient> {
    pub api: CampusPoolApi<C>,
    pub view: Rc<dyn View>,
    pub locator: Rc<dyn LocationProvider>,
    pub config: ClientConfig,
}

impl Context<ReqwestHttpClient> {
    /// 使用 reqwest 客户端连接配置中的后端
    pub fn connect(
        config: ClientConfig,
        store: Rc<dyn TokenStore>,
        navigator: Rc<dyn Navigator>,
        view: Rc<dyn View>,
        locator: Rc<dyn LocationProvider>,
    ) -> ClientResult<Self> {
        let client = ReqwestHttpClient::new(config.request_timeout)?;
        let session = Session::new(store, navigator);
        Ok(Self::new(client, config, session, view, locator))
    }
}

impl<C: HttpClient> Context<C> {
    pub fn new(
        client: C,
        config: ClientConfig,
        session: Session,
        view: Rc<dyn View>,
        locator: Rc<dyn LocationProvider>,
    ) -> Self {
        let api = CampusPoolApi::new(client, &config.api_base_url, session);
        Self {
            api,
            view,
            locator,
            config,
        }
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.view.notify(notice);
    }

    pub(crate) fn render(&self, update: ViewUpdate) {
        self.view.render(update);
    }

    /// 本地前置条件失败：提示并返回错误，不发请求
    pub(crate) fn invalid<T>(&self, message: &str) -> ClientResult<T> {
        self.notify(Notice::error(message));
        Err(ClientError::validation(message))
    }

    /// 用户操作失败时的提示
    ///
    /// 会话过期已经跳转登录页，不再提示。
    /// 服务端消息和定位错误原样展示，网络类错误使用 `fallback`。
    pub(crate) fn report(&self, err: &ClientError, fallback: &str) {
        let message = match err {
            ClientError::AuthExpired => return,
            ClientError::Network(_) | ClientError::Decode(_) => fallback.to_string(),
            other => other.user_message(),
        };
        tracing::debug!(code = err.error_code(), error = %err, "action failed");
        self.notify(Notice::error(message));
    }

    /// 设备定位并反向地理编码
    pub(crate) async fn locate(&self) -> ClientResult<Place> {
        self.notify(Notice::info("Getting your current location..."));
        let position = match self.locator.current_position().await {
            Ok(p) => p,
            Err(e) => {
                self.notify(Notice::error(e.user_message()));
                return Err(e.into());
            }
        };
        let address = self.api.reverse_geocode(position).await;
        Ok(Place::new(address, position))
    }

    /// 尽力通知后端，然后清除本地会话并回到登录页
    pub(crate) async fn sign_out(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "logout call failed, clearing session anyway");
        }
        self.session().clear();
        self.session().navigate(AppRoute::Login);
    }

    /// 欢迎语
    ///
    /// 返回 false 表示会话已过期。
    pub(crate) fn show_profile(&self, profile: ClientResult<ProfileResponse>) -> bool {
        match profile {
            Ok(resp) => {
                self.render(ViewUpdate::Welcome {
                    name: Some(resp.user.name),
                });
                true
            }
            Err(e) if e.is_auth_expired() => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load profile");
                self.render(ViewUpdate::Welcome { name: None });
                true
            }
        }
    }

    /// 资料不完整时弹出资料表单
    ///
    /// 返回 false 表示会话已过期。
    pub(crate) fn show_profile_check(&self, check: ClientResult<ProfileCheckResponse>) -> bool {
        match check {
            Ok(resp) if !resp.profile_complete => {
                self.render(ViewUpdate::ProfileForm {
                    missing_fields: resp.missing_fields,
                });
                true
            }
            Ok(_) => true,
            Err(e) if e.is_auth_expired() => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to check profile");
                true
            }
        }
    }
}

// =========================================================
// 路线坐标
// =========================================================

/// 起点缺失和终点缺失时的提示语
pub(crate) struct RoutePrompts {
    pub pickup: &'static str,
    pub destination: &'static str,
}

/// 起点与终点
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePoints {
    pub pickup: Option<Place>,
    pub destination: Option<Place>,
}

impl RoutePoints {
    pub(crate) fn require_both(&self, prompts: &RoutePrompts) -> Result<(Place, Place), &'static str> {
        let pickup = self.pickup.clone().ok_or(prompts.pickup)?;
        let destination = self.destination.clone().ok_or(prompts.destination)?;
        Ok((pickup, destination))
    }
}

// =========================================================
// 测试工具
// =========================================================
