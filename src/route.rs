//! 路由定义模块
//!
//! 定义应用的所有视图路由及其属性，不依赖任何宿主 API。
//! 实际的页面切换由宿主通过 `Navigator` 完成。

use campuspool_shared::Role;
use std::cell::RefCell;
use std::fmt::Display;

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 登录/注册页面 (默认路由)
    #[default]
    Login,
    /// 乘客控制面板 (需要认证)
    Rider,
    /// 司机控制面板 (需要认证)
    Driver,
    /// 页面未找到
    NotFound,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        match path {
            "/" | "/login" => Self::Login,
            "/rider" => Self::Rider,
            "/driver" => Self::Driver,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::Rider => "/rider",
            Self::Driver => "/driver",
            Self::NotFound => "/404",
        }
    }

    /// 该路由是否需要认证
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Rider | Self::Driver)
    }

    /// 登录成功后按角色进入的面板；未知角色没有专属面板
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Rider => Some(Self::Rider),
            Role::Driver => Some(Self::Driver),
            Role::Unknown => None,
        }
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// 页面跳转接口
pub trait Navigator {
    fn navigate(&self, route: AppRoute);
}

/// 记录导航历史的内存路由
#[derive(Debug, Default)]
pub struct MemoryRouter {
    history: RefCell<Vec<AppRoute>>,
}

impl MemoryRouter {
    pub fn new(initial: AppRoute) -> Self {
        Self {
            history: RefCell::new(vec![initial]),
        }
    }

    pub fn current(&self) -> AppRoute {
        self.history.borrow().last().copied().unwrap_or_default()
    }

    pub fn history(&self) -> Vec<AppRoute> {
        self.history.borrow().clone()
    }
}

impl Navigator for MemoryRouter {
    fn navigate(&self, route: AppRoute) {
        // 重复跳转到当前页不产生新的历史记录
        if self.current() == route && !self.history.borrow().is_empty() {
            return;
        }
        tracing::debug!(to = %route, "navigate");
        self.history.borrow_mut().push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_roundtrip() {
        for route in [AppRoute::Login, AppRoute::Rider, AppRoute::Driver] {
            assert_eq!(AppRoute::from_path(route.to_path()), route);
        }
        assert_eq!(AppRoute::from_path("/login"), AppRoute::Login);
        assert_eq!(AppRoute::from_path("/admin"), AppRoute::NotFound);
    }

    #[test]
    fn test_dashboards_require_auth() {
        assert!(AppRoute::Rider.requires_auth());
        assert!(AppRoute::Driver.requires_auth());
        assert!(!AppRoute::Login.requires_auth());
    }

    #[test]
    fn test_role_landing_pages() {
        assert_eq!(AppRoute::for_role(Role::Rider), Some(AppRoute::Rider));
        assert_eq!(AppRoute::for_role(Role::Driver), Some(AppRoute::Driver));
        assert_eq!(AppRoute::for_role(Role::Unknown), None);
    }

    #[test]
    fn test_memory_router_skips_same_route() {
        let router = MemoryRouter::new(AppRoute::Rider);
        router.navigate(AppRoute::Login);
        router.navigate(AppRoute::Login);
        assert_eq!(router.history(), vec![AppRoute::Rider, AppRoute::Login]);
        assert_eq!(router.current(), AppRoute::Login);
    }
}
