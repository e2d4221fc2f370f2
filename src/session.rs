//! 会话模块
//!
//! 管理会话令牌的持久化与导航副作用。
//! 令牌过期时统一在这里清除并跳回登录页。

use crate::route::{AppRoute, Navigator};
use crate::storage::TokenStore;
use campuspool_shared::TOKEN_STORAGE_KEY;
use std::rc::Rc;

/// 会话句柄
///
/// 克隆后共享同一个存储和导航器。
#[derive(Clone)]
pub struct Session {
    store: Rc<dyn TokenStore>,
    navigator: Rc<dyn Navigator>,
}

impl Session {
    pub fn new(store: Rc<dyn TokenStore>, navigator: Rc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// 当前令牌，空字符串视为没有令牌
    pub fn token(&self) -> Option<String> {
        self.store
            .get(TOKEN_STORAGE_KEY)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn store_token(&self, token: &str) {
        if !self.store.set(TOKEN_STORAGE_KEY, token) {
            tracing::warn!("failed to persist session token");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// 清除令牌，不导航
    pub fn clear(&self) {
        if !self.store.delete(TOKEN_STORAGE_KEY) {
            tracing::warn!("failed to delete session token");
        }
    }

    /// 会话失效：清除令牌并回到登录页
    pub fn expire(&self) {
        tracing::info!("session expired, returning to login");
        self.clear();
        self.navigator.navigate(AppRoute::Login);
    }

    /// 受保护页面的入口检查
    ///
    /// 没有令牌时跳转登录页并返回 false。
    pub fn require_auth(&self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        self.navigator.navigate(AppRoute::Login);
        false
    }

    pub fn navigate(&self, route: AppRoute) {
        self.navigator.navigate(route);
    }
}
