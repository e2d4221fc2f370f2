use super::Context;
use crate::error::ClientResult;
use crate::request::HttpClient;
use crate::route::AppRoute;
use crate::view::{Notice, ViewUpdate};
use campuspool_shared::protocol::RegisterRequest;
use campuspool_shared::{Place, Role, UserSummary};
use std::cell::RefCell;

const MIN_PASSWORD_LEN: usize = 6;

/// 注册表单输入
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub role: Role,
}

#[derive(Debug, Default)]
struct AuthState {
    home: Option<Place>,
    submitting: bool,
}

/// 登录/注册页控制器
pub struct AuthController<C: HttpClient> {
    ctx: Context<C>,
    state: RefCell<AuthState>,
}

impl<C: HttpClient> AuthController<C> {
    pub fn new(ctx: Context<C>) -> Self {
        Self {
            ctx,
            state: RefCell::new(AuthState::default()),
        }
    }

    /// 注册时使用的住址坐标
    pub fn home(&self) -> Option<Place> {
        self.state.borrow().home.clone()
    }

    /// 页面初始化
    ///
    /// 已有令牌时先校验，校验通过直接进入对应面板。
    pub async fn init(&self) {
        let session = self.ctx.session();
        if !session.is_authenticated() {
            self.ctx.render(ViewUpdate::LoginForm);
            return;
        }

        let claims = match self.ctx.api.verify_token().await {
            Ok(resp) => resp.user,
            Err(e) => {
                tracing::info!(error = %e, "stored token rejected");
                session.clear();
                self.ctx.render(ViewUpdate::LoginForm);
                return;
            }
        };

        let name = match self.ctx.api.profile().await {
            Ok(resp) => resp.user.name,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load profile");
                claims.email.clone()
            }
        };

        self.ctx.render(ViewUpdate::SignedIn {
            name,
            role: claims.role,
        });
        if let Some(route) = AppRoute::for_role(claims.role) {
            session.navigate(route);
        }
    }

    pub fn show_login(&self) {
        self.ctx.render(ViewUpdate::LoginForm);
    }

    pub fn show_register(&self) {
        self.ctx.render(ViewUpdate::RegisterForm);
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserSummary> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return self.ctx.invalid("Please fill in all required fields.");
        }

        match self.ctx.api.login(email, password).await {
            Ok(resp) => {
                let session = self.ctx.session();
                session.store_token(&resp.token);
                self.ctx.notify(Notice::success(resp.message));
                match AppRoute::for_role(resp.user.role) {
                    Some(route) => session.navigate(route),
                    None => self.ctx.render(ViewUpdate::SignedIn {
                        name: resp.user.name.clone(),
                        role: resp.user.role,
                    }),
                }
                Ok(resp.user)
            }
            Err(e) => {
                self.ctx.report(&e, "Login failed. Please try again.");
                Err(e)
            }
        }
    }

    /// 定位并把结果设为住址
    pub async fn use_my_location(&self) -> ClientResult<Place> {
        let place = self.ctx.locate().await?;
        self.set_home_location(place.clone());
        Ok(place)
    }

    pub fn set_home_location(&self, place: Place) {
        self.state.borrow_mut().home = Some(place.clone());
        self.ctx.render(ViewUpdate::HomeLocationSet(place));
    }

    /// 提交注册
    ///
    /// 返回 `Ok(false)` 表示已有一次提交在进行，本次被忽略。
    pub async fn register(&self, form: RegistrationForm) -> ClientResult<bool> {
        if self.state.borrow().submitting {
            return Ok(false);
        }

        let name = form.name.trim();
        let email = form.email.trim();
        let address = form.address.trim();
        if name.is_empty() || email.is_empty() || form.password.is_empty() || address.is_empty() {
            return self.ctx.invalid("Please fill in all required fields.");
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return self
                .ctx
                .invalid("Password must be at least 6 characters long.");
        }
        let Some(home) = self.home() else {
            return self
                .ctx
                .invalid("Please use 'Use My Location' or enter an address first.");
        };

        let req = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: form.password.clone(),
            home_address: address.to_string(),
            coordinates: home.coordinates,
            role: form.role,
        };

        self.state.borrow_mut().submitting = true;
        let result = self.ctx.api.register(&req).await;
        self.state.borrow_mut().submitting = false;

        match result {
            Ok(resp) => {
                self.ctx.notify(Notice::success(resp.message));
                self.ctx.render(ViewUpdate::LoginForm);
                Ok(true)
            }
            Err(e) => {
                self.ctx.report(&e, "Registration failed. Please try again.");
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.ctx.sign_out().await;
    }
}

#[cfg(test)]
mod tests;
