use super::{Context, RoutePoints, RoutePrompts};
use crate::error::{ClientError, ClientResult};
use crate::poller::Poller;
use crate::request::HttpClient;
use crate::view::{Notice, ViewUpdate};
use campuspool_shared::protocol::{CompleteProfileRequest, GoLiveRequest, RespondResponse};
use campuspool_shared::{PendingRequest, Place, RespondAction};
use std::cell::RefCell;
use std::rc::Rc;

const PROMPTS: RoutePrompts = RoutePrompts {
    pickup: "Please select your starting location first",
    destination: "Please select your destination first",
};

const OTP_LEN: usize = 4;

#[derive(Debug, Default)]
struct DriverState {
    route: RoutePoints,
    online: bool,
    ride_id: Option<String>,
    /// 上次渲染的请求列表，用于跳过相同内容的重复渲染
    last_requests: Option<Vec<PendingRequest>>,
    /// 已接受、尚未完成的请求，按接受顺序
    trips: Vec<String>,
}

struct DriverInner<C: HttpClient> {
    ctx: Context<C>,
    state: RefCell<DriverState>,
    requests_poller: Rc<Poller>,
    location_poller: Rc<Poller>,
}

// =========================================================
// 轮询逻辑
// =========================================================

impl<C: HttpClient + 'static> DriverInner<C> {
    fn start_requests_polling(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.requests_poller.start(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.poll_requests().await;
                }
            }
        });
    }

    fn start_location_sharing(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.location_poller.start(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.push_location().await;
                }
            }
        });
    }

    /// 拉取待处理请求，列表有变化时才渲染
    async fn poll_requests(&self) {
        if !self.state.borrow().online {
            return;
        }
        let requests = match self.ctx.api.pending_requests().await {
            Ok(resp) => resp.requests,
            Err(e) => return self.polling_failed("pending_requests", e),
        };

        let changed = {
            let mut state = self.state.borrow_mut();
            if state.last_requests.as_ref() == Some(&requests) {
                false
            } else {
                state.last_requests = Some(requests.clone());
                true
            }
        };
        if changed {
            self.ctx.render(ViewUpdate::PendingRequests(requests));
        }
    }

    async fn push_location(&self) {
        if self.state.borrow().trips.is_empty() {
            return;
        }
        let position = match self.ctx.locator.current_position().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read position for location update");
                return;
            }
        };
        if let Err(e) = self.ctx.api.update_location(position).await {
            self.polling_failed("update_location", e);
        }
    }

    fn polling_failed(&self, poller: &'static str, err: ClientError) {
        if err.is_auth_expired() {
            self.teardown();
            return;
        }
        tracing::warn!(poller, error = %err, "polling failed");
    }

    /// 回到离线状态并停止所有轮询
    fn reset(&self) {
        self.requests_poller.stop();
        self.location_poller.stop();
        let mut state = self.state.borrow_mut();
        state.online = false;
        state.ride_id = None;
        state.last_requests = None;
        state.trips.clear();
    }

    fn teardown(&self) {
        self.reset();
    }
}

// =========================================================
// 司机控制器
// =========================================================

/// 司机面板控制器
pub struct DriverController<C: HttpClient + 'static> {
    inner: Rc<DriverInner<C>>,
}

impl<C: HttpClient + 'static> DriverController<C> {
    pub fn new(ctx: Context<C>) -> Self {
        let requests_poller = Rc::new(Poller::new(
            "pending_requests",
            ctx.config.requests_poll_interval,
        ));
        let location_poller = Rc::new(Poller::new(
            "update_location",
            ctx.config.location_poll_interval,
        ));
        Self {
            inner: Rc::new(DriverInner {
                ctx,
                state: RefCell::new(DriverState::default()),
                requests_poller,
                location_poller,
            }),
        }
    }

    fn ctx(&self) -> &Context<C> {
        &self.inner.ctx
    }

    pub fn is_online(&self) -> bool {
        self.inner.state.borrow().online
    }

    pub fn ride_id(&self) -> Option<String> {
        self.inner.state.borrow().ride_id.clone()
    }

    /// 已接受、尚未完成的请求
    pub fn active_trips(&self) -> Vec<String> {
        self.inner.state.borrow().trips.clone()
    }

    pub fn route(&self) -> RoutePoints {
        self.inner.state.borrow().route.clone()
    }

    pub fn is_polling_requests(&self) -> bool {
        self.inner.requests_poller.is_running()
    }

    pub fn is_sharing_location(&self) -> bool {
        self.inner.location_poller.is_running()
    }

    fn fail<T>(&self, err: ClientError, fallback: &str) -> ClientResult<T> {
        if err.is_auth_expired() {
            self.inner.teardown();
        }
        self.ctx().report(&err, fallback);
        Err(err)
    }

    /// 页面初始化
    ///
    /// 返回 false 表示未登录或会话已过期。
    pub async fn init(&self) -> bool {
        let ctx = self.ctx();
        if !ctx.session().require_auth() {
            return false;
        }

        let (profile, check) = futures::join!(ctx.api.profile(), ctx.api.check_profile());
        let alive = ctx.show_profile(profile) & ctx.show_profile_check(check);
        if !alive {
            self.inner.teardown();
            return false;
        }
        ctx.render(ViewUpdate::Offline);
        true
    }

    // --- 在线状态 ---

    /// 切换在线状态
    ///
    /// 离线时只打开路线设置，真正上线由 `go_live` 完成。
    pub async fn toggle_online(&self) -> ClientResult<()> {
        if self.is_online() {
            return self.go_offline().await;
        }
        self.ctx().render(ViewUpdate::RouteSetup);
        self.ctx()
            .notify(Notice::info("Set your route to start accepting requests"));
        Ok(())
    }

    /// 发布行程并开始接收请求，返回行程 id
    pub async fn go_live(&self, seats: u32) -> ClientResult<String> {
        if self.is_online() {
            return self.ctx().invalid("You are already online");
        }
        if seats == 0 {
            return self.ctx().invalid("Please offer at least one seat");
        }
        let route = self.inner.state.borrow().route.require_both(&PROMPTS);
        let (pickup, destination) = match route {
            Ok(points) => points,
            Err(message) => return self.ctx().invalid(message),
        };

        let req = GoLiveRequest {
            pickup_location: pickup.coordinates,
            destination_location: destination.coordinates,
            pickup_address: pickup.address,
            destination_address: destination.address,
            seats_available: seats,
        };
        let ride_id = match self.ctx().api.go_live(&req).await {
            Ok(resp) => resp.ride_id,
            Err(e) => {
                self.inner.reset();
                self.ctx().render(ViewUpdate::Offline);
                return self.fail(e, "Failed to go online. Please try again.");
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            state.online = true;
            state.ride_id = Some(ride_id.clone());
            state.last_requests = None;
        }
        tracing::info!(ride_id = %ride_id, seats, "driver is live");
        self.ctx().render(ViewUpdate::Live {
            ride_id: ride_id.clone(),
            seats,
        });
        self.ctx()
            .notify(Notice::success("You are now online and accepting requests!"));
        self.inner.start_requests_polling();
        Ok(ride_id)
    }

    pub async fn go_offline(&self) -> ClientResult<()> {
        if self.ride_id().is_some() {
            if let Err(e) = self.ctx().api.go_offline().await {
                return self.fail(e, "Error going offline. Please try again.");
            }
        }
        self.inner.reset();
        self.ctx().render(ViewUpdate::Offline);
        self.ctx().notify(Notice::info("You are now offline"));
        Ok(())
    }

    // --- 路线 ---

    pub async fn use_current_location(&self) -> ClientResult<Place> {
        let place = self.ctx().locate().await?;
        self.set_pickup(place.clone());
        self.ctx()
            .notify(Notice::success("Current location set as starting point"));
        Ok(place)
    }

    pub fn set_pickup(&self, place: Place) {
        self.inner.state.borrow_mut().route.pickup = Some(place.clone());
        self.ctx().render(ViewUpdate::PickupSet(place));
    }

    pub fn set_destination(&self, place: Place) {
        self.inner.state.borrow_mut().route.destination = Some(place.clone());
        self.ctx().render(ViewUpdate::DestinationSet(place));
    }

    pub fn set_campus_destination(&self) {
        self.set_destination(self.ctx().config.campus.clone());
        self.ctx().notify(Notice::success("College set as destination"));
    }

    // --- 请求处理 ---

    /// 立即刷新请求列表
    pub async fn refresh_requests(&self) {
        self.inner.poll_requests().await;
    }

    /// 接受或拒绝请求，完成后刷新请求列表
    pub async fn respond(
        &self,
        request_id: &str,
        action: RespondAction,
    ) -> ClientResult<RespondResponse> {
        let resp = match self.ctx().api.respond(request_id, action).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(e, "Failed to respond to request. Please try again."),
        };

        match action {
            RespondAction::Accept => {
                {
                    let mut state = self.inner.state.borrow_mut();
                    if !state.trips.iter().any(|id| id == request_id) {
                        state.trips.push(request_id.to_string());
                    }
                }
                if let Some(otp) = resp.otp.clone() {
                    self.ctx().render(ViewUpdate::OtpIssued {
                        request_id: request_id.to_string(),
                        otp,
                    });
                }
                self.ctx().notify(Notice::success(resp.message.clone()));
                self.inner.start_location_sharing();
            }
            RespondAction::Reject => {
                self.ctx().notify(Notice::info(resp.message.clone()));
            }
        }

        self.refresh_requests().await;
        Ok(resp)
    }

    /// 校验乘客出示的 OTP 并开始行程
    pub async fn verify_otp(&self, request_id: &str, otp: &str) -> ClientResult<()> {
        let otp = otp.trim();
        if otp.len() != OTP_LEN || !otp.chars().all(|c| c.is_ascii_digit()) {
            return self.ctx().invalid("Please enter the 4-digit OTP");
        }

        match self.ctx().api.verify_otp(request_id, otp).await {
            Ok(resp) => {
                self.ctx().render(ViewUpdate::TripStarted {
                    request_id: request_id.to_string(),
                });
                self.ctx().notify(Notice::success(resp.message));
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to verify OTP. Please try again."),
        }
    }

    pub async fn complete_ride(&self, request_id: &str) -> ClientResult<()> {
        let resp = match self.ctx().api.complete_ride(request_id).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(e, "Failed to complete ride. Please try again."),
        };

        // 还有进行中的行程时继续上报位置
        let idle = {
            let mut state = self.inner.state.borrow_mut();
            state.trips.retain(|id| id != request_id);
            state.trips.is_empty()
        };
        if idle {
            self.inner.location_poller.stop();
        }
        self.ctx().render(ViewUpdate::TripCompleted {
            request_id: request_id.to_string(),
            fare: None,
        });
        self.ctx().notify(Notice::success(resp.message));
        self.refresh_requests().await;
        Ok(())
    }

    // --- 资料与会话 ---

    pub async fn complete_profile(&self, form: CompleteProfileRequest) -> ClientResult<()> {
        if form.phone_number.trim().is_empty() {
            return self.ctx().invalid("Please fill in all required fields.");
        }
        match self.ctx().api.complete_profile(form).await {
            Ok(_) => {
                self.ctx().render(ViewUpdate::ProfileFormHidden);
                self.ctx()
                    .notify(Notice::success("Driver profile completed successfully!"));
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to complete profile. Please try again."),
        }
    }

    pub async fn logout(&self) {
        self.inner.teardown();
        self.ctx().sign_out().await;
    }

    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl<C: HttpClient + 'static> Drop for DriverController<C> {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}
