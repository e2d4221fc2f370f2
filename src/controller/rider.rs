use super::{Context, RoutePoints, RoutePrompts};
use crate::dispatch::{DispatchOutcome, StatusDispatcher};
use crate::error::{ClientError, ClientResult};
use crate::poller::Poller;
use crate::request::HttpClient;
use crate::view::{Notice, ViewUpdate};
use campuspool_shared::protocol::{
    CompleteProfileRequest, FareEstimate, NearbyRidesRequest, RideRequestBody,
};
use campuspool_shared::{NearbyRide, Place, RideStatus, StatusSnapshot};
use std::cell::RefCell;
use std::rc::Rc;

const PROMPTS: RoutePrompts = RoutePrompts {
    pickup: "Please select a pickup location first",
    destination: "Please select a destination first",
};

struct RiderState {
    route: RoutePoints,
    /// 最近一次搜索结果
    results: Vec<NearbyRide>,
    selected: Option<NearbyRide>,
    dispatcher: StatusDispatcher,
    /// 请求已发出、尚未返回
    submitting: bool,
    /// 两个轮询器当前跟踪的请求
    status_target: Option<String>,
    tracking_target: Option<String>,
}

struct RiderInner<C: HttpClient> {
    ctx: Context<C>,
    state: RefCell<RiderState>,
    status_poller: Rc<Poller>,
    tracking_poller: Rc<Poller>,
}

// =========================================================
// 轮询逻辑
// =========================================================

impl<C: HttpClient + 'static> RiderInner<C> {
    /// 开始轮询请求状态；正在跟踪另一个请求时先停止旧的轮询
    fn start_status_polling(self: &Rc<Self>, request_id: String) {
        {
            let mut state = self.state.borrow_mut();
            state.dispatcher.link(&self.status_poller);
            if state.status_target.as_deref() != Some(request_id.as_str()) {
                self.status_poller.stop();
                state.status_target = Some(request_id.clone());
            }
        }
        let weak = Rc::downgrade(self);
        self.status_poller.start(move || {
            let weak = weak.clone();
            let request_id = request_id.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.poll_status(&request_id).await;
                }
            }
        });
    }

    fn start_tracking(self: &Rc<Self>, request_id: String) {
        {
            let mut state = self.state.borrow_mut();
            state.dispatcher.link(&self.tracking_poller);
            if state.tracking_target.as_deref() != Some(request_id.as_str()) {
                self.tracking_poller.stop();
                state.tracking_target = Some(request_id.clone());
            }
        }
        let weak = Rc::downgrade(self);
        self.tracking_poller.start(move || {
            let weak = weak.clone();
            let request_id = request_id.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.poll_driver_location(&request_id).await;
                }
            }
        });
    }

    async fn poll_status(self: &Rc<Self>, request_id: &str) {
        match self.ctx.api.request_status(request_id).await {
            Ok(snapshot) => self.apply_status(request_id, &snapshot),
            Err(e) => self.polling_failed("status", e),
        }
    }

    /// 把状态快照交给分发器，释放借用后再渲染
    fn apply_status(self: &Rc<Self>, request_id: &str, snapshot: &StatusSnapshot) {
        let outcome = self
            .state
            .borrow_mut()
            .dispatcher
            .dispatch(request_id, snapshot);
        let DispatchOutcome::Changed(transition) = outcome else {
            return;
        };

        if transition.status.is_terminal() {
            self.state.borrow_mut().selected = None;
        }
        transition.show(&*self.ctx.view);
        if matches!(transition.status, RideStatus::Accepted | RideStatus::Started) {
            self.start_tracking(request_id.to_string());
        }
    }

    async fn poll_driver_location(&self, request_id: &str) {
        if self.state.borrow().dispatcher.active_request() != Some(request_id) {
            return;
        }
        match self.ctx.api.driver_location(request_id).await {
            Ok(resp) => self.ctx.render(ViewUpdate::DriverPosition {
                location: resp.location,
                updated_at: resp.updated_at,
            }),
            Err(e) => self.polling_failed("driver_location", e),
        }
    }

    /// 轮询失败只记日志；会话过期则拆除控制器
    fn polling_failed(&self, poller: &'static str, err: ClientError) {
        if err.is_auth_expired() {
            self.teardown();
            return;
        }
        tracing::warn!(poller, error = %err, "polling failed");
    }

    fn teardown(&self) {
        self.state.borrow_mut().dispatcher.halt();
        self.status_poller.stop();
        self.tracking_poller.stop();
    }
}

// =========================================================
// 乘客控制器
// =========================================================

/// 乘客面板控制器
pub struct RiderController<C: HttpClient + 'static> {
    inner: Rc<RiderInner<C>>,
}

impl<C: HttpClient + 'static> RiderController<C> {
    pub fn new(ctx: Context<C>) -> Self {
        let state = RiderState {
            route: RoutePoints::default(),
            results: Vec::new(),
            selected: None,
            dispatcher: StatusDispatcher::new(),
            submitting: false,
            status_target: None,
            tracking_target: None,
        };
        let status_poller = Rc::new(Poller::new("request_status", ctx.config.status_poll_interval));
        let tracking_poller = Rc::new(Poller::new(
            "driver_location",
            ctx.config.location_poll_interval,
        ));
        Self {
            inner: Rc::new(RiderInner {
                ctx,
                state: RefCell::new(state),
                status_poller,
                tracking_poller,
            }),
        }
    }

    fn ctx(&self) -> &Context<C> {
        &self.inner.ctx
    }

    pub fn route(&self) -> RoutePoints {
        self.inner.state.borrow().route.clone()
    }

    pub fn results(&self) -> Vec<NearbyRide> {
        self.inner.state.borrow().results.clone()
    }

    pub fn selected(&self) -> Option<NearbyRide> {
        self.inner.state.borrow().selected.clone()
    }

    pub fn active_request(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .dispatcher
            .active_request()
            .map(str::to_string)
    }

    pub fn is_polling_status(&self) -> bool {
        self.inner.status_poller.is_running()
    }

    pub fn is_tracking_driver(&self) -> bool {
        self.inner.tracking_poller.is_running()
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
    /// 返回 false 表示未登录或会话已过期，页面已跳转登录。
    pub async fn init(&self) -> bool {
        let ctx = self.ctx();
        if !ctx.session().require_auth() {
            return false;
        }

        let api = &ctx.api;
        let (profile, check, active) =
            futures::join!(api.profile(), api.check_profile(), api.active_ride());

        let mut alive = ctx.show_profile(profile) & ctx.show_profile_check(check);
        let active = match active {
            Ok(resp) => Some(resp),
            Err(e) => {
                if e.is_auth_expired() {
                    alive = false;
                } else {
                    tracing::warn!(error = %e, "failed to check active ride");
                }
                None
            }
        };
        if !alive {
            self.inner.teardown();
            return false;
        }

        let resumable = active
            .filter(|resp| resp.has_active_ride)
            .and_then(|resp| resp.ride_info);
        if let Some(info) = resumable {
            match info.request_id.clone() {
                Some(request_id) => self.resume(request_id, &info),
                None => tracing::warn!("active ride without request id, not resuming"),
            }
        }
        true
    }

    /// 恢复已有请求的状态跟踪
    fn resume(&self, request_id: String, snapshot: &StatusSnapshot) {
        tracing::info!(request_id = %request_id, status = %snapshot.status, "resuming active ride");
        self.inner
            .state
            .borrow_mut()
            .dispatcher
            .begin(&request_id, None);
        self.inner.apply_status(&request_id, snapshot);

        let still_active = self.active_request().as_deref() == Some(request_id.as_str());
        if still_active {
            self.inner.start_status_polling(request_id);
        }
    }

    // --- 路线 ---

    pub async fn use_current_location(&self) -> ClientResult<Place> {
        let place = self.ctx().locate().await?;
        self.set_pickup(place.clone());
        self.ctx()
            .notify(Notice::success("Current location set as pickup point"));
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

    // --- 搜索与请求 ---

    /// 搜索附近行程，返回找到的数量
    pub async fn search_rides(&self) -> ClientResult<usize> {
        let route = self.inner.state.borrow().route.require_both(&PROMPTS);
        let (pickup, destination) = match route {
            Ok(points) => points,
            Err(message) => return self.ctx().invalid(message),
        };

        let req = NearbyRidesRequest {
            current_location: pickup.coordinates,
            destination_location: destination.coordinates,
            max_distance_km: self.ctx().config.search_radius_km,
        };
        let rides = match self.ctx().api.nearby_rides(&req).await {
            Ok(resp) => resp.nearby_rides,
            Err(e) => return self.fail(e, "Failed to search for rides. Please try again."),
        };

        {
            let mut state = self.inner.state.borrow_mut();
            state.results = rides.clone();
            state.selected = None;
        }

        let count = rides.len();
        if count == 0 {
            self.ctx().render(ViewUpdate::NoRidesFound);
            self.ctx().notify(Notice::warning(
                "No rides available in your area. Try adjusting your pickup location.",
            ));
        } else {
            self.ctx().render(ViewUpdate::RideList(rides));
            self.ctx()
                .notify(Notice::success(format!("Found {} available ride(s)", count)));
        }
        Ok(count)
    }

    pub fn select_ride(&self, ride_id: &str) -> ClientResult<NearbyRide> {
        let found = self
            .inner
            .state
            .borrow()
            .results
            .iter()
            .find(|r| r.ride_id == ride_id)
            .cloned();
        let Some(ride) = found else {
            return self.ctx().invalid("Ride not found");
        };
        self.inner.state.borrow_mut().selected = Some(ride.clone());
        self.ctx().render(ViewUpdate::RideSelected(ride.clone()));
        Ok(ride)
    }

    pub async fn estimate_fare(&self) -> ClientResult<FareEstimate> {
        let route = self.inner.state.borrow().route.require_both(&PROMPTS);
        let (pickup, destination) = match route {
            Ok(points) => points,
            Err(message) => return self.ctx().invalid(message),
        };

        match self
            .ctx()
            .api
            .fare_estimate(pickup.coordinates, destination.coordinates)
            .await
        {
            Ok(estimate) => {
                self.ctx().render(ViewUpdate::FareEstimated(estimate.clone()));
                Ok(estimate)
            }
            Err(e) => self.fail(e, "Failed to estimate fare. Please try again."),
        }
    }

    /// 向选中的行程发送请求，成功后开始状态轮询
    pub async fn confirm_request(&self) -> ClientResult<String> {
        let (route, selected, busy, submitting) = {
            let state = self.inner.state.borrow();
            (
                state.route.require_both(&PROMPTS),
                state.selected.clone(),
                state.dispatcher.active_request().is_some(),
                state.submitting,
            )
        };
        if submitting {
            return self.ctx().invalid("Your ride request is already being sent");
        }
        if busy {
            return self.ctx().invalid("You already have an active ride request");
        }
        let (pickup, destination) = match route {
            Ok(points) => points,
            Err(message) => return self.ctx().invalid(message),
        };
        let Some(ride) = selected else {
            return self.ctx().invalid("Missing ride information");
        };

        let body = RideRequestBody {
            ride_id: ride.ride_id.clone(),
            pickup_location: pickup.coordinates,
            destination_location: destination.coordinates,
            pickup_address: pickup.address,
            destination_address: destination.address,
        };
        self.inner.state.borrow_mut().submitting = true;
        let result = self.ctx().api.request_ride(&body).await;
        self.inner.state.borrow_mut().submitting = false;
        let created = match result {
            Ok(created) => created,
            Err(e) => return self.fail(e, "Failed to request ride. Please try again."),
        };

        let request_id = created.request_id;
        self.inner
            .state
            .borrow_mut()
            .dispatcher
            .begin(&request_id, Some(RideStatus::Pending));
        self.ctx().render(ViewUpdate::AwaitingDriver {
            request_id: request_id.clone(),
            estimated_fare: created.estimated_fare.or(Some(ride.suggested_fare)),
        });
        self.ctx().notify(Notice::success(
            "Ride request sent successfully! Waiting for driver confirmation...",
        ));
        self.inner.start_status_polling(request_id.clone());
        Ok(request_id)
    }

    /// 本地取消：停止跟踪当前请求
    pub fn cancel_active_ride(&self) -> ClientResult<()> {
        if self.active_request().is_none() {
            return self.ctx().invalid("No active ride request to cancel");
        }
        {
            let mut state = self.inner.state.borrow_mut();
            state.dispatcher.halt();
            state.selected = None;
        }
        self.ctx().render(ViewUpdate::SearchReset);
        self.ctx().notify(Notice::info("Ride request cancelled."));
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
                    .notify(Notice::success("Profile completed successfully!"));
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to complete profile. Please try again."),
        }
    }

    pub async fn logout(&self) {
        self.inner.teardown();
        self.ctx().sign_out().await;
    }

    /// 离开页面时调用
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl<C: HttpClient + 'static> Drop for RiderController<C> {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}
