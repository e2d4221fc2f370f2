use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpRequest};
use crate::session::Session;
use campuspool_shared::protocol::*;
use campuspool_shared::{Coordinates, HEADER_AUTHORIZATION, RespondAction, StatusSnapshot};

// =========================================================
// 1. Gateway
// =========================================================

/// 通用接口调用层
///
/// 负责 URL 拼接、令牌注入、JSON 编解码和错误归类。
/// 不做任何重试，失败原样交给调用方。
#[derive(Clone)]
pub struct ApiGateway<C: HttpClient> {
    client: C,
    base_url: String,
    session: Session,
}

impl<C: HttpClient> ApiGateway<C> {
    pub fn new(client: C, base_url: &str, session: Session) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    #[tracing::instrument(
        name = "api_call",
        skip_all,
        fields(method = R::METHOD.as_str(), path = %req.path())
    )]
    pub async fn call<R: ApiRequest>(&self, req: &R) -> ClientResult<R::Response> {
        let mut http = HttpRequest::new(&self.url(&req.path()), R::METHOD);

        if R::AUTHENTICATED {
            if let Some(token) = self.session.token() {
                http = http.with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", token));
            }
        }

        if R::METHOD.has_body() {
            let body = serde_json::to_value(req)?;
            if !body.is_null() {
                http = http
                    .with_header("Content-Type", "application/json")
                    .with_body(body);
            }
        }

        let resp = self.client.send(http).await?;

        if resp.status == 401 && R::AUTHENTICATED {
            self.session.expire();
            return Err(ClientError::AuthExpired);
        }

        if !resp.ok() {
            let message = resp.json::<ErrorBody>().ok().map(|b| b.error);
            tracing::debug!(status = resp.status, "request rejected");
            return Err(ClientError::request(resp.status, message));
        }

        resp.json::<R::Response>()
    }
}

// =========================================================
// 2. 业务接口
// =========================================================

/// 后端接口的类型化封装，每个端点一个方法
#[derive(Clone)]
pub struct CampusPoolApi<C: HttpClient> {
    gateway: ApiGateway<C>,
}

impl<C: HttpClient> CampusPoolApi<C> {
    pub fn new(client: C, base_url: &str, session: Session) -> Self {
        Self {
            gateway: ApiGateway::new(client, base_url, session),
        }
    }

    pub fn session(&self) -> &Session {
        self.gateway.session()
    }

    // --- Auth ---

    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<MessageResponse> {
        self.gateway.call(req).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.gateway.call(&req).await
    }

    pub async fn verify_token(&self) -> ClientResult<VerifyTokenResponse> {
        self.gateway.call(&VerifyTokenRequest).await
    }

    pub async fn logout(&self) -> ClientResult<MessageResponse> {
        self.gateway.call(&LogoutRequest).await
    }

    pub async fn profile(&self) -> ClientResult<ProfileResponse> {
        self.gateway.call(&ProfileRequest).await
    }

    // --- Profiles ---

    pub async fn check_profile(&self) -> ClientResult<ProfileCheckResponse> {
        self.gateway.call(&ProfileCheckRequest).await
    }

    pub async fn complete_profile(
        &self,
        form: CompleteProfileRequest,
    ) -> ClientResult<ProfileCompleteResponse> {
        self.gateway.call(&form.normalized()).await
    }

    // --- Driver ---

    pub async fn go_live(&self, req: &GoLiveRequest) -> ClientResult<GoLiveResponse> {
        self.gateway.call(req).await
    }

    pub async fn go_offline(&self) -> ClientResult<MessageResponse> {
        self.gateway.call(&GoOfflineRequest).await
    }

    pub async fn pending_requests(&self) -> ClientResult<PendingRequestsResponse> {
        self.gateway.call(&PendingRequestsRequest).await
    }

    pub async fn respond(
        &self,
        request_id: &str,
        action: RespondAction,
    ) -> ClientResult<RespondResponse> {
        let req = RespondRequest {
            request_id: request_id.to_string(),
            action,
        };
        self.gateway.call(&req).await
    }

    pub async fn verify_otp(&self, request_id: &str, otp: &str) -> ClientResult<MessageResponse> {
        let req = VerifyOtpRequest {
            request_id: request_id.to_string(),
            otp: otp.to_string(),
        };
        self.gateway.call(&req).await
    }

    pub async fn complete_ride(&self, request_id: &str) -> ClientResult<MessageResponse> {
        let req = CompleteRideRequest {
            request_id: request_id.to_string(),
        };
        self.gateway.call(&req).await
    }

    pub async fn update_location(&self, location: Coordinates) -> ClientResult<MessageResponse> {
        self.gateway.call(&UpdateLocationRequest { location }).await
    }

    // --- Rider ---

    pub async fn nearby_rides(&self, req: &NearbyRidesRequest) -> ClientResult<NearbyRidesResponse> {
        self.gateway.call(req).await
    }

    pub async fn request_ride(&self, req: &RideRequestBody) -> ClientResult<RideRequestCreated> {
        self.gateway.call(req).await
    }

    pub async fn active_ride(&self) -> ClientResult<ActiveRideResponse> {
        self.gateway.call(&ActiveRideRequest).await
    }

    pub async fn request_status(&self, request_id: &str) -> ClientResult<StatusSnapshot> {
        let req = RequestStatusRequest {
            request_id: request_id.to_string(),
        };
        self.gateway.call(&req).await
    }

    pub async fn driver_location(&self, request_id: &str) -> ClientResult<DriverLocationResponse> {
        let req = DriverLocationRequest {
            request_id: request_id.to_string(),
        };
        self.gateway.call(&req).await
    }

    pub async fn fare_estimate(
        &self,
        pickup: Coordinates,
        destination: Coordinates,
    ) -> ClientResult<FareEstimate> {
        let req = FareEstimateRequest {
            pickup_location: pickup,
            destination_location: destination,
        };
        self.gateway.call(&req).await
    }

    // --- Maps ---

    /// 反向地理编码
    ///
    /// 永不失败：任何错误（包括会话过期）都退回坐标文本。
    pub async fn reverse_geocode(&self, position: Coordinates) -> String {
        match self.gateway.call(&ReverseGeocodeRequest::from(position)).await {
            Ok(resp) => match resp.first_address() {
                Some(address) => address.to_string(),
                None => {
                    tracing::debug!(status = %resp.status, "geocoder returned no address");
                    position.format_fallback()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "reverse geocode failed");
                position.format_fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use crate::route::{AppRoute, MemoryRouter};
    use crate::storage::{MemoryStorage, TokenStore};
    use campuspool_shared::{RideStatus, Role, TOKEN_STORAGE_KEY};
    use campuspool_shared::protocol::HttpMethod;
    use serde_json::json;
    use std::rc::Rc;

    const BASE: &str = "http://campus.test/api";

    struct Fixture {
        api: CampusPoolApi<Rc<MockHttpClient>>,
        client: Rc<MockHttpClient>,
        store: Rc<MemoryStorage>,
        router: Rc<MemoryRouter>,
    }

    fn fixture(token: Option<&str>) -> Fixture {
        let client = Rc::new(MockHttpClient::new());
        let store = Rc::new(MemoryStorage::new());
        if let Some(t) = token {
            store.set(TOKEN_STORAGE_KEY, t);
        }
        let router = Rc::new(MemoryRouter::new(AppRoute::Rider));
        let session = Session::new(store.clone(), router.clone());
        let api = CampusPoolApi::new(client.clone(), BASE, session);
        Fixture {
            api,
            client,
            store,
            router,
        }
    }

    fn url(path: &str) -> String {
        format!("{}{}", BASE, path)
    }

    // =========================================================
    // 请求构造
    // =========================================================

    #[tokio::test]
    async fn test_bearer_header_and_json_body() {
        let f = fixture(Some("jwt-1"));
        f.client.mock_response(
            &url("/rides/fare-estimate"),
            200,
            json!({ "distance_km": 4.2, "estimated_fare": 63.0 }),
        );

        let est = f
            .api
            .fare_estimate(Coordinates::new(77.6, 12.9), Coordinates::new(77.7, 12.8))
            .await
            .unwrap();
        assert_eq!(est.estimated_fare, 63.0);

        let sent = &f.client.requests_to(&url("/rides/fare-estimate"))[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(
            sent.headers.get(HEADER_AUTHORIZATION).map(String::as_str),
            Some("Bearer jwt-1")
        );
        assert_eq!(
            sent.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            sent.json_body(),
            json!({
                "pickup_location": [77.6, 12.9],
                "destination_location": [77.7, 12.8]
            })
        );
    }

    #[tokio::test]
    async fn test_get_sends_no_body_and_substitutes_path() {
        let f = fixture(Some("jwt"));
        f.client.mock_response(
            &url("/rides/request-status/req-7"),
            200,
            json!({ "request_id": "req-7", "status": "pending" }),
        );

        let snap = f.api.request_status("req-7").await.unwrap();
        assert_eq!(snap.status, RideStatus::Pending);

        let sent = &f.client.requests_to(&url("/rides/request-status/req-7"))[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.body, None);
    }

    #[tokio::test]
    async fn test_unit_post_has_no_body() {
        let f = fixture(Some("jwt"));
        f.client
            .mock_response(&url("/auth/logout"), 200, json!({ "message": "bye" }));

        f.api.logout().await.unwrap();
        let sent = &f.client.requests_to(&url("/auth/logout"))[0];
        assert_eq!(sent.body, None);
    }

    #[tokio::test]
    async fn test_login_does_not_send_stored_token() {
        let f = fixture(Some("old"));
        f.client.mock_response(
            &url("/auth/login"),
            200,
            json!({
                "message": "Login successful",
                "token": "new",
                "user": { "id": "u1", "name": "Asha", "email": "a@kjc.edu", "role": "driver" }
            }),
        );

        let resp = f.api.login("a@kjc.edu", "secret").await.unwrap();
        assert_eq!(resp.user.role, Role::Driver);
        let sent = &f.client.requests_to(&url("/auth/login"))[0];
        assert!(!sent.headers.contains_key(HEADER_AUTHORIZATION));
    }

    // =========================================================
    // 错误归类
    // =========================================================

    #[tokio::test]
    async fn test_401_on_any_authenticated_endpoint_expires_session() {
        let paths = ["/auth/profile", "/rides/requests", "/rides/active-ride"];
        for path in paths {
            let f = fixture(Some("jwt"));
            f.client
                .mock_response(&url(path), 401, json!({ "error": "Token has expired" }));

            let err = match path {
                "/auth/profile" => f.api.profile().await.err(),
                "/rides/requests" => f.api.pending_requests().await.err(),
                _ => f.api.active_ride().await.err(),
            }
            .unwrap();

            assert!(err.is_auth_expired(), "{path}");
            assert_eq!(f.store.get(TOKEN_STORAGE_KEY), None, "{path}");
            assert_eq!(f.router.current(), AppRoute::Login, "{path}");
        }
    }

    #[tokio::test]
    async fn test_401_on_login_is_a_credential_error() {
        let f = fixture(None);
        f.client.mock_response(
            &url("/auth/login"),
            401,
            json!({ "error": "Invalid email or password" }),
        );

        let err = f.api.login("a@kjc.edu", "nope").await.unwrap_err();
        assert!(!err.is_auth_expired());
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.user_message(), "Invalid email or password");
        assert_eq!(f.router.history(), vec![AppRoute::Rider]);
    }

    #[tokio::test]
    async fn test_error_message_from_body_or_status() {
        let f = fixture(Some("jwt"));
        f.client.mock_response(
            &url("/rides/go-live"),
            400,
            json!({ "error": "You already have an active ride" }),
        );
        f.client
            .mock_response(&url("/rides/go-offline"), 502, json!("bad gateway"));

        let req = GoLiveRequest {
            pickup_location: Coordinates::new(77.6, 12.9),
            destination_location: Coordinates::new(77.7, 12.8),
            pickup_address: "A".into(),
            destination_address: "B".into(),
            seats_available: 3,
        };
        let err = f.api.go_live(&req).await.unwrap_err();
        assert_eq!(err.user_message(), "You already have an active ride");

        let err = f.api.go_offline().await.unwrap_err();
        assert_eq!(err.user_message(), "HTTP error! status: 502");
        assert_eq!(f.store.get(TOKEN_STORAGE_KEY).as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_network_and_decode_errors() {
        let f = fixture(Some("jwt"));
        f.client.mock_network_error(&url("/auth/profile"));
        f.client
            .mock_response(&url("/profiles/check"), 200, json!({ "unexpected": true }));

        let err = f.api.profile().await.unwrap_err();
        assert_eq!(err.error_code(), "NETWORK_ERROR");

        let err = f.api.check_profile().await.unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }

    // =========================================================
    // 反向地理编码
    // =========================================================

    #[tokio::test]
    async fn test_reverse_geocode_uses_first_result() {
        let f = fixture(Some("jwt"));
        f.client.mock_response(
            &url("/maps/reverse-geocode"),
            200,
            json!({
                "status": "OK",
                "results": [
                    { "formatted_address": "Kothanur, Bengaluru" },
                    { "formatted_address": "Karnataka" }
                ]
            }),
        );

        let address = f.api.reverse_geocode(Coordinates::new(77.7, 12.86)).await;
        assert_eq!(address, "Kothanur, Bengaluru");
        assert_eq!(
            f.client.requests_to(&url("/maps/reverse-geocode"))[0].json_body(),
            json!({ "lat": 12.86, "lng": 77.7 })
        );
    }

    #[tokio::test]
    async fn test_reverse_geocode_falls_back_to_coordinates() {
        let f = fixture(Some("jwt"));
        f.client.mock_network_error(&url("/maps/reverse-geocode"));

        let position = Coordinates::new(77.7334, 12.8627);
        assert_eq!(f.api.reverse_geocode(position).await, "12.862700, 77.733400");

        f.client.mock_response(
            &url("/maps/reverse-geocode"),
            200,
            json!({ "status": "ZERO_RESULTS", "results": [] }),
        );
        assert_eq!(f.api.reverse_geocode(position).await, "12.862700, 77.733400");
    }
}
