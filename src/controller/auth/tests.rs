use super::*;
use crate::controller::testing::{HOME, Harness, url};
use crate::geo::{FixedLocation, GeoError};
use crate::request::MockHttpClient;
use crate::view::NoticeLevel;
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;

// =========================================================
// 辅助函数
// =========================================================

fn controller(h: &Harness) -> AuthController<Rc<MockHttpClient>> {
    AuthController::new(h.ctx.clone())
}

fn form() -> RegistrationForm {
    RegistrationForm {
        name: "Asha".into(),
        email: "asha@kristujayanti.edu.in".into(),
        password: "secret1".into(),
        address: "Koramangala".into(),
        role: Role::Rider,
    }
}

fn login_response(role: &str) -> serde_json::Value {
    json!({
        "message": "Login successful",
        "token": "jwt-new",
        "user": { "id": "u1", "name": "Asha", "email": "asha@kjc.edu", "role": role }
    })
}

// =========================================================
// init 测试
// =========================================================

#[tokio::test]
async fn test_init_without_token_shows_login_form() {
    let h = Harness::new(AppRoute::Login, None);
    controller(&h).init().await;

    assert_eq!(h.view.updates(), vec![ViewUpdate::LoginForm]);
    assert_eq!(h.client.request_count(), 0);
}

#[tokio::test]
async fn test_init_with_valid_token_enters_dashboard() {
    let h = Harness::new(AppRoute::Login, Some("jwt"));
    h.client.mock_response(
        &url("/auth/verify-token"),
        200,
        json!({
            "message": "Token is valid",
            "user": { "user_id": "u1", "email": "ravi@kjc.edu", "role": "driver" }
        }),
    );
    h.client.mock_response(
        &url("/auth/profile"),
        200,
        json!({ "user": { "id": "u1", "name": "Ravi", "email": "ravi@kjc.edu", "role": "driver" } }),
    );

    controller(&h).init().await;

    assert_eq!(
        h.view.updates(),
        vec![ViewUpdate::SignedIn {
            name: "Ravi".into(),
            role: Role::Driver
        }]
    );
    assert_eq!(h.router.current(), AppRoute::Driver);
}

#[tokio::test]
async fn test_init_with_rejected_token_clears_it() {
    let h = Harness::new(AppRoute::Login, Some("stale"));
    h.client.mock_response(
        &url("/auth/verify-token"),
        401,
        json!({ "error": "Token has expired" }),
    );

    controller(&h).init().await;

    assert_eq!(h.token(), None);
    assert_eq!(h.router.current(), AppRoute::Login);
    assert_eq!(h.view.updates(), vec![ViewUpdate::LoginForm]);
}

// =========================================================
// login 测试
// =========================================================

#[tokio::test]
async fn test_login_requires_both_fields() {
    let h = Harness::new(AppRoute::Login, None);
    let err = controller(&h).login("  ", "pw").await.unwrap_err();

    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(h.client.request_count(), 0);
    assert_eq!(
        h.view.last_notice(),
        Some(Notice::error("Please fill in all required fields."))
    );
}

#[tokio::test]
async fn test_login_stores_token_and_routes_by_role() {
    let h = Harness::new(AppRoute::Login, None);
    h.client
        .mock_response(&url("/auth/login"), 200, login_response("rider"));

    let user = controller(&h)
        .login("asha@kjc.edu", "secret1")
        .await
        .unwrap();

    assert_eq!(user.role, Role::Rider);
    assert_eq!(h.token().as_deref(), Some("jwt-new"));
    assert_eq!(h.router.current(), AppRoute::Rider);
}

#[tokio::test]
async fn test_login_with_unknown_role_stays_signed_in() {
    let h = Harness::new(AppRoute::Login, None);
    h.client
        .mock_response(&url("/auth/login"), 200, login_response("admin"));

    controller(&h).login("a@kjc.edu", "secret1").await.unwrap();

    assert_eq!(h.router.current(), AppRoute::Login);
    assert_eq!(
        h.view.updates(),
        vec![ViewUpdate::SignedIn {
            name: "Asha".into(),
            role: Role::Unknown
        }]
    );
}

#[tokio::test]
async fn test_login_failure_shows_server_message() {
    let h = Harness::new(AppRoute::Login, None);
    h.client.mock_response(
        &url("/auth/login"),
        401,
        json!({ "error": "Invalid email or password" }),
    );

    let err = controller(&h).login("a@kjc.edu", "wrong").await.unwrap_err();

    assert!(!err.is_auth_expired());
    assert_eq!(h.token(), None);
    assert_eq!(
        h.view.last_notice(),
        Some(Notice::error("Invalid email or password"))
    );
}

// =========================================================
// register 测试
// =========================================================

#[tokio::test]
async fn test_register_validates_locally() {
    let h = Harness::new(AppRoute::Login, None);
    let auth = controller(&h);

    let mut short = form();
    short.password = "abc".into();
    auth.register(short).await.unwrap_err();
    assert_eq!(
        h.view.last_notice().unwrap().message,
        "Password must be at least 6 characters long."
    );

    let mut blank = form();
    blank.name = " ".into();
    auth.register(blank).await.unwrap_err();
    assert_eq!(
        h.view.last_notice().unwrap().message,
        "Please fill in all required fields."
    );

    // 没有住址坐标
    auth.register(form()).await.unwrap_err();
    assert_eq!(
        h.view.last_notice().unwrap().message,
        "Please use 'Use My Location' or enter an address first."
    );

    assert_eq!(h.client.request_count(), 0);
}

#[tokio::test]
async fn test_register_sends_home_coordinates() {
    let h = Harness::new(AppRoute::Login, None);
    h.mock_geocode("Koramangala, Bengaluru");
    h.client.mock_response(
        &url("/auth/register"),
        201,
        json!({ "message": "User registered successfully" }),
    );

    let auth = controller(&h);
    let home = auth.use_my_location().await.unwrap();
    assert_eq!(home.address, "Koramangala, Bengaluru");

    assert!(auth.register(form()).await.unwrap());

    let sent = &h.client.requests_to(&url("/auth/register"))[0];
    assert_eq!(
        sent.json_body(),
        json!({
            "name": "Asha",
            "email": "asha@kristujayanti.edu.in",
            "password": "secret1",
            "homeAddress": "Koramangala",
            "coordinates": [HOME.longitude, HOME.latitude],
            "role": "rider"
        })
    );
    assert_eq!(
        h.view.last_notice(),
        Some(Notice::success("User registered successfully"))
    );
    assert_eq!(h.view.updates().last(), Some(&ViewUpdate::LoginForm));
}

#[tokio::test(start_paused = true)]
async fn test_register_ignores_second_submit_while_in_flight() {
    let h = Harness::new(AppRoute::Login, None);
    h.client.mock_response(
        &url("/auth/register"),
        201,
        json!({ "message": "User registered successfully" }),
    );
    h.client.set_delay(Duration::from_secs(1));

    let auth = controller(&h);
    auth.set_home_location(Place::new("Koramangala", HOME));

    let (first, second) = futures::join!(auth.register(form()), auth.register(form()));

    assert!(first.unwrap());
    assert!(!second.unwrap());
    assert_eq!(h.client.requests_to(&url("/auth/register")).len(), 1);
}

#[tokio::test]
async fn test_use_my_location_reports_geolocation_error() {
    let h = Harness::new(AppRoute::Login, None);
    let auth = AuthController::new(Context {
        locator: Rc::new(FixedLocation::failing(GeoError::PermissionDenied)),
        ..h.ctx.clone()
    });

    let err = auth.use_my_location().await.unwrap_err();

    assert_eq!(err.error_code(), "LOCATION_ERROR");
    let notice = h.view.last_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(
        notice.message,
        "Location access denied. Please allow location access."
    );
    assert_eq!(auth.home(), None);
}

// =========================================================
// logout 测试
// =========================================================

#[tokio::test]
async fn test_logout_clears_session_even_if_call_fails() {
    let h = Harness::new(AppRoute::Rider, Some("jwt"));
    h.client.mock_network_error(&url("/auth/logout"));

    controller(&h).logout().await;

    assert_eq!(h.token(), None);
    assert_eq!(h.router.current(), AppRoute::Login);
}
