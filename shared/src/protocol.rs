use crate::{
    Contact, Coordinates, FareBreakdown, NearbyRide, PendingRequest, RespondAction, Role,
    StatusSnapshot, TokenClaims, UserProfile, UserSummary,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::borrow::Cow;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Only these methods carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path, relative to the API base.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// Whether the bearer token is attached. A 401 on an authenticated
    /// endpoint means the session expired.
    const AUTHENTICATED: bool = true;

    /// Concrete path for this value. Endpoints with path parameters override it.
    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed(Self::PATH)
    }
}

// =========================================================
// Shared response bodies
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// =========================================================
// Auth
// =========================================================

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "homeAddress")]
    pub home_address: String,
    pub coordinates: Coordinates,
    pub role: Role,
}

impl ApiRequest for RegisterRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/auth/register";
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

impl ApiRequest for LoginRequest {
    type Response = LoginResponse;
    const PATH: &'static str = "/auth/login";
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTHENTICATED: bool = false;
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    #[serde(default)]
    pub message: String,
    pub user: TokenClaims,
}

impl ApiRequest for VerifyTokenRequest {
    type Response = VerifyTokenResponse;
    const PATH: &'static str = "/auth/verify-token";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest;

impl ApiRequest for LogoutRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/auth/logout";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

impl ApiRequest for ProfileRequest {
    type Response = ProfileResponse;
    const PATH: &'static str = "/auth/profile";
    const METHOD: HttpMethod = HttpMethod::Get;
}

// =========================================================
// Profiles
// =========================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProfileCheckRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCheckResponse {
    pub profile_complete: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

impl ApiRequest for ProfileCheckRequest {
    type Response = ProfileCheckResponse;
    const PATH: &'static str = "/profiles/check";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// Profile form. Empty optional fields are left out of the body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompleteProfileRequest {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
}

impl CompleteProfileRequest {
    /// Turns blank strings into `None`.
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(field: &mut Option<String>) {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        self.phone_number = self.phone_number.trim().to_string();
        blank_to_none(&mut self.emergency_contact);
        blank_to_none(&mut self.college_id);
        blank_to_none(&mut self.vehicle_model);
        blank_to_none(&mut self.vehicle_color);
        blank_to_none(&mut self.vehicle_plate);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCompleteResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub profile_complete: bool,
}

impl ApiRequest for CompleteProfileRequest {
    type Response = ProfileCompleteResponse;
    const PATH: &'static str = "/profiles/complete";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Driver lifecycle
// =========================================================

#[derive(Debug, Clone, Serialize)]
pub struct GoLiveRequest {
    pub pickup_location: Coordinates,
    pub destination_location: Coordinates,
    pub pickup_address: String,
    pub destination_address: String,
    pub seats_available: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoLiveResponse {
    #[serde(default)]
    pub message: String,
    pub ride_id: String,
}

impl ApiRequest for GoLiveRequest {
    type Response = GoLiveResponse;
    const PATH: &'static str = "/rides/go-live";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct GoOfflineRequest;

impl ApiRequest for GoOfflineRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/rides/go-offline";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingRequestsRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequestsResponse {
    #[serde(default)]
    pub requests: Vec<PendingRequest>,
    #[serde(default)]
    pub total: usize,
}

impl ApiRequest for PendingRequestsRequest {
    type Response = PendingRequestsResponse;
    const PATH: &'static str = "/rides/requests";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize)]
pub struct RespondRequest {
    #[serde(skip)]
    pub request_id: String,
    pub action: RespondAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ApiRequest for RespondRequest {
    type Response = RespondResponse;
    const PATH: &'static str = "/rides/requests/{id}/respond";
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/rides/requests/{}/respond", self.request_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub request_id: String,
    pub otp: String,
}

impl ApiRequest for VerifyOtpRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/rides/verify-otp";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteRideRequest {
    pub request_id: String,
}

impl ApiRequest for CompleteRideRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/rides/complete-ride";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateLocationRequest {
    pub location: Coordinates,
}

impl ApiRequest for UpdateLocationRequest {
    type Response = MessageResponse;
    const PATH: &'static str = "/rides/update-location";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Rider lifecycle
// =========================================================

#[derive(Debug, Clone, Serialize)]
pub struct NearbyRidesRequest {
    pub current_location: Coordinates,
    pub destination_location: Coordinates,
    pub max_distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyRidesResponse {
    #[serde(default)]
    pub nearby_rides: Vec<NearbyRide>,
    #[serde(default)]
    pub total_found: usize,
}

impl ApiRequest for NearbyRidesRequest {
    type Response = NearbyRidesResponse;
    const PATH: &'static str = "/rides/nearby";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct RideRequestBody {
    pub ride_id: String,
    pub pickup_location: Coordinates,
    pub destination_location: Coordinates,
    pub pickup_address: String,
    pub destination_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequestCreated {
    #[serde(default)]
    pub message: String,
    pub request_id: String,
    #[serde(default)]
    pub estimated_fare: Option<f64>,
}

impl ApiRequest for RideRequestBody {
    type Response = RideRequestCreated;
    const PATH: &'static str = "/rides/request";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRideRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRideResponse {
    pub has_active_ride: bool,
    #[serde(default)]
    pub ride_info: Option<StatusSnapshot>,
}

impl ApiRequest for ActiveRideRequest {
    type Response = ActiveRideResponse;
    const PATH: &'static str = "/rides/active-ride";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusRequest {
    #[serde(skip)]
    pub request_id: String,
}

impl ApiRequest for RequestStatusRequest {
    type Response = StatusSnapshot;
    const PATH: &'static str = "/rides/request-status/{id}";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/rides/request-status/{}", self.request_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverLocationRequest {
    #[serde(skip)]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverLocationResponse {
    pub location: Coordinates,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub driver: Option<Contact>,
}

impl ApiRequest for DriverLocationRequest {
    type Response = DriverLocationResponse;
    const PATH: &'static str = "/rides/driver-location/{id}";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> Cow<'static, str> {
        Cow::Owned(format!("/rides/driver-location/{}", self.request_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FareEstimateRequest {
    pub pickup_location: Coordinates,
    pub destination_location: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareEstimate {
    pub distance_km: f64,
    pub estimated_fare: f64,
    #[serde(default)]
    pub fare_breakdown: Option<FareBreakdown>,
}

impl ApiRequest for FareEstimateRequest {
    type Response = FareEstimate;
    const PATH: &'static str = "/rides/fare-estimate";
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Maps
// =========================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReverseGeocodeRequest {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for ReverseGeocodeRequest {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: c.latitude,
            lng: c.longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
}

/// Geocoder payload relayed verbatim by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

impl GeocodeResponse {
    pub fn first_address(&self) -> Option<&str> {
        if self.status != "OK" {
            return None;
        }
        self.results.first().map(|r| r.formatted_address.as_str())
    }
}

impl ApiRequest for ReverseGeocodeRequest {
    type Response = GeocodeResponse;
    const PATH: &'static str = "/maps/reverse-geocode";
    const METHOD: HttpMethod = HttpMethod::Post;
}
