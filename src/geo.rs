//! 定位封装模块
//!
//! 把设备定位建模为返回 Result 的异步操作，由宿主环境提供实现。

use campuspool_shared::Coordinates;
use std::cell::RefCell;
use thiserror::Error;

/// 定位失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("Geolocation is not supported by this browser.")]
    Unsupported,
    #[error("Location access denied. Please allow location access.")]
    PermissionDenied,
    #[error("Location information unavailable.")]
    PositionUnavailable,
    #[error("Location request timed out.")]
    Timeout,
}

impl GeoError {
    /// 展示给用户的消息，与 `Display` 相同
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// 设备定位接口
#[async_trait::async_trait(?Send)]
pub trait LocationProvider {
    async fn current_position(&self) -> Result<Coordinates, GeoError>;
}

/// 固定位置
///
/// 适用于没有定位硬件的宿主，或需要模拟位置移动的场景。
#[derive(Debug)]
pub struct FixedLocation {
    position: RefCell<Result<Coordinates, GeoError>>,
}

impl FixedLocation {
    pub fn new(position: Coordinates) -> Self {
        Self {
            position: RefCell::new(Ok(position)),
        }
    }

    /// 始终返回指定错误
    pub fn failing(error: GeoError) -> Self {
        Self {
            position: RefCell::new(Err(error)),
        }
    }

    /// 更新后续返回的位置
    pub fn move_to(&self, position: Coordinates) {
        *self.position.borrow_mut() = Ok(position);
    }
}

#[async_trait::async_trait(?Send)]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        *self.position.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location_follows_moves() {
        let provider = FixedLocation::new(Coordinates::new(77.0, 12.0));
        assert_eq!(
            provider.current_position().await,
            Ok(Coordinates::new(77.0, 12.0))
        );

        provider.move_to(Coordinates::new(77.5, 12.5));
        assert_eq!(
            provider.current_position().await,
            Ok(Coordinates::new(77.5, 12.5))
        );
    }

    #[test]
    fn test_user_message_matches_display() {
        assert_eq!(
            GeoError::PermissionDenied.user_message(),
            "Location access denied. Please allow location access."
        );
        for err in [
            GeoError::Unsupported,
            GeoError::PermissionDenied,
            GeoError::PositionUnavailable,
            GeoError::Timeout,
        ] {
            assert_eq!(err.user_message(), err.to_string());
        }
    }

    #[tokio::test]
    async fn test_failing_location() {
        let provider = FixedLocation::failing(GeoError::Timeout);
        assert_eq!(provider.current_position().await, Err(GeoError::Timeout));
    }
}
