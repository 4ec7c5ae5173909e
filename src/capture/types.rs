use crate::models::{Location, MediaFile};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Options passed to the device for a position fix
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Longest the device may take to produce a fix
    pub timeout: Duration,
    /// Oldest cached fix the device may return; zero forces a fresh reading
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// One fix as reported by the device
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    /// Device clock at fix time
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn into_location(self) -> Location {
        Location {
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            gps_timestamp: Some(self.timestamp),
            accuracy: Some(self.accuracy),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location information is unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// Banner text shown next to the retry affordance
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::Unsupported => "Geolocation is not supported by this device.",
            LocationError::PermissionDenied => {
                "Location access was denied. Enable location permissions and try again."
            }
            LocationError::PositionUnavailable => {
                "Your location could not be determined. Move to an open area and try again."
            }
            LocationError::Timeout => "Getting your location took too long. Please try again.",
            LocationError::Unknown(_) => "An unknown error occurred while getting your location.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Back camera
    Environment,
    User,
}

/// Requested stream shape; devices may deliver less
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// How much frame data a stream has buffered, in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// RGBA pixels of one frame at native resolution
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera found on this device")]
    DeviceNotFound,
    #[error("camera is not open")]
    NotLive,
    #[error("camera is not ready: {0}")]
    NotReady(String),
    #[error("failed to encode photo: {0}")]
    Encoding(String),
    #[error("camera error: {0}")]
    Other(String),
}

/// Read-only view of the live stream for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub width: u32,
    pub height: u32,
    pub ready_state: ReadyState,
}

/// Display handle for a captured photo.
///
/// Shares the encoded bytes; dropping or releasing the last handle frees them.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    id: Uuid,
    bytes: Arc<[u8]>,
}

impl PreviewHandle {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(bytes),
        }
    }

    pub fn url(&self) -> String {
        format!("preview:{}", self.id)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Handles still sharing these bytes, this one included
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.bytes)
    }

    pub fn release(self) {
        debug!("Released preview {}", self.id);
    }
}

/// A captured photo paired with its preview, until it is submitted or discarded
#[derive(Debug, Clone)]
pub struct CapturedEvidence {
    pub file: MediaFile,
    pub preview: PreviewHandle,
    pub captured_at: DateTime<Utc>,
}

impl CapturedEvidence {
    /// Split into the file to upload and the preview to keep on screen
    pub fn into_parts(self) -> (MediaFile, PreviewHandle) {
        (self.file, self.preview)
    }

    pub fn discard(self) {
        debug!("Discarding captured photo {}", self.file.file_name);
        self.preview.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_position_options_demand_a_fresh_fix() {
        let opts = PositionOptions::default();
        assert!(opts.enable_high_accuracy);
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert_eq!(opts.maximum_age, Duration::ZERO);
    }

    #[test]
    fn ready_states_are_ordered() {
        assert!(ReadyState::HaveCurrentData < ReadyState::HaveEnoughData);
        assert!(ReadyState::HaveNothing < ReadyState::HaveMetadata);
    }

    #[test]
    fn fix_converts_with_gps_timestamp() {
        let ts = "2026-03-01T08:15:00Z".parse::<DateTime<Utc>>().unwrap();
        let location = PositionFix {
            latitude: 4.05,
            longitude: 9.70,
            accuracy: 12.0,
            timestamp: ts,
        }
        .into_location();
        assert!(location.has_coordinates());
        assert_eq!(location.gps_timestamp, Some(ts));
    }
}
