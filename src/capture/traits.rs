use crate::capture::types::{
    CameraError, LocationError, PositionFix, PositionOptions, RawFrame, ReadyState,
    StreamConstraints,
};
use async_trait::async_trait;

/// Device geolocation capability.
/// Hosts without one pass `None` to `LocationCapture` instead.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Request a single position fix
    async fn current_position(&self, options: &PositionOptions) -> Result<PositionFix, LocationError>;
}

/// Device camera capability
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Acquire a live video stream
    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live video stream acquired from a camera
#[async_trait]
pub trait MediaStream: Send {
    /// Resolve once the stream has reported its frame metadata
    async fn loaded_metadata(&mut self) -> Result<(), CameraError>;

    fn ready_state(&self) -> ReadyState;

    /// Native frame dimensions, (0, 0) until metadata is known
    fn frame_size(&self) -> (u32, u32);

    /// Render the current frame at native resolution
    async fn draw_frame(&mut self) -> Result<RawFrame, CameraError>;

    /// Stop every track; must not block
    fn stop_tracks(&mut self);

    fn live_tracks(&self) -> usize;
}
