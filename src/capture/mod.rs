pub mod camera;
pub mod location;
pub mod traits;
pub mod types;

pub use camera::{CameraSession, CameraState};
pub use location::LocationCapture;
pub use traits::{CameraDevice, Geolocator, MediaStream};
pub use types::{
    CameraError, CapturedEvidence, FacingMode, FrameSnapshot, LocationError, PositionFix,
    PositionOptions, PreviewHandle, RawFrame, ReadyState, StreamConstraints,
};
