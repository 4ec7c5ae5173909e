use crate::capture::traits::{CameraDevice, MediaStream};
use crate::capture::types::{
    CameraError, CapturedEvidence, FrameSnapshot, PreviewHandle, RawFrame, ReadyState,
    StreamConstraints,
};
use crate::models::MediaFile;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbaImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const JPEG_QUALITY: u8 = 95;
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum CameraState {
    Closed,
    Opening,
    Live,
    Capturing,
    Error(CameraError),
}

/// One camera capture session.
///
/// The session is the only owner of its stream. Presentation code reads
/// `snapshot()`; it never gets the stream itself. Dropping the session
/// stops the stream.
pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    constraints: StreamConstraints,
    stream: Option<Box<dyn MediaStream>>,
    state: CameraState,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self::with_constraints(device, StreamConstraints::default())
    }

    pub fn with_constraints(device: Arc<dyn CameraDevice>, constraints: StreamConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
            state: CameraState::Closed,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == CameraState::Live
    }

    pub fn error(&self) -> Option<&CameraError> {
        match &self.state {
            CameraState::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Tracks still running on the held stream
    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.live_tracks())
    }

    /// Current frame shape for display, if a stream is held
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.stream.as_ref().map(|s| {
            let (width, height) = s.frame_size();
            FrameSnapshot {
                width,
                height,
                ready_state: s.ready_state(),
            }
        })
    }

    /// Acquire the back camera.
    ///
    /// Any stream already held is closed first. The session becomes `Live`
    /// only once the stream reports non-zero frame dimensions; on failure
    /// whatever was acquired is stopped and the error is kept in the state.
    pub async fn open_camera(&mut self) -> Result<(), CameraError> {
        if self.stream.is_some() {
            debug!("Camera already open, closing previous stream first");
            self.close_camera();
        }

        self.state = CameraState::Opening;
        info!(
            "📷 Opening camera ({}x{} requested)",
            self.constraints.ideal_width, self.constraints.ideal_height
        );

        let stream = match self.device.open_stream(&self.constraints).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e)),
        };
        // held by the session while opening so close and drop can reach it
        let stream = self.stream.insert(stream);

        let metadata = match tokio::time::timeout(METADATA_TIMEOUT, stream.loaded_metadata()).await {
            Ok(result) => result,
            Err(_) => Err(CameraError::Other(
                "camera did not report frame metadata in time".to_string(),
            )),
        };
        let (width, height) = stream.frame_size();

        if let Err(e) = metadata {
            return Err(self.fail(e));
        }
        if width == 0 || height == 0 {
            return Err(self.fail(CameraError::Other(
                "camera reported empty frame dimensions".to_string(),
            )));
        }

        info!("Camera live at {}x{}", width, height);
        self.state = CameraState::Live;
        Ok(())
    }

    /// Take a still photo from the live stream
    pub async fn capture_photo(&mut self) -> Result<CapturedEvidence, CameraError> {
        if self.state != CameraState::Live {
            return Err(CameraError::NotLive);
        }
        let stream = self.stream.as_mut().ok_or(CameraError::NotLive)?;

        let ready = stream.ready_state();
        if ready < ReadyState::HaveEnoughData {
            return Err(CameraError::NotReady(format!(
                "video is still buffering ({:?})",
                ready
            )));
        }
        let (width, height) = stream.frame_size();
        if width == 0 || height == 0 {
            return Err(CameraError::NotReady(format!(
                "video frame has no size ({}x{})",
                width, height
            )));
        }

        self.state = CameraState::Capturing;
        let frame = stream.draw_frame().await;
        let stream_ended = stream.live_tracks() == 0;

        let result = frame.and_then(|frame| {
            let captured_at = Utc::now();
            let bytes = encode_jpeg(frame)?;
            Ok(package_photo(bytes, captured_at))
        });

        if stream_ended {
            warn!("Camera stream ended during capture");
            self.release_stream();
            self.state = CameraState::Error(CameraError::Other("camera stream ended".to_string()));
        } else {
            self.state = CameraState::Live;
        }

        if let Ok(evidence) = &result {
            info!(
                "📸 Captured {} ({} bytes)",
                evidence.file.file_name, evidence.file.file_size
            );
        }
        result
    }

    /// Stop and detach any held stream. Safe to call in every state.
    pub fn close_camera(&mut self) {
        if self.release_stream() {
            info!("Camera closed");
        }
        self.state = CameraState::Closed;
    }

    fn release_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop_tracks();
                true
            }
            None => false,
        }
    }

    fn fail(&mut self, error: CameraError) -> CameraError {
        warn!("Camera failed to open: {}", error);
        self.release_stream();
        self.state = CameraState::Error(error.clone());
        error
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release_stream();
    }
}

/// Encode a frame as JPEG without rescaling
fn encode_jpeg(frame: RawFrame) -> Result<Vec<u8>, CameraError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.rgba.len() != expected {
        return Err(CameraError::Encoding(format!(
            "frame buffer holds {} bytes, expected {} for {}x{}",
            frame.rgba.len(),
            expected,
            frame.width,
            frame.height
        )));
    }

    let (width, height) = (frame.width, frame.height);
    let rgba = RgbaImage::from_raw(width, height, frame.rgba)
        .ok_or_else(|| CameraError::Encoding("invalid frame buffer".to_string()))?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode(rgb.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| CameraError::Encoding(e.to_string()))?;
    Ok(bytes)
}

fn package_photo(bytes: Vec<u8>, captured_at: DateTime<Utc>) -> CapturedEvidence {
    let preview = PreviewHandle::new(&bytes);
    let mut file = MediaFile::new(photo_file_name(captured_at), "image/jpeg", bytes);
    file.captured_at = Some(captured_at);
    CapturedEvidence {
        file,
        preview,
        captured_at,
    }
}

/// `property-photo-2026-03-01T08-15-00-123Z.jpg`
pub fn photo_file_name(captured_at: DateTime<Utc>) -> String {
    format!(
        "property-photo-{}.jpg",
        captured_at.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}
