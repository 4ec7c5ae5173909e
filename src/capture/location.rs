use crate::capture::traits::Geolocator;
use crate::capture::types::{LocationError, PositionFix, PositionOptions};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One-shot GPS capture for a submission form.
///
/// Holds the latest fix and the latest error. Failures never escape:
/// `capture_location` returns `None` and the error is kept for display.
pub struct LocationCapture {
    geolocator: Option<Arc<dyn Geolocator>>,
    options: PositionOptions,
    fix: Option<PositionFix>,
    error: Option<LocationError>,
    loading: bool,
    auto_attempted: bool,
}

impl LocationCapture {
    /// Create a capture context; `None` means the device has no geolocation
    pub fn new(geolocator: Option<Arc<dyn Geolocator>>) -> Self {
        Self::with_options(geolocator, PositionOptions::default())
    }

    pub fn with_options(geolocator: Option<Arc<dyn Geolocator>>, options: PositionOptions) -> Self {
        Self {
            geolocator,
            options,
            fix: None,
            error: None,
            loading: false,
            auto_attempted: false,
        }
    }

    /// Capture once automatically if nothing is held yet.
    ///
    /// Only the first call per context may hit the device; later calls
    /// return whatever is held.
    pub async fn ensure_captured(&mut self) -> Option<PositionFix> {
        if self.fix.is_some() || self.auto_attempted {
            return self.fix.clone();
        }
        self.auto_attempted = true;
        self.capture_location().await
    }

    /// Request a fresh fix, replacing the held one on success
    pub async fn capture_location(&mut self) -> Option<PositionFix> {
        let geolocator = match &self.geolocator {
            Some(g) => Arc::clone(g),
            None => {
                warn!("Geolocation requested on a device without support");
                self.error = Some(LocationError::Unsupported);
                return None;
            }
        };

        self.loading = true;
        self.error = None;
        debug!(
            "Requesting position fix (high accuracy: {}, timeout: {:?})",
            self.options.enable_high_accuracy, self.options.timeout
        );

        let outcome = match tokio::time::timeout(
            self.options.timeout,
            geolocator.current_position(&self.options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        };
        self.loading = false;

        match outcome {
            Ok(fix) => {
                info!(
                    "📍 Location captured: {:.6}, {:.6} (±{:.0} m)",
                    fix.latitude, fix.longitude, fix.accuracy
                );
                self.fix = Some(fix.clone());
                Some(fix)
            }
            Err(e) => {
                warn!("Location capture failed: {}", e);
                self.error = Some(e);
                None
            }
        }
    }

    pub fn location(&self) -> Option<&PositionFix> {
        self.fix.as_ref()
    }

    pub fn error(&self) -> Option<&LocationError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(LocationError::user_message)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_supported(&self) -> bool {
        self.geolocator.is_some()
    }

    pub fn clear(&mut self) {
        self.fix = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedGeolocator {
        responses: Mutex<VecDeque<Result<PositionFix, LocationError>>>,
        calls: AtomicUsize,
        seen_options: Mutex<Vec<PositionOptions>>,
    }

    impl ScriptedGeolocator {
        fn new(responses: Vec<Result<PositionFix, LocationError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                seen_options: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Geolocator for ScriptedGeolocator {
        async fn current_position(&self, options: &PositionOptions) -> Result<PositionFix, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_options.lock().unwrap().push(options.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LocationError::Unknown("no scripted response".into())))
        }
    }

    struct HangingGeolocator;

    #[async_trait]
    impl Geolocator for HangingGeolocator {
        async fn current_position(&self, _options: &PositionOptions) -> Result<PositionFix, LocationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(LocationError::Unknown("unreachable".into()))
        }
    }

    fn fix(lat: f64, lng: f64, ts: &str) -> PositionFix {
        PositionFix {
            latitude: lat,
            longitude: lng,
            accuracy: 8.0,
            timestamp: ts.parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[tokio::test]
    async fn unsupported_device_returns_none_with_diagnostic() {
        let mut capture = LocationCapture::new(None);
        assert!(capture.capture_location().await.is_none());
        assert_eq!(capture.error(), Some(&LocationError::Unsupported));
        assert!(capture.error_message().unwrap().contains("not supported"));
    }

    #[tokio::test]
    async fn success_keeps_device_fix_timestamp() {
        let device = ScriptedGeolocator::new(vec![Ok(fix(4.05, 9.70, "2026-05-01T09:00:00Z"))]);
        let mut capture = LocationCapture::new(Some(device.clone()));

        let got = capture.capture_location().await.unwrap();
        assert_eq!(got.timestamp.to_rfc3339(), "2026-05-01T09:00:00+00:00");
        assert!(capture.error().is_none());
        assert!(!capture.is_loading());

        let opts = device.seen_options.lock().unwrap()[0].clone();
        assert!(opts.enable_high_accuracy);
        assert_eq!(opts.maximum_age, Duration::ZERO);
    }

    #[tokio::test]
    async fn failures_are_classified_and_not_retried() {
        let device = ScriptedGeolocator::new(vec![Err(LocationError::PermissionDenied)]);
        let mut capture = LocationCapture::new(Some(device.clone()));

        assert!(capture.capture_location().await.is_none());
        assert_eq!(capture.error(), Some(&LocationError::PermissionDenied));
        assert_eq!(device.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_device_times_out() {
        let mut capture = LocationCapture::new(Some(Arc::new(HangingGeolocator)));
        assert!(capture.capture_location().await.is_none());
        assert_eq!(capture.error(), Some(&LocationError::Timeout));
    }

    #[tokio::test]
    async fn auto_capture_runs_once_and_manual_recapture_supersedes() {
        let device = ScriptedGeolocator::new(vec![
            Err(LocationError::PositionUnavailable),
            Ok(fix(4.05, 9.70, "2026-05-01T09:00:00Z")),
            Ok(fix(4.06, 9.71, "2026-05-01T09:05:00Z")),
        ]);
        let mut capture = LocationCapture::new(Some(device.clone()));

        assert!(capture.ensure_captured().await.is_none());
        assert!(capture.ensure_captured().await.is_none());
        assert_eq!(device.calls.load(Ordering::SeqCst), 1);

        capture.capture_location().await.unwrap();
        let latest = capture.capture_location().await.unwrap();
        assert_eq!(latest.latitude, 4.06);
        assert_eq!(capture.location().unwrap().latitude, 4.06);
        assert_eq!(device.calls.load(Ordering::SeqCst), 3);
    }
}
