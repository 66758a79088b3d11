//! Lifecycle of the single active camera stream

use super::catalog::DeviceCatalog;
use super::{CameraDevice, CameraHost, ResolutionOption, Rotation};
use crate::config::Selection;
use crate::error::SessionError;
use crate::lifecycle::{LifecycleBridge, SleepTimeout};
use image::RgbImage;

/// A bound device/resolution pair with its open stream
#[derive(Debug)]
pub struct ActiveStream<S> {
    pub device: CameraDevice,
    pub resolution: ResolutionOption,
    pub rotation: Rotation,
    stream: S,
}

/// Session state. Rotation, resolution and the frame buffer only exist while `Active`.
#[derive(Debug)]
pub enum SessionState<S> {
    Idle,
    Active(ActiveStream<S>),
}

/// A session that has been constructed but has not touched the camera yet
///
/// The host camera subsystem may still be starting up when the owner is
/// created, so device selection is deferred to [`activate_after_warmup`],
/// which the owner calls after skipping one display tick.
///
/// [`activate_after_warmup`]: PendingSession::activate_after_warmup
pub struct PendingSession<H: CameraHost> {
    host: H,
    lifecycle: Option<Box<dyn LifecycleBridge>>,
}

impl<H: CameraHost> PendingSession<H> {
    /// Apply lifecycle settings and bind a device according to `selection`
    pub fn activate_after_warmup(
        self,
        selection: Selection,
        target_framerate: Option<u32>,
    ) -> CaptureSession<H> {
        let mut session = CaptureSession {
            host: self.host,
            lifecycle: self.lifecycle,
            state: SessionState::Idle,
        };

        if let Some(bridge) = session.lifecycle.as_mut() {
            bridge.set_screen_sleep(SleepTimeout::Never);
            bridge.set_target_framerate(target_framerate);
        }

        match selection {
            Selection::Auto => session.auto_select(),
            Selection::Explicit { camera, resolution } => {
                if let Err(e) = session.select_from_catalog(camera, resolution) {
                    tracing::error!("Camera selection failed: {}", e);
                }
            }
        }

        session
    }
}

/// Owner of the camera stream
///
/// Only this type starts or stops streams on the host. Other components
/// read the published device, resolution and rotation.
pub struct CaptureSession<H: CameraHost> {
    host: H,
    lifecycle: Option<Box<dyn LifecycleBridge>>,
    state: SessionState<H::Stream>,
}

impl<H: CameraHost> CaptureSession<H> {
    /// First phase of start-up. Nothing is selected until
    /// [`PendingSession::activate_after_warmup`] runs.
    pub fn construct(host: H, lifecycle: Option<Box<dyn LifecycleBridge>>) -> PendingSession<H> {
        PendingSession { host, lifecycle }
    }

    /// Bind `device` at `resolution_index`, tearing down any active stream first
    pub fn select_device(
        &mut self,
        device: &CameraDevice,
        resolution_index: usize,
    ) -> Result<(), SessionError> {
        let resolution = *device.resolutions.get(resolution_index).ok_or(
            SessionError::ResolutionIndexOutOfRange {
                index: resolution_index,
                available: device.resolutions.len(),
            },
        )?;

        self.deselect();

        let stream = self
            .host
            .open_stream(device, &resolution)
            .map_err(SessionError::StreamOpen)?;
        let rotation = self.host.rotation(&stream);

        let resolution = match self.host.negotiated_resolution(&stream) {
            Some(actual) if actual != resolution => {
                tracing::warn!("Camera {} asked for {}, running at {}", device, resolution, actual);
                actual
            }
            _ => resolution,
        };

        tracing::info!("Camera {} active at {}", device, resolution);

        self.state = SessionState::Active(ActiveStream {
            device: device.clone(),
            resolution,
            rotation,
            stream,
        });

        Ok(())
    }

    /// Stop the stream and release its buffer. No-op while idle.
    pub fn deselect(&mut self) {
        if let SessionState::Active(active) = std::mem::replace(&mut self.state, SessionState::Idle) {
            tracing::info!("Releasing camera {}", active.device);
            self.host.close_stream(active.stream);
        }
    }

    /// Bind the first rear-facing device at resolution 0, if there is one
    pub fn auto_select(&mut self) {
        let devices = DeviceCatalog::enumerate(&mut self.host);
        let Some(device) = DeviceCatalog::first_rear_facing(&devices) else {
            tracing::info!("No rear-facing camera found, staying idle");
            return;
        };

        if let Err(e) = self.select_device(device, 0) {
            tracing::warn!("Auto-select of {} failed: {}", device, e);
        }
    }

    /// Bind catalog entry `camera` at `resolution`
    pub fn select_from_catalog(
        &mut self,
        camera: usize,
        resolution: usize,
    ) -> Result<(), SessionError> {
        let devices = DeviceCatalog::enumerate(&mut self.host);
        let device = DeviceCatalog::pick(&devices, camera, resolution)?;
        self.select_device(device, resolution)
    }

    pub fn state(&self) -> &SessionState<H::Stream> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn current_device(&self) -> Option<&CameraDevice> {
        match &self.state {
            SessionState::Active(active) => Some(&active.device),
            SessionState::Idle => None,
        }
    }

    pub fn current_rotation(&self) -> Result<Rotation, SessionError> {
        match &self.state {
            SessionState::Active(active) => Ok(active.rotation),
            SessionState::Idle => Err(SessionError::NotActive),
        }
    }

    pub fn current_resolution(&self) -> Result<ResolutionOption, SessionError> {
        match &self.state {
            SessionState::Active(active) => Ok(active.resolution),
            SessionState::Idle => Err(SessionError::NotActive),
        }
    }

    /// Read this tick's rotation from the host and publish it
    pub fn refresh_rotation(&mut self) -> Option<Rotation> {
        match &mut self.state {
            SessionState::Active(active) => {
                active.rotation = self.host.rotation(&active.stream);
                Some(active.rotation)
            }
            SessionState::Idle => None,
        }
    }

    pub fn has_new_frame(&mut self) -> bool {
        match &mut self.state {
            SessionState::Active(active) => self.host.has_new_frame(&mut active.stream),
            SessionState::Idle => false,
        }
    }

    /// Copy of the latest frame. Empty buffers come back as `None`.
    pub fn snapshot(&mut self) -> Option<RgbImage> {
        let SessionState::Active(active) = &mut self.state else {
            return None;
        };

        self.host
            .pixels(&mut active.stream)
            .filter(|frame| frame.width() > 0 && frame.height() > 0)
    }

    pub fn lifecycle_mut(&mut self) -> Option<&mut (dyn LifecycleBridge + 'static)> {
        self.lifecycle.as_deref_mut()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: CameraHost> Drop for CaptureSession<H> {
    fn drop(&mut self) {
        self.deselect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ScriptedHost;
    use crate::lifecycle::RecordingBridge;

    fn rear(resolutions: Vec<ResolutionOption>) -> CameraDevice {
        CameraDevice::new("rear", false, resolutions)
    }

    fn front() -> CameraDevice {
        CameraDevice::new("front", true, vec![ResolutionOption::new(640, 480, 30)])
    }

    fn activate(host: ScriptedHost) -> CaptureSession<ScriptedHost> {
        CaptureSession::construct(host, None).activate_after_warmup(Selection::Auto, None)
    }

    #[test]
    fn test_auto_select_skips_front_facing() {
        let hd = ResolutionOption::new(1920, 1080, 30);
        let session = activate(ScriptedHost::new(vec![front(), rear(vec![hd])]));

        assert!(session.is_active());
        assert_eq!(session.current_device().unwrap().name, "rear");
        assert_eq!(session.current_resolution().unwrap(), hd);
        assert_eq!(session.host().opened(), 1);
    }

    #[test]
    fn test_empty_catalog_stays_idle() {
        let session = activate(ScriptedHost::new(vec![]));
        assert!(!session.is_active());
        assert_eq!(session.host().opened(), 0);
    }

    #[test]
    fn test_unavailable_catalog_stays_idle() {
        let session = activate(ScriptedHost::unavailable());
        assert!(!session.is_active());
    }

    #[test]
    fn test_only_front_facing_stays_idle() {
        let session = activate(ScriptedHost::new(vec![front()]));
        assert!(!session.is_active());
    }

    #[test]
    fn test_accessors_fail_while_idle() {
        let session = activate(ScriptedHost::new(vec![]));
        assert!(matches!(session.current_rotation(), Err(SessionError::NotActive)));
        assert!(matches!(session.current_resolution(), Err(SessionError::NotActive)));
    }

    #[test]
    fn test_reselect_releases_previous_stream_once() {
        let device = rear(vec![
            ResolutionOption::new(1920, 1080, 30),
            ResolutionOption::new(1280, 720, 30),
        ]);
        let mut session = activate(ScriptedHost::new(vec![device.clone()]));
        let first = session.host().live_streams().to_vec();

        session.select_device(&device, 1).unwrap();

        assert_eq!(session.host().opened(), 2);
        assert_eq!(session.host().closed(), 1);
        assert_eq!(session.host().live_streams().len(), 1);
        assert_ne!(session.host().live_streams(), first.as_slice());
        // Old stream closed before the new one opened
        assert_eq!(session.host().peak_live_streams(), 1);
        assert_eq!(session.current_resolution().unwrap().width, 1280);
    }

    #[test]
    fn test_negotiated_resolution_is_published() {
        let device = rear(vec![ResolutionOption::new(1920, 1080, 30)]);
        let mut host = ScriptedHost::new(vec![device]);
        host.set_negotiated(Some(ResolutionOption::new(1280, 720, 30)));
        let session = activate(host);

        assert_eq!(
            session.current_resolution().unwrap(),
            ResolutionOption::new(1280, 720, 30)
        );
    }

    #[test]
    fn test_out_of_range_resolution_keeps_current_stream() {
        let device = rear(vec![ResolutionOption::new(1920, 1080, 30)]);
        let mut session = activate(ScriptedHost::new(vec![device.clone()]));

        let err = session.select_device(&device, 3).unwrap_err();
        assert!(matches!(
            err,
            SessionError::ResolutionIndexOutOfRange { index: 3, available: 1 }
        ));
        assert!(session.is_active());
        assert_eq!(session.host().closed(), 0);
    }

    #[test]
    fn test_deselect_is_idempotent() {
        let mut session = activate(ScriptedHost::new(vec![rear(vec![ResolutionOption::new(
            640, 480, 30,
        )])]));

        session.deselect();
        session.deselect();

        assert!(!session.is_active());
        assert_eq!(session.host().closed(), 1);
        assert!(session.host().live_streams().is_empty());
    }

    #[test]
    fn test_deselect_right_after_select() {
        let device = rear(vec![ResolutionOption::new(640, 480, 30)]);
        let mut session = activate(ScriptedHost::new(vec![]));

        session.select_device(&device, 0).unwrap();
        session.deselect();
        assert!(session.snapshot().is_none());

        session.select_device(&device, 0).unwrap();
        assert_eq!(session.host().opened(), 2);
        assert_eq!(session.host().closed(), 1);
    }

    #[test]
    fn test_failed_open_leaves_idle() {
        let device = rear(vec![ResolutionOption::new(640, 480, 30)]);
        let mut session = activate(ScriptedHost::new(vec![device.clone()]));
        session.host_mut().set_fail_open(true);

        let err = session.select_device(&device, 0).unwrap_err();
        assert!(matches!(err, SessionError::StreamOpen(_)));
        assert!(!session.is_active());
        assert!(session.host().live_streams().is_empty());
    }

    #[test]
    fn test_rotation_follows_host() {
        let mut session = activate(ScriptedHost::new(vec![rear(vec![ResolutionOption::new(
            1280, 720, 30,
        )])]));
        assert_eq!(session.current_rotation().unwrap(), Rotation::Deg0);

        session.host_mut().set_rotation(Rotation::Deg90);
        assert_eq!(session.refresh_rotation(), Some(Rotation::Deg90));
        assert_eq!(session.current_rotation().unwrap(), Rotation::Deg90);
    }

    #[test]
    fn test_snapshot_filters_empty_buffer() {
        let mut session = activate(ScriptedHost::new(vec![rear(vec![ResolutionOption::new(
            640, 480, 30,
        )])]));
        assert!(session.snapshot().is_none());

        session.host_mut().push_frame(RgbImage::new(0, 0));
        assert!(session.snapshot().is_none());

        session.host_mut().push_frame(RgbImage::new(4, 4));
        assert_eq!(session.snapshot().unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_explicit_selection() {
        let hd = ResolutionOption::new(1920, 1080, 30);
        let session = CaptureSession::construct(ScriptedHost::new(vec![front(), rear(vec![hd])]), None)
            .activate_after_warmup(Selection::Explicit { camera: 0, resolution: 0 }, None);

        assert_eq!(session.current_device().unwrap().name, "front");
    }

    #[test]
    fn test_invalid_explicit_selection_stays_idle() {
        let session = CaptureSession::construct(ScriptedHost::new(vec![front()]), None)
            .activate_after_warmup(Selection::Explicit { camera: 5, resolution: 0 }, None);

        assert!(!session.is_active());
    }

    #[test]
    fn test_lifecycle_settings_applied_on_activation() {
        let bridge = RecordingBridge::new();
        let _session = CaptureSession::construct(ScriptedHost::new(vec![]), Some(Box::new(bridge.clone())))
            .activate_after_warmup(Selection::Auto, Some(60));

        assert_eq!(bridge.screen_sleep(), Some(SleepTimeout::Never));
        assert_eq!(bridge.target_framerate(), Some(Some(60)));
    }
}
