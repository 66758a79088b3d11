use super::{CameraDevice, CameraHost, ResolutionOption, Rotation};
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Buffer, Camera};

/// Open webcam stream
pub struct NokhwaStream {
    camera: Camera,
    /// Frame read by the last successful `has_new_frame`, not yet decoded
    latest: Option<Buffer>,
}

/// Camera host backed by the platform webcam API
///
/// Desktop webcams report no facing or rotation, so every device is listed
/// as rear-facing and frames are always upright.
#[derive(Default)]
pub struct NokhwaHost {
    /// Device id to platform index
    indices: Vec<(String, CameraIndex)>,
}

impl NokhwaHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, device: &CameraDevice) -> Result<CameraIndex> {
        self.indices
            .iter()
            .find(|(id, _)| *id == device.id)
            .map(|(_, index)| index.clone())
            .with_context(|| format!("Unknown camera {} (id {})", device.name, device.id))
    }

    fn query_resolutions(index: &CameraIndex) -> Result<Vec<ResolutionOption>> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(index.clone(), requested).context("Failed to open camera")?;

        let resolutions: Vec<ResolutionOption> = camera
            .compatible_camera_formats()
            .context("Failed to query camera formats")?
            .into_iter()
            .map(|format| {
                let resolution = format.resolution();
                ResolutionOption::new(resolution.width(), resolution.height(), format.frame_rate())
            })
            .collect();

        Ok(largest_first(resolutions))
    }
}

/// Same size is offered once per pixel format; keep one entry, largest first
fn largest_first(mut resolutions: Vec<ResolutionOption>) -> Vec<ResolutionOption> {
    // Full key so equal modes end up adjacent for dedup
    resolutions.sort_by_key(|r| {
        std::cmp::Reverse((
            u64::from(r.width) * u64::from(r.height),
            r.width,
            r.height,
            r.refresh_rate,
        ))
    });
    resolutions.dedup();
    resolutions
}

impl CameraHost for NokhwaHost {
    type Stream = NokhwaStream;

    fn list_devices(&mut self) -> Result<Vec<CameraDevice>> {
        let cameras = nokhwa::query(ApiBackend::Auto).context("Failed to query cameras")?;

        self.indices.clear();
        let mut devices = Vec::with_capacity(cameras.len());
        for info in cameras {
            let name = info.human_name();
            let resolutions = match Self::query_resolutions(info.index()) {
                Ok(resolutions) => resolutions,
                Err(e) => {
                    tracing::warn!("Skipping formats of {}: {:#}", name, e);
                    Vec::new()
                }
            };

            let id = info.index().to_string();
            self.indices.push((id.clone(), info.index().clone()));
            devices.push(CameraDevice::new(name, false, resolutions).with_id(id));
        }

        Ok(devices)
    }

    fn open_stream(
        &mut self,
        device: &CameraDevice,
        resolution: &ResolutionOption,
    ) -> Result<NokhwaStream> {
        tracing::info!("Initializing webcam {} at {}", device.name, resolution);

        let index = self.index_of(device)?;
        let format = CameraFormat::new(
            Resolution::new(resolution.width, resolution.height),
            FrameFormat::MJPEG,
            resolution.refresh_rate,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;
        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let actual = camera.resolution();
        tracing::info!(
            "Webcam streaming at {}x{}",
            actual.width(),
            actual.height()
        );

        Ok(NokhwaStream {
            camera,
            latest: None,
        })
    }

    fn close_stream(&mut self, mut stream: NokhwaStream) {
        if let Err(e) = stream.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", e);
        }
    }

    fn rotation(&self, _stream: &NokhwaStream) -> Rotation {
        Rotation::Deg0
    }

    fn negotiated_resolution(&self, stream: &NokhwaStream) -> Option<ResolutionOption> {
        let actual = stream.camera.resolution();
        Some(ResolutionOption::new(
            actual.width(),
            actual.height(),
            stream.camera.frame_rate(),
        ))
    }

    fn has_new_frame(&mut self, stream: &mut NokhwaStream) -> bool {
        if !stream.camera.is_stream_open() {
            return false;
        }
        keep_frame(&mut stream.latest, stream.camera.frame())
    }

    fn pixels(&mut self, stream: &mut NokhwaStream) -> Option<RgbImage> {
        let frame = stream.latest.as_ref()?;

        match frame.decode_image::<RgbFormat>() {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!("Failed to decode frame: {}", e);
                None
            }
        }
    }
}

/// Store a freshly read frame. A failed read leaves the cached one alone
/// and reports no new frame.
fn keep_frame<T, E: std::fmt::Display>(latest: &mut Option<T>, read: Result<T, E>) -> bool {
    match read {
        Ok(frame) => {
            *latest = Some(frame);
            true
        }
        Err(e) => {
            tracing::debug!("Failed to capture frame: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_largest_first_drops_repeated_modes() {
        let res = |w, h, r| ResolutionOption::new(w, h, r);
        // 1280x720 and 720x1280 share an area and interleave with other modes
        let sorted = largest_first(vec![
            res(1280, 720, 30),
            res(720, 1280, 30),
            res(1280, 720, 30),
            res(640, 480, 30),
            res(720, 1280, 30),
            res(1280, 720, 60),
        ]);
        assert_eq!(
            sorted,
            vec![
                res(1280, 720, 60),
                res(1280, 720, 30),
                res(720, 1280, 30),
                res(640, 480, 30),
            ]
        );
    }

    #[test]
    fn test_failed_read_is_not_a_new_frame() {
        let mut latest = None;
        assert!(keep_frame::<u32, &str>(&mut latest, Ok(1)));
        assert_eq!(latest, Some(1));

        assert!(!keep_frame::<u32, &str>(&mut latest, Err("timeout")));
        assert_eq!(latest, Some(1));

        assert!(keep_frame::<u32, &str>(&mut latest, Ok(2)));
        assert_eq!(latest, Some(2));
    }

    #[test]
    fn test_same_named_devices_resolve_by_id() {
        let host = NokhwaHost {
            indices: vec![
                ("0".to_string(), CameraIndex::Index(0)),
                ("1".to_string(), CameraIndex::Index(1)),
            ],
        };
        let first = CameraDevice::new("USB Camera", false, vec![]).with_id("0");
        let second = CameraDevice::new("USB Camera", false, vec![]).with_id("1");

        assert_eq!(host.index_of(&first).unwrap(), CameraIndex::Index(0));
        assert_eq!(host.index_of(&second).unwrap(), CameraIndex::Index(1));
        assert!(host
            .index_of(&CameraDevice::new("USB Camera", false, vec![]))
            .is_err());
    }
}
