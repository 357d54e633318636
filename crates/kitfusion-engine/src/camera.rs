use std::thread;
use std::time::{Duration, Instant};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use kitfusion_contracts::errors::CaptureFailure;
use kitfusion_contracts::media::{ImagePayload, DEFAULT_IMAGE_MIME};

use crate::media::payload_from_bytes;

const CAPTURE_JPEG_QUALITY: u8 = 90;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A live video stream owned by exactly one `CameraSession`.
pub trait VideoStream {
    /// True once a frame can be decoded.
    fn is_ready(&mut self) -> bool;
    fn read_frame(&mut self) -> Result<RgbImage, CaptureFailure>;
    /// Releases every underlying device track. Must tolerate repeated calls.
    fn stop(&mut self);
    fn is_stopped(&self) -> bool;
}

pub trait CameraBackend {
    fn name(&self) -> &str;
    fn start(&self) -> Result<Box<dyn VideoStream>, CaptureFailure>;
}

/// Scoped owner of a live camera stream. The stream is released on capture,
/// on `stop`, and when the session is dropped, whichever comes first.
pub struct CameraSession {
    backend: String,
    stream: Option<Box<dyn VideoStream>>,
}

impl CameraSession {
    pub fn open(backend: &dyn CameraBackend) -> Result<Self, CaptureFailure> {
        let stream = backend.start().map_err(|failure| {
            log::warn!("camera start failed on {}: {}", backend.name(), failure.kind());
            failure
        })?;
        log::debug!("camera stream opened ({})", backend.name());
        Ok(Self {
            backend: backend.name().to_string(),
            stream: Some(stream),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn is_ready(&mut self) -> bool {
        self.stream
            .as_mut()
            .map(|stream| stream.is_ready())
            .unwrap_or(false)
    }

    /// Polls readiness until `timeout` elapses. Returns the final readiness.
    pub fn wait_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_ready() {
                return true;
            }
            if self.is_released() || Instant::now() >= deadline {
                return false;
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    /// Grabs the current frame as a JPEG still and releases the stream.
    /// `Ok(None)` means the stream is not ready (or already released) and
    /// nothing changed. A failed frame read leaves the stream live.
    pub fn capture(&mut self) -> Result<Option<ImagePayload>, CaptureFailure> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        if !stream.is_ready() {
            return Ok(None);
        }
        let frame = stream.read_frame()?;
        let bytes = encode_jpeg(frame)?;
        self.stop();
        Ok(Some(payload_from_bytes(&bytes, DEFAULT_IMAGE_MIME)))
    }

    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::debug!("camera stream released ({})", self.backend);
        }
    }

    pub fn is_released(&self) -> bool {
        self.stream
            .as_ref()
            .map(|stream| stream.is_stopped())
            .unwrap_or(true)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn encode_jpeg(frame: RgbImage) -> Result<Vec<u8>, CaptureFailure> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, CAPTURE_JPEG_QUALITY)
        .encode_image(&DynamicImage::ImageRgb8(frame))
        .map_err(|err| CaptureFailure::unknown(format!("frame encode failed: {err}")))?;
    Ok(bytes)
}

/// Backend used when the binary is built without device support.
pub struct UnavailableBackend;

impl CameraBackend for UnavailableBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn start(&self) -> Result<Box<dyn VideoStream>, CaptureFailure> {
        Err(CaptureFailure::device_not_found())
    }
}

#[cfg(feature = "camera")]
pub use device::NokhwaBackend;

pub fn default_camera_backend(device_index: u32) -> Box<dyn CameraBackend> {
    #[cfg(feature = "camera")]
    {
        Box::new(NokhwaBackend::new(device_index))
    }
    #[cfg(not(feature = "camera"))]
    {
        let _ = device_index;
        Box::new(UnavailableBackend)
    }
}

#[cfg(feature = "camera")]
mod device {
    use image::RgbImage;
    use kitfusion_contracts::errors::CaptureFailure;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use nokhwa::Camera;

    use super::{CameraBackend, VideoStream};

    pub struct NokhwaBackend {
        index: u32,
    }

    impl NokhwaBackend {
        pub fn new(index: u32) -> Self {
            Self { index }
        }
    }

    impl CameraBackend for NokhwaBackend {
        fn name(&self) -> &str {
            "nokhwa"
        }

        fn start(&self) -> Result<Box<dyn VideoStream>, CaptureFailure> {
            let format =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = Camera::new(CameraIndex::Index(self.index), format)
                .map_err(|err| CaptureFailure::classify(&err.to_string()))?;
            camera
                .open_stream()
                .map_err(|err| CaptureFailure::classify(&err.to_string()))?;
            Ok(Box::new(NokhwaStream {
                camera,
                stopped: false,
            }))
        }
    }

    struct NokhwaStream {
        camera: Camera,
        stopped: bool,
    }

    impl VideoStream for NokhwaStream {
        fn is_ready(&mut self) -> bool {
            !self.stopped && self.camera.is_stream_open()
        }

        fn read_frame(&mut self) -> Result<RgbImage, CaptureFailure> {
            let buffer = self
                .camera
                .frame()
                .map_err(|err| CaptureFailure::classify(&err.to_string()))?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(|err| CaptureFailure::unknown(err.to_string()))?;
            let (width, height) = (decoded.width(), decoded.height());
            RgbImage::from_raw(width, height, decoded.into_raw())
                .ok_or_else(|| CaptureFailure::unknown("camera frame size mismatch"))
        }

        fn stop(&mut self) {
            if self.stopped {
                return;
            }
            if let Err(err) = self.camera.stop_stream() {
                log::warn!("camera stop_stream failed: {err}");
            }
            self.stopped = true;
        }

        fn is_stopped(&self) -> bool {
            self.stopped
        }
    }
}
