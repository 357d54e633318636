use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use kitfusion_contracts::media::{mime_for_path, ImagePayload, DEFAULT_IMAGE_MIME};

/// Reads a user-chosen file fully into a payload. No size or type checks:
/// the MIME tag comes from the extension, then the magic bytes, then the
/// JPEG default.
pub fn load_image_file(path: &Path) -> Result<ImagePayload> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let mime = mime_for_path(path)
        .or_else(|| sniff_mime(&bytes))
        .unwrap_or(DEFAULT_IMAGE_MIME);
    log::debug!("loaded {} as {mime} ({} bytes)", path.display(), bytes.len());
    Ok(payload_from_bytes(&bytes, mime))
}

pub fn payload_from_bytes(bytes: &[u8], mime: &str) -> ImagePayload {
    ImagePayload::new(BASE64.encode(bytes), mime)
}

pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

pub fn decode_payload_bytes(payload: &ImagePayload) -> Result<Vec<u8>> {
    BASE64
        .decode(payload.data().as_bytes())
        .context("image base64 decode failed")
}

pub fn decode_payload_image(payload: &ImagePayload) -> Result<DynamicImage> {
    let bytes = decode_payload_bytes(payload)?;
    image::load_from_memory(&bytes)
        .with_context(|| format!("failed decoding {} image", payload.mime()))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .context("png encode failed")?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::{DynamicImage, Rgb, RgbImage};

    use super::{decode_payload_image, encode_png, load_image_file, sniff_mime};

    fn tiny_png() -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        encode_png(&DynamicImage::ImageRgb8(image))
    }

    #[test]
    fn extension_decides_mime_before_sniffing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("kit.jpg");
        fs::write(&path, tiny_png()?)?;
        let payload = load_image_file(&path)?;
        assert_eq!(payload.mime(), "image/jpeg");
        Ok(())
    }

    #[test]
    fn unknown_extension_is_sniffed() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("capture.bin");
        fs::write(&path, tiny_png()?)?;
        let payload = load_image_file(&path)?;
        assert_eq!(payload.mime(), "image/png");
        let decoded = decode_payload_image(&payload)?;
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        Ok(())
    }

    #[test]
    fn unrecognized_bytes_fall_back_to_jpeg_tag() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("mystery");
        fs::write(&path, b"not an image")?;
        assert_eq!(sniff_mime(b"not an image"), None);
        assert_eq!(load_image_file(&path)?.mime(), "image/jpeg");
        Ok(())
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_image_file(std::path::Path::new("/nonexistent/player.png"))
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("/nonexistent/player.png"));
    }
}
