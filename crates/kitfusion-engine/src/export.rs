use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use kitfusion_contracts::media::ImagePayload;
use kitfusion_contracts::presets::FilterPreset;

use crate::filters::apply_filter;
use crate::media::{decode_payload_image, encode_png};

pub const EXPORT_FILE_PREFIX: &str = "jersey-fusion";

pub fn export_file_name(filter: &FilterPreset) -> String {
    format!("{EXPORT_FILE_PREFIX}-{}.png", filter.slug())
}

/// Rasterizes the result at native resolution with the filter baked in.
/// The result payload itself is never modified.
pub fn render_export_png(result: &ImagePayload, filter: &FilterPreset) -> Result<Vec<u8>> {
    let image = decode_payload_image(result)?.to_rgba8();
    let filtered = apply_filter(&image, filter);
    encode_png(&DynamicImage::ImageRgba8(filtered))
}

pub fn export_result(
    result: &ImagePayload,
    filter: &FilterPreset,
    out_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let bytes = render_export_png(result, filter)?;
    let path = out_dir.join(export_file_name(filter));
    fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("exported {} ({} filter, {} bytes)", path.display(), filter.name, bytes.len());
    Ok(path)
}
