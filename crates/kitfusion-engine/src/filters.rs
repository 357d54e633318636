use image::RgbaImage;
use kitfusion_contracts::presets::{FilterOp, FilterPreset};

type Rgb = [f32; 3];
type Matrix = [[f32; 3]; 3];

/// Applies a filter chain the way CSS filter functions do: each step works
/// on sRGB values in `0..=1` and clamps before the next. Alpha is untouched.
pub fn apply_filter(image: &RgbaImage, preset: &FilterPreset) -> RgbaImage {
    let mut out = image.clone();
    if preset.is_identity() {
        return out;
    }
    for pixel in out.pixels_mut() {
        let mut rgb = [
            channel_to_unit(pixel[0]),
            channel_to_unit(pixel[1]),
            channel_to_unit(pixel[2]),
        ];
        for op in preset.ops {
            rgb = apply_op(*op, rgb);
        }
        pixel[0] = unit_to_channel(rgb[0]);
        pixel[1] = unit_to_channel(rgb[1]);
        pixel[2] = unit_to_channel(rgb[2]);
    }
    out
}

fn apply_op(op: FilterOp, rgb: Rgb) -> Rgb {
    let out = match op {
        FilterOp::Grayscale(amount) => multiply(&grayscale_matrix(amount), rgb),
        FilterOp::Sepia(amount) => multiply(&sepia_matrix(amount), rgb),
        FilterOp::Saturate(amount) => multiply(&saturate_matrix(amount), rgb),
        FilterOp::Contrast(amount) => {
            let amount = amount.max(0.0);
            rgb.map(|value| (value - 0.5) * amount + 0.5)
        }
        FilterOp::Brightness(amount) => {
            let amount = amount.max(0.0);
            rgb.map(|value| value * amount)
        }
    };
    out.map(|value| value.clamp(0.0, 1.0))
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * inv, 0.7152 - 0.7152 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 + 0.2848 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 - 0.7152 * inv, 0.0722 + 0.9278 * inv],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * inv, 0.769 - 0.769 * inv, 0.189 - 0.189 * inv],
        [0.349 - 0.349 * inv, 0.686 + 0.314 * inv, 0.168 - 0.168 * inv],
        [0.272 - 0.272 * inv, 0.534 - 0.534 * inv, 0.131 + 0.869 * inv],
    ]
}

fn saturate_matrix(amount: f32) -> Matrix {
    let s = amount.max(0.0);
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn multiply(matrix: &Matrix, rgb: Rgb) -> Rgb {
    [
        matrix[0][0] * rgb[0] + matrix[0][1] * rgb[1] + matrix[0][2] * rgb[2],
        matrix[1][0] * rgb[0] + matrix[1][1] * rgb[1] + matrix[1][2] * rgb[2],
        matrix[2][0] * rgb[0] + matrix[2][1] * rgb[1] + matrix[2][2] * rgb[2],
    ]
}

fn channel_to_unit(value: u8) -> f32 {
    value as f32 / 255.0
}

fn unit_to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use kitfusion_contracts::presets::{find_filter, FILTERS, IDENTITY_FILTER};

    use super::apply_filter;

    fn swatch() -> RgbaImage {
        let mut image = RgbaImage::new(4, 1);
        image.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        image.put_pixel(1, 0, Rgba([200, 40, 10, 128]));
        image.put_pixel(2, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(3, 0, Rgba([90, 160, 220, 255]));
        image
    }

    #[test]
    fn identity_filter_is_a_no_op() {
        let image = swatch();
        assert_eq!(apply_filter(&image, &IDENTITY_FILTER), image);
    }

    #[test]
    fn mono_produces_neutral_pixels_and_keeps_alpha() {
        let mono = find_filter("Mono").unwrap();
        let out = apply_filter(&swatch(), mono);
        for pixel in out.pixels() {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
        }
        assert_eq!(out.get_pixel(1, 0)[3], 128);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn sepia_warms_white() {
        let sepia = find_filter("Sepia").unwrap();
        let out = apply_filter(&swatch(), sepia);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 239, 255]));
        assert_eq!(*out.get_pixel(2, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn every_non_identity_filter_changes_a_colour_pixel() {
        let image = swatch();
        for filter in FILTERS.iter().filter(|filter| !filter.is_identity()) {
            let out = apply_filter(&image, filter);
            assert_ne!(
                out.get_pixel(3, 0),
                image.get_pixel(3, 0),
                "{} left the pixel unchanged",
                filter.name
            );
        }
    }

    #[test]
    fn filtering_is_deterministic() {
        let vivid = find_filter("vivid").unwrap();
        assert_eq!(apply_filter(&swatch(), vivid), apply_filter(&swatch(), vivid));
    }
}
