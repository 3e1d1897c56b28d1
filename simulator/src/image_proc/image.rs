use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use ndarray::Array3;

/// Apply the sRGB transfer curve to a linear value.
///
/// Input is clamped to [0, 1] first, so HDR highlights saturate at 1.0.
pub fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Invert the sRGB transfer curve, the inverse of [`linear_to_srgb`].
pub fn srgb_to_linear(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts a decoded image to a grid of 0..255 intensities.
///
/// The grid is shaped `(height, width, channels)`; grayscale sources yield one
/// channel, color sources three. Alpha is dropped. Float images (EXR, HDR) are
/// treated as linear light and encoded with the sRGB curve before scaling, so
/// every source ends up on the same 8-bit convention.
///
/// # Arguments
/// * `img` - Any decoded image
///
/// # Returns
/// * An `Array3<f64>` with values in [0, 255]
pub fn dynamic_image_to_grid(img: &DynamicImage) -> Array3<f64> {
    let (width, height) = (img.width() as usize, img.height() as usize);

    if is_float_image(img) {
        let rgb = img.to_rgb32f();
        return Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            f64::from(linear_to_srgb(rgb.get_pixel(x as u32, y as u32)[c])) * 255.0
        });
    }

    if img.color().has_color() {
        let rgb = img.to_rgb8();
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            f64::from(rgb.get_pixel(x as u32, y as u32)[c])
        })
    } else {
        let gray = img.to_luma8();
        Array3::from_shape_fn((height, width, 1), |(y, x, _)| {
            f64::from(gray.get_pixel(x as u32, y as u32)[0])
        })
    }
}

/// Converts a grid of integer readings back into an image.
///
/// Values are clamped to `[0, max_value]`. Integer output is 8-bit when
/// `max_value` fits in a byte and 16-bit otherwise. Float output normalizes by
/// `max_value`, decodes the sRGB curve back to linear light and is always RGB,
/// with grayscale expanded to three channels. Reading such a file back through
/// [`dynamic_image_to_grid`] recovers the original scale.
///
/// # Arguments
/// * `grid` - Readings shaped `(height, width, channels)`, channels 1 or 3
/// * `max_value` - Largest representable reading, > 0
/// * `float_output` - Produce a 32-bit float image instead of an integer one
///
/// # Returns
/// * `Some(DynamicImage)`, or `None` if the channel count is not 1 or 3
pub fn grid_to_dynamic_image(
    grid: &Array3<i64>,
    max_value: i64,
    float_output: bool,
) -> Option<DynamicImage> {
    let (height, width, channels) = grid.dim();
    if channels != 1 && channels != 3 {
        return None;
    }

    let (width, height) = (width as u32, height as u32);
    let max_value = max_value.max(1);
    let clamped = |x: u32, y: u32, c: usize| -> i64 {
        let c = if channels == 1 { 0 } else { c };
        grid[[y as usize, x as usize, c]].clamp(0, max_value)
    };

    let img = if float_output {
        let scale = max_value as f32;
        DynamicImage::ImageRgb32F(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([0, 1, 2].map(|c| srgb_to_linear(clamped(x, y, c) as f32 / scale)))
        }))
    } else if max_value <= i64::from(u8::MAX) {
        if channels == 1 {
            DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |x, y| {
                Luma([clamped(x, y, 0) as u8])
            }))
        } else {
            DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
                Rgb([0, 1, 2].map(|c| clamped(x, y, c) as u8))
            }))
        }
    } else {
        let to_u16 = |v: i64| v.min(i64::from(u16::MAX)) as u16;
        if channels == 1 {
            DynamicImage::ImageLuma16(ImageBuffer::from_fn(width, height, |x, y| {
                Luma([to_u16(clamped(x, y, 0))])
            }))
        } else {
            DynamicImage::ImageRgb16(ImageBuffer::from_fn(width, height, |x, y| {
                Rgb([0, 1, 2].map(|c| to_u16(clamped(x, y, c))))
            }))
        }
    };

    Some(img)
}

fn is_float_image(img: &DynamicImage) -> bool {
    matches!(
        img,
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
    )
}
