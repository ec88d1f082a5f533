//! Face-crop preparation for embedding models.
//!
//! MobileFaceNet-style models take a fixed square RGB input with channels
//! scaled to `[0, 1]`. Providers call [`to_model_input`] before inference.

use crate::provider::{FaceImage, ProviderError};

/// Default model input side length in pixels.
pub const DEFAULT_INPUT_SIZE: usize = 112;

/// Pixel scale: channels are mapped with `(x - 0) / 255`.
const PIXEL_SCALE: f32 = 255.0;

/// Resizes `image` to `size x size` with bilinear interpolation and scales
/// every channel to `[0, 1]`.
///
/// Output is HWC (row-major, RGB interleaved), `size * size * 3` floats.
/// Sampling uses the top-left aligned mapping `src = dst * (src_len / size)`.
pub fn to_model_input(image: &FaceImage, size: usize) -> Result<Vec<f32>, ProviderError> {
    if image.width() == 0 || image.height() == 0 || size == 0 {
        return Err(ProviderError::EmptyImage);
    }

    let scale_x = image.width() as f32 / size as f32;
    let scale_y = image.height() as f32 / size as f32;
    let mut out = Vec::with_capacity(size * size * 3);

    for y in 0..size {
        let (y0, y1, fy) = sample_axis(y, scale_y, image.height());
        for x in 0..size {
            let (x0, x1, fx) = sample_axis(x, scale_x, image.width());
            let p00 = image.pixel(x0, y0);
            let p10 = image.pixel(x1, y0);
            let p01 = image.pixel(x0, y1);
            let p11 = image.pixel(x1, y1);
            for c in 0..3 {
                let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * fx;
                let bottom = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * fx;
                let v = top + (bottom - top) * fy;
                out.push(v / PIXEL_SCALE);
            }
        }
    }
    Ok(out)
}

fn sample_axis(dst: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let src = dst as f32 * scale;
    let i0 = (src.floor() as usize).min(len - 1);
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, src - i0 as f32)
}
