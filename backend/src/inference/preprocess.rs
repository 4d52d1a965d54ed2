//! Turns a decoded bitmap into the `[1, 224, 224, 1]` tensor the classifier expects.
//!
//! The steps run in a fixed order: pixel buffer, bilinear resize, channel mean,
//! scaling into `[0, 1]`, leading batch axis.

use image::DynamicImage;
use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::error::ImageDecodeError;

pub const INPUT_SIZE: usize = 224;
pub const TENSOR_SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, 1];

/// Model input. Owned by a single inference call and dropped when that call ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor {
    data: Array4<f32>,
}

impl PreprocessedTensor {
    pub fn shape(&self) -> [usize; 4] {
        let dims = self.data.shape();
        [dims[0], dims[1], dims[2], dims[3]]
    }

    pub fn view(&self) -> ndarray::ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Row-major (NHWC) values.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

}

pub fn preprocess(image: &DynamicImage) -> Result<PreprocessedTensor, ImageDecodeError> {
    let pixels = pixel_buffer(image)?;
    preprocess_pixels(pixels.view())
}

/// Runs the pipeline on an `(height, width, channels)` buffer of 0..=255 values.
pub fn preprocess_pixels(pixels: ArrayView3<f32>) -> Result<PreprocessedTensor, ImageDecodeError> {
    let (height, width, channels) = pixels.dim();
    if height == 0 || width == 0 {
        return Err(ImageDecodeError::EmptyImage);
    }
    if !(1..=4).contains(&channels) {
        return Err(ImageDecodeError::UnsupportedChannels(channels));
    }

    let resized = resize_bilinear(pixels, INPUT_SIZE, INPUT_SIZE);
    let grayscale = resized.mean_axis(Axis(2)).ok_or(ImageDecodeError::EmptyImage)?;
    let normalized = grayscale.mapv(|v| (v / 255.0).clamp(0.0, 1.0));

    let data = normalized.insert_axis(Axis(2)).insert_axis(Axis(0));
    Ok(PreprocessedTensor { data })
}

/// Colour channels as floats. Alpha is dropped so transparency does not darken the mean.
fn pixel_buffer(image: &DynamicImage) -> Result<Array3<f32>, ImageDecodeError> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    if width == 0 || height == 0 {
        return Err(ImageDecodeError::EmptyImage);
    }

    let (channels, raw) = if image.color().has_color() {
        (3, image.to_rgb8().into_raw())
    } else {
        (1, image.to_luma8().into_raw())
    };

    let values = raw.into_iter().map(f32::from).collect();
    Array3::from_shape_vec((height, width, channels), values)
        .map_err(|_| ImageDecodeError::EmptyImage)
}

/// Bilinear sampling with corner-unaligned coordinates: `src = dst * in / out`.
/// An empty source yields an all-zero output.
fn resize_bilinear(src: ArrayView3<f32>, out_height: usize, out_width: usize) -> Array3<f32> {
    let (in_height, in_width, channels) = src.dim();
    if in_height == 0 || in_width == 0 {
        return Array3::zeros((out_height, out_width, channels));
    }
    let scale_y = in_height as f32 / out_height as f32;
    let scale_x = in_width as f32 / out_width as f32;

    let mut out = Array3::<f32>::zeros((out_height, out_width, channels));
    for y in 0..out_height {
        let in_y = y as f32 * scale_y;
        let y0 = (in_y.floor() as usize).min(in_height - 1);
        let y1 = (y0 + 1).min(in_height - 1);
        let dy = in_y - y0 as f32;

        for x in 0..out_width {
            let in_x = x as f32 * scale_x;
            let x0 = (in_x.floor() as usize).min(in_width - 1);
            let x1 = (x0 + 1).min(in_width - 1);
            let dx = in_x - x0 as f32;

            for c in 0..channels {
                let top = src[[y0, x0, c]] + (src[[y0, x1, c]] - src[[y0, x0, c]]) * dx;
                let bottom = src[[y1, x0, c]] + (src[[y1, x1, c]] - src[[y1, x0, c]]) * dx;
                out[[y, x, c]] = top + (bottom - top) * dy;
            }
        }
    }
    out
}
