// THEORY:
// The `preprocess` module is the only place that knows how the model wants
// its pixels. A decoded frame is scaled so its longest side matches the
// configured test size, placed in the top-left corner of a square canvas and
// normalised per channel. The scale factor travels with the tensor so the
// predictor can map boxes back onto the source image.

use crate::core_modules::error::GritResult;
use crate::core_modules::image_frame::ImageFrame;
use image::imageops::FilterType;

/// A normalised, square, NCHW `f32` tensor ready for the model graph.
#[derive(Debug, Clone)]
pub struct ModelInput {
    /// `3 * side * side` values, channel planes in RGB order.
    pub tensor: Vec<f32>,
    pub side: u32,
    /// Source pixels per model pixel; multiply model boxes by this.
    pub scale: f32,
}

/// Resizes the longest side to `max_size`, pads bottom/right to a square and
/// normalises each channel with `mean`/`std` (RGB order). Padding stays zero.
pub fn prepare_input(image: &ImageFrame, max_size: u32, mean: [f64; 3], std: [f64; 3]) -> GritResult<ModelInput> {
    let side = max_size.max(1);
    let longest = image.width().max(image.height()).max(1);
    let resize = side as f32 / longest as f32;
    let new_w = ((image.width() as f32 * resize).round() as u32).clamp(1, side);
    let new_h = ((image.height() as f32 * resize).round() as u32).clamp(1, side);

    let rgb = image.to_rgb_image()?;
    let resized = image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);

    let plane = (side * side) as usize;
    let mut tensor = vec![0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y * side + x) as usize;
        for c in 0..3 {
            tensor[c * plane + idx] = ((pixel[c] as f64 - mean[c]) / std[c]) as f32;
        }
    }

    Ok(ModelInput {
        tensor,
        side,
        scale: longest as f32 / side as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::image_frame::ChannelOrder;

    #[test]
    fn landscape_image_is_padded_below() {
        // 4x2 BGR frame, every pixel pure blue.
        let data = [255u8, 0, 0].repeat(8);
        let frame = ImageFrame::new(4, 2, ChannelOrder::Bgr, data).unwrap();
        let input = prepare_input(&frame, 8, [0.0; 3], [1.0; 3]).unwrap();

        assert_eq!(input.side, 8);
        assert_eq!(input.tensor.len(), 3 * 64);
        assert_eq!(input.scale, 0.5);
        // Blue plane is full in the top half, zero padding below.
        assert_eq!(input.tensor[2 * 64], 255.0);
        assert_eq!(input.tensor[2 * 64 + 3 * 8 + 7], 255.0);
        assert_eq!(input.tensor[2 * 64 + 4 * 8], 0.0);
        // Red plane is empty.
        assert_eq!(input.tensor[0], 0.0);
    }

    #[test]
    fn normalisation_uses_mean_and_std() {
        let frame = ImageFrame::new(1, 1, ChannelOrder::Rgb, vec![110, 20, 30]).unwrap();
        let input = prepare_input(&frame, 1, [10.0, 20.0, 0.0], [50.0, 1.0, 3.0]).unwrap();
        assert_eq!(input.tensor, vec![2.0, 0.0, 10.0]);
        assert_eq!(input.scale, 1.0);
    }
}
