// THEORY:
// `ImageFrame` is the "dumb" pixel container handed from the decoder to the
// predictor. It knows its size and channel order and can hand out a copy in the
// other order. It knows nothing about models or annotations. Its fields are
// private so the `width * height * 3` length holds for every frame in flight.

use crate::core_modules::error::{GritError, GritResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Order of the three colour channels in a packed 8-bit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A decoded image: `width * height * 3` bytes, row-major, packed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl ImageFrame {
    pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> GritResult<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(GritError::input(format!(
                "{width}x{height} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, order, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Packed pixel bytes in `order()`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the frame in `order`, swapping red and blue if needed.
    pub fn to_order(&self, order: ChannelOrder) -> ImageFrame {
        if order == self.order {
            return self.clone();
        }
        let mut data = self.data.clone();
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        ImageFrame {
            width: self.width,
            height: self.height,
            order,
            data,
        }
    }

    /// The frame as an `image::RgbImage`, for resizing and encoding.
    pub fn to_rgb_image(&self) -> GritResult<image::RgbImage> {
        let rgb = self.to_order(ChannelOrder::Rgb);
        image::RgbImage::from_raw(rgb.width, rgb.height, rgb.data).ok_or_else(|| {
            GritError::input(format!("{}x{} frame has a short pixel buffer", self.width, self.height))
        })
    }
}

/// Decodes the image at `path` into packed 8-bit pixels in `order`.
pub fn read_image(path: &Path, order: ChannelOrder) -> GritResult<ImageFrame> {
    let decoded = image::open(path).map_err(|source| GritError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let frame = ImageFrame::new(width, height, ChannelOrder::Rgb, rgb.into_raw())?;
    Ok(frame.to_order(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_png_in_bgr_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        let mut img = image::RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 10]));
        img.put_pixel(1, 0, image::Rgb([1, 2, 3]));
        img.save(&path).unwrap();

        let frame = read_image(&path, ChannelOrder::Bgr).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 1));
        assert_eq!(frame.order(), ChannelOrder::Bgr);
        assert_eq!(frame.data(), &[10, 0, 255, 3, 2, 1]);

        let back = frame.to_rgb_image().unwrap();
        assert_eq!(back.get_pixel(0, 0), &image::Rgb([255, 0, 10]));
    }

    #[test]
    fn undecodable_file_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"not a png").unwrap();
        let err = read_image(&path, ChannelOrder::Rgb).unwrap_err();
        assert!(matches!(err, GritError::Image { .. }));
    }

    #[test]
    fn new_checks_buffer_length() {
        assert!(ImageFrame::new(2, 2, ChannelOrder::Rgb, vec![0; 12]).is_ok());
        let err = ImageFrame::new(2, 2, ChannelOrder::Rgb, vec![0; 11]).unwrap_err();
        assert!(matches!(err, GritError::Input { .. }));
    }

    #[test]
    fn order_swap_keeps_the_checked_buffer() {
        let frame = ImageFrame::new(1, 2, ChannelOrder::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let bgr = frame.to_order(ChannelOrder::Bgr);
        assert_eq!(bgr.data(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(bgr.data().len(), (bgr.width() * bgr.height() * 3) as usize);

        let rgb = bgr.to_rgb_image().unwrap();
        assert_eq!(rgb.dimensions(), (1, 2));
        assert_eq!(rgb.get_pixel(0, 1), &image::Rgb([4, 5, 6]));
    }
}
