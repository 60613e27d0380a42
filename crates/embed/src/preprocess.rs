use image::imageops::FilterType;
use image::DynamicImage;

/// Resizes `image` to `size`x`size` RGB and lays it out as a flat NCHW tensor
/// with `(value - mean) * scale` applied per channel.
///
/// Aspect ratio is not preserved; upstream alignment is expected to have
/// produced a roughly square face crop already.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn face_tensor(image: &DynamicImage, size: u32, mean: f32, scale: f32) -> Vec<f32> {
    let rgb = image
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();
    let plane = (size * size) as usize;
    let mut data = vec![0f32; 3 * plane];

    for (idx, pixel) in rgb.pixels().enumerate() {
        for channel in 0..3 {
            data[channel * plane + idx] = (f32::from(pixel[channel]) - mean) * scale;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn output_is_nchw_sized() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 30));
        let data = face_tensor(&img, 16, 127.5, 1.0 / 128.0);
        assert_eq!(data.len(), 3 * 16 * 16);
    }

    #[test]
    fn channels_are_planar_and_centered() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 128])));
        let data = face_tensor(&img, 4, 127.5, 1.0 / 128.0);
        let plane = 16;
        assert!((data[0] - (127.5 / 128.0)).abs() < 1e-6);
        assert!((data[plane] - (-127.5 / 128.0)).abs() < 1e-6);
        assert!((data[2 * plane] - (0.5 / 128.0)).abs() < 1e-6);
    }
}
