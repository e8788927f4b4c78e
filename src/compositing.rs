//! Alpha compositing onto a solid background

use image::{Rgb, RgbImage, RgbaImage};

/// Opaque white
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Composite an RGBA cutout over an opaque background of the same size
///
/// Per channel: `out = src * a + bg * (1 - a)` with `a = alpha / 255`,
/// rounded to the nearest integer. The result has no alpha channel.
#[must_use]
pub fn composite_over(cutout: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut output = RgbImage::new(cutout.width(), cutout.height());

    for (x, y, pixel) in cutout.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        let blend = |src: u8, bg: u8| -> u8 {
            let value = (u32::from(src) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255;
            value as u8
        };
        output.put_pixel(
            x,
            y,
            Rgb([
                blend(pixel[0], background[0]),
                blend(pixel[1], background[1]),
                blend(pixel[2], background[2]),
            ]),
        );
    }

    output
}

/// Composite an RGBA cutout onto opaque white
#[must_use]
pub fn composite_on_white(cutout: &RgbaImage) -> RgbImage {
    composite_over(cutout, WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_transparent_becomes_white() {
        let cutout = RgbaImage::from_pixel(3, 2, Rgba([12, 200, 40, 0]));
        let output = composite_on_white(&cutout);
        assert_eq!(output.dimensions(), (3, 2));
        assert!(output.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_opaque_keeps_source() {
        let cutout = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let output = composite_on_white(&cutout);
        assert!(output.pixels().all(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_partial_alpha_blends_linearly() {
        let cutout = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let output = composite_on_white(&cutout);
        // 255 * (127 / 255) = 127
        assert_eq!(output.get_pixel(0, 0).0, [127, 127, 127]);

        let cutout = RgbaImage::from_pixel(1, 1, Rgba([100, 50, 0, 51]));
        let output = composite_over(&cutout, Rgb([0, 0, 0]));
        assert_eq!(output.get_pixel(0, 0).0, [20, 10, 0]);
    }
}
