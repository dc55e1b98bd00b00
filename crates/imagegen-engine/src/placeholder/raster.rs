//! Clipped drawing primitives on `RgbImage`. Coordinates may fall outside
//! the canvas; anything off-canvas is dropped.

use image::{Rgb, RgbImage};

pub fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    blend_rect(image, x0, y0, x1, y1, color, 255);
}

/// One-pixel outline of the inclusive box.
pub fn stroke_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for x in x0..=x1 {
        blend_pixel(image, x, y0, color, 255);
        blend_pixel(image, x, y1, color, 255);
    }
    for y in y0..=y1 {
        blend_pixel(image, x0, y, color, 255);
        blend_pixel(image, x1, y, color, 255);
    }
}

/// Inclusive box, composited with `alpha` over existing pixels.
pub fn blend_rect(
    image: &mut RgbImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: Rgb<u8>,
    alpha: u8,
) {
    let Some((x0, x1)) = clip(x0, x1, image.width()) else {
        return;
    };
    let Some((y0, y1)) = clip(y0, y1, image.height()) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            composite(image.get_pixel_mut(x, y), color, alpha);
        }
    }
}

pub fn fill_ellipse(
    image: &mut RgbImage,
    cx: i64,
    cy: i64,
    rx: i64,
    ry: i64,
    color: Rgb<u8>,
) {
    blend_ellipse(image, cx, cy, rx, ry, color, 255);
}

pub fn blend_circle(image: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>, alpha: u8) {
    blend_ellipse(image, cx, cy, radius, radius, color, alpha);
}

fn blend_ellipse(
    image: &mut RgbImage,
    cx: i64,
    cy: i64,
    rx: i64,
    ry: i64,
    color: Rgb<u8>,
    alpha: u8,
) {
    if rx <= 0 || ry <= 0 {
        blend_pixel(image, cx, cy, color, alpha);
        return;
    }
    let (rx2, ry2) = ((rx * rx) as f64, (ry * ry) as f64);
    for dy in -ry..=ry {
        for dx in -rx..=rx {
            if (dx * dx) as f64 / rx2 + (dy * dy) as f64 / ry2 <= 1.0 {
                blend_pixel(image, cx + dx, cy + dy, color, alpha);
            }
        }
    }
}

pub fn blend_pixel(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, alpha: u8) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    composite(image.get_pixel_mut(x as u32, y as u32), color, alpha);
}

fn composite(pixel: &mut Rgb<u8>, color: Rgb<u8>, alpha: u8) {
    if alpha == 255 {
        *pixel = color;
        return;
    }
    let a = alpha as u32;
    for channel in 0..3 {
        let under = pixel[channel] as u32;
        pixel[channel] = ((color[channel] as u32 * a + under * (255 - a) + 127) / 255) as u8;
    }
}

fn clip(start: i64, end: i64, limit: u32) -> Option<(u32, u32)> {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let max = limit as i64 - 1;
    if limit == 0 || hi < 0 || lo > max {
        return None;
    }
    Some((lo.max(0) as u32, hi.min(max) as u32))
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::{blend_circle, blend_pixel, fill_rect, stroke_rect};

    #[test]
    fn drawing_outside_the_canvas_is_clipped() {
        let mut image = RgbImage::new(4, 4);
        fill_rect(&mut image, -10, -10, 1, 1, Rgb([255, 0, 0]));
        blend_circle(&mut image, 100, 100, 5, Rgb([0, 255, 0]), 255);
        blend_pixel(&mut image, -1, 2, Rgb([0, 0, 255]), 255);

        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(1, 1), Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(2, 2), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn blending_mixes_with_the_background() {
        let mut image = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        blend_pixel(&mut image, 0, 0, Rgb([255, 255, 255]), 128);
        assert_eq!(*image.get_pixel(0, 0), Rgb([128, 128, 128]));
    }

    #[test]
    fn stroke_leaves_interior_untouched() {
        let mut image = RgbImage::new(5, 5);
        stroke_rect(&mut image, 0, 0, 4, 4, Rgb([9, 9, 9]));
        assert_eq!(*image.get_pixel(0, 2), Rgb([9, 9, 9]));
        assert_eq!(*image.get_pixel(4, 4), Rgb([9, 9, 9]));
        assert_eq!(*image.get_pixel(2, 2), Rgb([0, 0, 0]));
    }
}
