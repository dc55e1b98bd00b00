use std::fmt;
use std::path::PathBuf;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use tracing::debug;

use super::raster::{blend_pixel, blend_rect};

const BITMAP_CELL: u32 = 8;

/// Text face for placeholder captions. Loading never fails: without a
/// readable TrueType file the built-in 8x8 bitmap face is used.
pub enum Typeface {
    Outline(FontVec),
    Bitmap,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typeface::Outline(_) => f.write_str("Typeface::Outline"),
            Typeface::Bitmap => f.write_str("Typeface::Bitmap"),
        }
    }
}

impl Typeface {
    pub fn load(paths: &[PathBuf]) -> Self {
        for path in paths {
            let Ok(data) = std::fs::read(path) else {
                continue;
            };
            match FontVec::try_from_vec(data) {
                Ok(font) => {
                    debug!(path = %path.display(), "loaded placeholder font");
                    return Typeface::Outline(font);
                }
                Err(err) => debug!(path = %path.display(), error = %err, "skipping unreadable font"),
            }
        }
        debug!("no TrueType font found; using bitmap font");
        Typeface::Bitmap
    }

    /// Width and height in pixels of `text` at `px` pixels tall.
    pub fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        match self {
            Typeface::Outline(font) => {
                let scaled = font.as_scaled(PxScale::from(px.max(1.0)));
                let mut width = 0.0f32;
                let mut previous = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                let height = scaled.ascent() - scaled.descent();
                (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
            }
            Typeface::Bitmap => {
                let scale = bitmap_scale(px);
                let chars = text.chars().count() as u32;
                (chars * BITMAP_CELL * scale, BITMAP_CELL * scale)
            }
        }
    }

    /// Draws `text` with its top-left corner at (`x`, `y`).
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        image: &mut RgbImage,
        text: &str,
        x: i64,
        y: i64,
        px: f32,
        color: Rgb<u8>,
        alpha: u8,
    ) {
        match self {
            Typeface::Outline(font) => {
                let scale = PxScale::from(px.max(1.0));
                let scaled = font.as_scaled(scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut previous = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    previous = Some(id);
                    let Some(outlined) = font.outline_glyph(glyph) else {
                        continue;
                    };
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let level = (coverage.clamp(0.0, 1.0) * alpha as f32) as u8;
                        if level > 0 {
                            blend_pixel(
                                image,
                                bounds.min.x as i64 + gx as i64,
                                bounds.min.y as i64 + gy as i64,
                                color,
                                level,
                            );
                        }
                    });
                }
            }
            Typeface::Bitmap => {
                let scale = bitmap_scale(px) as i64;
                let cell = BITMAP_CELL as i64 * scale;
                for (index, ch) in text.chars().enumerate() {
                    let rows = BASIC_FONTS
                        .get(ch)
                        .or_else(|| BASIC_FONTS.get('?'))
                        .unwrap_or([0; 8]);
                    let left = x + index as i64 * cell;
                    for (row, bits) in rows.iter().enumerate() {
                        for bit in 0..8 {
                            if bits & (1 << bit) == 0 {
                                continue;
                            }
                            let px0 = left + bit as i64 * scale;
                            let py0 = y + row as i64 * scale;
                            blend_rect(
                                image,
                                px0,
                                py0,
                                px0 + scale - 1,
                                py0 + scale - 1,
                                color,
                                alpha,
                            );
                        }
                    }
                }
            }
        }
    }

    /// Largest size not above `px` whose rendering fits in `max_width`.
    pub fn fit(&self, text: &str, px: f32, max_width: u32) -> f32 {
        let mut size = px.max(1.0);
        while size > 1.0 && self.measure(text, size).0 > max_width {
            size = (size * 0.9).max(1.0);
        }
        size
    }
}

fn bitmap_scale(px: f32) -> u32 {
    ((px / BITMAP_CELL as f32).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgb, RgbImage};

    use super::Typeface;

    #[test]
    fn missing_fonts_fall_back_to_bitmap() {
        let face = Typeface::load(&[PathBuf::from("/definitely/not/a/font.ttf")]);
        assert!(matches!(face, Typeface::Bitmap));
    }

    #[test]
    fn garbage_font_files_are_skipped() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("broken.ttf");
        std::fs::write(&path, b"not a font")?;
        assert!(matches!(Typeface::load(&[path]), Typeface::Bitmap));
        Ok(())
    }

    #[test]
    fn bitmap_text_scales_with_size() {
        let face = Typeface::Bitmap;
        assert_eq!(face.measure("AI", 8.0), (16, 8));
        assert_eq!(face.measure("AI", 32.0), (64, 32));
        assert_eq!(face.measure("AI", 2.0), (16, 8));
    }

    #[test]
    fn bitmap_text_marks_pixels() {
        let mut image = RgbImage::new(32, 16);
        Typeface::Bitmap.draw(&mut image, "H", 0, 0, 16.0, Rgb([255, 255, 255]), 255);
        assert!(image.pixels().any(|pixel| *pixel == Rgb([255, 255, 255])));
    }

    #[test]
    fn fit_shrinks_long_text() {
        let face = Typeface::Bitmap;
        let size = face.fit("caption line", 64.0, 200);
        assert!(face.measure("caption line", size).0 <= 200);
        assert!(size < 64.0);
    }
}
