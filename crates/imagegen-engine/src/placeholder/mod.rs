//! Locally drawn stand-in images for when no backend produced one.

pub mod palette;
pub mod raster;
pub mod text;

use std::io::Cursor;

use image::imageops;
use image::{ImageFormat, Rgb, RgbImage};
use imagegen_contracts::catalog::PlaceholderStyle;
use rand::{Rng, RngCore};

use crate::config::Config;
use crate::error::{BackendError, SynthesisError};
use palette::{hashed_colors, lerp, select_theme, Theme, ROBOT_KEYWORD};
use raster::{blend_circle, blend_rect, fill_ellipse, fill_rect, stroke_rect};
use text::Typeface;

pub const TITLE: &str = "AI Generated";
pub const SUBTITLE_CHARS: usize = 80;
pub const BLUR_SIGMA: f32 = 0.5;
pub const MIN_SHAPES: usize = 3;
pub const MAX_SHAPES: usize = 7;
pub const MIN_SHAPE_SIZE: u32 = 20;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const SHADOW: Rgb<u8> = Rgb([0, 0, 0]);
const ROBOT_OUTLINE: Rgb<u8> = Rgb([200, 200, 220]);
const ROBOT_HEAD: Rgb<u8> = Rgb([80, 80, 100]);
const ROBOT_BODY: Rgb<u8> = Rgb([100, 100, 120]);
const ROBOT_ARM: Rgb<u8> = Rgb([90, 90, 110]);
const ROBOT_OUTLINE_WIDTH: i64 = 3;

/// The prompt as shown under the title: at most 80 characters, with an
/// ellipsis when cut.
pub fn subtitle_text(prompt: &str) -> String {
    if prompt.chars().count() > SUBTITLE_CHARS {
        let head: String = prompt.chars().take(SUBTITLE_CHARS).collect();
        format!("{head}...")
    } else {
        prompt.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Rectangle,
}

/// One translucent shape of the decorative overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub kind: ShapeKind,
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub color: Rgb<u8>,
    pub alpha: u8,
}

#[derive(Debug, Clone)]
pub struct Placeholder {
    pub image: RgbImage,
    pub theme: &'static Theme,
    pub decorations: Vec<Decoration>,
    pub robot: bool,
}

/// Inputs for one placeholder rendering.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderJob<'a> {
    pub style: PlaceholderStyle,
    pub prompt: &'a str,
    pub width: u32,
    pub height: u32,
    /// Gradient colours suggested by a colour-hint backend.
    pub colors: Option<(Rgb<u8>, Rgb<u8>)>,
}

pub trait PlaceholderRenderer: Send + Sync {
    /// PNG bytes for `job`.
    fn render(&self, job: &PlaceholderJob<'_>, rng: &mut dyn RngCore)
        -> Result<Vec<u8>, SynthesisError>;
}

/// Source of two gradient colours for a prompt.
pub trait ColorAdvisor: Send + Sync {
    fn name(&self) -> &str;
    fn suggest(&self, prompt: &str) -> Result<(Rgb<u8>, Rgb<u8>), BackendError>;
}

#[derive(Debug)]
pub struct PlaceholderPainter {
    title_face: Typeface,
    subtitle_face: Typeface,
}

impl PlaceholderPainter {
    pub fn new(title_face: Typeface, subtitle_face: Typeface) -> Self {
        Self {
            title_face,
            subtitle_face,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Typeface::load(&config.font_paths),
            Typeface::load(&config.subtitle_font_candidates()),
        )
    }

    /// The composed scene, softened by a light blur as the last step.
    pub fn paint_styled(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Placeholder, SynthesisError> {
        let mut placeholder = self.compose_styled(prompt, width, height, rng)?;
        placeholder.image = imageops::blur(&placeholder.image, BLUR_SIGMA);
        Ok(placeholder)
    }

    fn compose_styled(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Placeholder, SynthesisError> {
        check_dimensions(width, height)?;
        let theme = select_theme(prompt);
        let mut image = RgbImage::new(width, height);

        for y in 0..height {
            let progress = y as f64 / height as f64;
            let color = if progress < 0.5 {
                lerp(theme.base[0], theme.base[1], progress * 2.0)
            } else {
                lerp(theme.base[1], theme.base[2], (progress - 0.5) * 2.0)
            };
            fill_rect(&mut image, 0, y as i64, width as i64 - 1, y as i64, color);
        }

        let robot = palette::has_keyword(prompt, ROBOT_KEYWORD);
        if robot {
            draw_robot(&mut image, theme.accent);
        }

        let decorations = scatter_shapes(&mut image, theme, rng);

        let title_px = self
            .title_face
            .fit(TITLE, height as f32 * 0.06, caption_width(width));
        self.caption(
            &mut image,
            &self.title_face,
            TITLE,
            title_px,
            height as i64 - (height as f64 * 0.15) as i64,
            2,
            128,
            255,
        );
        let subtitle = subtitle_text(prompt);
        let subtitle_px = self
            .subtitle_face
            .fit(&subtitle, height as f32 * 0.03, caption_width(width));
        self.caption(
            &mut image,
            &self.subtitle_face,
            &subtitle,
            subtitle_px,
            height as i64 - (height as f64 * 0.08) as i64,
            1,
            100,
            200,
        );

        Ok(Placeholder {
            image,
            theme,
            decorations,
            robot,
        })
    }

    /// Two-colour top-to-bottom blend with centred captions. Same inputs,
    /// same pixels.
    pub fn paint_gradient(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        colors: (Rgb<u8>, Rgb<u8>),
    ) -> Result<RgbImage, SynthesisError> {
        check_dimensions(width, height)?;
        let (top, bottom) = colors;
        let mut image = RgbImage::new(width, height);
        for y in 0..height {
            let color = lerp(top, bottom, y as f64 / height as f64);
            fill_rect(&mut image, 0, y as i64, width as i64 - 1, y as i64, color);
        }

        let middle = height as i64 / 2;
        let title_px = self
            .title_face
            .fit(TITLE, height as f32 * 0.05, caption_width(width));
        let (_, title_height) = self.title_face.measure(TITLE, title_px);
        self.caption(
            &mut image,
            &self.title_face,
            TITLE,
            title_px,
            middle - title_height as i64,
            0,
            0,
            255,
        );
        let snippet = subtitle_text(prompt);
        let snippet_px = self
            .subtitle_face
            .fit(&snippet, height as f32 * 0.025, caption_width(width));
        self.caption(
            &mut image,
            &self.subtitle_face,
            &snippet,
            snippet_px,
            middle + 20,
            0,
            0,
            255,
        );

        Ok(image)
    }

    /// Horizontally centred white text at `y`, with an optional drop shadow.
    #[allow(clippy::too_many_arguments)]
    fn caption(
        &self,
        image: &mut RgbImage,
        face: &Typeface,
        text: &str,
        px: f32,
        y: i64,
        shadow_offset: i64,
        shadow_alpha: u8,
        alpha: u8,
    ) {
        let (text_width, _) = face.measure(text, px);
        let x = (image.width() as i64 - text_width as i64) / 2;
        if shadow_offset > 0 {
            face.draw(
                image,
                text,
                x + shadow_offset,
                y + shadow_offset,
                px,
                SHADOW,
                shadow_alpha,
            );
        }
        face.draw(image, text, x, y, px, WHITE, alpha);
    }
}

impl PlaceholderRenderer for PlaceholderPainter {
    fn render(
        &self,
        job: &PlaceholderJob<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<u8>, SynthesisError> {
        let image = match job.style {
            PlaceholderStyle::Styled => {
                self.paint_styled(job.prompt, job.width, job.height, rng)?
                    .image
            }
            PlaceholderStyle::Gradient => {
                let colors = job.colors.unwrap_or_else(|| hashed_colors(job.prompt));
                self.paint_gradient(job.prompt, job.width, job.height, colors)?
            }
        };
        encode_png(&image)
    }
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, SynthesisError> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

fn check_dimensions(width: u32, height: u32) -> Result<(), SynthesisError> {
    if width == 0 || height == 0 {
        return Err(SynthesisError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn caption_width(width: u32) -> u32 {
    (width as f32 * 0.95) as u32
}

fn draw_robot(image: &mut RgbImage, accent: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let cx = width as i64 / 2;
    let cy = height as i64 / 2;
    let head = width.min(height) as i64 / 6;
    let body_half = head * 6 / 5;

    outlined_box(
        image,
        (cx - head, cy - head * 2, cx + head, cy - head / 2),
        ROBOT_HEAD,
    );

    let eye = (head / 4).max(1);
    let eye_y = cy - head * 3 / 2;
    fill_ellipse(image, cx - head / 2, eye_y, eye / 2, eye / 2, accent);
    fill_ellipse(image, cx + head / 2, eye_y, eye / 2, eye / 2, accent);

    outlined_box(
        image,
        (cx - body_half, cy - head / 2, cx + body_half, cy + head * 3 / 2),
        ROBOT_BODY,
    );

    let arm = head / 3;
    fill_rect(image, cx - head * 2, cy, cx - body_half, cy + arm, ROBOT_ARM);
    fill_rect(image, cx + body_half, cy, cx + head * 2, cy + arm, ROBOT_ARM);
}

fn outlined_box(image: &mut RgbImage, bounds: (i64, i64, i64, i64), fill: Rgb<u8>) {
    let (x0, y0, x1, y1) = bounds;
    fill_rect(image, x0, y0, x1, y1, fill);
    for inset in 0..ROBOT_OUTLINE_WIDTH {
        stroke_rect(image, x0 + inset, y0 + inset, x1 - inset, y1 - inset, ROBOT_OUTLINE);
    }
}

fn scatter_shapes(image: &mut RgbImage, theme: &Theme, rng: &mut dyn RngCore) -> Vec<Decoration> {
    let (width, height) = image.dimensions();
    let max_size = (width.min(height) / 8).max(MIN_SHAPE_SIZE);
    let colors = theme.colors();
    let count = rng.gen_range(MIN_SHAPES..=MAX_SHAPES);

    let mut decorations = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = if rng.gen_bool(0.5) {
            ShapeKind::Circle
        } else {
            ShapeKind::Rectangle
        };
        let decoration = Decoration {
            kind,
            x: rng.gen_range(0..=width),
            y: rng.gen_range(0..=height),
            size: rng.gen_range(MIN_SHAPE_SIZE..=max_size),
            alpha: rng.gen_range(30..=100),
            color: colors[rng.gen_range(0..colors.len())],
        };
        let (x, y, size) = (
            decoration.x as i64,
            decoration.y as i64,
            decoration.size as i64,
        );
        match kind {
            ShapeKind::Circle => blend_circle(image, x, y, size, decoration.color, decoration.alpha),
            ShapeKind::Rectangle => blend_rect(
                image,
                x - size,
                y - size,
                x + size,
                y + size,
                decoration.color,
                decoration.alpha,
            ),
        }
        decorations.push(decoration);
    }
    decorations
}

#[cfg(test)]
mod tests {
    use image::{imageops, ImageFormat, Rgb};
    use imagegen_contracts::catalog::PlaceholderStyle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::palette::{hashed_colors, select_theme};
    use super::text::Typeface;
    use super::{
        subtitle_text, PlaceholderJob, PlaceholderPainter, PlaceholderRenderer, BLUR_SIGMA,
        MAX_SHAPES, MIN_SHAPES, MIN_SHAPE_SIZE,
    };
    use crate::error::SynthesisError;

    fn painter() -> PlaceholderPainter {
        PlaceholderPainter::new(Typeface::Bitmap, Typeface::Bitmap)
    }

    #[test]
    fn subtitle_truncates_after_eighty_chars() {
        let long = "x".repeat(81);
        assert_eq!(subtitle_text(&long), format!("{}...", "x".repeat(80)));
        let exact = "y".repeat(80);
        assert_eq!(subtitle_text(&exact), exact);
        assert_eq!(subtitle_text("short"), "short");
    }

    #[test]
    fn styled_png_has_table_dimensions() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let job = PlaceholderJob {
            style: PlaceholderStyle::Styled,
            prompt: "a lighthouse at dusk",
            width: 1024,
            height: 576,
            colors: None,
        };
        let bytes = painter().render(&job, &mut rng)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        assert_eq!((decoded.width(), decoded.height()), (1024, 576));
        Ok(())
    }

    #[test]
    fn shapes_use_theme_colours_and_bounds() -> anyhow::Result<()> {
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let placeholder = painter().paint_styled("ocean waves", 320, 240, &mut rng)?;
            let palette = select_theme("ocean waves").colors();
            let count = placeholder.decorations.len();

            assert_eq!(placeholder.theme.name, "ocean");
            assert!((MIN_SHAPES..=MAX_SHAPES).contains(&count));
            for shape in &placeholder.decorations {
                assert!(palette.contains(&shape.color));
                assert!((30..=100).contains(&shape.alpha));
                assert!((MIN_SHAPE_SIZE..=MIN_SHAPE_SIZE.max(240 / 8)).contains(&shape.size));
                assert!(shape.x <= 320 && shape.y <= 240);
            }
        }
        Ok(())
    }

    #[test]
    fn same_seed_draws_same_shapes() -> anyhow::Result<()> {
        let first = painter().paint_styled("robot", 200, 200, &mut StdRng::seed_from_u64(3))?;
        let second = painter().paint_styled("robot", 200, 200, &mut StdRng::seed_from_u64(3))?;
        assert_eq!(first.decorations, second.decorations);
        assert_eq!(first.image, second.image);
        assert!(first.robot);
        Ok(())
    }

    #[test]
    fn blur_runs_after_captions() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(5);
        let composed = painter().compose_styled("harbour lights", 240, 160, &mut rng)?;
        let white = Rgb([255, 255, 255]);
        assert!(composed.image.pixels().any(|pixel| *pixel == white));

        let mut rng = StdRng::seed_from_u64(5);
        let painted = painter().paint_styled("harbour lights", 240, 160, &mut rng)?;
        assert_eq!(painted.decorations, composed.decorations);
        assert_eq!(painted.image, imageops::blur(&composed.image, BLUR_SIGMA));
        Ok(())
    }

    #[test]
    fn robot_glyph_only_for_robot_prompts() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(painter().paint_styled("Robot butler", 120, 120, &mut rng)?.robot);
        assert!(!painter().paint_styled("tech summit", 120, 120, &mut rng)?.robot);
        Ok(())
    }

    #[test]
    fn gradient_is_deterministic_per_prompt() -> anyhow::Result<()> {
        let colors = hashed_colors("harbour at night");
        let first = painter().paint_gradient("harbour at night", 256, 144, colors)?;
        let second = painter().paint_gradient("harbour at night", 256, 144, colors)?;
        assert_eq!(first, second);
        assert_eq!(*first.get_pixel(0, 0), colors.0);
        Ok(())
    }

    #[test]
    fn gradient_uses_suggested_colours_when_present() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let job = PlaceholderJob {
            style: PlaceholderStyle::Gradient,
            prompt: "forest",
            width: 64,
            height: 64,
            colors: Some((Rgb([255, 0, 0]), Rgb([0, 0, 255]))),
        };
        let bytes = painter().render(&job, &mut rng)?;
        let decoded = image::load_from_memory(&bytes)?.to_rgb8();
        assert_eq!(*decoded.get_pixel(0, 0), Rgb([255, 0, 0]));
        Ok(())
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = painter().paint_styled("x", 0, 10, &mut rng).err();
        assert!(matches!(
            err,
            Some(SynthesisError::InvalidDimensions { width: 0, height: 10 })
        ));
    }
}
