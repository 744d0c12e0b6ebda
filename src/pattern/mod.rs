//! Procedural backdrop rasters.
//!
//! Every raster starts from the same base wash: a `primary` fill with fifty
//! centred squares shrinking to nothing, blended `primary -> card -> primary`.
//! The selected style then draws its overlay and the whole image receives a
//! uniform per-pixel noise pass.
//!
//! Styles marked deterministic use the `frac(sin(seed) * k)` sieve and produce
//! identical pixels for identical inputs up to the noise pass. `waves` and
//! `particles` draw from the supplied random source.

mod geometric;
mod glitch;
mod lines;
mod minimal;
mod particles;
mod waves;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbaImage;
use rand::Rng;
use sha2::{Digest, Sha256};
use tiny_skia::Pixmap;

use crate::canvas::Canvas;
use crate::color::{blend, ColorTriple, Rgb};
use crate::settings::{PatternStyle, StyleSelection, Theme};

/// Length of the raster's longer edge.
pub const MAX_RASTER_DIMENSION: u32 = 2048;

const WASH_LAYERS: u32 = 50;
const DARK_NOISE_AMPLITUDE: f64 = 15.0;
const LIGHT_NOISE_AMPLITUDE: f64 = 8.0;

/// A fully composited backdrop image. Always opaque.
#[derive(Clone)]
pub struct Raster {
    pixmap: Pixmap,
}

impl Raster {
    fn from_canvas(canvas: Canvas) -> Self {
        Self {
            pixmap: canvas.into_pixmap(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA8 bytes, row-major.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            bytes.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        bytes
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    /// Hex SHA-256 of the pixel bytes.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.pixmap.data());
        hash.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width(), self.height(), self.to_rgba())
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let image = self
            .to_image()
            .context("raster buffer does not match its dimensions")?;
        image
            .save(path)
            .with_context(|| format!("failed writing {}", path.display()))
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Raster size for `aspect_ratio`: the long edge is [`MAX_RASTER_DIMENSION`],
/// the short edge is scaled and floored. Non-finite or non-positive ratios
/// are treated as square.
pub fn raster_dimensions(aspect_ratio: f64) -> (u32, u32) {
    let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };
    let max = f64::from(MAX_RASTER_DIMENSION);
    let (width, height) = if aspect >= 1.0 {
        (max, max / aspect)
    } else {
        (max * aspect, max)
    };
    (clamp_dimension(width), clamp_dimension(height))
}

fn clamp_dimension(value: f64) -> u32 {
    (value.floor() as u32).clamp(1, MAX_RASTER_DIMENSION)
}

/// Derived drawing coordinates shared by every style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternGeometry {
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Half the raster diagonal.
    pub max_radius: f64,
}

impl PatternGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let width = f64::from(width);
        let height = f64::from(height);
        Self {
            width,
            height,
            center_x: width / 2.0,
            center_y: height / 2.0,
            max_radius: (width * width + height * height).sqrt() / 2.0,
        }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn max_side(&self) -> f64 {
        self.width.max(self.height)
    }

    pub fn distance_from_center(&self, x: f64, y: f64) -> f64 {
        (x - self.center_x).hypot(y - self.center_y)
    }

    /// `max(floor, 1 - (dist / max_radius) * k)`.
    pub fn falloff(&self, x: f64, y: f64, k: f64, floor: f64) -> f64 {
        (1.0 - (self.distance_from_center(x, y) / self.max_radius) * k).max(floor)
    }
}

/// `frac(sin(seed) * 10000)`.
pub fn seeded_random(seed: f64) -> f64 {
    seeded_fraction(seed, 10000.0)
}

/// `frac(sin(seed) * scale)`; the result is in `[0, 1)`.
pub fn seeded_fraction(seed: f64, scale: f64) -> f64 {
    let x = seed.sin() * scale;
    x - x.floor()
}

/// `start, start + step, ...` while below `limit`, accumulated the same way
/// as an incrementing loop counter.
pub(crate) fn stepped(start: f64, limit: f64, step: f64) -> impl Iterator<Item = f64> {
    let valid = step.is_finite() && step > 0.0;
    std::iter::successors(valid.then_some(start), move |value| Some(value + step))
        .take_while(move |value| *value < limit)
}

pub(crate) struct PatternContext<'a> {
    pub canvas: &'a mut Canvas,
    pub geometry: PatternGeometry,
    pub colors: ColorTriple,
    pub theme: Theme,
}

impl PatternContext<'_> {
    /// Neutral stroke/fill gray: `dark` on dark backgrounds, `light` otherwise.
    pub fn gray(&self, dark: u8, light: u8) -> Rgb {
        if self.theme.is_dark() {
            Rgb::gray(dark)
        } else {
            Rgb::gray(light)
        }
    }
}

/// Generates a backdrop with noise drawn from the thread-local generator.
pub fn generate(aspect_ratio: f64, style: &StyleSelection, theme: Theme) -> Raster {
    generate_with_rng(aspect_ratio, style, theme, &mut rand::thread_rng())
}

pub fn generate_with_rng<R: Rng + ?Sized>(
    aspect_ratio: f64,
    style: &StyleSelection,
    theme: Theme,
    rng: &mut R,
) -> Raster {
    let started = Instant::now();
    let mut raster = draw_pattern(aspect_ratio, style, theme, rng);
    apply_noise(&mut raster, theme, rng);
    log::debug!(
        "generated {:?} backdrop {}x{} ({theme}) in {:?}",
        style,
        raster.width(),
        raster.height(),
        started.elapsed()
    );
    raster
}

/// The base wash plus the style overlay, without the noise pass.
pub fn draw_pattern<R: Rng + ?Sized>(
    aspect_ratio: f64,
    style: &StyleSelection,
    theme: Theme,
    rng: &mut R,
) -> Raster {
    let (width, height) = raster_dimensions(aspect_ratio);
    let Some(mut canvas) = Canvas::new(width, height) else {
        unreachable!("raster dimensions are clamped to 1..={MAX_RASTER_DIMENSION}");
    };
    let mut context = PatternContext {
        canvas: &mut canvas,
        geometry: PatternGeometry::new(width, height),
        colors: ColorTriple::for_theme(theme),
        theme,
    };

    draw_base_wash(&mut context);
    match style {
        StyleSelection::Known(PatternStyle::Cherokee) => {}
        StyleSelection::Known(PatternStyle::Glitch) => glitch::draw(&mut context),
        StyleSelection::Known(PatternStyle::Waves) => waves::draw(&mut context, rng),
        StyleSelection::Known(PatternStyle::Particles) => particles::draw(&mut context, rng),
        StyleSelection::Known(PatternStyle::Minimal) => minimal::draw(&mut context),
        StyleSelection::Known(PatternStyle::Geometric) => geometric::draw(&mut context),
        StyleSelection::Known(PatternStyle::Lines) => lines::draw(&mut context),
        StyleSelection::Unrecognized(name) => {
            log::warn!("unrecognized pattern style '{name}', drawing base wash only");
        }
    }

    Raster::from_canvas(canvas)
}

fn draw_base_wash(context: &mut PatternContext<'_>) {
    let geometry = context.geometry;
    let primary = context.colors.primary_background;
    let card = context.colors.card_background;

    context
        .canvas.fill_rect(0.0, 0.0, geometry.width, geometry.height, primary.with_alpha(1.0));

    let square = geometry.min_side();
    for layer in 0..WASH_LAYERS {
        let progress = f64::from(layer) / f64::from(WASH_LAYERS);
        let size = square * (1.0 - progress);
        let color = if progress < 0.5 {
            blend(primary, card, progress * 2.0)
        } else {
            blend(card, primary, (progress - 0.5) * 2.0)
        };
        context.canvas.fill_rect(
            geometry.center_x - size / 2.0,
            geometry.center_y - size / 2.0,
            size,
            size,
            color.with_alpha(1.0),
        );
    }
}

/// Adds `(random() - 0.5) * amplitude` to R, G and B of every pixel, one
/// value per pixel, saturating at the 8-bit bounds.
pub fn apply_noise<R: Rng + ?Sized>(raster: &mut Raster, theme: Theme, rng: &mut R) {
    let amplitude = noise_amplitude(theme);
    for pixel in raster.pixmap.data_mut().chunks_exact_mut(4) {
        let noise = (rng.gen::<f64>() - 0.5) * amplitude;
        // The wash leaves every pixel opaque, so premultiplied == straight.
        for channel in &mut pixel[..3] {
            *channel = noisy_channel(*channel, noise);
        }
    }
}

/// Clamped 8-bit store: halves round to even, like a clamped byte array.
fn noisy_channel(value: u8, noise: f64) -> u8 {
    (f64::from(value) + noise).round_ties_even().clamp(0.0, 255.0) as u8
}

pub fn noise_amplitude(theme: Theme) -> f64 {
    match theme {
        Theme::Dark => DARK_NOISE_AMPLITUDE,
        Theme::Light => LIGHT_NOISE_AMPLITUDE,
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn noise_rounds_halves_to_even() {
        assert_eq!(noisy_channel(0, 0.5), 0);
        assert_eq!(noisy_channel(1, 0.5), 2);
        assert_eq!(noisy_channel(2, 0.5), 2);
        assert_eq!(noisy_channel(3, -0.5), 2);
        assert_eq!(noisy_channel(10, 0.6), 11);
        assert_eq!(noisy_channel(0, -4.0), 0);
        assert_eq!(noisy_channel(254, 4.0), 255);
    }

    #[test]
    fn landscape_and_portrait_dimensions() {
        assert_eq!(raster_dimensions(1600.0 / 900.0), (2048, 1152));
        assert_eq!(raster_dimensions(900.0 / 1600.0), (1152, 2048));
        assert_eq!(raster_dimensions(1.0), (2048, 2048));
    }

    #[test]
    fn degenerate_aspect_ratios_are_square() {
        assert_eq!(raster_dimensions(0.0), (2048, 2048));
        assert_eq!(raster_dimensions(-3.0), (2048, 2048));
        assert_eq!(raster_dimensions(f64::NAN), (2048, 2048));
        assert_eq!(raster_dimensions(f64::INFINITY), (2048, 2048));
        // extreme but valid ratios keep at least one pixel
        assert_eq!(raster_dimensions(1e9), (2048, 1));
    }

    #[test]
    fn geometry_uses_half_diagonal() {
        let geometry = PatternGeometry::new(300, 400);
        assert_eq!(geometry.center_x, 150.0);
        assert_eq!(geometry.center_y, 200.0);
        assert_eq!(geometry.max_radius, 250.0);
        assert_eq!(geometry.falloff(150.0, 200.0, 0.7, 0.1), 1.0);
        assert!((geometry.falloff(0.0, 0.0, 0.7, 0.1) - 0.3).abs() < 1e-12);
        assert_eq!(geometry.falloff(0.0, 0.0, 2.0, 0.1), 0.1);
    }

    #[test]
    fn seeded_random_is_fractional_and_repeatable() {
        for seed in [0.0, 1.0, 1001.0, 2003.0, 12345.5] {
            let value = seeded_random(seed);
            assert!((0.0..1.0).contains(&value));
            assert_eq!(value, seeded_random(seed));
        }
        assert_eq!(seeded_random(0.0), 0.0);
        let expected = {
            let x = 1.0_f64.sin() * 10000.0;
            x - x.floor()
        };
        assert_eq!(seeded_random(1.0), expected);
    }

    #[test]
    fn stepped_matches_loop_bounds() {
        let values: Vec<f64> = stepped(10.0, 40.0, 10.0).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(stepped(0.0, 10.0, 0.0).count(), 0);
        assert_eq!(stepped(0.0, 10.0, f64::NAN).count(), 0);
    }

    #[test]
    fn base_wash_centre_and_corner_colors() {
        let mut rng = StdRng::seed_from_u64(7);
        let raster = draw_pattern(
            1.0,
            &StyleSelection::Known(PatternStyle::Cherokee),
            Theme::Dark,
            &mut rng,
        );
        // corners sit outside every wash square
        assert_eq!(raster.pixel(0, 0), Some([0x14, 0x14, 0x14, 255]));
        // the last layer (progress 0.98) blends card -> primary at t = 0.96
        let center = raster.pixel(1024, 1024).expect("center pixel");
        assert_eq!(center, [20, 20, 20, 255]);
        // rows 512..532 are topped by the progress 0.5 layer, the pure card color
        assert_eq!(raster.pixel(1024, 520), Some([0x19, 0x19, 0x19, 255]));
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let mut rng = StdRng::seed_from_u64(42);
        let style = StyleSelection::Known(PatternStyle::Cherokee);
        let clean = draw_pattern(0.5, &style, Theme::Light, &mut rng);
        let mut noisy = clean.clone();
        apply_noise(&mut noisy, Theme::Light, &mut rng);

        let half = noise_amplitude(Theme::Light) / 2.0;
        let pairs = clean
            .pixmap()
            .data()
            .chunks_exact(4)
            .zip(noisy.pixmap().data().chunks_exact(4));
        for (before, after) in pairs {
            assert_eq!(after[3], 255);
            let delta = f64::from(after[0]) - f64::from(before[0]);
            assert!(delta.abs() <= half.ceil(), "noise {delta} exceeds amplitude");
            // one noise value per pixel for all channels, unless clamped
            if before[0] == before[1] && before[1] == before[2] {
                assert_eq!(after[0], after[1]);
                assert_eq!(after[1], after[2]);
            }
        }
    }

    #[test]
    fn rgba_export_matches_dimensions() {
        let mut rng = StdRng::seed_from_u64(1);
        let raster = generate_with_rng(2.0, &StyleSelection::default(), Theme::Dark, &mut rng);
        assert_eq!((raster.width(), raster.height()), (2048, 1024));
        assert_eq!(raster.to_rgba().len(), 2048 * 1024 * 4);
        assert_eq!(raster.digest().len(), 64);
        assert!(raster.to_image().is_some());
    }
}
