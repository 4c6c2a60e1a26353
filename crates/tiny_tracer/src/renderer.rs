//! Offline render driver.
//!
//! Buckets are rendered in parallel on the rayon pool. Every bucket owns a
//! sampler seeded from the render seed and its index, so the output does
//! not depend on how work lands on threads.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tiny_math::Vec2;

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::{Color, IndependentSampler, Integrator, IntegratorKind, PinholeCamera, Sampler};

/// Offline render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel. One sample goes through the pixel center; more
    /// are jittered across the pixel.
    pub spp: u32,
    pub seed: u64,
    pub bucket_size: u32,
    pub integrator: IntegratorKind,
    /// Apply gamma 2.0 when writing 8-bit output.
    pub gamma: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            spp: 1,
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            integrator: IntegratorKind::Normal,
            gamma: false,
        }
    }
}

impl RenderSettings {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color, gamma: bool) -> [u8; 4] {
    let encode = |c: f32| {
        let c = if gamma { linear_to_gamma(c) } else { c };
        (255.0 * c.clamp(0.0, 1.0) + 0.5) as u8
    };
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Render a single pixel, averaging `spp` samples.
pub fn render_pixel(
    camera: &PinholeCamera,
    integrator: &dyn Integrator,
    x: u32,
    y: u32,
    spp: u32,
    sampler: &mut dyn Sampler,
) -> Color {
    if spp <= 1 {
        let ray = camera.generate_ray(x, y, Vec2::splat(0.5));
        return integrator.render(&ray, sampler);
    }

    let mut pixel_color = Color::ZERO;
    for _ in 0..spp {
        let ray = camera.generate_ray(x, y, sampler.next_2d());
        pixel_color += integrator.render(&ray, sampler);
    }
    pixel_color / spp as f32
}

/// Linear RGB image produced by the offline pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let local_x = i as u32 % bucket.width;
            let local_y = i as u32 / bucket.width;
            self.set(bucket.x + local_x, bucket.y + local_y, *color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba8(&self, gamma: bool) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color, gamma));
        }
        bytes
    }

    /// Write the image; the format follows the file extension.
    pub fn save_png(&self, path: impl AsRef<Path>, gamma: bool) -> image::ImageResult<()> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            &self.to_rgba8(gamma),
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )?;
        log::info!("Saved {}x{} image to {:?}", self.width, self.height, path);
        Ok(())
    }
}

/// Render the whole image with `integrator`.
pub fn render_image(
    camera: &PinholeCamera,
    integrator: &dyn Integrator,
    settings: &RenderSettings,
) -> ImageBuffer {
    let buckets = generate_buckets(settings.width, settings.height, settings.bucket_size);
    log::info!(
        "Rendering {}x{} at {} spp with the {} integrator ({} buckets)",
        settings.width,
        settings.height,
        settings.spp,
        settings.integrator.name(),
        buckets.len()
    );

    let start = Instant::now();
    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let mut sampler = IndependentSampler::for_bucket(settings.seed, bucket.index);
            let pixels = render_bucket(bucket, camera, integrator, settings.spp, &mut sampler);
            BucketResult::new(*bucket, pixels)
        })
        .collect();

    let mut image = ImageBuffer::new(settings.width, settings.height);
    for result in &results {
        image.write_bucket(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bucket;

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::new(0.0, 1.0, 2.0), false), [0, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::splat(0.25), true), [128, 128, 128, 255]);
        assert_eq!(color_to_rgba(Color::splat(-1.0), true), [0, 0, 0, 255]);
    }

    #[test]
    fn test_write_bucket() {
        let mut image = ImageBuffer::new(4, 4);
        let bucket = Bucket::new(2, 1, 2, 2, 0);
        let pixels = vec![Color::X, Color::Y, Color::Z, Color::ONE];
        image.write_bucket(&BucketResult::new(bucket, pixels));

        assert_eq!(image.get(2, 1), Color::X);
        assert_eq!(image.get(3, 1), Color::Y);
        assert_eq!(image.get(2, 2), Color::Z);
        assert_eq!(image.get(3, 2), Color::ONE);
        assert_eq!(image.get(0, 0), Color::ZERO);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "width": 64, "spp": 4, "integrator": "normal" }"#).unwrap();
        assert_eq!(settings.width, 64);
        assert_eq!(settings.height, 512);
        assert_eq!(settings.spp, 4);
        assert_eq!(settings.bucket_size, DEFAULT_BUCKET_SIZE);
    }
}
