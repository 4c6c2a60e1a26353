//! TinyRender offline pipeline.
//!
//! Integrators compute the radiance carried by a camera ray; the bucket
//! driver fans pixels out over rayon workers and collects an [`ImageBuffer`].
//!
//! ```ignore
//! use tiny_tracer::{render_image, PinholeCamera, RenderSettings};
//!
//! let settings = RenderSettings::default();
//! let camera = PinholeCamera::new(&description.camera.to_camera(1.0), settings.width, settings.height);
//! let integrator = settings.integrator.build(&scene);
//! render_image(&camera, integrator.as_ref(), &settings).save_png("out.png", settings.gamma)?;
//! ```

mod bucket;
mod camera;
mod integrator;
mod normal;
mod renderer;
mod sampler;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::PinholeCamera;
pub use integrator::{Integrator, IntegratorKind};
pub use normal::NormalIntegrator;
pub use renderer::{color_to_rgba, render_image, render_pixel, ImageBuffer, RenderSettings};
pub use sampler::{IndependentSampler, Sampler};

pub use tiny_core::Color;
