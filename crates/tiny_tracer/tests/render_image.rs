use tiny_core::{Bsdf, Mesh, Scene, Shape};
use tiny_math::{Camera, Vec3};
use tiny_tracer::{render_image, PinholeCamera, RenderSettings};

fn quad_scene() -> Scene {
    Scene::new(vec![Shape::new("quad", Mesh::quad())], vec![Bsdf::default()]).unwrap()
}

fn settings(width: u32, height: u32) -> RenderSettings {
    RenderSettings {
        width,
        height,
        bucket_size: 8,
        ..Default::default()
    }
}

fn pinhole(settings: &RenderSettings) -> PinholeCamera {
    let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, settings.aspect());
    PinholeCamera::new(&camera, settings.width, settings.height)
}

#[test]
fn image_shows_quad_in_the_middle() {
    let scene = quad_scene();
    let settings = settings(33, 21);
    let integrator = settings.integrator.build(&scene);

    let image = render_image(&pinhole(&settings), integrator.as_ref(), &settings);
    assert_eq!(image.pixels.len(), 33 * 21);

    assert!((image.get(16, 10) - Vec3::Z).length() < 1e-5);
    assert_eq!(image.get(0, 0), Vec3::ZERO);
    assert_eq!(image.get(32, 20), Vec3::ZERO);
}

#[test]
fn parallel_render_is_deterministic() {
    let scene = Scene::new(
        vec![Shape::new("sphere", Mesh::uv_sphere(32, 16))],
        vec![Bsdf::default()],
    )
    .unwrap();
    let settings = RenderSettings {
        spp: 4,
        seed: 1234,
        ..settings(40, 30)
    };
    let integrator = settings.integrator.build(&scene);
    let camera = pinhole(&settings);

    let first = render_image(&camera, integrator.as_ref(), &settings);
    let second = render_image(&camera, integrator.as_ref(), &settings);
    assert_eq!(first, second);
    assert!(first
        .pixels
        .iter()
        .all(|c| c.is_finite() && c.min_element() >= 0.0 && c.max_element() <= 1.0 + 1e-5));
}

#[test]
fn zero_sized_image_renders_nothing() {
    let scene = quad_scene();
    let settings = settings(0, 0);
    let integrator = settings.integrator.build(&scene);

    let image = render_image(&pinhole(&settings), integrator.as_ref(), &settings);
    assert!(image.pixels.is_empty());
}

#[test]
fn rgba_output_matches_image_size() {
    let scene = quad_scene();
    let settings = settings(8, 8);
    let integrator = settings.integrator.build(&scene);

    let image = render_image(&pinhole(&settings), integrator.as_ref(), &settings);
    let bytes = image.to_rgba8(settings.gamma);
    assert_eq!(bytes.len(), 8 * 8 * 4);
    assert!(bytes.chunks_exact(4).all(|px| px[3] == 255));
}
