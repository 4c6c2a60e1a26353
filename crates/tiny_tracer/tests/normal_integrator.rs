use tiny_core::{Bsdf, Mesh, Scene, Shape};
use tiny_math::{Mat4, Ray, Vec3};
use tiny_tracer::{IndependentSampler, Integrator, IntegratorKind, NormalIntegrator, Sampler};

fn scene_with(mesh: Mesh) -> Scene {
    Scene::new(vec![Shape::new("quad", mesh)], vec![Bsdf::default()]).unwrap()
}

fn toward_origin() -> Ray {
    Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z)
}

#[test]
fn miss_returns_black() {
    let scene = scene_with(Mesh::quad());
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
    assert_eq!(integrator.render(&away, &mut sampler), Vec3::ZERO);

    let beside = Ray::new(Vec3::new(3.0, 0.0, 5.0), -Vec3::Z);
    assert_eq!(integrator.render(&beside, &mut sampler), Vec3::ZERO);
}

#[test]
fn empty_scene_is_black() {
    let scene = Scene::empty();
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    assert_eq!(integrator.render(&toward_origin(), &mut sampler), Vec3::ZERO);
}

#[test]
fn hit_returns_absolute_normal() {
    let scene = scene_with(Mesh::quad());
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    let color = integrator.render(&toward_origin(), &mut sampler);
    assert!((color - Vec3::Z).length() < 1e-5);
}

#[test]
fn back_facing_normal_is_folded_positive() {
    let flipped = Mesh::quad().transformed(&Mat4::from_rotation_y(std::f32::consts::PI));
    let scene = scene_with(flipped);
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    let color = integrator.render(&toward_origin(), &mut sampler);
    assert!((color - Vec3::Z).length() < 1e-5);
}

#[test]
fn tilted_surface_colors_stay_in_unit_range() {
    let tilted = Mesh::quad().transformed(&Mat4::from_rotation_y(-std::f32::consts::FRAC_PI_4));
    let scene = scene_with(tilted);
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    let color = integrator.render(&toward_origin(), &mut sampler);
    let expected = std::f32::consts::FRAC_1_SQRT_2;
    assert!((color.x - expected).abs() < 1e-4);
    assert!(color.y.abs() < 1e-4);
    assert!((color.z - expected).abs() < 1e-4);
    assert!(color.min_element() >= 0.0 && color.max_element() <= 1.0);
}

#[test]
fn render_is_idempotent_and_leaves_sampler_alone() {
    let scene = scene_with(Mesh::uv_sphere(24, 12));
    let integrator = IntegratorKind::Normal.build(&scene);

    let mut sampler = IndependentSampler::new(9);
    let mut untouched = IndependentSampler::new(9);

    let ray = Ray::new(Vec3::new(0.2, 0.3, 5.0), -Vec3::Z);
    let first = integrator.render(&ray, &mut sampler);
    let second = integrator.render(&ray, &mut sampler);
    assert_eq!(first, second);
    assert!(first.is_finite());

    assert_eq!(sampler.next_1d(), untouched.next_1d());
}

#[test]
fn zero_direction_ray_is_a_miss() {
    let scene = scene_with(Mesh::cube());
    let integrator = NormalIntegrator::new(&scene);
    let mut sampler = IndependentSampler::new(0);

    let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
    assert_eq!(integrator.render(&ray, &mut sampler), Vec3::ZERO);
}
