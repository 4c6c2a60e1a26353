mod app;
mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tiny_raster::{PassConfig, RecordingGpu, RenderPass, SimplePass};
use tiny_tracer::{render_image, PinholeCamera};

use crate::config::Config;

const USAGE: &str = "\
usage: tiny_viewer render <scene.json> [output.png]
       tiny_viewer view <scene.json>
       tiny_viewer check <scene.json>";

/// Offline render to PNG.
fn render(config: &Config, output: &Path) -> Result<()> {
    let scene = config.scene.build().context("Failed to build scene")?;
    let settings = &config.render;

    let camera = config.scene.camera.to_camera(settings.aspect());
    let camera = PinholeCamera::new(&camera, settings.width, settings.height);
    let integrator = settings.integrator.build(&scene);

    let image = render_image(&camera, integrator.as_ref(), settings);
    image
        .save_png(output, settings.gamma)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!("Wrote {}", output.display());
    Ok(())
}

/// Run one real-time frame against the recording backend and report what
/// the pass drew. Needs no window or GPU.
fn check(config: &Config) -> Result<()> {
    let scene = config.scene.build().context("Failed to build scene")?;
    let settings = &config.render;

    let mut gpu = RecordingGpu::new();
    let mut pass = SimplePass::new(&scene, config.scene.camera.to_camera(settings.aspect()));
    let pass_config =
        PassConfig::new(settings.width, settings.height).with_light(config.scene.light.into());

    pass.init(&mut gpu, &pass_config)?;
    pass.render(&mut gpu)?;

    for (shape, draw) in scene.shapes().iter().zip(gpu.draws()) {
        log::info!(
            "{}: {} vertices with {} ({} uniforms)",
            shape.name,
            draw.count,
            draw.fragment_shader,
            draw.uniforms_set.len()
        );
    }

    pass.clean_up(&mut gpu)?;
    let leaked = gpu.live_programs() + gpu.live_buffers() + gpu.live_vertex_arrays();
    if leaked > 0 {
        bail!("{} GPU objects still alive after clean up", leaked);
    }

    log::info!(
        "Checked {} shapes: {} draws in {} frame",
        scene.shape_count(),
        gpu.draws().len(),
        gpu.frames()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, scene_path) = match args.as_slice() {
        [command, scene, ..] => (command.as_str(), PathBuf::from(scene)),
        _ => bail!("{}", USAGE),
    };

    let config = Config::load(&scene_path)?;
    log::info!("Loaded {}", scene_path.display());

    match command {
        "render" => {
            let output = args
                .get(2)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("render.png"));
            render(&config, &output)
        }
        "view" => app::run(&config),
        "check" => check(&config),
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}
