//! Interactive viewer: SimplePass on a window surface with an egui overlay.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tiny_core::Scene;
use tiny_math::Vec3;
use tiny_raster::{Light, PassConfig, RenderError, RenderPass, SimplePass, WgpuGpu};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::Config;

const ORBIT_SENSITIVITY: f32 = 0.005;
const DOLLY_PER_LINE: f32 = 0.1;
const DOLLY_PER_PIXEL: f32 = 0.002;

/// Open a window and run the frame loop until it is closed.
pub fn run(config: &Config) -> Result<()> {
    let scene = config.scene.build().context("Failed to build scene")?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&scene, config);
    log::info!("Running event loop");
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Frame timing shown in the stats panel.
#[derive(Default)]
struct FrameStats {
    fps: f32,
    frame_ms: f32,
    frame_count: u32,
    timer: f32,
}

impl FrameStats {
    fn update(&mut self, delta_time: f32) {
        self.frame_count += 1;
        self.timer += delta_time;
        self.frame_ms = delta_time * 1000.0;

        // Update FPS every 0.5 seconds
        if self.timer >= 0.5 {
            self.fps = self.frame_count as f32 / self.timer;
            self.frame_count = 0;
            self.timer = 0.0;
        }
    }
}

/// Everything that exists only while a window does.
struct Viewport<'s> {
    window: Arc<Window>,
    gpu: WgpuGpu,
    pass: SimplePass<'s>,
    scene_light: Light,

    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl<'s> Viewport<'s> {
    fn new(event_loop: &ActiveEventLoop, scene: &'s Scene, config: &Config) -> Result<Self> {
        let window_attrs = Window::default_attributes()
            .with_title("TinyRender")
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let mut gpu = pollster::block_on(WgpuGpu::new(window.clone()))
            .context("Failed to initialize GPU")?;
        let (width, height) = gpu.size();

        let pass_config = PassConfig {
            clear_color: [0.1, 0.2, 0.3, 1.0],
            ..PassConfig::new(width, height).with_light(config.scene.light.into())
        };
        let mut pass = SimplePass::new(scene, config.scene.camera.to_camera(pass_config.aspect()));
        pass.init(&mut gpu, &pass_config)
            .context("Failed to initialize render pass")?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            gpu.device(),
            gpu.surface_format(),
            None, // No depth testing for egui
            1,
            false,
        );
        log::info!("Viewport ready at {}x{}", width, height);

        Ok(Self {
            window,
            gpu,
            pass,
            scene_light: pass_config.light,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.pass.resize(width, height);
    }

    /// Build the UI, draw the scene, then draw the UI on top and present.
    fn redraw(&mut self, stats: &FrameStats) -> Result<(), RenderError> {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        let mut light = self.pass.base().light();
        let scene_light = self.scene_light;
        let objects = self.pass.objects().len();
        let vertices: u32 = self.pass.objects().iter().map(|o| o.vertex_count).sum();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::SidePanel::left("light_panel")
                .default_width(240.0)
                .show(ctx, |ui| {
                    ui.heading("TinyRender");
                    ui.separator();
                    ui.label(format!("FPS: {:.1}", stats.fps));
                    ui.label(format!("Frame: {:.2} ms", stats.frame_ms));
                    ui.label(format!("Objects: {}", objects));
                    ui.label(format!("Triangles: {}", vertices / 3));

                    ui.separator();
                    ui.heading("Light");
                    vec3_row(ui, "Position", &mut light.position, 0.05);
                    vec3_row(ui, "Intensity", &mut light.intensity, 0.1);
                    light.intensity = light.intensity.max(Vec3::ZERO);
                    if ui.button("Reset").clicked() {
                        light = scene_light;
                    }

                    ui.separator();
                    ui.label("Left drag: orbit");
                    ui.label("Wheel: dolly");
                });
        });

        // Light edits take effect in this frame's uniforms.
        *self.pass.base_mut().light_mut() = light;

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        self.pass.render(&mut self.gpu)?;

        let Some(frame) = self.gpu.take_frame() else {
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = self.gpu.size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui Encoder"),
            });

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(self.gpu.device(), self.gpu.queue(), *id, image_delta);
        }
        self.egui_renderer.update_buffers(
            self.gpu.device(),
            self.gpu.queue(),
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime(); // egui renderer needs a 'static pass

            self.egui_renderer
                .render(&mut egui_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn vec3_row(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut value.x).speed(speed).prefix("x: "));
        ui.add(egui::DragValue::new(&mut value.y).speed(speed).prefix("y: "));
        ui.add(egui::DragValue::new(&mut value.z).speed(speed).prefix("z: "));
    });
}

struct App<'s> {
    scene: &'s Scene,
    config: &'s Config,
    viewport: Option<Viewport<'s>>,
    error: Option<anyhow::Error>,

    // Input state
    left_mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    last_frame_time: Instant,
    stats: FrameStats,
}

impl<'s> App<'s> {
    fn new(scene: &'s Scene, config: &'s Config) -> Self {
        Self {
            scene,
            config,
            viewport: None,
            error: None,
            left_mouse_pressed: false,
            last_mouse_pos: None,
            last_frame_time: Instant::now(),
            stats: FrameStats::default(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewport.is_some() {
            return;
        }
        match Viewport::new(event_loop, self.scene, self.config) {
            Ok(viewport) => {
                viewport.window.request_redraw();
                self.viewport = Some(viewport);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(viewport) = &mut self.viewport else {
            return;
        };

        // Let egui handle the event first
        if viewport
            .egui_state
            .on_window_event(&viewport.window, &event)
            .consumed
        {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewport.resize(size.width, size.height);
                log::info!("Resized to {}x{}", size.width, size.height);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.left_mouse_pressed = state == ElementState::Pressed;
                if !self.left_mouse_pressed {
                    self.last_mouse_pos = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.left_mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let delta_x = (position.x - last_x) as f32;
                        let delta_y = (position.y - last_y) as f32;
                        viewport.pass.base_mut().camera.orbit(
                            -delta_x * ORBIT_SENSITIVITY,
                            -delta_y * ORBIT_SENSITIVITY,
                        );
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * DOLLY_PER_LINE,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * DOLLY_PER_PIXEL,
                };
                viewport.pass.base_mut().camera.dolly(-amount);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta_time = (now - self.last_frame_time).as_secs_f32();
                self.last_frame_time = now;
                self.stats.update(delta_time);

                match viewport.redraw(&self.stats) {
                    Ok(()) => {}
                    Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        viewport.gpu.reconfigure();
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                        log::error!("Out of memory!");
                        event_loop.exit();
                    }
                    Err(e) => log::error!("Render error: {}", e),
                }

                // Request next frame
                viewport.window.request_redraw();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut viewport) = self.viewport.take() {
            if let Err(e) = viewport.pass.clean_up(&mut viewport.gpu) {
                log::error!("Clean up failed: {}", e);
            }
        }
    }
}
