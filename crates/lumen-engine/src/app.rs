//! Application lifecycle management.
//!
//! Opens the window, builds the particle system and runs the frame loop:
//! fixed-rate particle ticks, camera steering, then one render per frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use lumen_kernel::ParticleSystem;
use tracing::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::input::{Action, InputHandler};
use crate::renderer::Renderer;
use crate::timing::{FpsCounter, FrameLimiter, TickClock};

/// GPU state that exists once the window is up.
struct Scene {
    window: Arc<Window>,
    renderer: Renderer,
    particles: ParticleSystem,
}

/// Application state machine.
struct LumenApp {
    /// Demo configuration
    config: EngineConfig,
    /// Window, renderer and particles (created on resume)
    scene: Option<Scene>,
    /// Keyboard state
    input: InputHandler,
    /// Fixed-rate tick source
    clock: TickClock,
    /// Frame limiter for VSync-off mode
    limiter: FrameLimiter,
    /// Periodic FPS reporting
    fps_counter: Option<FpsCounter>,
    /// Viewer
    camera: Camera,
    /// Time of the previous frame, for camera steering
    last_frame: Instant,
    /// Fatal error raised inside the event loop
    failure: Option<anyhow::Error>,
}

impl LumenApp {
    /// Creates a new application instance.
    fn new(config: EngineConfig) -> Self {
        let fps_counter = (config.fps_log_interval > 0.0)
            .then(|| FpsCounter::new(Duration::from_secs_f32(config.fps_log_interval)));

        Self {
            clock: TickClock::new(config.tick_rate),
            limiter: FrameLimiter::new(config.target_fps, config.vsync),
            camera: Camera::new(&config.camera, config.window_width, config.window_height),
            input: InputHandler::new(),
            fps_counter,
            last_frame: Instant::now(),
            scene: None,
            failure: None,
            config,
        }
    }

    /// Creates the window, renderer and particle system.
    fn create_scene(&self, event_loop: &ActiveEventLoop) -> Result<Scene> {
        let window_attrs = Window::default_attributes()
            .with_title("Lumen")
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let mut renderer = pollster::block_on(Renderer::new(window.clone(), self.config.vsync))?;
        let particles = renderer
            .create_particle_system(&self.config.particles)
            .context("Failed to create particle system")?;

        Ok(Scene {
            window,
            renderer,
            particles,
        })
    }

    /// Applies a one-shot key action.
    fn apply(&mut self, action: Action, event_loop: &ActiveEventLoop) {
        match action {
            Action::ToggleBillboarding => {
                if let Some(scene) = &mut self.scene {
                    let enabled = !scene.particles.billboarding();
                    scene.particles.set_billboarding(enabled);
                    info!("Billboarding {}", if enabled { "on" } else { "off" });
                }
            },
            Action::TogglePause => {
                let paused = self.clock.toggle_pause();
                info!("Simulation {}", if paused { "paused" } else { "resumed" });
            },
            Action::Exit => {
                info!("Escape pressed, shutting down...");
                event_loop.exit();
            },
        }
    }

    /// Runs ticks due this frame, steers the camera and renders.
    fn update_and_render(&mut self) -> Result<()> {
        self.limiter.begin();

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.25);
        self.last_frame = now;

        let (yaw, pitch) = self.input.turn_axis();
        self.camera.turn(yaw, pitch, dt);

        let Some(scene) = &mut self.scene else {
            return Ok(());
        };

        let ticks = self.clock.frame();
        if ticks > 0 {
            let respawned = scene.particles.update_steps(ticks);
            debug!("Ran {} ticks, {} respawns", ticks, respawned);
        }

        let drawn = scene.renderer.render(
            &scene.particles,
            self.camera.view_proj(),
            self.camera.forward(),
            self.config.particle_scale,
        )?;

        if let Some((fps, frame_time)) = self.fps_counter.as_mut().and_then(FpsCounter::tick) {
            info!(
                "FPS: {:.1}, Frame: {:.2}ms, Particles drawn: {}, Ticks: {}",
                fps,
                frame_time,
                drawn,
                self.clock.total_ticks()
            );
        }

        self.limiter.sleep_remainder();
        Ok(())
    }

    /// Stops the loop with an error to report from [`run`].
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for LumenApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }

        info!("Application resumed, creating window...");
        match self.create_scene(event_loop) {
            Ok(scene) => {
                info!(
                    "Lumen ready - {} particles, {} ticks/s",
                    scene.particles.particle_count(),
                    self.config.tick_rate
                );
                scene.window.request_redraw();
                self.scene = Some(scene);
                self.clock.reset();
                self.last_frame = Instant::now();
            },
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(action) = self.input.handle_event(&event) {
            self.apply(action, event_loop);
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down...");
                event_loop.exit();
            },
            WindowEvent::Resized(new_size) => {
                if let Some(scene) = &mut self.scene {
                    scene.renderer.resize(new_size);
                }
                self.camera.set_viewport(new_size.width, new_size.height);
            },
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.update_and_render() {
                    self.fail(event_loop, e);
                    return;
                }

                if let Some(scene) = &self.scene {
                    scene.window.request_redraw();
                }
            },
            _ => {},
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(Scene {
            mut renderer,
            particles,
            ..
        }) = self.scene.take()
        {
            renderer.release_particle_system(particles);
            info!("Presented {} frames", renderer.frame_count());
        }
    }
}

/// Runs the main application loop.
pub fn run() -> Result<()> {
    let mut config = EngineConfig::load();
    config.validate();

    info!("Configuration loaded:");
    info!("  Window: {}x{}", config.window_width, config.window_height);
    info!("  VSync: {}", config.vsync);
    info!("  Tick rate: {}/s", config.tick_rate);
    info!("  Texture: {}", config.particles.texture_path.display());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LumenApp::new(config);

    info!("Starting event loop...");
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.failure.take() {
        return Err(err);
    }

    Ok(())
}
