//! Window bootstrap and the render loop: winit + glutin own the surface,
//! glow talks to the context, and the pipeline crate owns everything that
//! can fail interestingly. Reload failures never take the window down; the
//! last good program keeps rendering.

use std::ffi::CString;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::DisplayBuilder;
use pipeline::{PipelineController, PlaybackClock};
use raw_window_handle::HasRawWindowHandle;
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::cli::Cli;
use crate::gl::{self, FrameUniforms, GlowDevice, RenderTarget, ScreenQuad, UniformBindings, POSITION_SLOT};
use crate::manifest::PlaygroundManifest;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Frames-per-second over rolling one-second windows, for the title bar.
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    last: u32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            last: 0,
        }
    }

    /// Counts one frame; true when a one-second window just closed and the
    /// title should refresh.
    fn tick(&mut self, now: Instant) -> bool {
        self.frames += 1;
        if now.saturating_duration_since(self.window_start) >= Duration::from_secs(1) {
            self.last = self.frames;
            self.frames = 0;
            self.window_start += Duration::from_secs(1);
            true
        } else {
            false
        }
    }
}

/// Cursor and button state backing both mouse-uniform dialects.
#[derive(Default)]
struct MouseState {
    position: (f64, f64),
    pressed: bool,
    drag: (f64, f64),
    click: (f64, f64),
}

impl MouseState {
    fn moved(&mut self, x: f64, y: f64) {
        self.position = (x, y);
        if self.pressed {
            self.drag = self.position;
        }
    }

    fn button(&mut self, pressed: bool) {
        self.pressed = pressed;
        if pressed {
            self.click = self.position;
            self.drag = self.position;
        }
    }

    /// GLSL-Heroku dialect: normalized, bottom-left origin.
    fn normalized(&self, width: f64, height: f64) -> [f32; 2] {
        [
            (self.position.0 / width) as f32,
            (1.0 - self.position.1 / height) as f32,
        ]
    }

    /// ShaderToy dialect: xy is the drag position in pixels, zw the latched
    /// click position with the sign flipped while the button is up.
    fn shadertoy(&self, height: f64) -> [f32; 4] {
        let sign = if self.pressed { 1.0 } else { -1.0 };
        [
            self.drag.0 as f32,
            (height - self.drag.1) as f32,
            (sign * self.click.0) as f32,
            (sign * (height - self.click.1)) as f32,
        ]
    }
}

fn title_line(base: &str, elapsed_secs: u64, fps: u32, divisor: u32, paused: bool) -> String {
    format!(
        "{base} - {elapsed_secs}s - [FPS: {fps}] @ {divisor}x{}",
        if paused { " (PAUSED)" } else { "" }
    )
}

pub fn run(cli: Cli) -> Result<()> {
    let manifest = PlaygroundManifest::discover(&cli.root)?;
    let recipe = manifest.recipe(&cli.root);
    let preamble_lines = cli.preamble_lines.unwrap_or(manifest.preamble_lines);
    let title_base = manifest.display_name().to_string();
    let (width, height) = cli.size;
    tracing::info!(
        root = %cli.root.display(),
        fragments = recipe.fragment.len(),
        preamble_lines,
        "starting playground"
    );

    let event_loop = EventLoop::new().context("failed to create event loop")?;

    let window_builder = WindowBuilder::new()
        .with_title(&title_base)
        .with_inner_size(PhysicalSize::new(width, height));
    let template = ConfigTemplateBuilder::new().with_alpha_size(8).with_depth_size(0);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("at least one GL config")
        })
        .map_err(|err| anyhow!("failed to build GL display: {err}"))?;
    let window = window.ok_or_else(|| anyhow!("no window was created"))?;

    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));
    let not_current: NotCurrentContext = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .map_err(|err| anyhow!("create_context failed: {err}"))?
    };

    let inner = window.inner_size();
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(inner.width.max(1)).expect("nonzero width"),
        NonZeroU32::new(inner.height.max(1)).expect("nonzero height"),
    );
    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .map_err(|err| anyhow!("create_window_surface failed: {err}"))?
    };
    let gl_context = not_current
        .make_current(&gl_surface)
        .map_err(|err| anyhow!("make_current failed: {err}"))?;
    if !cli.no_vsync {
        gl_surface
            .set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::new(1).unwrap()))
            .ok();
    }

    let glow_context = unsafe {
        glow::Context::from_loader_function(|symbol| {
            gl_display.get_proc_address(&CString::new(symbol).unwrap()) as *const _
        })
    };

    let device = GlowDevice::new(glow_context);
    let quad = ScreenQuad::new(device.gl()).map_err(|err| anyhow!("quad setup failed: {err}"))?;
    let mut controller = PipelineController::new(device, recipe, preamble_lines, POSITION_SLOT);

    // At startup there is no previous program to fall back to: a build
    // failure here is terminal for the process.
    controller
        .reload()
        .map_err(|err| anyhow!("initial shader build failed:\n{err}"))?;
    let mut bindings = UniformBindings::locate(
        controller.device().gl(),
        controller.active().expect("program installed by reload"),
    );

    let mut divisor = cli.scale;
    let mut target = RenderTarget::new(
        controller.device().gl(),
        (inner.width / divisor).max(1) as i32,
        (inner.height / divisor).max(1) as i32,
    )
    .map_err(|err| anyhow!("render target setup failed: {err}"))?;

    let mut clock = PlaybackClock::start();
    let mut fps = FpsCounter::new(Instant::now());
    let mut mouse = MouseState::default();
    let mut shift_held = false;

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => elwt.exit(),

                    WindowEvent::ModifiersChanged(modifiers) => {
                        shift_held = modifiers.state().shift_key();
                    }

                    WindowEvent::KeyboardInput { event, .. } => {
                        if !event.state.is_pressed() || event.repeat {
                            return;
                        }
                        let PhysicalKey::Code(code) = event.physical_key else {
                            return;
                        };
                        match code {
                            KeyCode::Escape => {
                                tracing::info!("closing (Esc)");
                                elwt.exit();
                                return;
                            }
                            KeyCode::Space => {
                                clock.toggle_pause();
                                tracing::info!(paused = clock.is_paused(), "playback toggled");
                            }
                            KeyCode::Digit1 => divisor = 1,
                            KeyCode::Digit2 => divisor = 2,
                            KeyCode::Digit3 => divisor = 4,
                            KeyCode::Digit4 => divisor = 8,
                            KeyCode::KeyR => {
                                clock.reset();
                                if shift_held {
                                    match controller.reload() {
                                        Ok(()) => {
                                            bindings = UniformBindings::locate(
                                                controller.device().gl(),
                                                controller.active().expect("program installed"),
                                            );
                                            tracing::info!("reloaded shader program");
                                        }
                                        Err(err) => tracing::warn!(
                                            "reload failed, keeping the previous program:\n{err}"
                                        ),
                                    }
                                } else {
                                    tracing::info!("time reset to zero");
                                }
                            }
                            _ => return,
                        }
                        if matches!(code, KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4) {
                            tracing::info!(divisor, "switched resolution divisor");
                        }
                        window.set_title(&title_line(
                            &title_base,
                            clock.elapsed().as_secs(),
                            fps.last,
                            divisor,
                            clock.is_paused(),
                        ));
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        mouse.moved(position.x, position.y);
                    }

                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => mouse.button(state == ElementState::Pressed),

                    WindowEvent::Resized(new_size) => {
                        let w = NonZeroU32::new(new_size.width.max(1)).unwrap();
                        let h = NonZeroU32::new(new_size.height.max(1)).unwrap();
                        gl_surface.resize(&gl_context, w, h);
                        window.request_redraw();
                    }

                    WindowEvent::RedrawRequested => {
                        let win = window.inner_size();
                        let window_width = win.width.max(1) as i32;
                        let window_height = win.height.max(1) as i32;
                        let scaled_width = (window_width / divisor as i32).max(1);
                        let scaled_height = (window_height / divisor as i32).max(1);

                        {
                            let gl = controller.device().gl();
                            if target.width != scaled_width || target.height != scaled_height {
                                target.resize(gl, scaled_width, scaled_height);
                            }
                            if let Some(program) = controller.active() {
                                let frame = FrameUniforms {
                                    resolution: [target.width as f32, target.height as f32],
                                    time: clock.elapsed().as_secs_f32(),
                                    mouse: mouse.normalized(win.width as f64, win.height as f64),
                                    i_mouse: mouse.shadertoy(win.height as f64),
                                };
                                gl::render_frame(
                                    gl,
                                    program,
                                    &quad,
                                    &target,
                                    &bindings,
                                    &frame,
                                    window_width,
                                    window_height,
                                );
                                if let Err(err) = gl_surface.swap_buffers(&gl_context) {
                                    tracing::error!("swap_buffers failed: {err}");
                                }
                            }
                        }

                        if fps.tick(Instant::now()) {
                            window.set_title(&title_line(
                                &title_base,
                                clock.elapsed().as_secs(),
                                fps.last,
                                divisor,
                                clock.is_paused(),
                            ));
                        }
                    }

                    _ => {}
                },

                Event::AboutToWait => window.request_redraw(),

                Event::LoopExiting => {
                    let gl = controller.device().gl();
                    target.destroy(gl);
                    quad.destroy(gl);
                }

                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
