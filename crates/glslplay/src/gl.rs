//! Everything that talks to OpenGL through glow: the [`GlowDevice`] backing
//! the build pipeline, the static full-screen quad, per-frame uniform
//! upload for both uniform dialects, and the offscreen render target used
//! for resolution scaling.

use glow::HasContext;
use pipeline::{ShaderDevice, StageKind};

/// Vertex-attribute slot the quad's position stream is bound to; the
/// pipeline binds the same slot by name before linking.
pub const POSITION_SLOT: u32 = 0;

/// Screen-covering triangle strip, matching the quad the playground has
/// always drawn.
const QUAD_VERTICES: [f32; 8] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    1.0, 1.0,
];

/// glow-backed implementation of the pipeline's device capability.
pub struct GlowDevice {
    gl: glow::Context,
}

impl GlowDevice {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl ShaderDevice for GlowDevice {
    type Stage = glow::NativeShader;
    type Program = glow::NativeProgram;

    fn create_stage(&self, kind: StageKind) -> Result<Self::Stage, String> {
        let target = match kind {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl.create_shader(target) }
    }

    fn compile(&self, stage: Self::Stage, source: &str) -> bool {
        unsafe {
            self.gl.shader_source(stage, source);
            self.gl.compile_shader(stage);
            self.gl.get_shader_compile_status(stage)
        }
    }

    fn compile_log(&self, stage: Self::Stage) -> String {
        unsafe { self.gl.get_shader_info_log(stage) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach(&self, program: Self::Program, stage: Self::Stage) {
        unsafe { self.gl.attach_shader(program, stage) }
    }

    fn bind_attrib_location(&self, program: Self::Program, slot: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, slot, name) }
    }

    fn link(&self, program: Self::Program) -> bool {
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn link_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn destroy_stage(&self, stage: Self::Stage) {
        unsafe { self.gl.delete_shader(stage) }
    }

    fn destroy_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }
}

/// The static quad: one VAO/VBO pair uploaded once at startup.
pub struct ScreenQuad {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
}

impl ScreenQuad {
    pub fn new(gl: &glow::Context) -> Result<Self, String> {
        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = gl.create_buffer()?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD_VERTICES),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(POSITION_SLOT);
            gl.vertex_attrib_pointer_f32(POSITION_SLOT, 2, glow::FLOAT, false, 0, 0);
            gl.bind_vertex_array(None);

            Ok(Self { vao, vbo })
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_buffer(self.vbo);
            gl.delete_vertex_array(self.vao);
        }
    }
}

/// Offscreen color target the shader renders into; the window gets a
/// linear-filtered blit, which is what makes the resolution divisor an
/// actual render-scale control instead of a title cosmetic.
pub struct RenderTarget {
    fbo: glow::NativeFramebuffer,
    tex: glow::NativeTexture,
    pub width: i32,
    pub height: i32,
}

impl RenderTarget {
    pub fn new(gl: &glow::Context, width: i32, height: i32) -> Result<Self, String> {
        unsafe {
            let fbo = gl.create_framebuffer()?;
            let tex = gl.create_texture()?;
            let width = width.max(1);
            let height = height.max(1);

            gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(tex),
                0,
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                gl.bind_texture(glow::TEXTURE_2D, None);
                gl.delete_framebuffer(fbo);
                gl.delete_texture(tex);
                return Err(format!("framebuffer incomplete: 0x{status:x}"));
            }

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);

            Ok(Self {
                fbo,
                tex,
                width,
                height,
            })
        }
    }

    /// Reallocates texture storage; keeps the same FBO/texture ids.
    pub fn resize(&mut self, gl: &glow::Context, width: i32, height: i32) {
        self.width = width.max(1);
        self.height = height.max(1);
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.tex));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                self.width,
                self.height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.fbo);
            gl.delete_texture(self.tex);
        }
    }
}

/// Per-frame uniform values in both dialects the playground feeds.
pub struct FrameUniforms {
    /// Render-target size in pixels (after the divisor).
    pub resolution: [f32; 2],
    pub time: f32,
    /// GLSL-Heroku mouse: normalized, bottom-left origin.
    pub mouse: [f32; 2],
    /// ShaderToy mouse: drag position in pixels, click position in zw with
    /// the sign flipped while the button is up.
    pub i_mouse: [f32; 4],
}

/// Uniform locations for the active program, looked up once per successful
/// build. Shaders declare whichever subset they want; missing uniforms stay
/// `None` and are skipped.
pub struct UniformBindings {
    resolution: Option<glow::NativeUniformLocation>,
    time: Option<glow::NativeUniformLocation>,
    mouse: Option<glow::NativeUniformLocation>,
    i_resolution: Option<glow::NativeUniformLocation>,
    i_time: Option<glow::NativeUniformLocation>,
    i_mouse: Option<glow::NativeUniformLocation>,
}

impl UniformBindings {
    pub fn locate(gl: &glow::Context, program: glow::NativeProgram) -> Self {
        unsafe {
            Self {
                resolution: gl.get_uniform_location(program, "resolution"),
                time: gl.get_uniform_location(program, "time"),
                mouse: gl.get_uniform_location(program, "mouse"),
                i_resolution: gl.get_uniform_location(program, "iResolution"),
                i_time: gl.get_uniform_location(program, "iTime"),
                i_mouse: gl.get_uniform_location(program, "iMouse"),
            }
        }
    }

    /// Uploads the frame values. The program must be in use.
    fn apply(&self, gl: &glow::Context, frame: &FrameUniforms) {
        let [width, height] = frame.resolution;
        unsafe {
            gl.uniform_2_f32(self.resolution.as_ref(), width, height);
            gl.uniform_1_f32(self.time.as_ref(), frame.time);
            gl.uniform_2_f32(self.mouse.as_ref(), frame.mouse[0], frame.mouse[1]);
            gl.uniform_3_f32(self.i_resolution.as_ref(), width, height, 1.0);
            gl.uniform_1_f32(self.i_time.as_ref(), frame.time);
            gl.uniform_4_f32(
                self.i_mouse.as_ref(),
                frame.i_mouse[0],
                frame.i_mouse[1],
                frame.i_mouse[2],
                frame.i_mouse[3],
            );
        }
    }
}

/// One frame: render the quad into the offscreen target with the given
/// uniforms, then blit the result across the window's framebuffer.
pub fn render_frame(
    gl: &glow::Context,
    program: glow::NativeProgram,
    quad: &ScreenQuad,
    target: &RenderTarget,
    bindings: &UniformBindings,
    frame: &FrameUniforms,
    window_width: i32,
    window_height: i32,
) {
    unsafe {
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));
        gl.viewport(0, 0, target.width, target.height);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT);

        gl.use_program(Some(program));
        bindings.apply(gl, frame);
        gl.bind_vertex_array(Some(quad.vao));
        gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
        gl.bind_vertex_array(None);
        gl.use_program(None);

        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.fbo));
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        gl.blit_framebuffer(
            0,
            0,
            target.width,
            target.height,
            0,
            0,
            window_width,
            window_height,
            glow::COLOR_BUFFER_BIT,
            glow::LINEAR,
        );
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    }
}
