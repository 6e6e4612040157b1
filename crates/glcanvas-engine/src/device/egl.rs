//! EGL + GLES2 + Skia driver.
//!
//! GL entry points are resolved through `eglGetProcAddress` on first use.
//! Every GL call assumes the caller made a context current, which the session
//! guarantees through [`CurrentContext`](super::CurrentContext).

use std::cell::OnceCell;
use std::ffi::c_void;

use glow::HasContext;
use khronos_egl as egl;
use skia_safe::gpu;

use super::driver::{DrawingBackend, GlApi, PlatformApi, ReleaseMode, ShaderStage};
use super::error::{DriverError, DriverResult};
use super::init::ConfigAttribs;

fn egl_err(err: egl::Error) -> DriverError {
    DriverError::new(err.to_string())
}

pub struct EglDriver {
    egl: egl::Instance<egl::Static>,
    gl: OnceCell<glow::Context>,
}

impl Default for EglDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl EglDriver {
    pub fn new() -> Self {
        Self {
            egl: egl::Instance::new(egl::Static),
            gl: OnceCell::new(),
        }
    }

    fn gl(&self) -> &glow::Context {
        self.gl.get_or_init(|| {
            log::debug!("loading GL entry points");
            // SAFETY: the loader only returns addresses from eglGetProcAddress.
            unsafe {
                glow::Context::from_loader_function(|name| {
                    self.egl
                        .get_proc_address(name)
                        .map_or(std::ptr::null(), |f| f as *const c_void)
                })
            }
        })
    }

    fn gl_error(&self) -> Option<u32> {
        // SAFETY: only called with a context current.
        let code = unsafe { self.gl().get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}

impl PlatformApi for EglDriver {
    type Display = egl::Display;
    type Config = egl::Config;
    type Context = egl::Context;
    type Surface = egl::Surface;

    fn default_display(&self) -> Option<egl::Display> {
        // SAFETY: EGL_DEFAULT_DISPLAY is always a valid native display id.
        unsafe { self.egl.get_display(egl::DEFAULT_DISPLAY) }
    }

    fn initialize(&self, display: egl::Display) -> DriverResult<(i32, i32)> {
        self.egl.initialize(display).map_err(egl_err)
    }

    fn choose_config(
        &self,
        display: egl::Display,
        attribs: &ConfigAttribs,
    ) -> DriverResult<Option<egl::Config>> {
        let attributes = [
            egl::RENDERABLE_TYPE,
            egl::OPENGL_ES2_BIT,
            egl::SURFACE_TYPE,
            egl::WINDOW_BIT,
            egl::ALPHA_SIZE,
            attribs.alpha,
            egl::BLUE_SIZE,
            attribs.blue,
            egl::GREEN_SIZE,
            attribs.green,
            egl::RED_SIZE,
            attribs.red,
            egl::DEPTH_SIZE,
            attribs.depth,
            egl::STENCIL_SIZE,
            attribs.stencil,
            egl::NONE,
        ];
        self.egl
            .choose_first_config(display, &attributes)
            .map_err(egl_err)
    }

    fn create_context(
        &self,
        display: egl::Display,
        config: egl::Config,
        client_version: i32,
    ) -> DriverResult<egl::Context> {
        let attributes = [egl::CONTEXT_CLIENT_VERSION, client_version, egl::NONE];
        self.egl
            .create_context(display, config, None, &attributes)
            .map_err(egl_err)
    }

    fn create_pbuffer_surface(
        &self,
        display: egl::Display,
        config: egl::Config,
        size: Option<(i32, i32)>,
    ) -> DriverResult<egl::Surface> {
        let attributes = match size {
            Some((width, height)) => vec![egl::WIDTH, width, egl::HEIGHT, height, egl::NONE],
            None => vec![egl::NONE],
        };
        self.egl
            .create_pbuffer_surface(display, config, &attributes)
            .map_err(egl_err)
    }

    fn make_current(
        &self,
        display: egl::Display,
        surface: Option<egl::Surface>,
        context: Option<egl::Context>,
    ) -> DriverResult<()> {
        self.egl
            .make_current(display, surface, surface, context)
            .map_err(egl_err)
    }

    fn destroy_surface(&self, display: egl::Display, surface: egl::Surface) -> DriverResult<()> {
        self.egl.destroy_surface(display, surface).map_err(egl_err)
    }

    fn destroy_context(&self, display: egl::Display, context: egl::Context) -> DriverResult<()> {
        self.egl.destroy_context(display, context).map_err(egl_err)
    }

    fn terminate(&self, display: egl::Display) -> DriverResult<()> {
        self.egl.terminate(display).map_err(egl_err)
    }
}

impl GlApi for EglDriver {
    type Buffer = glow::NativeBuffer;
    type Shader = glow::NativeShader;
    type Program = glow::NativeProgram;

    fn take_error(&self) -> Option<u32> {
        // Querying GL without a current context is undefined.
        self.egl.get_current_context()?;
        self.gl_error()
    }

    fn create_vertex_buffer(&self, data: &[u8]) -> DriverResult<glow::NativeBuffer> {
        let gl = self.gl();
        // SAFETY: the session holds a CurrentContext token for GL work.
        unsafe {
            let buffer = gl.create_buffer().map_err(DriverError)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            if let Some(code) = self.gl_error() {
                gl.delete_buffer(buffer);
                return Err(DriverError::new(format!("buffer upload failed (0x{code:04x})")));
            }
            Ok(buffer)
        }
    }

    fn delete_buffer(&self, buffer: glow::NativeBuffer) {
        unsafe { self.gl().delete_buffer(buffer) }
    }

    fn create_shader(&self, stage: ShaderStage) -> DriverResult<glow::NativeShader> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl().create_shader(kind).map_err(DriverError) }
    }

    fn compile_shader(&self, shader: glow::NativeShader, source: &str) -> DriverResult<()> {
        let gl = self.gl();
        unsafe {
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if gl.get_shader_compile_status(shader) {
                Ok(())
            } else {
                Err(DriverError(gl.get_shader_info_log(shader)))
            }
        }
    }

    fn delete_shader(&self, shader: glow::NativeShader) {
        unsafe { self.gl().delete_shader(shader) }
    }

    fn create_program(&self) -> DriverResult<glow::NativeProgram> {
        unsafe { self.gl().create_program().map_err(DriverError) }
    }

    fn attach_shader(&self, program: glow::NativeProgram, shader: glow::NativeShader) -> DriverResult<()> {
        unsafe { self.gl().attach_shader(program, shader) };
        match self.gl_error() {
            Some(code) => Err(DriverError::new(format!("glAttachShader failed (0x{code:04x})"))),
            None => Ok(()),
        }
    }

    fn detach_shader(&self, program: glow::NativeProgram, shader: glow::NativeShader) {
        unsafe { self.gl().detach_shader(program, shader) }
    }

    fn link_program(&self, program: glow::NativeProgram) -> DriverResult<()> {
        let gl = self.gl();
        unsafe {
            gl.link_program(program);
            if gl.get_program_link_status(program) {
                Ok(())
            } else {
                Err(DriverError(gl.get_program_info_log(program)))
            }
        }
    }

    fn use_program(&self, program: Option<glow::NativeProgram>) {
        unsafe { self.gl().use_program(program) }
    }

    fn attrib_location(&self, program: glow::NativeProgram, name: &str) -> DriverResult<u32> {
        unsafe { self.gl().get_attrib_location(program, name) }
            .ok_or_else(|| DriverError::new(format!("attribute {name} not found")))
    }

    fn delete_program(&self, program: glow::NativeProgram) {
        unsafe { self.gl().delete_program(program) }
    }

    fn set_unpack_alignment(&self, alignment: i32) {
        unsafe { self.gl().pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment) }
    }

    fn create_texture(&self) -> DriverResult<u32> {
        unsafe { self.gl().create_texture() }
            .map(|texture| texture.0.get())
            .map_err(DriverError)
    }
}

impl DrawingBackend for EglDriver {
    type Interface = gpu::gl::Interface;
    type DrawingContext = gpu::DirectContext;

    fn native_interface(&self) -> DriverResult<gpu::gl::Interface> {
        gpu::gl::Interface::new_native()
            .ok_or_else(|| DriverError::new("native GL interface is unavailable"))
    }

    fn create_drawing_context(&self, interface: gpu::gl::Interface) -> DriverResult<gpu::DirectContext> {
        gpu::direct_contexts::make_gl(interface, None)
            .ok_or_else(|| DriverError::new("Skia rejected the GL interface"))
    }

    fn release_drawing_context(&self, mut context: gpu::DirectContext, mode: ReleaseMode) {
        match mode {
            ReleaseMode::Orderly => {
                context.flush_and_submit();
                context.free_gpu_resources();
            }
            ReleaseMode::Abandon => context.abandon(),
        }
    }
}
