//! Driver seam.
//!
//! The session never calls EGL, GL or the drawing backend directly. It goes
//! through these traits so that the same lifecycle code runs against the real
//! backend and against [`SoftwareDriver`](super::SoftwareDriver).

use std::fmt::Debug;

use super::error::DriverResult;
use super::init::ConfigAttribs;

/// Display, configuration, context and surface management (EGL-shaped).
pub trait PlatformApi {
    type Display: Copy + Debug;
    type Config: Copy + Debug;
    type Context: Copy + Debug;
    type Surface: Copy + Debug;

    /// Returns the default display connection, if there is one.
    fn default_display(&self) -> Option<Self::Display>;

    /// Initializes the display and returns its `(major, minor)` version.
    fn initialize(&self, display: Self::Display) -> DriverResult<(i32, i32)>;

    /// Requests exactly one configuration matching `attribs`.
    ///
    /// `Ok(None)` means the request was valid but nothing matched.
    fn choose_config(
        &self,
        display: Self::Display,
        attribs: &ConfigAttribs,
    ) -> DriverResult<Option<Self::Config>>;

    /// Creates a context without a share context.
    fn create_context(
        &self,
        display: Self::Display,
        config: Self::Config,
        client_version: i32,
    ) -> DriverResult<Self::Context>;

    fn create_pbuffer_surface(
        &self,
        display: Self::Display,
        config: Self::Config,
        size: Option<(i32, i32)>,
    ) -> DriverResult<Self::Surface>;

    /// Binds `context` to the calling thread.
    ///
    /// `surface = None` binds without a draw/read surface; `context = None`
    /// releases the thread's current context.
    fn make_current(
        &self,
        display: Self::Display,
        surface: Option<Self::Surface>,
        context: Option<Self::Context>,
    ) -> DriverResult<()>;

    fn destroy_surface(&self, display: Self::Display, surface: Self::Surface) -> DriverResult<()>;

    fn destroy_context(&self, display: Self::Display, context: Self::Context) -> DriverResult<()>;

    fn terminate(&self, display: Self::Display) -> DriverResult<()>;
}

/// Shader stage passed to [`GlApi::create_shader`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// The GLES2 subset used by the session. Every call targets the context that
/// is current on the calling thread.
pub trait GlApi {
    type Buffer: Copy + Debug;
    type Shader: Copy + Debug;
    type Program: Copy + Debug;

    /// Pops the sticky GL error flag. `Some(code)` if an error was recorded.
    fn take_error(&self) -> Option<u32>;

    /// Generates an array buffer and uploads `data` with static usage.
    fn create_vertex_buffer(&self, data: &[u8]) -> DriverResult<Self::Buffer>;
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_shader(&self, stage: ShaderStage) -> DriverResult<Self::Shader>;
    /// Uploads `source` and compiles it. The error carries the info log.
    fn compile_shader(&self, shader: Self::Shader, source: &str) -> DriverResult<()>;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> DriverResult<Self::Program>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) -> DriverResult<()>;
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Links the program. The error carries the info log.
    fn link_program(&self, program: Self::Program) -> DriverResult<()>;
    fn use_program(&self, program: Option<Self::Program>);
    fn attrib_location(&self, program: Self::Program, name: &str) -> DriverResult<u32>;
    fn delete_program(&self, program: Self::Program);

    fn set_unpack_alignment(&self, alignment: i32);

    /// Generates one texture name. Names are never zero.
    fn create_texture(&self) -> DriverResult<u32>;
}

/// How the drawing backend lets go of its GPU resources.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReleaseMode {
    /// Flush pending work and free resources. Needs the context current.
    Orderly,
    /// Forget resources without issuing any GL call.
    Abandon,
}

/// Higher-level GPU drawing backend layered on the current native context
/// (Skia-shaped).
pub trait DrawingBackend {
    /// Snapshot of the native function table of the current context.
    type Interface;
    type DrawingContext;

    fn native_interface(&self) -> DriverResult<Self::Interface>;

    fn create_drawing_context(&self, interface: Self::Interface) -> DriverResult<Self::DrawingContext>;

    fn release_drawing_context(&self, context: Self::DrawingContext, mode: ReleaseMode);
}

/// Everything a [`GpuSession`](super::GpuSession) needs from a backend.
pub trait Driver: PlatformApi + GlApi + DrawingBackend {}

impl<T> Driver for T where T: PlatformApi + GlApi + DrawingBackend {}
