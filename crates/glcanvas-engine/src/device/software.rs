//! In-memory driver.
//!
//! `SoftwareDriver` behaves like a strict EGL/GLES2 implementation without
//! touching a GPU: it hands out handles, checks that GL calls happen with a
//! context current, tracks every live object, records an ordered call log and
//! can be told to fail at any fallible step.
//!
//! Clones share state, so a caller can keep one clone for inspection while a
//! session owns the other.
//!
//! Terminating a display does not reclaim its contexts or surfaces. Anything
//! the session forgets to destroy stays visible in [`SoftwareDriver::live`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::driver::{DrawingBackend, GlApi, PlatformApi, ReleaseMode, ShaderStage};
use super::error::{DriverError, DriverResult};
use super::init::ConfigAttribs;

const GL_INVALID_OPERATION: u32 = 0x0502;
const GL_OUT_OF_MEMORY: u32 = 0x0505;

/// Opaque handle issued by [`SoftwareDriver`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftHandle(pub u32);

/// A step at which [`SoftwareDriver`] can be made to fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Fault {
    NoDisplay,
    Initialize,
    ChooseConfig,
    CreateContext,
    CreatePbuffer,
    /// Surface creation succeeds but leaves the GL error flag set.
    PbufferErrorFlag,
    MakeCurrent,
    /// Make-current succeeds but leaves the GL error flag set.
    MakeCurrentErrorFlag,
    NativeInterface,
    DrawingContext,
    BufferAlloc,
    VertexCompile,
    FragmentCompile,
    CreateProgram,
    /// Every attach fails.
    AttachShader,
    /// Only attaching the fragment shader fails.
    AttachFragmentShader,
    LinkProgram,
    AttribLocation,
    /// Program setup succeeds but leaves the GL error flag set.
    PipelineErrorFlag,
    CreateTexture,
}

/// One framebuffer configuration offered by the software display.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SoftwareConfig {
    pub attribs: ConfigAttribs,
    pub es2_renderable: bool,
    pub window_surface: bool,
}

impl SoftwareConfig {
    pub const RGBA8: Self = Self {
        attribs: ConfigAttribs::RGBA8,
        es2_renderable: true,
        window_surface: true,
    };

    pub const RGB565: Self = Self {
        attribs: ConfigAttribs {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth: 0,
            stencil: 0,
        },
        es2_renderable: true,
        window_surface: true,
    };

    fn satisfies(&self, want: &ConfigAttribs) -> bool {
        let have = &self.attribs;
        self.es2_renderable
            && self.window_surface
            && have.red >= want.red
            && have.green >= want.green
            && have.blue >= want.blue
            && have.alpha >= want.alpha
            && have.depth >= want.depth
            && have.stencil >= want.stencil
    }
}

/// Driver calls in the order they were made.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    GetDisplay,
    Initialize,
    ChooseConfig,
    CreateContext { client_version: i32 },
    CreatePbufferSurface,
    MakeCurrent { surface: bool, context: bool },
    DestroySurface,
    DestroyContext,
    Terminate,
    CreateVertexBuffer { len: usize },
    DeleteBuffer,
    CreateShader(ShaderStage),
    CompileShader(ShaderStage),
    DeleteShader,
    CreateProgram,
    AttachShader(ShaderStage),
    DetachShader,
    LinkProgram,
    UseProgram,
    AttribLocation(String),
    DeleteProgram,
    SetUnpackAlignment(i32),
    CreateTexture,
    NativeInterface,
    CreateDrawingContext,
    ReleaseDrawingContext(ReleaseMode),
}

/// Counts of objects that exist in the driver right now.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct LiveObjects {
    pub displays: usize,
    pub contexts: usize,
    pub surfaces: usize,
    pub buffers: usize,
    pub shaders: usize,
    pub programs: usize,
    pub drawing_contexts: usize,
}

impl LiveObjects {
    pub fn is_empty(&self) -> bool {
        *self == LiveObjects::default()
    }
}

/// Native interface snapshot: the context that was current when probed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SoftInterface {
    pub context: SoftHandle,
}

/// Drawing context created on top of a software GL context.
#[derive(Debug, Eq, PartialEq)]
pub struct SoftDrawingContext {
    pub id: SoftHandle,
    pub context: SoftHandle,
}

struct ShaderObject {
    stage: ShaderStage,
    source: Option<String>,
    compiled: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<SoftHandle>,
    attributes: Vec<String>,
    linked: bool,
}

#[derive(Default)]
struct State {
    faults: HashSet<Fault>,
    configs: Vec<SoftwareConfig>,
    next_id: u32,
    next_texture: u32,

    display_initialized: bool,
    contexts: HashSet<SoftHandle>,
    surfaces: HashSet<SoftHandle>,
    buffers: HashMap<SoftHandle, usize>,
    shaders: HashMap<SoftHandle, ShaderObject>,
    programs: HashMap<SoftHandle, ProgramObject>,
    drawing_contexts: HashSet<SoftHandle>,
    textures: Vec<u32>,

    current: Option<(Option<SoftHandle>, SoftHandle)>,
    error_flag: Option<u32>,
    invalid_operations: usize,
    calls: Vec<Call>,
}

impl State {
    fn issue(&mut self) -> SoftHandle {
        self.next_id += 1;
        SoftHandle(self.next_id)
    }

    fn fails(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn require_current(&mut self) -> DriverResult<SoftHandle> {
        match self.current {
            Some((_, context)) => Ok(context),
            None => {
                self.invalid_operations += 1;
                Err(DriverError::new("no context is current"))
            }
        }
    }

    fn invalid(&mut self, msg: &str) -> DriverError {
        self.invalid_operations += 1;
        DriverError::new(msg)
    }
}

const DISPLAY: SoftHandle = SoftHandle(0);

#[derive(Clone)]
pub struct SoftwareDriver {
    state: Rc<RefCell<State>>,
}

impl Default for SoftwareDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDriver {
    /// A driver offering an RGB565 and an RGBA8 configuration.
    pub fn new() -> Self {
        Self::with_configs(vec![SoftwareConfig::RGB565, SoftwareConfig::RGBA8])
    }

    pub fn with_configs(configs: Vec<SoftwareConfig>) -> Self {
        let state = State {
            configs,
            ..State::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Makes the given step fail from now on.
    pub fn with_fault(self, fault: Fault) -> Self {
        self.inject(fault);
        self
    }

    pub fn inject(&self, fault: Fault) {
        self.state.borrow_mut().faults.insert(fault);
    }

    pub fn clear_faults(&self) {
        self.state.borrow_mut().faults.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn called(&self, call: &Call) -> bool {
        self.state.borrow().calls.contains(call)
    }

    pub fn live(&self) -> LiveObjects {
        let s = self.state.borrow();
        LiveObjects {
            displays: usize::from(s.display_initialized),
            contexts: s.contexts.len(),
            surfaces: s.surfaces.len(),
            buffers: s.buffers.len(),
            shaders: s.shaders.len(),
            programs: s.programs.len(),
            drawing_contexts: s.drawing_contexts.len(),
        }
    }

    /// Calls that violated the API contract: releasing an unknown handle,
    /// GL work without a current context, and the like.
    pub fn invalid_operations(&self) -> usize {
        self.state.borrow().invalid_operations
    }

    pub fn current_context(&self) -> Option<SoftHandle> {
        self.state.borrow().current.map(|(_, context)| context)
    }

    pub fn current_surface(&self) -> Option<SoftHandle> {
        self.state.borrow().current.and_then(|(surface, _)| surface)
    }

    /// Byte length of a live vertex buffer.
    pub fn buffer_len(&self, buffer: SoftHandle) -> Option<usize> {
        self.state.borrow().buffers.get(&buffer).copied()
    }

    pub fn textures(&self) -> Vec<u32> {
        self.state.borrow().textures.clone()
    }

    fn record(&self, call: Call) -> std::cell::RefMut<'_, State> {
        let mut s = self.state.borrow_mut();
        s.calls.push(call);
        s
    }
}

fn declared_attributes(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix("attribute "))
        .filter_map(|decl| decl.trim_end_matches(';').split_whitespace().last())
        .map(str::to_string)
        .collect()
}

impl PlatformApi for SoftwareDriver {
    type Display = SoftHandle;
    type Config = SoftHandle;
    type Context = SoftHandle;
    type Surface = SoftHandle;

    fn default_display(&self) -> Option<SoftHandle> {
        let s = self.record(Call::GetDisplay);
        if s.fails(Fault::NoDisplay) { None } else { Some(DISPLAY) }
    }

    fn initialize(&self, display: SoftHandle) -> DriverResult<(i32, i32)> {
        let mut s = self.record(Call::Initialize);
        if display != DISPLAY {
            return Err(s.invalid("EGL_BAD_DISPLAY"));
        }
        if s.fails(Fault::Initialize) {
            return Err(DriverError::new("EGL_NOT_INITIALIZED"));
        }
        s.display_initialized = true;
        Ok((1, 5))
    }

    fn choose_config(
        &self,
        _display: SoftHandle,
        attribs: &ConfigAttribs,
    ) -> DriverResult<Option<SoftHandle>> {
        let s = self.record(Call::ChooseConfig);
        if !s.display_initialized {
            return Err(DriverError::new("EGL_NOT_INITIALIZED"));
        }
        if s.fails(Fault::ChooseConfig) {
            return Err(DriverError::new("EGL_BAD_ATTRIBUTE"));
        }
        let found = s
            .configs
            .iter()
            .position(|c| c.satisfies(attribs))
            .map(|index| SoftHandle(1_000 + index as u32));
        Ok(found)
    }

    fn create_context(
        &self,
        _display: SoftHandle,
        config: SoftHandle,
        client_version: i32,
    ) -> DriverResult<SoftHandle> {
        let mut s = self.record(Call::CreateContext { client_version });
        if !s.display_initialized {
            return Err(DriverError::new("EGL_NOT_INITIALIZED"));
        }
        if config.0 < 1_000 || (config.0 - 1_000) as usize >= s.configs.len() {
            return Err(s.invalid("EGL_BAD_CONFIG"));
        }
        if s.fails(Fault::CreateContext) || !(1..=3).contains(&client_version) {
            return Err(DriverError::new("EGL_BAD_MATCH"));
        }
        let context = s.issue();
        s.contexts.insert(context);
        Ok(context)
    }

    fn create_pbuffer_surface(
        &self,
        _display: SoftHandle,
        _config: SoftHandle,
        size: Option<(i32, i32)>,
    ) -> DriverResult<SoftHandle> {
        let mut s = self.record(Call::CreatePbufferSurface);
        if !s.display_initialized {
            return Err(DriverError::new("EGL_NOT_INITIALIZED"));
        }
        if s.fails(Fault::CreatePbuffer) || size.is_some_and(|(w, h)| w < 0 || h < 0) {
            return Err(DriverError::new("EGL_BAD_ALLOC"));
        }
        if s.fails(Fault::PbufferErrorFlag) {
            s.error_flag = Some(GL_OUT_OF_MEMORY);
        }
        let surface = s.issue();
        s.surfaces.insert(surface);
        Ok(surface)
    }

    fn make_current(
        &self,
        _display: SoftHandle,
        surface: Option<SoftHandle>,
        context: Option<SoftHandle>,
    ) -> DriverResult<()> {
        let mut s = self.record(Call::MakeCurrent {
            surface: surface.is_some(),
            context: context.is_some(),
        });
        let Some(context) = context else {
            s.current = None;
            return Ok(());
        };
        if !s.contexts.contains(&context) {
            return Err(s.invalid("EGL_BAD_CONTEXT"));
        }
        if let Some(surface) = surface {
            if !s.surfaces.contains(&surface) {
                return Err(s.invalid("EGL_BAD_SURFACE"));
            }
        }
        if s.fails(Fault::MakeCurrent) {
            return Err(DriverError::new("EGL_BAD_ACCESS"));
        }
        if s.fails(Fault::MakeCurrentErrorFlag) {
            s.error_flag = Some(GL_INVALID_OPERATION);
        }
        s.current = Some((surface, context));
        Ok(())
    }

    fn destroy_surface(&self, _display: SoftHandle, surface: SoftHandle) -> DriverResult<()> {
        let mut s = self.record(Call::DestroySurface);
        if !s.surfaces.remove(&surface) {
            return Err(s.invalid("EGL_BAD_SURFACE"));
        }
        Ok(())
    }

    fn destroy_context(&self, _display: SoftHandle, context: SoftHandle) -> DriverResult<()> {
        let mut s = self.record(Call::DestroyContext);
        if !s.contexts.remove(&context) {
            return Err(s.invalid("EGL_BAD_CONTEXT"));
        }
        if s.current.is_some_and(|(_, c)| c == context) {
            s.current = None;
        }
        Ok(())
    }

    fn terminate(&self, display: SoftHandle) -> DriverResult<()> {
        let mut s = self.record(Call::Terminate);
        if display != DISPLAY || !s.display_initialized {
            return Err(s.invalid("EGL_BAD_DISPLAY"));
        }
        s.display_initialized = false;
        Ok(())
    }
}

impl GlApi for SoftwareDriver {
    type Buffer = SoftHandle;
    type Shader = SoftHandle;
    type Program = SoftHandle;

    fn take_error(&self) -> Option<u32> {
        self.state.borrow_mut().error_flag.take()
    }

    fn create_vertex_buffer(&self, data: &[u8]) -> DriverResult<SoftHandle> {
        let mut s = self.record(Call::CreateVertexBuffer { len: data.len() });
        s.require_current()?;
        if s.fails(Fault::BufferAlloc) {
            s.error_flag = Some(GL_OUT_OF_MEMORY);
            return Err(DriverError::new("GL_OUT_OF_MEMORY"));
        }
        let buffer = s.issue();
        s.buffers.insert(buffer, data.len());
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: SoftHandle) {
        let mut s = self.record(Call::DeleteBuffer);
        if s.require_current().is_ok() && s.buffers.remove(&buffer).is_none() {
            s.invalid_operations += 1;
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> DriverResult<SoftHandle> {
        let mut s = self.record(Call::CreateShader(stage));
        s.require_current()?;
        let shader = s.issue();
        s.shaders.insert(
            shader,
            ShaderObject {
                stage,
                source: None,
                compiled: false,
            },
        );
        Ok(shader)
    }

    fn compile_shader(&self, shader: SoftHandle, source: &str) -> DriverResult<()> {
        let mut s = self.state.borrow_mut();
        let Some(stage) = s.shaders.get(&shader).map(|o| o.stage) else {
            return Err(s.invalid("GL_INVALID_VALUE"));
        };
        s.calls.push(Call::CompileShader(stage));
        let fault = match stage {
            ShaderStage::Vertex => Fault::VertexCompile,
            ShaderStage::Fragment => Fault::FragmentCompile,
        };
        if s.fails(fault) || !source.contains("void main()") {
            return Err(DriverError::new("0:1: error: syntax error"));
        }
        if let Some(object) = s.shaders.get_mut(&shader) {
            object.source = Some(source.to_string());
            object.compiled = true;
        }
        Ok(())
    }

    fn delete_shader(&self, shader: SoftHandle) {
        let mut s = self.record(Call::DeleteShader);
        if s.require_current().is_ok() && s.shaders.remove(&shader).is_none() {
            s.invalid_operations += 1;
        }
    }

    fn create_program(&self) -> DriverResult<SoftHandle> {
        let mut s = self.record(Call::CreateProgram);
        s.require_current()?;
        if s.fails(Fault::CreateProgram) {
            return Err(DriverError::new("glCreateProgram returned 0"));
        }
        let program = s.issue();
        s.programs.insert(program, ProgramObject::default());
        Ok(program)
    }

    fn attach_shader(&self, program: SoftHandle, shader: SoftHandle) -> DriverResult<()> {
        let mut s = self.state.borrow_mut();
        let Some(stage) = s.shaders.get(&shader).map(|o| o.stage) else {
            return Err(s.invalid("GL_INVALID_VALUE"));
        };
        s.calls.push(Call::AttachShader(stage));
        let fails = s.fails(Fault::AttachShader)
            || (stage == ShaderStage::Fragment && s.fails(Fault::AttachFragmentShader));
        if fails {
            s.error_flag = Some(GL_INVALID_OPERATION);
            return Err(DriverError::new("GL_INVALID_OPERATION"));
        }
        match s.programs.get_mut(&program) {
            Some(p) => {
                p.attached.push(shader);
                Ok(())
            }
            None => Err(s.invalid("GL_INVALID_VALUE")),
        }
    }

    fn detach_shader(&self, program: SoftHandle, shader: SoftHandle) {
        let mut s = self.record(Call::DetachShader);
        let detached = match s.programs.get_mut(&program) {
            Some(p) => {
                let before = p.attached.len();
                p.attached.retain(|&h| h != shader);
                p.attached.len() < before
            }
            None => false,
        };
        if !detached {
            s.error_flag = Some(GL_INVALID_OPERATION);
            s.invalid_operations += 1;
        }
    }

    fn link_program(&self, program: SoftHandle) -> DriverResult<()> {
        let mut s = self.record(Call::LinkProgram);
        let Some(attached) = s.programs.get(&program).map(|p| p.attached.clone()) else {
            return Err(s.invalid("GL_INVALID_VALUE"));
        };
        if s.fails(Fault::LinkProgram) {
            return Err(DriverError::new("error: linking failed"));
        }
        let compiled: Vec<&ShaderObject> = attached
            .iter()
            .filter_map(|h| s.shaders.get(h))
            .filter(|o| o.compiled)
            .collect();
        let has = |stage: ShaderStage| compiled.iter().any(|o| o.stage == stage);
        if !has(ShaderStage::Vertex) || !has(ShaderStage::Fragment) {
            return Err(DriverError::new("error: missing shader stage"));
        }
        let attributes: Vec<String> = compiled
            .iter()
            .filter(|o| o.stage == ShaderStage::Vertex)
            .filter_map(|o| o.source.as_deref())
            .flat_map(declared_attributes)
            .collect();
        if let Some(p) = s.programs.get_mut(&program) {
            p.attributes = attributes;
            p.linked = true;
        }
        Ok(())
    }

    fn use_program(&self, _program: Option<SoftHandle>) {
        let mut s = self.record(Call::UseProgram);
        let _ = s.require_current();
    }

    fn attrib_location(&self, program: SoftHandle, name: &str) -> DriverResult<u32> {
        let s = self.record(Call::AttribLocation(name.to_string()));
        if s.fails(Fault::AttribLocation) {
            return Err(DriverError::new(format!("attribute {name} not found")));
        }
        s.programs
            .get(&program)
            .filter(|p| p.linked)
            .and_then(|p| p.attributes.iter().position(|a| a == name))
            .map(|index| index as u32)
            .ok_or_else(|| DriverError::new(format!("attribute {name} not found")))
    }

    fn delete_program(&self, program: SoftHandle) {
        let mut s = self.record(Call::DeleteProgram);
        if s.require_current().is_ok() && s.programs.remove(&program).is_none() {
            s.invalid_operations += 1;
        }
    }

    fn set_unpack_alignment(&self, alignment: i32) {
        let mut s = self.record(Call::SetUnpackAlignment(alignment));
        if s.fails(Fault::PipelineErrorFlag) {
            s.error_flag = Some(GL_INVALID_OPERATION);
        }
    }

    fn create_texture(&self) -> DriverResult<u32> {
        let mut s = self.record(Call::CreateTexture);
        s.require_current()?;
        if s.fails(Fault::CreateTexture) {
            return Err(DriverError::new("GL_OUT_OF_MEMORY"));
        }
        s.next_texture += 1;
        let name = s.next_texture;
        s.textures.push(name);
        Ok(name)
    }
}

impl DrawingBackend for SoftwareDriver {
    type Interface = SoftInterface;
    type DrawingContext = SoftDrawingContext;

    fn native_interface(&self) -> DriverResult<SoftInterface> {
        let mut s = self.record(Call::NativeInterface);
        let context = s.require_current()?;
        if s.fails(Fault::NativeInterface) {
            return Err(DriverError::new("failed to probe native GL interface"));
        }
        Ok(SoftInterface { context })
    }

    fn create_drawing_context(&self, interface: SoftInterface) -> DriverResult<SoftDrawingContext> {
        let mut s = self.record(Call::CreateDrawingContext);
        if !s.contexts.contains(&interface.context) {
            return Err(s.invalid("interface refers to a destroyed context"));
        }
        if s.fails(Fault::DrawingContext) {
            return Err(DriverError::new("backend rejected the native context"));
        }
        let id = s.issue();
        s.drawing_contexts.insert(id);
        Ok(SoftDrawingContext {
            id,
            context: interface.context,
        })
    }

    fn release_drawing_context(&self, context: SoftDrawingContext, mode: ReleaseMode) {
        let mut s = self.record(Call::ReleaseDrawingContext(mode));
        if mode == ReleaseMode::Orderly && s.current.map(|(_, c)| c) != Some(context.context) {
            s.invalid_operations += 1;
        }
        if !s.drawing_contexts.remove(&context.id) {
            s.invalid_operations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound() -> (SoftwareDriver, SoftHandle) {
        let d = SoftwareDriver::new();
        let display = d.default_display().unwrap();
        d.initialize(display).unwrap();
        let config = d.choose_config(display, &ConfigAttribs::RGBA8).unwrap().unwrap();
        let context = d.create_context(display, config, 2).unwrap();
        d.make_current(display, None, Some(context)).unwrap();
        (d, context)
    }

    // ── platform ──────────────────────────────────────────────────────────

    #[test]
    fn choose_config_skips_configs_below_request() {
        let d = SoftwareDriver::new();
        let display = d.default_display().unwrap();
        d.initialize(display).unwrap();
        let config = d.choose_config(display, &ConfigAttribs::RGBA8).unwrap();
        // RGB565 is listed first but has no alpha.
        assert_eq!(config, Some(SoftHandle(1_001)));
    }

    #[test]
    fn terminate_does_not_reclaim_contexts() {
        let (d, context) = bound();
        d.terminate(DISPLAY).unwrap();
        assert_eq!(d.live().contexts, 1);
        d.destroy_context(DISPLAY, context).unwrap();
        assert!(d.live().is_empty());
    }

    #[test]
    fn double_destroy_is_counted_as_invalid() {
        let (d, context) = bound();
        d.destroy_context(DISPLAY, context).unwrap();
        assert!(d.destroy_context(DISPLAY, context).is_err());
        assert_eq!(d.invalid_operations(), 1);
    }

    // ── gl ────────────────────────────────────────────────────────────────

    #[test]
    fn gl_calls_need_a_current_context() {
        let d = SoftwareDriver::new();
        assert!(d.create_texture().is_err());
        assert_eq!(d.invalid_operations(), 1);
    }

    #[test]
    fn attribute_locations_follow_declaration_order() {
        let (d, _) = bound();
        let vs = d.create_shader(ShaderStage::Vertex).unwrap();
        d.compile_shader(vs, "attribute vec4 aPosition;\nattribute vec4 aTexCoord;\nvoid main() {}\n")
            .unwrap();
        let fs = d.create_shader(ShaderStage::Fragment).unwrap();
        d.compile_shader(fs, "void main() {}\n").unwrap();
        let program = d.create_program().unwrap();
        d.attach_shader(program, vs).unwrap();
        d.attach_shader(program, fs).unwrap();
        d.link_program(program).unwrap();
        assert_eq!(d.attrib_location(program, "aPosition"), Ok(0));
        assert_eq!(d.attrib_location(program, "aTexCoord"), Ok(1));
        assert!(d.attrib_location(program, "aColor").is_err());
    }

    #[test]
    fn link_without_fragment_stage_fails() {
        let (d, _) = bound();
        let vs = d.create_shader(ShaderStage::Vertex).unwrap();
        d.compile_shader(vs, "void main() {}").unwrap();
        let program = d.create_program().unwrap();
        d.attach_shader(program, vs).unwrap();
        assert!(d.link_program(program).is_err());
    }

    #[test]
    fn detaching_unattached_shader_sets_error_flag() {
        let (d, _) = bound();
        let vs = d.create_shader(ShaderStage::Vertex).unwrap();
        let program = d.create_program().unwrap();
        d.detach_shader(program, vs);
        assert_eq!(d.take_error(), Some(GL_INVALID_OPERATION));
        assert_eq!(d.invalid_operations(), 1);
    }

    #[test]
    fn texture_names_start_at_one_and_increase() {
        let (d, _) = bound();
        assert_eq!(d.create_texture(), Ok(1));
        assert_eq!(d.create_texture(), Ok(2));
        assert_eq!(d.textures(), vec![1, 2]);
    }
}
