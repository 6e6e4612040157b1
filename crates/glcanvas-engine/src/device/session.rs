use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;

use super::arena::{ArenaSnapshot, GraphicsContext, ResourceArena};
use super::bridge::{DrawingBridge, SurfaceBridge};
use super::context::ContextFactory;
use super::current::{self, CurrentContext, SessionId};
use super::driver::{Driver, ReleaseMode};
use super::error::{GpuError, Result, StepExt};
use super::init::SessionConfig;
use super::pipeline::{PipelineFactory, ShaderPipeline};

/// Lifecycle of a [`GpuSession`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

/// Texture name allocated by the driver. Ownership passes to the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(NonZeroU32);

impl TextureId {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Owns a GL context, its off-screen surface and the drawing context layered
/// on top of it.
///
/// Construction either reaches [`SessionState::Ready`] or fails with every
/// acquired resource released. Teardown runs on [`GpuSession::destroy`] or on
/// drop, whichever comes first, in reverse acquisition order:
/// drawing bridge, blit pipeline, surface, context, display.
///
/// All calls must come from one thread. The session is neither `Send` nor
/// `Sync`.
pub struct GpuSession<D: Driver> {
    id: SessionId,
    driver: D,
    config: SessionConfig,
    state: SessionState,
    arena: ResourceArena<D>,
    _thread_bound: PhantomData<*const ()>,
}

impl<D: Driver> GpuSession<D> {
    /// Creates and fully initializes a session.
    pub fn new(driver: D, config: SessionConfig) -> Result<Self> {
        let mut session = Self {
            id: SessionId::next(),
            driver,
            config,
            state: SessionState::Uninitialized,
            arena: ResourceArena::default(),
            _thread_bound: PhantomData,
        };

        match session.initialize() {
            Ok(()) => Ok(session),
            Err(err) => {
                log::warn!("{}: initialization failed: {err}", session.id);
                session.destroy();
                Err(err)
            }
        }
    }

    pub fn with_defaults(driver: D) -> Result<Self> {
        Self::new(driver, SessionConfig::default())
    }

    fn initialize(&mut self) -> Result<()> {
        self.state = SessionState::Initializing;
        log::info!("{}: initializing graphics context", self.id);

        ContextFactory::new(&self.driver, &self.config).create(&mut self.arena)?;
        let gc = self.require_context()?;

        let surface = self
            .driver
            .create_pbuffer_surface(gc.display, gc.config, self.config.pbuffer_size)
            .context_step("failed to create pixel-buffer surface")?;
        self.arena.surface.fill(surface);
        // The flag belongs to whatever context is current. Leave it alone if
        // that is another session's.
        let foreign = current::current_session().is_some_and(|owner| owner != self.id);
        let pending = if foreign { None } else { self.driver.take_error() };
        if let Some(code) = pending {
            log::warn!("GL error 0x{code:04x} after pixel-buffer creation");
            return Err(GpuError::context("failed to create pixel-buffer surface"));
        }

        self.driver
            .make_current(gc.display, Some(surface), Some(gc.context))
            .context_step("failed to make context current")?;
        if let Some(code) = self.driver.take_error() {
            log::warn!("GL error 0x{code:04x} after make-current");
            return Err(GpuError::context("failed to make context current"));
        }
        let current = CurrentContext::bind(&self.driver, self.id);

        if self.config.build_pipeline {
            let pipeline = PipelineFactory::create(&current)?;
            self.arena.pipeline.fill(pipeline);
            log::info!("{}: blit pipeline built", self.id);
        }

        let bridge = SurfaceBridge::create(&current)?;
        self.arena.bridge.fill(bridge);
        log::info!("{}: drawing context created", self.id);

        self.state = SessionState::Ready;
        Ok(())
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn graphics_context(&self) -> Option<GraphicsContext<D>> {
        self.arena.graphics_context()
    }

    pub fn pipeline(&self) -> Option<&ShaderPipeline<D>> {
        self.arena.pipeline.get()
    }

    pub fn bridge(&self) -> Option<&DrawingBridge<D>> {
        self.arena.bridge.get()
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        self.arena.snapshot()
    }

    // ── operations ────────────────────────────────────────────────────────

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            state => Err(GpuError::NotReady(state)),
        }
    }

    fn require_context(&self) -> Result<GraphicsContext<D>> {
        self.arena
            .graphics_context()
            .ok_or_else(|| GpuError::context("graphics context is not available"))
    }

    /// Makes the context current, optionally with the pixel-buffer surface.
    fn bind<'s>(
        driver: &'s D,
        arena: &ResourceArena<D>,
        session: SessionId,
        with_surface: bool,
    ) -> Result<CurrentContext<'s, D>> {
        let gc = arena
            .graphics_context()
            .ok_or_else(|| GpuError::context("graphics context is not available"))?;
        let surface = if with_surface { arena.surface.copied() } else { None };
        driver
            .make_current(gc.display, surface, Some(gc.context))
            .context_step("failed to make context current")?;
        Ok(CurrentContext::bind(driver, session))
    }

    /// Makes the context current with the pixel-buffer surface bound.
    pub fn make_current(&self) -> Result<CurrentContext<'_, D>> {
        self.ensure_ready()?;
        Self::bind(&self.driver, &self.arena, self.id, true)
    }

    /// Allocates one texture name.
    ///
    /// Binds the context without a surface first, so it works regardless of
    /// what was current on this thread before.
    pub fn create_texture(&self) -> Result<TextureId> {
        self.ensure_ready()?;
        let current = Self::bind(&self.driver, &self.arena, self.id, false)?;
        let name = current
            .driver()?
            .create_texture()
            .context_step("failed to create texture")?;
        let id = NonZeroU32::new(name)
            .map(TextureId)
            .ok_or_else(|| GpuError::context("driver returned texture name 0"))?;
        log::debug!("{}: created texture {}", self.id, id.get());
        Ok(id)
    }

    /// Builds the fallback blit pipeline if it does not exist yet.
    pub fn build_pipeline(&mut self) -> Result<&ShaderPipeline<D>> {
        self.ensure_ready()?;
        if !self.arena.pipeline.is_live() {
            let current = Self::bind(&self.driver, &self.arena, self.id, true)?;
            let pipeline = PipelineFactory::create(&current)?;
            self.arena.pipeline.fill(pipeline);
            log::info!("{}: blit pipeline built", self.id);
        }
        self.arena
            .pipeline
            .get()
            .ok_or_else(|| GpuError::shader("blit pipeline is not available"))
    }

    /// Per-frame drawing is not part of this core.
    pub fn draw_frame(&mut self) -> Result<()> {
        self.ensure_ready()?;
        Err(GpuError::NotImplemented("draw_frame"))
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases everything the session owns. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        log::info!("{}: tearing down", self.id);

        let needs_context = self.arena.bridge.is_live() || self.arena.pipeline.is_live();
        let bound = needs_context && self.rebind_for_teardown();

        if let Some(bridge) = self.arena.bridge.take() {
            let mode = if bound { ReleaseMode::Orderly } else { ReleaseMode::Abandon };
            bridge.release(&self.driver, mode);
        }

        if let Some(pipeline) = self.arena.pipeline.take() {
            if bound {
                log::debug!("{}: deleting blit pipeline", self.id);
                pipeline.release(&self.driver);
            } else {
                log::warn!("{}: context unavailable, blit pipeline left to the driver", self.id);
            }
        }

        let display = self.arena.display.copied();
        if let (Some(display), true) = (display, self.arena.context.is_live()) {
            if let Err(err) = self.driver.make_current(display, None, None) {
                log::warn!("{}: failed to release current context: {err}", self.id);
            }
        }
        current::clear_current(self.id);

        if let Some(surface) = self.arena.surface.take() {
            if let Some(display) = display {
                log::debug!("{}: destroying pixel-buffer surface", self.id);
                if let Err(err) = self.driver.destroy_surface(display, surface) {
                    log::warn!("{}: failed to destroy surface: {err}", self.id);
                }
            }
        }

        if let Some(context) = self.arena.context.take() {
            if let Some(display) = display {
                log::info!("{}: destroying context", self.id);
                if let Err(err) = self.driver.destroy_context(display, context) {
                    log::warn!("{}: failed to destroy context: {err}", self.id);
                }
            }
        }

        self.arena.config.take();

        if let Some(display) = self.arena.display.take() {
            log::info!("{}: terminating display", self.id);
            if let Err(err) = self.driver.terminate(display) {
                log::warn!("{}: failed to terminate display: {err}", self.id);
            }
        }

        self.state = SessionState::Destroyed;
    }

    fn rebind_for_teardown(&self) -> bool {
        match Self::bind(&self.driver, &self.arena, self.id, true) {
            Ok(_) => {
                // A stale flag from a failed stage must not leak into the next user.
                let _ = self.driver.take_error();
                true
            }
            Err(err) => {
                log::warn!("{}: cannot make context current for teardown: {err}", self.id);
                false
            }
        }
    }
}

impl<D: Driver> Drop for GpuSession<D> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<D: Driver> fmt::Debug for GpuSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("arena", &self.arena)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::arena::SlotState;
    use crate::device::{Call, Fault, SoftwareDriver};

    fn session(driver: &SoftwareDriver) -> Result<GpuSession<SoftwareDriver>> {
        GpuSession::with_defaults(driver.clone())
    }

    fn position(driver: &SoftwareDriver, call: &Call) -> usize {
        driver
            .calls()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{call:?} was never made"))
    }

    // ── happy path ────────────────────────────────────────────────────────

    #[test]
    fn construct_two_textures_destroy() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        assert_eq!(s.state(), SessionState::Ready);

        let a = s.create_texture().unwrap();
        let b = s.create_texture().unwrap();
        assert_ne!(a, b);
        assert!(a.get() > 0 && b.get() > 0);

        s.destroy();
        assert_eq!(s.state(), SessionState::Destroyed);
        assert!(driver.live().is_empty(), "{:?}", driver.live());
        assert_eq!(driver.invalid_operations(), 0);
    }

    #[test]
    fn stages_run_in_order() {
        let driver = SoftwareDriver::new();
        let _s = session(&driver).unwrap();
        let order = [
            Call::GetDisplay,
            Call::Initialize,
            Call::ChooseConfig,
            Call::CreateContext { client_version: 2 },
            Call::CreatePbufferSurface,
            Call::MakeCurrent { surface: true, context: true },
            Call::NativeInterface,
            Call::CreateDrawingContext,
        ];
        let positions: Vec<usize> = order.iter().map(|c| position(&driver, c)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn pipeline_is_skipped_by_default() {
        let driver = SoftwareDriver::new();
        let s = session(&driver).unwrap();
        assert!(s.pipeline().is_none());
        assert_eq!(s.snapshot().pipeline, SlotState::Empty);
        assert!(!driver.called(&Call::CreateProgram));
    }

    #[test]
    fn texture_binds_without_surface() {
        let driver = SoftwareDriver::new();
        let s = session(&driver).unwrap();
        s.create_texture().unwrap();
        assert_eq!(driver.current_surface(), None);
        assert!(driver.current_context().is_some());
        assert_eq!(current::current_session(), Some(s.id()));
    }

    #[test]
    fn draw_frame_is_not_implemented() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        assert!(matches!(s.draw_frame(), Err(GpuError::NotImplemented("draw_frame"))));
        // Still usable afterwards.
        assert!(s.create_texture().is_ok());
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn destroy_is_idempotent() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        s.destroy();
        let calls = driver.calls().len();
        s.destroy();
        drop(s);
        assert_eq!(driver.calls().len(), calls);
        assert_eq!(driver.invalid_operations(), 0);
    }

    #[test]
    fn teardown_runs_in_reverse_order() {
        let driver = SoftwareDriver::new();
        let s = GpuSession::new(
            driver.clone(),
            SessionConfig { build_pipeline: true, ..SessionConfig::default() },
        )
        .unwrap();
        drop(s);

        let release = position(&driver, &Call::ReleaseDrawingContext(ReleaseMode::Orderly));
        let program = position(&driver, &Call::DeleteProgram);
        let surface = position(&driver, &Call::DestroySurface);
        let context = position(&driver, &Call::DestroyContext);
        let display = position(&driver, &Call::Terminate);
        assert!(release < program && program < surface && surface < context && context < display);
        assert!(driver.live().is_empty(), "{:?}", driver.live());
        assert_eq!(current::current_session(), None);
    }

    #[test]
    fn operations_after_destroy_are_rejected() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        s.destroy();
        assert!(matches!(s.create_texture(), Err(GpuError::NotReady(SessionState::Destroyed))));
        assert!(matches!(s.draw_frame(), Err(GpuError::NotReady(SessionState::Destroyed))));
        assert!(s.build_pipeline().is_err());
        assert!(s.make_current().is_err());
    }

    #[test]
    fn bridge_is_abandoned_when_context_cannot_be_bound() {
        let driver = SoftwareDriver::new();
        let s = session(&driver).unwrap();
        driver.inject(Fault::MakeCurrent);
        drop(s);
        assert!(driver.called(&Call::ReleaseDrawingContext(ReleaseMode::Abandon)));
        assert!(driver.live().is_empty(), "{:?}", driver.live());
    }

    // ── fault injection ───────────────────────────────────────────────────

    fn fails_at(fault: Fault, step: &str, never: &[Call]) {
        let driver = SoftwareDriver::new().with_fault(fault);
        let err = session(&driver).unwrap_err();
        assert!(matches!(err, GpuError::Context { .. }), "{fault:?}: {err}");
        assert_eq!(err.step(), Some(step), "{fault:?}");
        for call in never {
            assert!(!driver.called(call), "{fault:?}: {call:?} ran after the failing stage");
        }
        assert!(driver.live().is_empty(), "{fault:?}: {:?}", driver.live());
        assert_eq!(driver.invalid_operations(), 0, "{fault:?}");
        assert_eq!(current::current_session(), None);
    }

    #[test]
    fn display_acquisition_failure() {
        fails_at(Fault::NoDisplay, "failed to get default display", &[Call::Initialize]);
    }

    #[test]
    fn display_initialize_failure() {
        fails_at(Fault::Initialize, "failed to initialize display", &[Call::ChooseConfig]);
    }

    #[test]
    fn config_failure() {
        fails_at(
            Fault::ChooseConfig,
            "failed to choose configuration",
            &[Call::CreateContext { client_version: 2 }],
        );
    }

    #[test]
    fn context_failure() {
        fails_at(Fault::CreateContext, "failed to create context", &[Call::CreatePbufferSurface]);
    }

    #[test]
    fn pbuffer_failure() {
        fails_at(
            Fault::CreatePbuffer,
            "failed to create pixel-buffer surface",
            &[Call::MakeCurrent { surface: true, context: true }],
        );
    }

    #[test]
    fn pbuffer_error_flag() {
        fails_at(
            Fault::PbufferErrorFlag,
            "failed to create pixel-buffer surface",
            &[Call::MakeCurrent { surface: true, context: true }],
        );
    }

    #[test]
    fn make_current_failure() {
        fails_at(Fault::MakeCurrent, "failed to make context current", &[Call::NativeInterface]);
    }

    #[test]
    fn make_current_error_flag() {
        fails_at(
            Fault::MakeCurrentErrorFlag,
            "failed to make context current",
            &[Call::NativeInterface],
        );
    }

    #[test]
    fn native_interface_failure() {
        fails_at(
            Fault::NativeInterface,
            "failed to probe native interface",
            &[Call::CreateDrawingContext],
        );
    }

    #[test]
    fn drawing_context_failure() {
        fails_at(Fault::DrawingContext, "failed to create drawing context", &[]);
    }

    #[test]
    fn no_matching_config() {
        let driver = SoftwareDriver::with_configs(vec![]);
        let err = session(&driver).unwrap_err();
        assert_eq!(err.step(), Some("failed to choose configuration"));
        assert!(driver.live().is_empty());
    }

    #[test]
    fn pipeline_failure_during_init_cleans_up() {
        let driver = SoftwareDriver::new().with_fault(Fault::LinkProgram);
        let err = GpuSession::new(
            driver.clone(),
            SessionConfig { build_pipeline: true, ..SessionConfig::default() },
        )
        .unwrap_err();
        assert!(matches!(err, GpuError::Shader { .. }));
        assert!(!driver.called(&Call::NativeInterface));
        assert!(driver.live().is_empty(), "{:?}", driver.live());
    }

    // ── pipeline on demand ────────────────────────────────────────────────

    #[test]
    fn build_pipeline_on_demand_is_idempotent() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        let program = s.build_pipeline().unwrap().program;
        assert_eq!(s.build_pipeline().unwrap().program, program);
        let programs = driver.calls().iter().filter(|c| **c == Call::CreateProgram).count();
        assert_eq!(programs, 1);
    }

    #[test]
    fn failed_on_demand_pipeline_keeps_session_ready() {
        let driver = SoftwareDriver::new();
        let mut s = session(&driver).unwrap();
        driver.inject(Fault::FragmentCompile);
        assert!(matches!(s.build_pipeline(), Err(GpuError::Shader { .. })));
        assert_eq!(s.state(), SessionState::Ready);
        driver.clear_faults();
        assert!(s.build_pipeline().is_ok());
    }

    #[test]
    fn pipeline_builds_after_earlier_attempt_failed() {
        for fault in [Fault::BufferAlloc, Fault::AttachShader, Fault::AttachFragmentShader] {
            let driver = SoftwareDriver::new();
            let mut s = session(&driver).unwrap();
            driver.inject(fault);
            assert!(s.build_pipeline().is_err(), "{fault:?}");
            driver.clear_faults();
            assert!(s.build_pipeline().is_ok(), "{fault:?}");
            assert_eq!(driver.invalid_operations(), 0, "{fault:?}");
        }
    }

    // ── thread affinity ───────────────────────────────────────────────────

    #[test]
    fn second_session_displaces_first_token() {
        let driver_a = SoftwareDriver::new();
        let driver_b = SoftwareDriver::new();
        let a = session(&driver_a).unwrap();
        let token = a.make_current().unwrap();
        let b = session(&driver_b).unwrap();

        assert!(!token.is_valid());
        assert!(matches!(PipelineFactory::create(&token), Err(GpuError::Context { .. })));

        // create_texture re-acquires currency itself.
        assert!(a.create_texture().is_ok());
        drop(b);
    }

    #[test]
    fn pixel_buffer_check_leaves_other_sessions_flag_alone() {
        let driver_a = SoftwareDriver::new();
        let a = session(&driver_a).unwrap();

        // With `a` current the flag is not this session's to read; it is
        // picked up once the new context is made current.
        let driver_b = SoftwareDriver::new().with_fault(Fault::PbufferErrorFlag);
        let err = session(&driver_b).unwrap_err();
        assert_eq!(err.step(), Some("failed to make context current"));
        assert!(driver_b.live().is_empty());
        drop(a);
    }
}
