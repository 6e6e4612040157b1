use std::fmt;

use super::current::CurrentContext;
use super::driver::{DrawingBackend, Driver, ReleaseMode};
use super::error::{Result, StepExt};

/// Higher-level drawing context bound to a native GL context.
///
/// The bridge owns the backend's GPU resources: [`DrawingBridge::release`] is
/// the only place they are freed. Whoever owns the bridge must call it while
/// the underlying GL context still exists.
pub struct DrawingBridge<B: DrawingBackend> {
    context: B::DrawingContext,
}

impl<B: DrawingBackend> DrawingBridge<B> {
    pub fn context(&self) -> &B::DrawingContext {
        &self.context
    }

    /// Hands the backend context back for release.
    ///
    /// Use [`ReleaseMode::Orderly`] only with the GL context current.
    pub(crate) fn release(self, backend: &B, mode: ReleaseMode) {
        log::info!("releasing drawing context ({mode:?})");
        backend.release_drawing_context(self.context, mode);
    }
}

impl<B: DrawingBackend> fmt::Debug for DrawingBridge<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingBridge").finish_non_exhaustive()
    }
}

/// Wraps the current native context with the drawing backend.
pub struct SurfaceBridge;

impl SurfaceBridge {
    pub fn create<D: Driver>(current: &CurrentContext<'_, D>) -> Result<DrawingBridge<D>> {
        let backend = current.driver()?;
        let interface = backend
            .native_interface()
            .context_step("failed to probe native interface")?;
        let context = backend
            .create_drawing_context(interface)
            .context_step("failed to create drawing context")?;
        Ok(DrawingBridge { context })
    }
}
