use super::session::SessionState;

/// Failure reported by a driver call.
///
/// Carries whatever the driver could tell us (EGL error name, shader info
/// log, ...). The session attaches it to a [`GpuError`] as the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Errors surfaced by the GPU session.
///
/// Every error is final for the operation that raised it. Initialization is
/// never retried; a failed [`GpuSession::new`](super::GpuSession::new) leaves
/// nothing allocated.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// Display, configuration, context, surface, make-current or
    /// drawing-bridge failure.
    #[error("context error: {step}")]
    Context {
        step: &'static str,
        #[source]
        source: Option<DriverError>,
    },

    /// Buffer, compile, attach, link or attribute failure in the blit pipeline.
    #[error("shader error: {step}")]
    Shader {
        step: &'static str,
        #[source]
        source: Option<DriverError>,
    },

    /// The feature exists in the interface but is intentionally absent.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// The operation requires a `Ready` session.
    #[error("session is not ready (state: {0:?})")]
    NotReady(SessionState),
}

impl GpuError {
    pub(crate) fn context(step: &'static str) -> Self {
        Self::Context { step, source: None }
    }

    pub(crate) fn shader(step: &'static str) -> Self {
        Self::Shader { step, source: None }
    }

    /// Short description of the failing step, if the error has one.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::Context { step, .. } | Self::Shader { step, .. } => Some(step),
            Self::NotImplemented(_) | Self::NotReady(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GpuError>;

/// Converts driver failures into [`GpuError`] while naming the step.
pub(crate) trait StepExt<T> {
    fn context_step(self, step: &'static str) -> Result<T>;
    fn shader_step(self, step: &'static str) -> Result<T>;
}

impl<T> StepExt<T> for DriverResult<T> {
    fn context_step(self, step: &'static str) -> Result<T> {
        self.map_err(|e| GpuError::Context { step, source: Some(e) })
    }

    fn shader_step(self, step: &'static str) -> Result<T> {
        self.map_err(|e| GpuError::Shader { step, source: Some(e) })
    }
}
