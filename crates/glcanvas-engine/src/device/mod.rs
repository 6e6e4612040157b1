//! GPU context lifecycle.
//!
//! This module is responsible for:
//! - negotiating the display/config/context triple
//! - creating the off-screen pixel-buffer surface and making it current
//! - building the optional fallback blit pipeline
//! - layering the drawing backend on the current context
//! - tearing all of it down in reverse order

mod arena;
mod bridge;
mod context;
mod current;
mod driver;
mod error;
mod init;
mod pipeline;
mod session;
mod software;

#[cfg(feature = "backend_egl")]
mod egl;

pub use arena::{ArenaSnapshot, GraphicsContext, ResourceArena, Slot, SlotState};
pub use bridge::{DrawingBridge, SurfaceBridge};
pub use context::ContextFactory;
pub use current::{current_session, CurrentContext, SessionId};
pub use driver::{DrawingBackend, Driver, GlApi, PlatformApi, ReleaseMode, ShaderStage};
pub use error::{DriverError, DriverResult, GpuError, Result};
pub use init::{ConfigAttribs, SessionConfig};
pub use pipeline::{
    BlitVertex, PipelineFactory, ShaderPipeline, FRAGMENT_SHADER, POSITION_ATTRIBUTE,
    QUAD_VERTICES, TEX_COORD_ATTRIBUTE, VERTEX_SHADER,
};
pub use session::{GpuSession, SessionState, TextureId};
pub use software::{
    Call, Fault, LiveObjects, SoftDrawingContext, SoftHandle, SoftInterface, SoftwareConfig,
    SoftwareDriver,
};

#[cfg(feature = "backend_egl")]
pub use egl::EglDriver;
