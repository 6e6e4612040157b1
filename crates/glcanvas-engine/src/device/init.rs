/// Framebuffer configuration requested from the display.
///
/// Color sizes are in bits. The render and surface type requirements are
/// fixed: the configuration must be ES2-renderable and window-capable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConfigAttribs {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
    pub depth: i32,
    pub stencil: i32,
}

impl ConfigAttribs {
    /// RGBA8 color, no depth, no stencil.
    pub const RGBA8: Self = Self {
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
        depth: 0,
        stencil: 0,
    };
}

impl Default for ConfigAttribs {
    fn default() -> Self {
        Self::RGBA8
    }
}

/// Initialization parameters for a [`GpuSession`](super::GpuSession).
///
/// The defaults describe the only configuration the session has been built
/// around; change them only for a concrete platform requirement.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Attributes used to choose exactly one display configuration.
    pub config_attribs: ConfigAttribs,

    /// Client API version requested at context creation.
    pub client_version: i32,

    /// Size of the off-screen pixel-buffer surface.
    ///
    /// `None` passes no size attributes and leaves the choice to the driver.
    pub pbuffer_size: Option<(i32, i32)>,

    /// Build the fallback blit pipeline during initialization.
    ///
    /// Off by default; the pipeline can still be built later through
    /// [`GpuSession::build_pipeline`](super::GpuSession::build_pipeline).
    pub build_pipeline: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            config_attribs: ConfigAttribs::RGBA8,
            client_version: 2,
            pbuffer_size: None,
            build_pipeline: false,
        }
    }
}
