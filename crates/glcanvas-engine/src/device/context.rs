use super::arena::ResourceArena;
use super::driver::Driver;
use super::error::{GpuError, Result, StepExt};
use super::init::SessionConfig;

/// Negotiates the display/config/context triple.
///
/// Each handle goes into the arena as soon as it exists, so a failure at a
/// later step is cleaned up by the arena's owner.
pub struct ContextFactory<'a, D: Driver> {
    driver: &'a D,
    config: &'a SessionConfig,
}

impl<'a, D: Driver> ContextFactory<'a, D> {
    pub fn new(driver: &'a D, config: &'a SessionConfig) -> Self {
        Self { driver, config }
    }

    pub fn create(&self, arena: &mut ResourceArena<D>) -> Result<()> {
        let driver = self.driver;

        let display = driver
            .default_display()
            .ok_or_else(|| GpuError::context("failed to get default display"))?;

        let (major, minor) = driver
            .initialize(display)
            .context_step("failed to initialize display")?;
        arena.display.fill(display);
        log::debug!("display initialized (version {major}.{minor})");

        // Exactly one configuration is requested; no fallback search.
        let config = driver
            .choose_config(display, &self.config.config_attribs)
            .context_step("failed to choose configuration")?
            .ok_or_else(|| GpuError::context("failed to choose configuration"))?;
        arena.config.fill(config);
        log::debug!("chose config {config:?} for {:?}", self.config.config_attribs);

        let context = driver
            .create_context(display, config, self.config.client_version)
            .context_step("failed to create context")?;
        arena.context.fill(context);

        log::info!(
            "created context {context:?} (client version {})",
            self.config.client_version
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::arena::SlotState;
    use crate::device::{Call, ConfigAttribs, Fault, SoftwareConfig, SoftwareDriver};

    fn run(driver: &SoftwareDriver) -> (Result<()>, ResourceArena<SoftwareDriver>) {
        let config = SessionConfig::default();
        let mut arena = ResourceArena::default();
        let res = ContextFactory::new(driver, &config).create(&mut arena);
        (res, arena)
    }

    #[test]
    fn creates_full_triple() {
        let driver = SoftwareDriver::new();
        let (res, arena) = run(&driver);
        assert!(res.is_ok());
        assert!(arena.graphics_context().is_some());
        assert!(driver.called(&Call::CreateContext { client_version: 2 }));
        assert_eq!(driver.live().contexts, 1);
    }

    #[test]
    fn missing_display_acquires_nothing() {
        let driver = SoftwareDriver::new().with_fault(Fault::NoDisplay);
        let (res, arena) = run(&driver);
        let err = res.unwrap_err();
        assert_eq!(err.step(), Some("failed to get default display"));
        assert!(!arena.snapshot().any_live());
        assert_eq!(driver.calls(), vec![Call::GetDisplay]);
    }

    #[test]
    fn initialize_failure_leaves_display_slot_empty() {
        let driver = SoftwareDriver::new().with_fault(Fault::Initialize);
        let (res, arena) = run(&driver);
        assert!(matches!(res, Err(GpuError::Context { .. })));
        assert_eq!(arena.display.state(), SlotState::Empty);
        assert!(!driver.called(&Call::ChooseConfig));
    }

    #[test]
    fn zero_matching_configs_is_an_error() {
        let driver = SoftwareDriver::with_configs(vec![SoftwareConfig::RGB565]);
        let (res, arena) = run(&driver);
        assert_eq!(res.unwrap_err().step(), Some("failed to choose configuration"));
        // Display stays in the arena for the owner to terminate.
        assert!(arena.display.is_live());
        assert_eq!(arena.config.state(), SlotState::Empty);
        assert!(!driver.called(&Call::CreateContext { client_version: 2 }));
    }

    #[test]
    fn single_match_is_accepted() {
        let driver = SoftwareDriver::with_configs(vec![SoftwareConfig::RGBA8]);
        let (res, arena) = run(&driver);
        assert!(res.is_ok());
        assert!(arena.config.is_live());
        let requests = driver.calls().iter().filter(|c| **c == Call::ChooseConfig).count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn config_without_window_support_is_rejected() {
        let offscreen_only = SoftwareConfig {
            window_surface: false,
            ..SoftwareConfig::RGBA8
        };
        let driver = SoftwareDriver::with_configs(vec![offscreen_only]);
        let (res, _) = run(&driver);
        assert!(res.is_err());
    }

    #[test]
    fn depth_request_is_forwarded() {
        let driver = SoftwareDriver::new();
        let config = SessionConfig {
            config_attribs: ConfigAttribs { depth: 24, ..ConfigAttribs::RGBA8 },
            ..SessionConfig::default()
        };
        let mut arena = ResourceArena::default();
        let res = ContextFactory::new(&driver, &config).create(&mut arena);
        assert!(res.is_err());
    }

    #[test]
    fn context_failure_keeps_source() {
        use std::error::Error as _;

        let driver = SoftwareDriver::new().with_fault(Fault::CreateContext);
        let (res, arena) = run(&driver);
        let err = res.unwrap_err();
        assert_eq!(err.step(), Some("failed to create context"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("EGL_BAD_MATCH"));
        assert!(arena.config.is_live());
        assert_eq!(arena.context.state(), SlotState::Empty);
    }
}
