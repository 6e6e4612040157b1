use std::fmt;
use std::mem;

use super::bridge::DrawingBridge;
use super::driver::{Driver, PlatformApi};
use super::pipeline::ShaderPipeline;

/// Ownership state of one session resource.
///
/// A handle can only leave the slot through [`Slot::take`], which moves it out
/// and leaves `Released` behind. A released handle is gone from the arena and
/// cannot be released twice.
pub enum Slot<T> {
    /// Never acquired.
    Empty,
    Live(T),
    Released,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<T> Slot<T> {
    pub(crate) fn fill(&mut self, value: T) {
        debug_assert!(!self.is_live(), "slot filled twice");
        *self = Slot::Live(value);
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Live(v) => Some(v),
            Slot::Empty | Slot::Released => None,
        }
    }

    /// Moves the handle out for release. Empty slots stay empty.
    pub(crate) fn take(&mut self) -> Option<T> {
        match mem::replace(self, Slot::Released) {
            Slot::Live(v) => Some(v),
            Slot::Empty => {
                *self = Slot::Empty;
                None
            }
            Slot::Released => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Slot::Live(_))
    }

    pub fn state(&self) -> SlotState {
        match self {
            Slot::Empty => SlotState::Empty,
            Slot::Live(_) => SlotState::Live,
            Slot::Released => SlotState::Released,
        }
    }
}

impl<T: Copy> Slot<T> {
    pub fn copied(&self) -> Option<T> {
        self.get().copied()
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.state(), f)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotState {
    Empty,
    Live,
    Released,
}

/// The display/context/config triple, copied out of the arena.
pub struct GraphicsContext<P: PlatformApi> {
    pub display: P::Display,
    pub context: P::Context,
    pub config: P::Config,
}

impl<P: PlatformApi> Clone for GraphicsContext<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: PlatformApi> Copy for GraphicsContext<P> {}

impl<P: PlatformApi> fmt::Debug for GraphicsContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("display", &self.display)
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}

/// Every GPU resource a session owns, in acquisition order.
pub struct ResourceArena<D: Driver> {
    pub(crate) display: Slot<D::Display>,
    pub(crate) config: Slot<D::Config>,
    pub(crate) context: Slot<D::Context>,
    pub(crate) surface: Slot<D::Surface>,
    pub(crate) pipeline: Slot<ShaderPipeline<D>>,
    pub(crate) bridge: Slot<DrawingBridge<D>>,
}

impl<D: Driver> Default for ResourceArena<D> {
    fn default() -> Self {
        Self {
            display: Slot::Empty,
            config: Slot::Empty,
            context: Slot::Empty,
            surface: Slot::Empty,
            pipeline: Slot::Empty,
            bridge: Slot::Empty,
        }
    }
}

impl<D: Driver> ResourceArena<D> {
    /// Returns the triple once display, config and context are all live.
    pub fn graphics_context(&self) -> Option<GraphicsContext<D>> {
        Some(GraphicsContext {
            display: self.display.copied()?,
            context: self.context.copied()?,
            config: self.config.copied()?,
        })
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            display: self.display.state(),
            config: self.config.state(),
            context: self.context.state(),
            surface: self.surface.state(),
            pipeline: self.pipeline.state(),
            bridge: self.bridge.state(),
        }
    }
}

impl<D: Driver> fmt::Debug for ResourceArena<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}

/// Slot states of an arena, for diagnostics and assertions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArenaSnapshot {
    pub display: SlotState,
    pub config: SlotState,
    pub context: SlotState,
    pub surface: SlotState,
    pub pipeline: SlotState,
    pub bridge: SlotState,
}

impl ArenaSnapshot {
    pub fn any_live(&self) -> bool {
        [
            self.display,
            self.config,
            self.context,
            self.surface,
            self.pipeline,
            self.bridge,
        ]
        .contains(&SlotState::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_moves_value_out_once() {
        let mut slot = Slot::Empty;
        slot.fill(7u32);
        assert!(slot.is_live());
        assert_eq!(slot.take(), Some(7));
        assert_eq!(slot.state(), SlotState::Released);
        assert_eq!(slot.take(), None);
        assert_eq!(slot.state(), SlotState::Released);
    }

    #[test]
    fn take_on_empty_stays_empty() {
        let mut slot: Slot<u32> = Slot::default();
        assert_eq!(slot.take(), None);
        assert_eq!(slot.state(), SlotState::Empty);
    }

    #[test]
    fn copied_only_for_live() {
        let mut slot = Slot::Empty;
        assert_eq!(slot.copied(), None);
        slot.fill(3i32);
        assert_eq!(slot.copied(), Some(3));
        slot.take();
        assert_eq!(slot.copied(), None);
    }
}
