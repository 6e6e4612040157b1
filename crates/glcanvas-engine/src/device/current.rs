//! Per-thread "current context" tracking.
//!
//! The driver binds a context to the calling thread behind our back. This
//! module mirrors that binding: a thread-local records which session's
//! context is current, and [`CurrentContext`] is the token GL work must hold.
//! A token goes stale as soon as another session's context is made current
//! on the same thread or its own session releases the context.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use super::driver::Driver;
use super::error::{GpuError, Result};

/// Identity of a [`GpuSession`](super::GpuSession), unique per process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

thread_local! {
    static CURRENT: Cell<Option<SessionId>> = const { Cell::new(None) };
}

/// Session whose context is current on the calling thread.
pub fn current_session() -> Option<SessionId> {
    CURRENT.with(Cell::get)
}

pub(crate) fn mark_current(session: SessionId) {
    let previous = CURRENT.with(|c| c.replace(Some(session)));
    if let Some(previous) = previous.filter(|p| *p != session) {
        log::debug!("{session} displaced {previous} as current context on this thread");
    }
}

/// Forgets the binding if it belongs to `session`.
pub(crate) fn clear_current(session: SessionId) {
    CURRENT.with(|c| {
        if c.get() == Some(session) {
            c.set(None);
        }
    });
}

/// Proof that a session's context is current on this thread.
///
/// Not `Send`: the binding it stands for is per-thread.
pub struct CurrentContext<'s, D: Driver> {
    driver: &'s D,
    session: SessionId,
    _thread_bound: PhantomData<*const ()>,
}

impl<'s, D: Driver> CurrentContext<'s, D> {
    /// Records `session` as current. Call right after a successful
    /// `make_current` on the driver.
    pub(crate) fn bind(driver: &'s D, session: SessionId) -> Self {
        mark_current(session);
        Self {
            driver,
            session,
            _thread_bound: PhantomData,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether the context is still current on this thread.
    pub fn is_valid(&self) -> bool {
        current_session() == Some(self.session)
    }

    /// Driver access for GL work. Fails on a stale token.
    pub fn driver(&self) -> Result<&'s D> {
        if self.is_valid() {
            Ok(self.driver)
        } else {
            Err(GpuError::context("context is not current on this thread"))
        }
    }
}

impl<D: Driver> fmt::Debug for CurrentContext<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentContext")
            .field("session", &self.session)
            .field("valid", &self.is_valid())
            .finish()
    }
}
