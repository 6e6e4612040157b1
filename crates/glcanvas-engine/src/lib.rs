//! glcanvas engine crate.
//!
//! Owns the GPU context lifecycle that sits under a 2D drawing backend:
//! context negotiation, the off-screen surface, the fallback blit pipeline
//! and ordered teardown.

pub mod device;
pub mod logging;
