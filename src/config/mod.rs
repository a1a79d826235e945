//! # Configuration Module
//!
//! This module centralizes the numeric constants of the lock manager.
//! Constants whose values depend on each other are co-located and their
//! relationships documented, so a change in one place cannot silently
//! invalidate another.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation and compile-time assertions

pub mod constants;
pub use constants::*;
