//! Domain model for habits, tasks, reflections and memories.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Timestamps are UTC; calendar dates are interpreted in the user zone.

pub mod habit;
pub mod memory;
pub mod reflection;
pub mod task;
