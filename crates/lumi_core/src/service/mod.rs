//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and collaborator calls into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage and platform details.

pub mod habit_store;
pub mod memory_service;
pub mod progress;
pub mod reflection_service;
pub mod task_history;
pub mod task_service;
