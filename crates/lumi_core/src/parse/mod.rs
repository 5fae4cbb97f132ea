//! Heuristic parsers over free text.
//!
//! # Responsibility
//! - Pure functions only: no persistence, no clock access.
//! - Every parser returns a usable value; failures degrade to a fallback
//!   instead of an error.

pub mod note_input;
pub mod reflection_input;
pub mod task_json;

pub use note_input::{parse_note_input, ParsedNote, UNTAGGED};
pub use reflection_input::{parse_reflection_input, ParseOutcome, ParsedReflection};
pub use task_json::extract_task_json;
