//! Flutter bridge for Lumi core.

pub mod api;
