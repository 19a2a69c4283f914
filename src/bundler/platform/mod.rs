//! Platform packaging steps.

pub mod macos;
