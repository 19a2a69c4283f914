//! macOS packaging stages that run after the bundle tree is assembled.

pub mod dmg;
pub mod installer;
pub mod metadata;
pub mod notarize;
pub mod sign;
