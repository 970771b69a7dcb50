//! Domain layer - Pure data and command construction.

pub mod commands;
pub mod media;
pub mod segment;
pub mod video;
