//! Small, dependency-free helpers shared by every other module.

pub mod alignment;
