//! Shared primitives: geometry and canvas types, the error taxonomy, hashing and file helpers.

pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod fs;
pub(crate) mod math;
